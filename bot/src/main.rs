mod activity;
mod commands;
mod schedule;
mod users;
mod vk;

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dialog_flow::engine::DialogEngine;
use dialog_flow::ports::UserProfile;
use dialog_flow::state::InMemoryStateStore;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::activity::ActivityTracker;
use crate::commands::SqliteCommandResolver;
use crate::schedule::HttpScheduleSource;
use crate::users::SqliteUserDirectory;
use crate::vk::{LongPollListener, VkApi};

#[tokio::main]
async fn main() -> Result<()> {
    {
        let env_file = Path::new(".env");
        if env_file.exists() {
            dotenv::from_filename(".env").ok();
        }
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&env::var("RUST_LOG").unwrap_or("INFO".to_string()))
        .init();

    log::info!("Starting bot...");

    let token = env::var("VK_TOKEN").context("VK_TOKEN must be set")?;
    let group_id: u64 = env::var("VK_GROUP_ID")
        .context("VK_GROUP_ID must be set")?
        .parse()
        .context("VK_GROUP_ID must be numeric")?;
    let database_url = env::var("DATABASE_URL").unwrap_or("sqlite://bot.db".to_string());
    let schedule_url = env::var("SCHEDULE_API_URL").context("SCHEDULE_API_URL must be set")?;

    let pool = SqlitePoolOptions::new()
        .connect_with(SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true))
        .await
        .context("opening the database")?;

    let directory = SqliteUserDirectory::new(pool.clone()).await?;
    let commands = SqliteCommandResolver::new(pool.clone()).await?;
    let api = VkApi::new(token);

    let engine = DialogEngine::new(
        api.clone(),
        commands,
        HttpScheduleSource::new(schedule_url),
        directory.clone(),
        Arc::new(InMemoryStateStore::new()),
    );
    let tracker = ActivityTracker::spawn(Arc::new(directory.clone()));
    let mut listener = LongPollListener::new(api.clone(), group_id);

    log::info!("Long poll loop started (group {group_id})");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received, shutting down");
                break;
            }
            batch = listener.next_batch() => match batch {
                Ok(messages) => {
                    for message in messages {
                        if directory.is_banned(message.from_id).await.unwrap_or(false) {
                            log::debug!("ignoring message from banned user {}", message.from_id);
                            continue;
                        }
                        sync_profile(&api, &directory, message.from_id).await;
                        tracker.touch(message.from_id);
                        engine
                            .process_message(message.from_id, message.peer_id, &message.text)
                            .await;
                    }
                }
                Err(err) => {
                    log::error!("long poll failed: {err:#}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    tracker.shutdown().await;
    Ok(())
}

async fn sync_profile(api: &VkApi, directory: &SqliteUserDirectory, user_id: u64) {
    use dialog_flow::ports::UserDirectory;

    let profile = match api.get_user(user_id).await {
        Ok(user) => UserProfile {
            vk_user_id: user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.screen_name,
            is_online: user.online == 1,
        },
        Err(err) => {
            log::warn!("users.get failed for {user_id}: {err:#}");
            return;
        }
    };

    if let Err(err) = directory.sync_user(&profile).await {
        log::warn!("user sync failed for {user_id}: {err:#}");
    }
}
