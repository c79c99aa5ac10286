//! SQLite-backed user directory: activity sync plus the data behind the
//! admin commands.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use dialog_flow::ports::{UserDirectory, UserProfile};
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                 vk_user_id INTEGER PRIMARY KEY,
                 first_name TEXT NOT NULL DEFAULT '',
                 last_name TEXT NOT NULL DEFAULT '',
                 username TEXT,
                 is_online INTEGER NOT NULL DEFAULT 0,
                 is_banned INTEGER NOT NULL DEFAULT 0,
                 ban_reason TEXT,
                 message_count INTEGER NOT NULL DEFAULT 0,
                 last_activity TEXT NOT NULL,
                 first_seen TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("creating users table")?;

        Ok(SqliteUserDirectory { pool })
    }

    pub async fn is_banned(&self, vk_user_id: u64) -> Result<bool> {
        let row = sqlx::query("SELECT is_banned FROM users WHERE vk_user_id = ?")
            .bind(vk_user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .context("reading ban flag")?;

        Ok(row
            .map(|row| row.get::<i64, _>("is_banned") != 0)
            .unwrap_or(false))
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn sync_user(&self, profile: &UserProfile) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users
                 (vk_user_id, first_name, last_name, username, is_online, last_activity, first_seen)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(vk_user_id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 username = excluded.username,
                 is_online = excluded.is_online,
                 last_activity = excluded.last_activity",
        )
        .bind(profile.vk_user_id as i64)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.username)
        .bind(profile.is_online)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("user upsert")?;
        Ok(())
    }

    async fn touch_message(&self, vk_user_id: u64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (vk_user_id, message_count, last_activity, first_seen)
             VALUES (?, 1, ?, ?)
             ON CONFLICT(vk_user_id) DO UPDATE SET
                 message_count = message_count + 1,
                 last_activity = excluded.last_activity",
        )
        .bind(vk_user_id as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("message counter update")?;
        Ok(())
    }

    async fn update_activity(&self, vk_user_id: u64, is_online: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_online = ?, last_activity = ? WHERE vk_user_id = ?")
            .bind(is_online)
            .bind(Utc::now().to_rfc3339())
            .bind(vk_user_id as i64)
            .execute(&self.pool)
            .await
            .context("activity update")?;
        Ok(())
    }

    async fn stats(&self) -> Result<String> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(is_online), 0) AS online,
                    COALESCE(SUM(is_banned), 0) AS banned,
                    COALESCE(SUM(message_count), 0) AS messages
             FROM users",
        )
        .fetch_one(&self.pool)
        .await
        .context("reading stats")?;

        Ok(format!(
            "📊 Статистика\nВсего пользователей: {}\nСейчас онлайн: {}\nЗаблокировано: {}\nСообщений обработано: {}",
            row.get::<i64, _>("total"),
            row.get::<i64, _>("online"),
            row.get::<i64, _>("banned"),
            row.get::<i64, _>("messages"),
        ))
    }

    async fn search(&self, query: &str, limit: u32) -> Result<String> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query(
            "SELECT vk_user_id, first_name, last_name, username, is_banned, message_count
             FROM users
             WHERE first_name LIKE ?1 OR last_name LIKE ?1 OR username LIKE ?1
                OR CAST(vk_user_id AS TEXT) LIKE ?1
             ORDER BY last_activity DESC
             LIMIT ?2",
        )
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("user search")?;

        if rows.is_empty() {
            return Ok(format!("Никого не нашлось по запросу «{query}»"));
        }

        let lines: Vec<String> = rows
            .iter()
            .map(|row| {
                let username = row
                    .get::<Option<String>, _>("username")
                    .map(|name| format!(" @{name}"))
                    .unwrap_or_default();
                let banned = if row.get::<i64, _>("is_banned") != 0 {
                    ", забанен"
                } else {
                    ""
                };
                format!(
                    "• {} {}{username} (id{}) — сообщений: {}{banned}",
                    row.get::<String, _>("first_name"),
                    row.get::<String, _>("last_name"),
                    row.get::<i64, _>("vk_user_id"),
                    row.get::<i64, _>("message_count"),
                )
            })
            .collect();

        Ok(lines.join("\n"))
    }

    async fn manage(&self, vk_user_id: u64, ban: bool, reason: Option<&str>) -> Result<String> {
        let updated =
            sqlx::query("UPDATE users SET is_banned = ?, ban_reason = ? WHERE vk_user_id = ?")
                .bind(ban)
                .bind(ban.then(|| reason.unwrap_or("не указана").to_string()))
                .bind(vk_user_id as i64)
                .execute(&self.pool)
                .await
                .context("ban flag update")?
                .rows_affected();

        if updated == 0 {
            return Ok(format!("Пользователь id{vk_user_id} не найден"));
        }
        Ok(match (ban, reason) {
            (true, Some(reason)) => {
                format!("Пользователь id{vk_user_id} заблокирован (причина: {reason})")
            }
            (true, None) => format!("Пользователь id{vk_user_id} заблокирован"),
            (false, _) => format!("Пользователь id{vk_user_id} разблокирован"),
        })
    }
}

#[cfg(test)]
mod tests {
    use dialog_flow::ports::{UserDirectory, UserProfile};
    use sqlx::SqlitePool;

    use super::SqliteUserDirectory;

    async fn directory() -> SqliteUserDirectory {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteUserDirectory::new(pool).await.unwrap()
    }

    fn profile(id: u64, first_name: &str) -> UserProfile {
        UserProfile {
            vk_user_id: id,
            first_name: first_name.to_string(),
            last_name: "Тестов".to_string(),
            username: Some("tester".to_string()),
            is_online: true,
        }
    }

    #[tokio::test]
    async fn test_sync_and_stats() {
        let directory = directory().await;
        directory.sync_user(&profile(1, "Иван")).await.unwrap();
        directory.sync_user(&profile(2, "Пётр")).await.unwrap();
        directory.touch_message(1).await.unwrap();
        directory.touch_message(1).await.unwrap();

        let stats = directory.stats().await.unwrap();
        assert!(stats.contains("Всего пользователей: 2"), "got: {stats}");
        assert!(stats.contains("Сообщений обработано: 2"));
    }

    #[tokio::test]
    async fn test_touch_message_creates_missing_row() {
        let directory = directory().await;
        directory.touch_message(7).await.unwrap();

        let stats = directory.stats().await.unwrap();
        assert!(stats.contains("Всего пользователей: 1"));
    }

    #[tokio::test]
    async fn test_search_formatting() {
        let directory = directory().await;
        directory.sync_user(&profile(1, "Иван")).await.unwrap();

        let found = directory.search("Иван", 10).await.unwrap();
        assert!(found.contains("Иван Тестов"), "got: {found}");
        assert!(found.contains("id1"));

        let missing = directory.search("Глеб", 10).await.unwrap();
        assert!(missing.contains("Никого не нашлось"));
    }

    #[tokio::test]
    async fn test_ban_round_trip() {
        let directory = directory().await;
        directory.sync_user(&profile(1, "Иван")).await.unwrap();

        let banned = directory.manage(1, true, Some("спам")).await.unwrap();
        assert!(banned.contains("заблокирован"));
        assert!(banned.contains("спам"));
        assert!(directory.is_banned(1).await.unwrap());

        let unbanned = directory.manage(1, false, None).await.unwrap();
        assert!(unbanned.contains("разблокирован"));
        assert!(!directory.is_banned(1).await.unwrap());

        let missing = directory.manage(99, true, None).await.unwrap();
        assert!(missing.contains("не найден"));
    }
}
