//! Command table lookup over the admin-panel SQLite database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialog_flow::ports::{Command, CommandResolver};
use sqlx::{Row, SqlitePool};

pub struct SqliteCommandResolver {
    pool: SqlitePool,
}

impl SqliteCommandResolver {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commands (
                 name TEXT NOT NULL COLLATE NOCASE UNIQUE,
                 triggers TEXT NOT NULL,
                 response TEXT NOT NULL,
                 keyboard TEXT,
                 command_type TEXT NOT NULL DEFAULT 'text'
             )",
        )
        .execute(&pool)
        .await
        .context("creating commands table")?;

        Ok(SqliteCommandResolver { pool })
    }
}

#[async_trait]
impl CommandResolver for SqliteCommandResolver {
    async fn find(&self, text: &str) -> Result<Option<Command>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let rows = sqlx::query("SELECT name, triggers, response, keyboard FROM commands")
            .fetch_all(&self.pool)
            .await
            .context("loading command table")?;

        for row in rows {
            let triggers: String = row.get("triggers");
            let matched = triggers
                .split(';')
                .map(|trigger| trigger.trim().to_lowercase())
                .any(|trigger| !trigger.is_empty() && trigger == needle);

            if matched {
                return Ok(Some(Command {
                    name: row.get("name"),
                    response: row.get("response"),
                    keyboard: row.get("keyboard"),
                }));
            }
        }
        Ok(None)
    }
}
