//! Capability seams the engine depends on. The transport, the command table
//! and the schedule feed live behind these traits; the binary crate wires in
//! the real implementations.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// DB-defined command: trigger text mapped to a canned response, optionally
/// with its own keyboard.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub name: String,
    pub response: String,
    pub keyboard: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LoadSnapshot {
    #[serde(alias = "count")]
    pub visitors: u32,
    #[serde(alias = "loadPercent", alias = "load")]
    pub load_percent: u32,
}

/// Named ticket price for a date. Upstream spellings vary.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RateEntry {
    #[serde(alias = "Name", alias = "title")]
    pub name: String,
    #[serde(alias = "Price", alias = "cost")]
    pub price: i64,
}

impl RateEntry {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        RateEntry {
            name: name.into(),
            price,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct UserProfile {
    pub vk_user_id: u64,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub is_online: bool,
}

/// Outbound message delivery.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, peer_id: u64, text: &str, keyboard: Option<&str>) -> Result<bool>;
}

/// Lookup of configurable commands by inbound text.
#[async_trait]
pub trait CommandResolver: Send + Sync {
    async fn find(&self, text: &str) -> Result<Option<Command>>;
}

/// Current load, sessions and tariffs of the rink. Session objects come back
/// raw: the upstream naming is too inconsistent to deserialize strictly, see
/// [`crate::schedule::parse_session`].
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn current_load(&self) -> Result<LoadSnapshot>;
    async fn sessions(&self, date: &str) -> Result<Vec<Value>>;
    async fn tariffs(&self, date: &str) -> Result<Vec<RateEntry>>;
}

/// User registry used for activity tracking and the admin commands. Every
/// method is best-effort from the engine's point of view: failures are
/// logged, never escalated to the end user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn sync_user(&self, profile: &UserProfile) -> Result<()>;
    async fn touch_message(&self, vk_user_id: u64) -> Result<()>;
    async fn update_activity(&self, vk_user_id: u64, is_online: bool) -> Result<()>;
    async fn stats(&self) -> Result<String>;
    async fn search(&self, query: &str, limit: u32) -> Result<String>;
    async fn manage(&self, vk_user_id: u64, ban: bool, reason: Option<&str>) -> Result<String>;
}
