//! HTTP source of the rink load, sessions and tariffs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialog_flow::ports::{LoadSnapshot, RateEntry, ScheduleSource};
use serde_json::Value;

pub struct HttpScheduleSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScheduleSource {
    pub fn new(base_url: String) -> Self {
        HttpScheduleSource {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn current_load(&self) -> Result<LoadSnapshot> {
        self.http
            .get(format!("{}/load", self.base_url))
            .send()
            .await
            .context("load request")?
            .error_for_status()
            .context("load request status")?
            .json()
            .await
            .context("decoding load snapshot")
    }

    async fn sessions(&self, date: &str) -> Result<Vec<Value>> {
        self.http
            .get(format!("{}/sessions", self.base_url))
            .query(&[("date", date)])
            .send()
            .await
            .context("sessions request")?
            .error_for_status()
            .context("sessions request status")?
            .json()
            .await
            .context("decoding sessions")
    }

    async fn tariffs(&self, date: &str) -> Result<Vec<RateEntry>> {
        self.http
            .get(format!("{}/tariffs", self.base_url))
            .query(&[("date", date)])
            .send()
            .await
            .context("tariffs request")?
            .error_for_status()
            .context("tariffs request status")?
            .json()
            .await
            .context("decoding tariffs")
    }
}
