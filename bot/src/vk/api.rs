use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialog_flow::ports::Messenger;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

const API_BASE: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.199";

#[derive(Debug, Error)]
pub enum VkError {
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiErrorBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VkUser {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default)]
    pub online: u8,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LongPollServer {
    pub key: String,
    pub server: String,
    pub ts: String,
}

#[derive(Clone)]
pub struct VkApi {
    http: reqwest::Client,
    token: String,
}

impl VkApi {
    pub fn new(token: String) -> Self {
        VkApi {
            http: reqwest::Client::new(),
            token,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let mut form = params;
        form.push(("access_token", self.token.clone()));
        form.push(("v", API_VERSION.to_string()));

        let envelope: Envelope<T> = self
            .http
            .post(format!("{API_BASE}/{method}"))
            .form(&form)
            .send()
            .await
            .with_context(|| format!("calling {method}"))?
            .json()
            .await
            .with_context(|| format!("decoding {method} response"))?;

        if let Some(err) = envelope.error {
            return Err(VkError::Api {
                code: err.error_code,
                message: err.error_msg,
            }
            .into());
        }
        envelope
            .response
            .with_context(|| format!("{method}: empty response"))
    }

    pub async fn send_message(
        &self,
        peer_id: u64,
        text: &str,
        keyboard: Option<&str>,
    ) -> Result<i64> {
        let mut params = vec![
            ("peer_id", peer_id.to_string()),
            ("random_id", random_id().to_string()),
            ("message", text.to_string()),
        ];
        if let Some(payload) = keyboard {
            params.push(("keyboard", payload.to_string()));
        }
        self.call("messages.send", params).await
    }

    pub async fn get_user(&self, user_id: u64) -> Result<VkUser> {
        let users: Vec<VkUser> = self
            .call(
                "users.get",
                vec![
                    ("user_ids", user_id.to_string()),
                    ("fields", "screen_name,online".to_string()),
                ],
            )
            .await?;
        users
            .into_iter()
            .next()
            .with_context(|| format!("users.get: no user {user_id}"))
    }

    pub async fn get_long_poll_server(&self, group_id: u64) -> Result<LongPollServer> {
        self.call(
            "groups.getLongPollServer",
            vec![("group_id", group_id.to_string())],
        )
        .await
    }
}

#[async_trait]
impl Messenger for VkApi {
    async fn send(&self, peer_id: u64, text: &str, keyboard: Option<&str>) -> Result<bool> {
        let msg_id = self.send_message(peer_id, text, keyboard).await?;
        log::debug!("sent message {msg_id} to peer {peer_id}");
        Ok(true)
    }
}

// messages.send rejects duplicates with the same random_id
fn random_id() -> i32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| (elapsed.as_nanos() & 0x7fff_ffff) as i32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{ApiErrorBody, Envelope, VkUser};

    #[test]
    fn test_error_envelope_decoding() {
        let envelope: Envelope<i64> = serde_json::from_str(
            r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#,
        )
        .unwrap();

        let ApiErrorBody {
            error_code,
            error_msg,
        } = envelope.error.unwrap();
        assert_eq!(error_code, 5);
        assert_eq!(error_msg, "User authorization failed");
        assert!(envelope.response.is_none());
    }

    #[test]
    fn test_user_decoding_tolerates_missing_fields() {
        let envelope: Envelope<Vec<VkUser>> =
            serde_json::from_str(r#"{"response": [{"id": 42, "first_name": "Иван"}]}"#).unwrap();

        let users = envelope.response.unwrap();
        assert_eq!(users[0].id, 42);
        assert_eq!(users[0].first_name, "Иван");
        assert_eq!(users[0].online, 0);
        assert!(users[0].screen_name.is_none());
    }
}
