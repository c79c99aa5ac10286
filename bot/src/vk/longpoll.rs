use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::api::{LongPollServer, VkApi};

const WAIT_SECONDS: u32 = 25;

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    updates: Vec<Value>,
    #[serde(default)]
    failed: Option<u8>,
}

#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub from_id: u64,
    pub peer_id: u64,
    pub text: String,
}

/// Group long-poll loop. One `next_batch` call is one poll cycle; protocol
/// hiccups resolve themselves on the following call.
pub struct LongPollListener {
    api: VkApi,
    http: reqwest::Client,
    group_id: u64,
    server: Option<LongPollServer>,
}

impl LongPollListener {
    pub fn new(api: VkApi, group_id: u64) -> Self {
        LongPollListener {
            api,
            http: reqwest::Client::new(),
            group_id,
            server: None,
        }
    }

    pub async fn next_batch(&mut self) -> Result<Vec<InboundMessage>> {
        let server = match self.server.clone() {
            Some(server) => server,
            None => {
                let server = self
                    .api
                    .get_long_poll_server(self.group_id)
                    .await
                    .context("obtaining long poll server")?;
                log::debug!("long poll server obtained, ts={}", server.ts);
                self.server = Some(server.clone());
                server
            }
        };

        let response: PollResponse = self
            .http
            .get(&server.server)
            .query(&[
                ("act", "a_check".to_string()),
                ("key", server.key.clone()),
                ("ts", server.ts.clone()),
                ("wait", WAIT_SECONDS.to_string()),
            ])
            .send()
            .await
            .context("long poll request")?
            .json()
            .await
            .context("decoding long poll response")?;

        match response.failed {
            // history is outdated, the new ts comes with the response
            Some(1) => {
                if let (Some(server), Some(ts)) = (self.server.as_mut(), response.ts) {
                    server.ts = ts;
                }
                Ok(vec![])
            }
            // key expired or information lost: re-obtain the server next call
            Some(code) => {
                log::warn!("long poll failed with code {code}, re-obtaining server");
                self.server = None;
                Ok(vec![])
            }
            None => {
                if let (Some(server), Some(ts)) = (self.server.as_mut(), response.ts) {
                    server.ts = ts;
                }
                Ok(response
                    .updates
                    .iter()
                    .filter_map(parse_message_event)
                    .collect())
            }
        }
    }
}

fn parse_message_event(update: &Value) -> Option<InboundMessage> {
    if update.get("type")?.as_str()? != "message_new" {
        return None;
    }
    let object = update.get("object")?;
    // api >= 5.103 nests the message one level deeper
    let message = object.get("message").unwrap_or(object);

    let from_id = message.get("from_id")?.as_i64()?;
    let peer_id = message.get("peer_id")?.as_i64()?;
    let text = message.get("text")?.as_str()?.to_string();

    // negative from_id means a group is writing; those are not conversations
    (from_id > 0).then_some(InboundMessage {
        from_id: from_id as u64,
        peer_id: peer_id as u64,
        text,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_message_event, PollResponse};

    #[test]
    fn test_message_event_parsing() {
        let update = json!({
            "type": "message_new",
            "object": {
                "message": {"from_id": 42, "peer_id": 42, "text": "билет"}
            }
        });

        let message = parse_message_event(&update).unwrap();
        assert_eq!(message.from_id, 42);
        assert_eq!(message.peer_id, 42);
        assert_eq!(message.text, "билет");
    }

    #[test]
    fn test_flat_message_object_is_accepted() {
        let update = json!({
            "type": "message_new",
            "object": {"from_id": 42, "peer_id": 42, "text": "привет"}
        });

        assert!(parse_message_event(&update).is_some());
    }

    #[test]
    fn test_non_message_updates_are_ignored() {
        let update = json!({
            "type": "message_typing_state",
            "object": {"from_id": 42, "peer_id": 42, "text": ""}
        });
        assert!(parse_message_event(&update).is_none());

        let group_sender = json!({
            "type": "message_new",
            "object": {"message": {"from_id": -191039, "peer_id": 42, "text": "рассылка"}}
        });
        assert!(parse_message_event(&group_sender).is_none());
    }

    #[test]
    fn test_failed_response_decoding() {
        let response: PollResponse = serde_json::from_str(r#"{"failed": 2}"#).unwrap();
        assert_eq!(response.failed, Some(2));
        assert!(response.updates.is_empty());
        assert!(response.ts.is_none());
    }
}
