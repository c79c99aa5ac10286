//! Thin VK API client: exactly the surface the bot needs (send message,
//! fetch user, group long poll).

mod api;
mod longpoll;

pub use api::{VkApi, VkError, VkUser};
pub use longpoll::{InboundMessage, LongPollListener};
