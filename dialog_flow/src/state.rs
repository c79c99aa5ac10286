use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketCategory {
    Adult,
    Child,
}

impl TicketCategory {
    pub fn title(&self) -> &'static str {
        match self {
            TicketCategory::Adult => "Взрослые",
            TicketCategory::Child => "Детские",
        }
    }
}

/// Step of the ticket-purchase flow the user is currently in. Each variant
/// carries exactly the selection data that is valid at that step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    WaitingForDate,
    WaitingForSession {
        date: String,
    },
    WaitingForCategory {
        date: String,
        session: String,
    },
    WaitingForPayment {
        date: String,
        session: String,
        category: TicketCategory,
    },
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

/// Per-user conversation state storage. The engine re-reads the state on
/// every inbound message and never caches it across calls.
pub trait ConversationStore: Send + Sync {
    /// Current state for the user, `Idle` if the user was never seen.
    fn state_of(&self, user_id: u64) -> ConversationState;
    fn set_state(&self, user_id: u64, state: ConversationState);
    /// Drops the user entry entirely; the next read defaults to `Idle`.
    fn clear(&self, user_id: u64);
}

#[derive(Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<u64, ConversationState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryStateStore {
    fn state_of(&self, user_id: u64) -> ConversationState {
        self.states
            .lock()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&self, user_id: u64, state: ConversationState) {
        self.states.lock().insert(user_id, state);
    }

    fn clear(&self, user_id: u64) {
        self.states.lock().remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversationState, ConversationStore, InMemoryStateStore};

    #[test]
    fn test_default_state_is_idle() {
        let store = InMemoryStateStore::new();
        assert_eq!(store.state_of(1), ConversationState::Idle);
    }

    #[test]
    fn test_state_round_trip() {
        let store = InMemoryStateStore::new();
        let state = ConversationState::WaitingForSession {
            date: "01.01.2025".to_string(),
        };

        store.set_state(1, state.clone());
        assert_eq!(store.state_of(1), state);
        // reads are idempotent between writes
        assert_eq!(store.state_of(1), state);
        // other users are untouched
        assert_eq!(store.state_of(2), ConversationState::Idle);
    }

    #[test]
    fn test_clear_resets_to_idle() {
        let store = InMemoryStateStore::new();
        store.set_state(
            1,
            ConversationState::WaitingForCategory {
                date: "01.01.2025".to_string(),
                session: "10:00".to_string(),
            },
        );

        store.clear(1);
        assert_eq!(store.state_of(1), ConversationState::Idle);
    }
}
