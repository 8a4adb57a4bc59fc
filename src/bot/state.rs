//! Per-chat pending-input state.
//!
//! The aiogram-style finite-state machine is reduced to a single "what are
//! we waiting for" marker per chat, kept in memory. A restart simply drops
//! pending prompts, matching the in-memory FSM storage of the original.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The next free-form message this chat is expected to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInput {
    /// New text for an existing note
    EditNoteText { note_id: i32, page: i64 },
    /// An IANA timezone name
    AwaitTimezone,
    /// A default reminder time in `HH:MM`
    AwaitReminderTime,
    /// A person's name for a new birthday entry
    BirthdayName,
    /// The birth date for the named person
    BirthdayDate { person_name: String },
    /// A `.txt` document with birthday lines
    BirthdayImport,
}

#[derive(Clone, Default)]
pub struct PendingInputs {
    inner: Arc<Mutex<HashMap<i64, PendingInput>>>,
}

impl PendingInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, chat_id: i64, input: PendingInput) {
        self.inner.lock().unwrap().insert(chat_id, input);
    }

    pub fn get(&self, chat_id: i64) -> Option<PendingInput> {
        self.inner.lock().unwrap().get(&chat_id).cloned()
    }

    /// Remove and return the pending state, consuming the prompt.
    pub fn take(&self, chat_id: i64) -> Option<PendingInput> {
        self.inner.lock().unwrap().remove(&chat_id)
    }

    pub fn clear(&self, chat_id: i64) {
        self.inner.lock().unwrap().remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_the_state() {
        let pending = PendingInputs::new();
        pending.set(1, PendingInput::AwaitTimezone);
        assert_eq!(pending.get(1), Some(PendingInput::AwaitTimezone));
        assert_eq!(pending.take(1), Some(PendingInput::AwaitTimezone));
        assert_eq!(pending.take(1), None);
    }

    #[test]
    fn states_are_per_chat() {
        let pending = PendingInputs::new();
        pending.set(1, PendingInput::BirthdayName);
        pending.set(
            2,
            PendingInput::BirthdayDate {
                person_name: "Мама".into(),
            },
        );
        pending.clear(1);
        assert_eq!(pending.get(1), None);
        assert!(matches!(pending.get(2), Some(PendingInput::BirthdayDate { .. })));
    }

    #[test]
    fn newer_state_replaces_older() {
        let pending = PendingInputs::new();
        pending.set(1, PendingInput::AwaitTimezone);
        pending.set(1, PendingInput::AwaitReminderTime);
        assert_eq!(pending.get(1), Some(PendingInput::AwaitReminderTime));
    }
}
