// mailbox.rs — single-slot handoff between the ingestion and control workers.
//
// Capacity is exactly one: a publish overwrites whatever the consumer has not
// taken yet, so a slow control loop always observes the freshest snapshot and
// never a backlog. There is no history and no queueing anywhere in this path.

use std::sync::Mutex;

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Mailbox { slot: Mutex::new(None) }
    }

    /// Store `value`, replacing any unread one. Never blocks the producer
    /// beyond the slot lock.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(value);
    }

    /// Take the most recently published value, or `None` if nothing new has
    /// arrived since the last successful take. Empty is a normal condition,
    /// not an error.
    pub fn try_take(&self) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
