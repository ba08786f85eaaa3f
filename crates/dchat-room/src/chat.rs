//! The chat log: delivered messages, newest first.

use std::collections::VecDeque;

use dchat_protocol::Identity;
use serde::Serialize;

/// One delivered chat message and the identity it was sent under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    identity: Identity,
    text: String,
}

impl ChatEntry {
    /// Creates an entry.
    pub fn new(identity: Identity, text: impl Into<String>) -> Self {
        Self {
            identity,
            text: text.into(),
        }
    }

    /// Who sent the message.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The message text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Append-only log in arrival order, newest entry first.
///
/// Entries are never removed, reordered, or deduplicated.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
}

impl ChatLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delivered message at the front of the log.
    pub fn append_incoming(&mut self, identity: Identity, text: impl Into<String>) {
        self.entries.push_front(ChatEntry::new(identity, text));
    }

    /// Iterates entries newest first.
    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    /// The most recently delivered entry.
    pub fn latest(&self) -> Option<&ChatEntry> {
        self.entries.front()
    }

    /// Number of delivered messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been delivered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the entries out, newest first.
    pub fn to_vec(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn who(name: &str) -> Identity {
        Identity::new(name, "green")
    }

    #[test]
    fn test_append_incoming_puts_newest_first() {
        let mut log = ChatLog::new();
        log.append_incoming(who("a"), "first");
        log.append_incoming(who("b"), "second");

        let texts: Vec<&str> = log.entries().map(ChatEntry::text).collect();
        assert_eq!(texts, vec!["second", "first"]);
        assert_eq!(log.latest().map(ChatEntry::text), Some("second"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut log = ChatLog::new();
        log.append_incoming(who("a"), "same");
        log.append_incoming(who("a"), "same");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_new_log_is_empty() {
        let log = ChatLog::new();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }

    #[test]
    fn test_entry_keeps_sender_identity() {
        let mut log = ChatLog::new();
        log.append_incoming(who("ada"), "hi");
        assert_eq!(log.to_vec()[0].identity(), &who("ada"));
    }
}
