//! Ordered message log carried across turns.

use super::message::{ChatMessage, Role, system_message, user_message};

/// Append-only conversation history.
///
/// The system prompt is always the first entry. Turns push the user
/// message, then the agentic loop appends assistant and tool messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Starts a conversation with the given system prompt.
    #[must_use]
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![system_message(system_prompt)],
        }
    }

    /// Appends a user message.
    pub fn push_user(&mut self, content: &str) {
        self.messages.push(user_message(content));
    }

    /// Moves the log out, leaving it empty until [`Self::restore`].
    pub(crate) fn take(&mut self) -> Vec<ChatMessage> {
        std::mem::take(&mut self.messages)
    }

    /// Puts back a log previously taken with [`Self::take`].
    pub(crate) fn restore(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    /// All messages in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages, including the system prompt.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` only while the log is taken by a running turn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of user turns recorded.
    #[must_use]
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::assistant_message;

    #[test]
    fn test_system_prompt_first() {
        let mut conv = Conversation::new("sys");
        conv.push_user("chunk 1");
        let mut log = conv.take();
        log.push(assistant_message("noted"));
        conv.restore(log);
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.messages()[0].content, "sys");
        assert_eq!(conv.user_turns(), 1);
    }

    #[test]
    fn test_take_and_restore() {
        let mut conv = Conversation::new("sys");
        conv.push_user("a");
        let mut taken = conv.take();
        assert!(conv.is_empty());
        taken.push(assistant_message("b"));
        conv.restore(taken);
        assert_eq!(conv.len(), 3);
    }
}
