use hubspace_common::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Messages kept in the room history.
pub const HISTORY_LIMIT: usize = 50;
/// Longest accepted message, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    Empty,
    #[error("message is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Shortened sender id.
    pub from: String,
    pub text: String,
    pub at_ms: u64,
}

/// Room chat history, ordered by timestamp, newest last.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a message. Whitespace is trimmed before the checks.
    pub fn post(
        &mut self,
        from: &ParticipantId,
        text: &str,
        at_ms: u64,
    ) -> Result<ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::Empty);
        }
        let len = text.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(ChatError::TooLong {
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }

        let message = ChatMessage {
            from: from.short(),
            text: text.to_string(),
            at_ms,
        };
        // Stable for equal timestamps: later posts go after earlier ones.
        let idx = self.messages.partition_point(|m| m.at_ms <= at_ms);
        self.messages.insert(idx, message.clone());
        if self.messages.len() > HISTORY_LIMIT {
            self.messages.pop_front();
        }
        tracing::debug!(from = %message.from, at_ms, "chat message posted");
        Ok(message)
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().skip(self.messages.len().saturating_sub(n))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
