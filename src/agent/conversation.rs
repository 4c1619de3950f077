//! The conversation sent to the model on every step.

use crate::config::DESCRIPTION_PLACEHOLDER;
use crate::model::{ChatMessage, Role};

/// Role-tagged messages, bounded to a single full UI description.
///
/// A description is pushed before each request. Once the model's answer
/// has been acted on, [`Conversation::compact`] swaps the description for a
/// short placeholder and records the answer, so old screens never pile up.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending_description: bool,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            pending_description: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the prompt describing the current screen.
    ///
    /// A description still pending from an abandoned step is replaced.
    pub fn push_description(&mut self, prompt: impl Into<String>) {
        self.discard_pending();
        self.messages.push(ChatMessage::user(prompt));
        self.pending_description = true;
    }

    /// Drop the pending description, if any.
    pub fn discard_pending(&mut self) {
        if self.pending_description {
            self.messages.pop();
            self.pending_description = false;
        }
    }

    /// Replace the pending description with the placeholder and record the
    /// model's response.
    pub fn compact(&mut self, response: impl Into<String>) {
        self.discard_pending();
        self.messages.push(ChatMessage::user(DESCRIPTION_PLACEHOLDER));
        self.messages.push(ChatMessage::assistant(response));
    }

    /// Number of user messages that still carry a full description.
    pub fn description_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User && m.content != DESCRIPTION_PLACEHOLDER)
            .count()
    }
}
