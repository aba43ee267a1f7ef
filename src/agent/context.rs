use crate::llm::types::ChatMessage;

/// Explicit conversation state for one dispatch loop.
///
/// Held only for the duration of the process; nothing is persisted.
/// `reset` drops everything except the system prompt.
pub struct ConversationContext {
    system_prompt: String,
    messages: Vec<ChatMessage>,
}

impl ConversationContext {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let messages = vec![ChatMessage::text("system", system_prompt.clone())];
        Self {
            system_prompt,
            messages,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Clone of the accumulated conversation for one model request.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything except the system prompt.
    pub fn reset(&mut self) {
        self.messages = vec![ChatMessage::text("system", self.system_prompt.clone())];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_only_the_system_prompt() {
        let mut ctx = ConversationContext::new("You are a desktop agent.");
        ctx.push(ChatMessage::text("user", "hello"));
        ctx.push(ChatMessage::text("assistant", "hi"));
        assert_eq!(ctx.len(), 3);

        ctx.reset();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.messages()[0].role, "system");
    }
}
