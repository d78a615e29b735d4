#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use ai::{AiError, ChatModel, Conversation, Message, ToolCall, ToolSpec, Value};
use async_trait::async_trait;

/// Replays canned assistant messages and records how many messages it was shown each turn.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    seen: Mutex<Vec<usize>>,
    instructions: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            instructions: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Never answers within `delay`.
    pub(crate) fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(vec![Message::assistant("too late", vec![])])
        }
    }

    pub(crate) fn seen(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }

    /// System message of every conversation it was shown.
    pub(crate) fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        _tools: &[ToolSpec],
    ) -> Result<Message, AiError> {
        self.seen.lock().unwrap().push(conversation.len());
        if let Some(system) = conversation.messages().first() {
            self.instructions.lock().unwrap().push(system.content.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AiError::Decode("script exhausted".into()))
    }
}

pub(crate) fn call(id: &str, name: &str, arguments: Value) -> Message {
    Message::assistant("", vec![ToolCall::new(id, name, arguments)])
}

pub(crate) fn answer(text: &str) -> Message {
    Message::assistant(text, vec![])
}
