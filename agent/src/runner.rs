use std::sync::Arc;
use std::time::Duration;

use ai::{AiError, ChatModel, Conversation, Message, ToolCall};

use crate::registry::{ToolRegistry, ToolResult};

pub const DEFAULT_MAX_TURNS: usize = 25;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("no final answer after {max_turns} model turns")]
    Exhausted { max_turns: usize },

    #[error("model did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Model(#[from] AiError),
}

/// One observable step of a run, reported as it happens.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The model answered: text, requested tool calls, or both.
    Agent {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Every tool call of the preceding agent step has run.
    Tools { results: Vec<ToolResult> },
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub answer: String,
    pub conversation: Conversation,
    /// Model calls made.
    pub turns: usize,
}

#[derive(Debug)]
enum AgentState {
    AwaitingModel,
    ExecutingTool(Vec<ToolCall>),
    Done(String),
}

/// Drives the model/tool exchange for one question at a time.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    system_prompt: String,
    max_turns: usize,
    turn_timeout: Duration,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.name())
            .field("registry", &self.registry)
            .field("max_turns", &self.max_turns)
            .field("turn_timeout", &self.turn_timeout)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        registry: ToolRegistry,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model,
            registry,
            system_prompt: system_prompt.into(),
            max_turns: DEFAULT_MAX_TURNS,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answers `question`, calling `on_step` after every model reply and
    /// every tool batch.
    ///
    /// Tool failures, unknown tools and bad arguments are fed back to the
    /// model as `Error: ...` tool messages. Only model failures, a model call
    /// outliving the turn timeout, or running out of turns end the run early.
    pub async fn run<F, Fut>(&self, question: &str, mut on_step: F) -> Result<Outcome, AgentError>
    where
        F: FnMut(Step) -> Fut,
        Fut: Future<Output = ()>,
    {
        let tools = self.registry.specs();
        let mut conversation = Conversation::new(&self.system_prompt, question);
        let mut turns = 0;
        let mut state = AgentState::AwaitingModel;

        loop {
            state = match state {
                AgentState::AwaitingModel => {
                    if turns >= self.max_turns {
                        tracing::warn!(max_turns = self.max_turns, "agent ran out of turns");
                        return Err(AgentError::Exhausted {
                            max_turns: self.max_turns,
                        });
                    }
                    turns += 1;

                    let reply = self.ask_model(&conversation, &tools).await?;
                    tracing::debug!(
                        turn = turns,
                        tool_calls = reply.tool_calls.len(),
                        "model replied"
                    );

                    on_step(Step::Agent {
                        text: reply.content.clone(),
                        tool_calls: reply.tool_calls.clone(),
                    })
                    .await;

                    let next = if reply.has_tool_calls() {
                        AgentState::ExecutingTool(reply.tool_calls.clone())
                    } else {
                        AgentState::Done(reply.content.clone())
                    };
                    conversation.push(reply);
                    next
                }
                AgentState::ExecutingTool(calls) => {
                    let mut results = Vec::with_capacity(calls.len());

                    for call in &calls {
                        let result = match self.registry.dispatch(call).await {
                            Ok(result) => result,
                            Err(e) => {
                                tracing::warn!(tool = %call.name, error = %e, "rejected tool call");
                                ToolResult::failure(call, e)
                            }
                        };

                        conversation.push(Message::tool(call, &result.content));
                        results.push(result);
                    }

                    on_step(Step::Tools { results }).await;
                    AgentState::AwaitingModel
                }
                AgentState::Done(answer) => {
                    tracing::info!(turns, "agent finished");
                    return Ok(Outcome {
                        answer,
                        conversation,
                        turns,
                    });
                }
            };
        }
    }

    async fn ask_model(
        &self,
        conversation: &Conversation,
        tools: &[ai::ToolSpec],
    ) -> Result<Message, AgentError> {
        let reply = tokio::time::timeout(self.turn_timeout, self.model.complete(conversation, tools))
            .await
            .map_err(|_| AgentError::Timeout(self.turn_timeout))?;

        Ok(reply?)
    }
}
