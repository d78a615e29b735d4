mod message;
#[cfg(feature = "mistralrs")]
mod mistral;
mod openai;
mod tool;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config::{AIConfig, Credentials, ModelProvider};

pub use message::{Conversation, Message, Role, ToolCall, parse_arguments};
#[cfg(feature = "mistralrs")]
pub use mistral::MistralModel;
pub use openai::OpenAiCompatModel;
pub use serde_json::{Value, json};
pub use tool::{ToolSpec, create_tool};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Stands in for a tool call the model sent without a function name.
pub const UNNAMED_TOOL: &str = "<unnamed>";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected model response: {0}")]
    Decode(String),

    #[error("missing credential {0}")]
    MissingCredential(&'static str),

    #[error("provider {0:?} is not available in this build")]
    Unsupported(ModelProvider),
}

/// A chat-completion service that may answer with text or tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the next assistant message for `conversation`, offering `tools`.
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Message, AiError>;
}

/// Builds the model backend named by `config`.
pub async fn connect(
    config: &AIConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn ChatModel>, AiError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider {
        ModelProvider::Ollama => {
            let base_url = format!("{}/v1", config.url.trim_end_matches('/'));
            Ok(Arc::new(OpenAiCompatModel::new(
                base_url,
                &config.model,
                None,
                timeout,
            )?))
        }
        ModelProvider::OpenAI => {
            let key = credentials
                .openai_api_key
                .clone()
                .ok_or(AiError::MissingCredential(config::OPENAI_API_KEY))?;
            Ok(Arc::new(OpenAiCompatModel::new(
                OPENAI_BASE_URL,
                &config.model,
                Some(key),
                timeout,
            )?))
        }
        #[cfg(feature = "mistralrs")]
        ModelProvider::MistralRs => Ok(Arc::new(MistralModel::new(&config.model).await?)),
        #[cfg(not(feature = "mistralrs"))]
        ModelProvider::MistralRs => Err(AiError::Unsupported(ModelProvider::MistralRs)),
    }
}
