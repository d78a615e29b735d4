use std::collections::HashMap;

use async_trait::async_trait;
use mistralrs::{
    Function, Model, RequestBuilder, Response, TextMessageRole, TextModelBuilder, Tool,
    ToolChoice, ToolType,
};
use serde_json::{Value, json};

use crate::{AiError, ChatModel, Conversation, Message, Role, ToolCall, ToolSpec, parse_arguments};

/// Runs a model in-process through mistral.rs.
pub struct MistralModel {
    name: String,
    model: Model,
}

impl std::fmt::Debug for MistralModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralModel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl MistralModel {
    pub async fn new(model_id: &str) -> Result<Self, AiError> {
        let model = TextModelBuilder::new(model_id)
            .with_dtype(mistralrs::ModelDType::F16)
            .build()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        tracing::info!(model = model_id, "loaded local model");

        Ok(Self {
            name: model_id.to_string(),
            model,
        })
    }
}

#[async_trait]
impl ChatModel for MistralModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Message, AiError> {
        let mut request_builder = conversation
            .messages()
            .iter()
            .fold(RequestBuilder::new(), |builder, message| {
                builder.add_message(text_role(message.role), history_text(message))
            });

        if !tools.is_empty() {
            request_builder = request_builder
                .set_tools(tools.iter().map(to_mistral_tool).collect())
                .set_tool_choice(ToolChoice::Auto);
        }

        let mut stream = self
            .model
            .stream_chat_request(request_builder)
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let mut full_response = String::new();
        let mut tool_calls: Vec<ToolCall> = vec![];

        while let Some(chunk) = stream.next().await {
            if let Response::Chunk(chunk_response) = chunk
                && let Some(choice) = chunk_response.choices.first()
            {
                if let Some(content) = &choice.delta.content {
                    full_response.push_str(content);
                }
                if let Some(calls) = &choice.delta.tool_calls {
                    for call in calls {
                        tool_calls.push(ToolCall::new(
                            call.id.clone(),
                            call.function.name.clone(),
                            parse_arguments(&call.function.arguments),
                        ));
                    }
                }
            }
        }

        Ok(Message::assistant(full_response, tool_calls))
    }
}

fn text_role(role: Role) -> TextMessageRole {
    match role {
        Role::System => TextMessageRole::System,
        Role::User => TextMessageRole::User,
        Role::Assistant => TextMessageRole::Assistant,
        Role::Tool => TextMessageRole::Tool,
    }
}

/// Flattens structured fields into text, since the request builder only carries role + content.
fn history_text(message: &Message) -> String {
    match message.role {
        Role::Assistant if message.has_tool_calls() => json!({
            "content": message.content,
            "tool_calls": message.tool_calls,
        })
        .to_string(),
        Role::Tool => json!({
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        })
        .to_string(),
        _ => message.content.clone(),
    }
}

fn to_mistral_tool(spec: &ToolSpec) -> Tool {
    let parameters: Option<HashMap<String, Value>> =
        serde_json::from_value(spec.parameters.clone()).ok();

    Tool {
        tp: ToolType::Function,
        function: Function {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters,
        },
    }
}
