//! Chat completions over the OpenAI wire format. Ollama serves the same API under `/v1`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    AiError, ChatModel, Conversation, Message, Role, ToolCall, ToolSpec, UNNAMED_TOOL,
    parse_arguments,
};

#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiCompatModel {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            timeout,
        })
    }

    fn request_body(&self, conversation: &Conversation, tools: &[ToolSpec]) -> Value {
        let messages: Vec<Value> = conversation.messages().iter().map(wire_message).collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(ToolSpec::to_wire).collect());
            body["tool_choice"] = json!("auto");
        }

        body
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Message, AiError> {
        let body = self.request_body(conversation, tools);

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout(self.timeout)
            } else {
                AiError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::Request(format!("{status}: {text}")));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;

        let message = parse_response(&json)?;
        tracing::debug!(
            model = %self.model,
            tool_calls = message.tool_calls.len(),
            "received completion"
        );
        Ok(message)
    }
}

fn wire_message(message: &Message) -> Value {
    let mut wire = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if message.role == Role::Assistant && message.has_tool_calls() {
        wire["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    },
                })
            })
            .collect();
    }

    if let Some(id) = &message.tool_call_id {
        wire["tool_call_id"] = json!(id);
    }

    if let Some(name) = &message.name {
        wire["name"] = json!(name);
    }

    wire
}

fn parse_response(json: &Value) -> Result<Message, AiError> {
    let message = json
        .pointer("/choices/0/message")
        .ok_or_else(|| AiError::Decode("missing choices[0].message".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(index, call)| parse_tool_call(index, call))
                .collect()
        })
        .unwrap_or_default();

    Ok(Message::assistant(content, tool_calls))
}

// A call without a name is kept so dispatch can reject it back to the model.
fn parse_tool_call(index: usize, call: &Value) -> ToolCall {
    let function = call.get("function");
    let name = function
        .and_then(|function| function.get("name"))
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(UNNAMED_TOOL);

    let arguments = match function.and_then(|function| function.get("arguments")) {
        Some(Value::String(raw)) => parse_arguments(raw),
        Some(other) => other.clone(),
        None => json!({}),
    };

    let id = call
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| format!("call_{index}"), str::to_string);

    ToolCall::new(id, name, arguments)
}
