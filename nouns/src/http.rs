use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Embedder, NounError};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "text-embedding-3-small";
const OLLAMA_URL: &str = "http://localhost:11434";
const OLLAMA_DEFAULT_MODEL: &str = "nomic-embed-text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFlavor {
    /// `POST {url}/api/embed`
    Ollama,
    /// `POST {url}/embeddings`
    OpenAI,
}

/// Embeddings from a remote API. Rate limits, server errors and network
/// errors are retried with exponential backoff; other client errors fail at once.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    flavor: HttpFlavor,
    url: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl HttpEmbedder {
    pub fn new(
        flavor: HttpFlavor,
        url: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, NounError> {
        let (default_url, default_model) = match flavor {
            HttpFlavor::Ollama => (OLLAMA_URL, OLLAMA_DEFAULT_MODEL),
            HttpFlavor::OpenAI => (OPENAI_EMBEDDINGS_URL, OPENAI_DEFAULT_MODEL),
        };

        if flavor == HttpFlavor::OpenAI && api_key.is_none() {
            return Err(NounError::Embedding("OPENAI_API_KEY not set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NounError::Embedding(e.to_string()))?;

        Ok(Self {
            client,
            flavor,
            url: url
                .unwrap_or_else(|| default_url.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| default_model.to_string()),
            api_key,
            max_retries,
        })
    }

    fn endpoint(&self) -> String {
        match self.flavor {
            HttpFlavor::Ollama => format!("{}/api/embed", self.url),
            HttpFlavor::OpenAI => format!("{}/embeddings", self.url),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_key(&self) -> String {
        match self.flavor {
            HttpFlavor::Ollama => format!("ollama:{}", self.model),
            HttpFlavor::OpenAI => format!("openai:{}", self.model),
        }
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, NounError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // 1s, 2s, 4s, ... capped at 32s
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(self.endpoint()).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response
                            .json()
                            .await
                            .map_err(|e| NounError::Embedding(e.to_string()))?;
                        return match self.flavor {
                            HttpFlavor::Ollama => parse_ollama_response(&json),
                            HttpFlavor::OpenAI => parse_openai_response(&json),
                        };
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = NounError::Embedding(format!("embedding API error {status}: {body_text}"));

                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(attempt, %status, "embedding request failed, retrying");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "embedding request failed, retrying");
                    last_err = Some(NounError::Embedding(format!(
                        "embedding connection error ({}): {e}",
                        self.url
                    )));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| NounError::Embedding("embedding failed after retries".to_string())))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_vector(value: &Value) -> Result<Vec<f32>, NounError> {
    let values = value
        .as_array()
        .ok_or_else(|| NounError::Embedding("embedding is not an array".to_string()))?;

    Ok(values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>, NounError> {
    json.get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| NounError::Embedding("missing embeddings array".to_string()))?
        .iter()
        .map(parse_vector)
        .collect()
}

fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>, NounError> {
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| NounError::Embedding("missing data array".to_string()))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let index = item
                .get("index")
                .and_then(Value::as_u64)
                .unwrap_or(position as u64);
            let embedding = item
                .get("embedding")
                .ok_or_else(|| NounError::Embedding("missing embedding".to_string()))?;
            Ok((index, parse_vector(embedding)?))
        })
        .collect::<Result<Vec<_>, NounError>>()?;

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
