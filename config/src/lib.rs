use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "GLEAN_CONFIG";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing credential {0}")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GleanConfig {
    pub ai: AIConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub chart: ChartConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Ollama,
    OpenAI,
    MistralRs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AIConfig {
    pub provider: ModelProvider,
    pub model: String,
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for AIConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Ollama,
            model: "llama3.1:latest".to_string(),
            url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Queries whose cells make up the proper-noun corpus.
    pub noun_queries: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://Chinook.db".to_string(),
            noun_queries: vec![
                "SELECT Name FROM Artist".to_string(),
                "SELECT Title FROM Album".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Local,
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
    pub url: Option<String>,
    pub dims: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: None,
            url: None,
            dims: 256,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub output_dir: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub max_turns: usize,
    pub top_k: usize,
    pub dialect: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            top_k: 5,
            dialect: "SQLite".to_string(),
        }
    }
}

impl GleanConfig {
    pub fn get_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return GleanConfig::default();
        };

        Self::from_path(&path).unwrap_or_default()
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `$GLEAN_CONFIG`, else `$HOME/.config/glean/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let home_dir = std::env::var("HOME").ok()?;
        Some(PathBuf::from(format!("{home_dir}/.config/glean/config.toml")))
    }

    /// Whether any configured collaborator talks to the OpenAI API.
    pub fn needs_openai_key(&self) -> bool {
        self.ai.provider == ModelProvider::OpenAI
            || self.embedding.provider == EmbeddingProvider::OpenAI
    }
}

/// Secrets resolved once at startup and handed to constructors.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Reads credentials through `lookup` (normally `std::env::var`), falling back to
    /// `prompt` for anything the configuration needs but the lookup lacks.
    pub fn resolve<L, P>(config: &GleanConfig, lookup: L, mut prompt: P) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
        P: FnMut(&str) -> Option<String>,
    {
        let mut openai_api_key = lookup(OPENAI_API_KEY).filter(|key| !key.trim().is_empty());

        if openai_api_key.is_none() && config.needs_openai_key() {
            openai_api_key = prompt("Enter OpenAI API Key")
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty());

            if openai_api_key.is_none() {
                return Err(ConfigError::MissingCredential(OPENAI_API_KEY));
            }
        }

        Ok(Self { openai_api_key })
    }
}
