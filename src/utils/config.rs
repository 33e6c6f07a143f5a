use crate::llm::Provider;
use crate::pipeline::RunnerSettings;
use crate::types::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// Which provider to use: "ollama" or "openai".
    pub provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Result cap per research query.
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub collaborator_timeout_secs: u64,
    pub clarification_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::Configuration(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env_or("ATLAS_HOST", "127.0.0.1"),
                port: parse_env("ATLAS_PORT", 3000)?,
            },
            llm: LLMConfig {
                provider: env_or("ATLAS_LLM_PROVIDER", "ollama"),
                ollama_url: env_or("ATLAS_OLLAMA_URL", "http://localhost:11434"),
                ollama_model: env_or("ATLAS_OLLAMA_MODEL", "llama3.2"),
                openai_api_key: env::var("ATLAS_OPENAI_API_KEY").ok(),
                openai_api_base: env_or("ATLAS_OPENAI_API_BASE", "https://api.openai.com/v1"),
                openai_model: env_or("ATLAS_OPENAI_MODEL", "gpt-4o-mini"),
            },
            search: SearchConfig {
                max_results: parse_env("ATLAS_SEARCH_MAX_RESULTS", 4)?,
            },
            pipeline: PipelineConfig {
                collaborator_timeout_secs: parse_env("ATLAS_COLLABORATOR_TIMEOUT_SECS", 120)?,
                clarification_timeout_secs: parse_env("ATLAS_CLARIFICATION_TIMEOUT_SECS", 300)?,
                max_retries: parse_env("ATLAS_MAX_RETRIES", 2)?,
                retry_base_delay_ms: parse_env("ATLAS_RETRY_BASE_DELAY_MS", 500)?,
            },
        })
    }
}

impl LLMConfig {
    /// Resolve the configured provider.
    pub fn provider(&self) -> Result<Provider> {
        match self.provider.as_str() {
            "ollama" => Ok(Provider::Ollama {
                base_url: self.ollama_url.clone(),
                model: self.ollama_model.clone(),
            }),
            #[cfg(feature = "openai")]
            "openai" => {
                let api_key = self.openai_api_key.clone().ok_or_else(|| {
                    AppError::Configuration(
                        "ATLAS_OPENAI_API_KEY is required for the openai provider".to_string(),
                    )
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: self.openai_api_base.clone(),
                    model: self.openai_model.clone(),
                })
            }
            #[cfg(not(feature = "openai"))]
            "openai" => Err(AppError::Configuration(
                "this build does not include the openai feature".to_string(),
            )),
            other => Err(AppError::Configuration(format!(
                "unknown LLM provider '{}'",
                other
            ))),
        }
    }
}

impl PipelineConfig {
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            collaborator_timeout: Duration::from_secs(self.collaborator_timeout_secs),
            clarification_timeout: Duration::from_secs(self.clarification_timeout_secs),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}
