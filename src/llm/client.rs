use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction.
///
/// All providers implement this trait, allowing the pipeline to swap
/// between them (or substitute a fake in tests) without changing stage code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama local LLM provider.
    ///
    /// Recommended models: `llama3.2` (general purpose), `mistral` (fast).
    Ollama { base_url: String, model: String },

    /// OpenAI API provider (including Azure OpenAI and compatible APIs).
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl Provider {
    /// Create a client instance for this provider.
    pub fn create_client(&self) -> Box<dyn LLMClient> {
        match self {
            Provider::Ollama { base_url, model } => Box::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            )),
        }
    }

    /// Get a human-readable name for this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Ollama { .. } => "Ollama",
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    /// The model this provider is configured to use.
    pub fn model(&self) -> &str {
        match self {
            Provider::Ollama { model, .. } => model,
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => model,
        }
    }
}

/// Configuration-based client factory.
///
/// Holds a default provider while allowing per-call provider switching.
pub struct LLMClientFactory {
    default_provider: Provider,
}

impl LLMClientFactory {
    /// Create a new factory with the specified default provider.
    pub fn new(default_provider: Provider) -> Self {
        Self { default_provider }
    }

    /// Create a client using the default provider.
    pub fn create_default(&self) -> Box<dyn LLMClient> {
        self.default_provider.create_client()
    }

    /// Create a client using a specific provider.
    pub fn create_with_provider(&self, provider: Provider) -> Box<dyn LLMClient> {
        provider.create_client()
    }

    /// Get a reference to the default provider.
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}
