use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

/// Split a base URL like `http://localhost:11434` into host and port.
/// Falls back to the Ollama defaults for anything it cannot parse.
fn parse_base_url(base_url: &str) -> (String, u16) {
    let rest = match base_url.split_once("://") {
        Some((_, rest)) => rest,
        None => return ("localhost".to_string(), 11434),
    };

    match rest.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(11434)),
        None => (rest.to_string(), 11434),
    }
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        let (host, port) = parse_base_url(&base_url);
        // `ollama-rs` parses `host` as a URL and panics on a scheme-less value,
        // while `parse_base_url` yields a bare host. Reattach the scheme the
        // caller configured (falling back to `http` for schemeless input).
        let scheme = base_url
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("http");
        let client = Ollama::new(format!("{scheme}://{host}"), port);

        Self { client, model }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::Collaborator(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
