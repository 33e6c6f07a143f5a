//! Language-generation collaborator clients.
//!
//! The pipeline treats text generation as an opaque, fallible call. This
//! module hides the concrete provider behind the [`LLMClient`] trait so
//! stages can be constructed with any implementation - a local Ollama
//! server, an OpenAI-compatible API, or a test double.
//!
//! # Supported Providers
//!
//! - Ollama - local inference, always available (the default)
//! - OpenAI - enable the `openai` Cargo feature
//!
//! # Example
//!
//! ```ignore
//! use atlas::llm::{LLMClientFactory, Provider};
//!
//! let factory = LLMClientFactory::new(Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! });
//! let client = factory.create_default().await?;
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait, provider enum and factory.
pub mod client;

pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
