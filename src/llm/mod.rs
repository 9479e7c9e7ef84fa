//! LLM Provider Clients and Abstractions
//!
//! Every agent talks to its text-generation backend through the [`LLMClient`]
//! trait. Clients are created per model by an [`LLMClientFactoryTrait`]
//! implementation, which lets each role run on its own model.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server (default)
//!
//! # Example
//!
//! ```ignore
//! use lyceum::llm::{LLMClientFactory, LLMClientFactoryTrait};
//!
//! let factory = LLMClientFactory::new(config.provider.clone());
//! let client = factory.create_for_model("llama3.2").await?;
//! let text = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait, provider selection and client factory.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, LLMClientFactoryTrait, LLMResponse, Provider};
