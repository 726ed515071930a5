//! LLM provider abstraction layer for stock-predictor
//!
//! This crate provides provider-agnostic abstractions for asking a Large
//! Language Model for a single completion. It includes:
//!
//! - Message types for LLM communication
//! - Completion request/response types, including structured (JSON schema)
//!   output constraints
//! - Provider trait for LLM implementations
//! - Concrete provider implementations (behind feature flags)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, ResponseFormat, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;

// Provider implementations (feature-gated)
#[cfg(any(feature = "gemini", feature = "openai"))]
pub mod providers;
