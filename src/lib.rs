//! commit-assist - AI-assisted commit message generation.
//!
//! # Overview
//!
//! commit-assist reads the staged changes of a git repository, builds a
//! rule-driven prompt and asks a remote language model (OpenAI, xAI,
//! OpenRouter, Gemini or any OpenAI-compatible endpoint) for either a
//! streamed free-text message or a schema-validated conventional commit.

pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod git;
pub mod llm;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use dispatch::{GENERATION_TIMEOUT, GenerationRequest, Generator};
pub use error::{AiError, DiffError, SettingsError};
pub use llm::{HttpConnector, LanguageModel, ModelConnector, TextStream};
pub use prompt::{CommitType, CommitTypeCatalog};
pub use provider::{ApiKey, Model, ProviderCredentials, ProviderId};
pub use schema::{FieldFlags, OptionalField, ResponseSchema, StructuredCommitMessage};
pub use session::GenerationEvent;
pub use settings::{Overrides, Settings};
