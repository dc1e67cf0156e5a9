//! Prompt synthesis: turns a raw user prompt (plus clarifying answers or a
//! remix template) into a model-specific prompt via an external LLM, with
//! output validation, bounded retry and deterministic fallbacks.

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod log;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod safety;
pub mod schema;
pub mod strategy;
pub mod ux;
pub mod wire;

pub use engine::PromptArchitect;
pub use errors::{ProviderError, Stage, StageError, SynthesisError, TemplateError};
pub use prompt::{SystemTemplate, TemplateSource, TemplateStore};
pub use provider::{DynGenerator, Generator};
pub use wire::{Intent, PromptRequest, RemixContext, SynthesisResult};
