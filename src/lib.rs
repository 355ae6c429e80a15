//! TransBack - round-trip translation checking
//!
//! Translates text through an OpenRouter chat-completion model, translates the
//! result back, and asks the model whether the meaning survived. Exposed as an
//! HTTP API (batch and Server-Sent Events) and as a file-based CLI.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod logging;
pub mod server;

// Re-export key types for convenience
pub use crate::core::{
    client::{ChatCompletion, OpenRouterClient},
    config::AppConfig,
    errors::TranslationError,
    models::{PipelineResult, RoundTripRequest, Stage},
    pipeline::RoundTrip,
    prompt::{PromptLoader, Slot, Template},
    translator::Translator,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
