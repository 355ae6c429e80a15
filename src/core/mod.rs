//! Core round-trip translation engine

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod translator;
