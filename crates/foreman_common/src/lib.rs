//! Foreman Common - shared types and schemas for the Foreman orchestration engine
//!
//! Everything the engine crate and its callers agree on lives here: the
//! configuration struct, the error taxonomy, the plan domain model with its
//! strict JSON Schemas, the chat wire contract, and the prompt templates.
//! No I/O in this crate.

pub mod config;
pub mod error;
pub mod plan;
pub mod prompts;
pub mod wire;

pub use config::*;
pub use error::*;
pub use plan::*;
pub use wire::*;
