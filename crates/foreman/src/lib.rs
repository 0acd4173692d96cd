//! Foreman - model orchestration engine
//!
//! Turns a photographed object plus a natural-language goal into a short,
//! ordered sequence of labeled action steps by orchestrating two classes of
//! remote model calls: a vision-capable model that describes the subject and
//! a planning model that emits a strict-schema step list, optionally after a
//! bounded agentic web-search sub-loop.
//!
//! The engine is a library: the HTTP front door, configuration loading, and
//! process lifecycle live with the embedding service. All state is per
//! invocation; nothing here is shared across requests.

pub mod image;
pub mod orchestrator;
pub mod search;

pub use orchestrator::pipeline::PlanPipeline;
