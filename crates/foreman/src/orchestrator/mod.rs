//! Model orchestration core.
//!
//! The flow is one-directional: normalized image -> model call(s) -> raw JSON
//! text -> validated plan. Every remote call goes through the retrying
//! invoker; the tool loop and the pipeline coordinator sit on top of it and
//! the extractor turns the final text into typed steps.
//!
//! Production wiring uses `HttpTransport` and the web-search tool; tests use
//! the deterministic fakes in `fakes` (no network, no sleep surprises).

pub mod extractor;
pub mod fakes;
pub mod invoker;
pub mod pipeline;
pub mod tool_loop;

pub use extractor::{extract_steps, extract_task_plan};
pub use fakes::{FakeToolHandler, ScriptedReply, ScriptedTransport};
pub use invoker::{CallOutcome, ChatTransport, HttpTransport, RetryingInvoker};
pub use pipeline::PlanPipeline;
pub use tool_loop::{ToolCatalog, ToolHandler, ToolLoopDriver};

/// Sampling for identification calls: low temperature, tight nucleus.
pub(crate) const VISION_TEMPERATURE: f64 = 0.2;
pub(crate) const VISION_TOP_P: f64 = 0.7;
pub(crate) const VISION_MAX_TOKENS: u32 = 300;

/// Sampling for planning calls.
pub(crate) const PLAN_TEMPERATURE: f64 = 0.3;
pub(crate) const PLAN_TOP_P: f64 = 0.95;
pub(crate) const PLAN_MAX_TOKENS: u32 = 2000;
