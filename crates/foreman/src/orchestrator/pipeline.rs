//! Pipeline coordinator.
//!
//! Sequences the end-to-end flow: validate input -> normalize image ->
//! identify and/or plan -> validate the structured answer -> return ordered
//! steps. Two operating modes are first-class: two-stage (separate
//! identify-then-plan calls, no tools) and combined single-call (one
//! multimodal call that may run the tool loop). Errors propagate unchanged in
//! kind; mapping to a caller-facing status lives on `ForemanError` itself.

use foreman_common::prompts::{
    build_combined_system_prompt, build_combined_user_prompt, build_plan_system_prompt,
    build_plan_user_prompt, build_task_plan_system_prompt, build_task_plan_user_prompt,
    build_vision_user_prompt, sanitize_inline, VISION_SYSTEM_PROMPT,
};
use foreman_common::wire::{ChatMessage, ChatRequest, Conversation, ResponseFormat};
use foreman_common::{
    step_list_schema, task_plan_schema, ForemanConfig, ForemanError, PipelineMode, PlanRequest,
    PlanStep, TaskPlan, MAX_GOAL_CHARS, MIN_IMAGE_PAYLOAD_CHARS,
};
use std::sync::Arc;
use tracing::info;

use super::extractor;
use super::invoker::{ChatTransport, HttpTransport, RetryingInvoker};
use super::tool_loop::{ToolCatalog, ToolLoopDriver};
use super::{
    PLAN_MAX_TOKENS, PLAN_TEMPERATURE, PLAN_TOP_P, VISION_MAX_TOKENS, VISION_TEMPERATURE,
    VISION_TOP_P,
};
use crate::image::{self, NormalizedImage};
use crate::search::SearchClient;

/// End-to-end plan pipeline. One instance serves many requests; all mutable
/// state is per invocation.
pub struct PlanPipeline {
    config: ForemanConfig,
    invoker: RetryingInvoker,
    tools: ToolCatalog,
}

impl PlanPipeline {
    /// Production wiring: HTTP transport plus the web-search capability.
    pub fn new(config: ForemanConfig) -> anyhow::Result<Self> {
        let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(&config)?);
        let mut tools = ToolCatalog::new();
        tools.register(Arc::new(SearchClient::new(&config)?));
        Ok(Self::with_parts(config, transport, tools))
    }

    /// Explicit wiring; the seam tests use to swap in scripted parts.
    pub fn with_parts(
        config: ForemanConfig,
        transport: Arc<dyn ChatTransport>,
        tools: ToolCatalog,
    ) -> Self {
        let invoker = RetryingInvoker::new(transport, &config);
        Self {
            config,
            invoker,
            tools,
        }
    }

    pub fn config(&self) -> &ForemanConfig {
        &self.config
    }

    /// Generate an ordered labeled-step plan for the request.
    pub async fn run(&self, request: &PlanRequest) -> Result<Vec<PlanStep>, ForemanError> {
        let goal = validate_goal(&request.user_goal)?;
        if request.image_data.len() < MIN_IMAGE_PAYLOAD_CHARS {
            return Err(ForemanError::InvalidImageData(format!(
                "image payload under {} characters",
                MIN_IMAGE_PAYLOAD_CHARS
            )));
        }
        let image = image::normalize(&request.image_data)?;

        info!("Plan request accepted - goal: {}", goal);

        let raw = match self.config.mode {
            PipelineMode::TwoStage => {
                let description = self.identify_subject(&image, &goal).await?;
                self.plan_from_description(&description, &goal).await?
            }
            PipelineMode::Combined => self.plan_combined(&image, &goal).await?,
        };

        let steps = extractor::extract_steps(&raw, self.config.plan_length)?;
        info!("Plan generated with {} steps", steps.len());
        Ok(steps)
    }

    /// Stage 1 of two-stage mode: describe the photographed subject.
    async fn identify_subject(
        &self,
        image: &NormalizedImage,
        goal: &str,
    ) -> Result<String, ForemanError> {
        info!("Stage 1: visual identification");

        let messages = vec![
            ChatMessage::system(VISION_SYSTEM_PROMPT),
            ChatMessage::user_with_image(build_vision_user_prompt(goal), image.data_url()),
        ];
        let mut request = ChatRequest::new(&self.config.vision_model, messages);
        request.temperature = Some(VISION_TEMPERATURE);
        request.top_p = Some(VISION_TOP_P);
        request.max_tokens = Some(VISION_MAX_TOKENS);

        let response = self.invoker.invoke(&request, "visual identification").await?;
        let description = response
            .first_content()
            .unwrap_or_default()
            .trim()
            .to_string();
        if description.is_empty() {
            return Err(ForemanError::malformed(
                "vision stage returned no content",
                "",
            ));
        }

        info!("Identified subject: {}", description);
        Ok(description)
    }

    /// Stage 2 of two-stage mode: one strict-schema planning call, no tools.
    async fn plan_from_description(
        &self,
        description: &str,
        goal: &str,
    ) -> Result<String, ForemanError> {
        info!("Stage 2: plan generation");
        let length = self.config.plan_length;

        let messages = vec![
            ChatMessage::system(build_plan_system_prompt(description, length)),
            ChatMessage::user_text(build_plan_user_prompt(description, goal, length)),
        ];
        let mut request = ChatRequest::new(&self.config.text_model, messages);
        request.temperature = Some(PLAN_TEMPERATURE);
        request.top_p = Some(PLAN_TOP_P);
        request.max_tokens = Some(PLAN_MAX_TOKENS);
        request.response_format = Some(ResponseFormat::strict(
            "step_list",
            step_list_schema(length),
        ));

        let response = self.invoker.invoke(&request, "plan generation").await?;
        response
            .first_content()
            .map(|c| c.to_string())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ForemanError::malformed("planning stage returned no content", ""))
    }

    /// Combined mode: one multimodal conversation, optionally tool-augmented.
    async fn plan_combined(
        &self,
        image: &NormalizedImage,
        goal: &str,
    ) -> Result<String, ForemanError> {
        info!("Combined vision + planning (single conversation)");
        let length = self.config.plan_length;

        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::system(build_combined_system_prompt(length)));
        conversation.push(ChatMessage::user_with_image(
            build_combined_user_prompt(goal, length),
            image.data_url(),
        ));

        let format = ResponseFormat::strict("step_list", step_list_schema(length));

        if self.config.tool_use && !self.tools.is_empty() {
            let driver = ToolLoopDriver::new(
                &self.invoker,
                &self.tools,
                self.config.max_tool_iterations,
            );
            let (_conversation, content) = driver
                .run(conversation, &self.config.vision_model, format)
                .await?;
            return Ok(content);
        }

        // Plain single request/response planning call - the simplest valid
        // path, no tool machinery involved.
        let mut request = ChatRequest::new(&self.config.vision_model, conversation.to_messages());
        request.temperature = Some(PLAN_TEMPERATURE);
        request.top_p = Some(PLAN_TOP_P);
        request.max_tokens = Some(PLAN_MAX_TOKENS);
        request.response_format = Some(format);

        let response = self.invoker.invoke(&request, "combined planning").await?;
        response
            .first_content()
            .map(|c| c.to_string())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ForemanError::malformed("planning stage returned no content", ""))
    }

    /// Secondary operation: chronological task plan for an already-identified
    /// component.
    pub async fn generate_task_plan(
        &self,
        component: &str,
        component_state: &str,
        goal: &str,
    ) -> Result<TaskPlan, ForemanError> {
        let goal = validate_goal(goal)?;
        info!("Generating chronological task plan for {}", component);

        let messages = vec![
            ChatMessage::system(build_task_plan_system_prompt(component, component_state)),
            ChatMessage::user_text(build_task_plan_user_prompt(
                component,
                component_state,
                &goal,
            )),
        ];
        let mut request = ChatRequest::new(&self.config.text_model, messages);
        request.temperature = Some(PLAN_TEMPERATURE);
        request.top_p = Some(PLAN_TOP_P);
        request.max_tokens = Some(PLAN_MAX_TOKENS);
        request.response_format = Some(ResponseFormat::strict("task_plan", task_plan_schema()));

        let response = self.invoker.invoke(&request, "task plan generation").await?;
        let content = response
            .first_content()
            .map(|c| c.to_string())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ForemanError::malformed("planning stage returned no content", ""))?;

        extractor::extract_task_plan(&content)
    }
}

/// Trim, sanitize, and bound the goal text.
fn validate_goal(raw: &str) -> Result<String, ForemanError> {
    let goal = sanitize_inline(raw);
    if goal.is_empty() {
        return Err(ForemanError::InvalidGoal("goal must not be empty".to_string()));
    }
    if goal.chars().count() > MAX_GOAL_CHARS {
        return Err(ForemanError::InvalidGoal(format!(
            "goal exceeds {} characters",
            MAX_GOAL_CHARS
        )));
    }
    Ok(goal)
}
