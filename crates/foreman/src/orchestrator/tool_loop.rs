//! Tool-call loop driver.
//!
//! Bounded multi-turn protocol: the model may request registered capabilities
//! any number of times up to the iteration cap; each result is injected back
//! as a tool turn and the model re-invoked. Once the model stops requesting
//! tools the loop switches modes - an endpoint that accepts arbitrary tool
//! use cannot simultaneously enforce a strict output schema, so the final
//! answer comes from one dedicated strict-schema call with no tools attached.

use async_trait::async_trait;
use foreman_common::prompts::FINALIZE_INSTRUCTION;
use foreman_common::wire::{
    ChatMessage, ChatRequest, Conversation, ResponseFormat, ToolCall, ToolDefinition,
};
use foreman_common::ForemanError;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::invoker::RetryingInvoker;
use super::{PLAN_MAX_TOKENS, PLAN_TEMPERATURE, PLAN_TOP_P};

/// One registered capability the model may invoke.
///
/// Handlers never fail the loop: every failure mode is encoded in the JSON
/// payload they return.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn invoke(&self, arguments: &str) -> String;
}

/// Static registry mapping capability name to a typed handler.
#[derive(Default)]
pub struct ToolCatalog {
    handlers: Vec<Arc<dyn ToolHandler>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.push(handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.iter().find(|h| h.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Definitions advertised to the model on every Active-state call.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.iter().map(|h| h.definition()).collect()
    }

    /// Execute one requested call and wrap the payload as a tool turn.
    ///
    /// An unrecognized function name yields a synthetic error result rather
    /// than failing the loop.
    pub async fn dispatch(&self, call: &ToolCall) -> ChatMessage {
        let name = call.function.name.as_str();
        match self.get(name) {
            Some(handler) => {
                info!("Dispatching tool call: {} ({})", name, call.id);
                let payload = handler.invoke(&call.function.arguments).await;
                ChatMessage::tool(call.id.clone(), payload)
            }
            None => {
                warn!("Rejecting unsupported capability: {}", name);
                let payload = json!({ "error": format!("unsupported capability: {}", name) });
                ChatMessage::tool(call.id.clone(), payload.to_string())
            }
        }
    }
}

/// Drives the Active -> Finalizing state machine over the retrying invoker.
pub struct ToolLoopDriver<'a> {
    invoker: &'a RetryingInvoker,
    catalog: &'a ToolCatalog,
    max_iterations: usize,
}

impl<'a> ToolLoopDriver<'a> {
    pub fn new(invoker: &'a RetryingInvoker, catalog: &'a ToolCatalog, max_iterations: usize) -> Self {
        Self {
            invoker,
            catalog,
            max_iterations,
        }
    }

    /// Run the loop to completion and return the final conversation plus the
    /// strict-schema answer text.
    pub async fn run(
        &self,
        mut conversation: Conversation,
        model: &str,
        response_format: ResponseFormat,
    ) -> Result<(Conversation, String), ForemanError> {
        for iteration in 1..=self.max_iterations {
            info!("Tool loop iteration {}/{}", iteration, self.max_iterations);

            let mut request = ChatRequest::new(model, conversation.to_messages());
            request.temperature = Some(PLAN_TEMPERATURE);
            request.top_p = Some(PLAN_TOP_P);
            request.max_tokens = Some(PLAN_MAX_TOKENS);
            request.tools = Some(self.catalog.definitions());
            request.tool_choice = Some("auto".to_string());

            let operation = format!("tool loop (iteration {})", iteration);
            let response = self.invoker.invoke(&request, &operation).await?;
            let reply = response
                .first_reply()
                .cloned()
                .ok_or_else(|| ForemanError::malformed("response carried no choices", ""))?;

            let tool_calls = reply.tool_calls.clone();
            conversation.push(reply.into_turn());

            if tool_calls.is_empty() {
                return self.finalize(conversation, model, response_format).await;
            }

            for call in &tool_calls {
                let turn = self.catalog.dispatch(call).await;
                conversation.push(turn);
            }
        }

        warn!(
            "Tool loop did not converge within {} iterations",
            self.max_iterations
        );
        Err(ForemanError::ToolLoopExceeded {
            iterations: self.max_iterations,
        })
    }

    /// Terminal success state: one strict-schema call with no tools attached.
    async fn finalize(
        &self,
        mut conversation: Conversation,
        model: &str,
        response_format: ResponseFormat,
    ) -> Result<(Conversation, String), ForemanError> {
        info!("Model finished using tools, requesting structured output");

        conversation.push(ChatMessage::user_text(FINALIZE_INSTRUCTION));

        let mut request = ChatRequest::new(model, conversation.to_messages());
        request.temperature = Some(PLAN_TEMPERATURE);
        request.top_p = Some(PLAN_TOP_P);
        request.max_tokens = Some(PLAN_MAX_TOKENS);
        request.response_format = Some(response_format);

        let response = self.invoker.invoke(&request, "plan formatting").await?;
        let reply = response
            .first_reply()
            .cloned()
            .ok_or_else(|| ForemanError::malformed("final response carried no choices", ""))?;

        let content = reply.content.clone().unwrap_or_default();
        conversation.push(reply.into_turn());

        if content.trim().is_empty() {
            return Err(ForemanError::malformed(
                "final structured reply had no content",
                "",
            ));
        }

        debug_assert!(!conversation.has_unresolved_tool_calls());
        Ok((conversation, content))
    }
}
