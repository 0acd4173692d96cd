//! Deterministic fakes for orchestration tests.
//!
//! `ScriptedTransport` plays back a fixed sequence of endpoint behaviors and
//! records every request; `FakeToolHandler` answers capability calls with a
//! canned payload and counts invocations. No network, no shell, no sleeps
//! beyond the invoker's own backoff.

use async_trait::async_trait;
use foreman_common::wire::{
    AssistantReply, ChatRequest, ChatResponse, Choice, FunctionCall, FunctionSpec, ToolCall,
    ToolDefinition,
};
use foreman_common::ForemanError;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::invoker::{CallOutcome, ChatTransport};
use super::tool_loop::ToolHandler;

/// One scripted endpoint behavior.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Successful response with assistant text content.
    Content(String),
    /// Successful response requesting the given tool calls.
    ToolCalls(Vec<ToolCall>),
    /// HTTP 4xx-class rejection.
    ClientError(u16, String),
    /// HTTP 5xx-class failure.
    ServerError(u16),
    /// Request timeout.
    Timeout,
}

impl ScriptedReply {
    pub fn content(text: &str) -> Self {
        Self::Content(text.to_string())
    }

    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        Self::ToolCalls(vec![ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }])
    }

    pub fn client_error(status: u16, detail: &str) -> Self {
        Self::ClientError(status, detail.to_string())
    }

    pub fn server_error(status: u16) -> Self {
        Self::ServerError(status)
    }
}

/// Transport that replays a script and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedReply>>,
    fallback: Mutex<Option<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one scripted reply (builder style).
    pub fn reply(self, reply: ScriptedReply) -> Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    /// Behavior replayed forever once the script runs out.
    pub fn repeat(self, reply: ScriptedReply) -> Self {
        *self.fallback.lock().unwrap() = Some(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The request made on the `index`th call.
    pub fn request_at(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn response_with(message: AssistantReply) -> ChatResponse {
    ChatResponse {
        model: Some("scripted".to_string()),
        choices: vec![Choice {
            message,
            finish_reason: None,
        }],
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn execute(&self, request: &ChatRequest, operation: &str) -> CallOutcome {
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.lock().unwrap().clone());

        match reply {
            Some(ScriptedReply::Content(text)) => CallOutcome::Ok(response_with(AssistantReply {
                content: Some(text),
                tool_calls: vec![],
            })),
            Some(ScriptedReply::ToolCalls(calls)) => {
                CallOutcome::Ok(response_with(AssistantReply {
                    content: None,
                    tool_calls: calls,
                }))
            }
            Some(ScriptedReply::ClientError(status, detail)) => {
                CallOutcome::Fatal(ForemanError::UpstreamClientError { status, detail })
            }
            Some(ScriptedReply::ServerError(status)) => {
                CallOutcome::Retryable(ForemanError::UpstreamServerError {
                    status,
                    detail: "scripted failure".to_string(),
                })
            }
            Some(ScriptedReply::Timeout) => {
                CallOutcome::Retryable(ForemanError::UpstreamTimeout {
                    operation: operation.to_string(),
                })
            }
            None => CallOutcome::Fatal(ForemanError::Network(
                "scripted transport ran out of replies".to_string(),
            )),
        }
    }
}

/// Capability handler answering with a canned payload.
pub struct FakeToolHandler {
    name: String,
    payload: String,
    arguments_seen: Mutex<Vec<String>>,
}

impl FakeToolHandler {
    pub fn new(name: &str, payload: &str) -> Self {
        Self {
            name: name.to_string(),
            payload: payload.to_string(),
            arguments_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.arguments_seen.lock().unwrap().len()
    }

    pub fn last_arguments(&self) -> Option<String> {
        self.arguments_seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ToolHandler for FakeToolHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: self.name.clone(),
                description: "fake capability for tests".to_string(),
                parameters: json!({"type": "object"}),
            },
        }
    }

    async fn invoke(&self, arguments: &str) -> String {
        self.arguments_seen
            .lock()
            .unwrap()
            .push(arguments.to_string());
        self.payload.clone()
    }
}
