//! Agentic loop: alternate model replies and tool execution until an answer emerges
//!
//! One [`AgentDriver::run_turn`] call takes a user request, hands the conversation to
//! the model, runs every tool call it asks for in order and feeds the results back,
//! until the model answers in plain text. The loop is bounded by an iteration cap and
//! can be cancelled between steps.

use crate::client::{ClientError, ReasoningClient};
use crate::conversation::{Conversation, Message};
use crate::tools::{all_tools, Confirmer, Tool, ToolExecutor, ToolResult, ToolUse};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use t2c_core::config::AgentConfig;
use t2c_core::Config;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that end a turn without an answer
#[derive(Error, Debug)]
pub enum AgentError {
    /// Client error during API calls
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The model kept calling tools past the iteration cap
    #[error("Agent stopped after {0} iterations without a final answer")]
    MaxIterationsExceeded(u32),

    /// The caller cancelled the turn
    #[error("Turn cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Something observable that happened during a turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgenticEvent {
    /// The model asked for a tool
    ToolCall {
        id: String,
        name: String,
        input: JsonValue,
    },
    /// A tool finished
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    /// The model produced text
    TextResponse { text: String },
}

impl AgenticEvent {
    fn tool_call(call: &ToolUse) -> Self {
        AgenticEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        }
    }

    fn tool_result(result: &ToolResult) -> Self {
        AgenticEvent::ToolResult {
            tool_use_id: result.tool_use_id.clone(),
            content: result.content.clone(),
            is_error: result.is_error(),
        }
    }
}

/// What a completed turn produced
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final text answer
    pub answer: String,
    /// Everything that happened, in order
    pub events: Vec<AgenticEvent>,
    /// Number of model calls made
    pub iterations: u32,
}

/// Drives one conversation against a reasoning client and a tool executor
pub struct AgentDriver {
    client: Arc<dyn ReasoningClient>,
    executor: ToolExecutor,
    tools: Vec<Tool>,
    conversation: Conversation,
    max_iterations: u32,
    max_context_tokens: usize,
    events: Option<mpsc::UnboundedSender<AgenticEvent>>,
}

impl AgentDriver {
    /// Create a driver with every tool enabled and default limits
    pub fn new(client: Arc<dyn ReasoningClient>, executor: ToolExecutor) -> Self {
        let defaults = AgentConfig::default();
        Self {
            client,
            executor,
            tools: all_tools(),
            conversation: Conversation::with_system_prompt(defaults.system_prompt),
            max_iterations: defaults.max_iterations,
            max_context_tokens: defaults.max_context_tokens,
            events: None,
        }
    }

    /// Create a driver from project configuration
    pub fn from_config(
        config: &Config,
        client: Arc<dyn ReasoningClient>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self::new(client, ToolExecutor::from_config(config, confirmer))
            .with_system_prompt(config.agent.system_prompt.clone())
            .with_max_iterations(config.agent.max_iterations)
            .with_max_context_tokens(config.agent.max_context_tokens)
    }

    /// Replace the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.conversation.system_prompt = Some(system_prompt.into());
        self
    }

    /// Cap the number of model calls per turn
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Bound the history sent to the model
    pub fn with_max_context_tokens(mut self, max_context_tokens: usize) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    /// Stream events to `sender` as they happen
    pub fn with_event_sender(mut self, sender: mpsc::UnboundedSender<AgenticEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// The conversation so far
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Forget the history, keeping the system prompt
    pub fn reset(&mut self) {
        self.conversation.clear();
    }

    fn emit(&self, events: &mut Vec<AgenticEvent>, event: AgenticEvent) {
        if let Some(sender) = &self.events {
            // Receiver gone just means nobody is watching
            let _ = sender.send(event.clone());
        }
        events.push(event);
    }

    /// Run one user request to completion
    pub async fn run_turn(
        &mut self,
        input: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        self.conversation.add_user_message(input);
        let mut events = Vec::new();

        for iteration in 1..=self.max_iterations {
            let removed = self.conversation.truncate_to_tokens(self.max_context_tokens);
            if removed > 0 {
                tracing::debug!("Dropped {} old messages to fit the context budget", removed);
            }

            tracing::debug!("Agent iteration {}/{}", iteration, self.max_iterations);

            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                reply = self.client.complete(&self.conversation, &self.tools) => reply?,
            };

            if let Some(text) = &reply.text {
                self.emit(
                    &mut events,
                    AgenticEvent::TextResponse { text: text.clone() },
                );
            }

            if !reply.has_tool_calls() {
                let answer = reply.text.unwrap_or_default();
                self.conversation.add_assistant_message(answer.clone());
                return Ok(TurnOutcome {
                    answer,
                    events,
                    iterations: iteration,
                });
            }

            let calls = reply.tool_calls;
            self.conversation
                .add_message(Message::assistant_tool_calls(reply.text, calls.clone()));

            for (index, call) in calls.iter().enumerate() {
                if cancel.is_cancelled() {
                    // Every call needs an answer or the history is rejected next turn
                    for skipped in &calls[index..] {
                        self.conversation.add_message(Message::tool_result(ToolResult::error(
                            skipped.id.clone(),
                            "Cancelled by the user before it ran.".to_string(),
                        )));
                    }
                    return Err(AgentError::Cancelled);
                }

                tracing::debug!("Invoking: {} with {}", call.name, call.input);
                self.emit(&mut events, AgenticEvent::tool_call(call));

                let result = self.executor.execute(call).await;
                self.emit(&mut events, AgenticEvent::tool_result(&result));
                self.conversation.add_message(Message::tool_result(result));
            }
        }

        tracing::warn!(
            "Agent exceeded {} iterations without a final answer",
            self.max_iterations
        );
        Err(AgentError::MaxIterationsExceeded(self.max_iterations))
    }
}
