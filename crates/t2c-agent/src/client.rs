//! OpenAI-compatible chat completions client
//!
//! This module provides the [`ReasoningClient`] seam the agent driver talks to, and
//! [`ChatClient`], its implementation over any `/chat/completions` endpoint with
//! function calling.

use crate::conversation::{Conversation, Message, MessageContent, Role};
use crate::tools::{Tool, ToolUse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use t2c_core::config::AgentConfig;
use thiserror::Error;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur during API client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// API error response
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The response carried no choices
    #[error("Response contained no choices")]
    EmptyResponse,
}

/// One reply from the model: either a final answer or a batch of tool calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    /// Text the model produced, if any
    pub text: Option<String>,
    /// Tool calls the model requested, in order
    pub tool_calls: Vec<ToolUse>,
    /// Why the model stopped generating
    pub finish_reason: Option<String>,
}

impl AssistantReply {
    /// Whether the model asked for tools to be run
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A model that can take a conversation and decide what to do next
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Produce the next assistant reply for `conversation`, offering `tools`
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[Tool],
    ) -> Result<AssistantReply, ClientError>;
}

/// Request body for `/chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "gpt-4o")
    pub model: String,
    /// Messages in the conversation, system prompt first
    pub messages: Vec<ApiMessage>,
    /// Tools the model may call
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ApiTool>,
    /// Temperature for sampling (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "system", "user", "assistant" or "tool"
    pub role: String,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ApiToolCall>,
    /// ID of the call a tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub type_: String,
    pub function: ApiFunctionCall,
}

/// Function name and JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool offered to the model
#[derive(Debug, Clone, Serialize)]
pub struct ApiTool {
    #[serde(rename = "type")]
    pub type_: String,
    pub function: ApiFunction,
}

/// Function declaration inside [`ApiTool`]
#[derive(Debug, Clone, Serialize)]
pub struct ApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Response from `/chat/completions`
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Candidate completions
    pub choices: Vec<Choice>,
}

/// A single completion candidate
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ApiMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

fn function_type() -> String {
    "function".to_string()
}

impl ChatRequest {
    /// Create a request from a Conversation
    pub fn from_conversation(conversation: &Conversation, model: impl Into<String>) -> Self {
        let mut messages = Vec::with_capacity(conversation.message_count() + 1);
        if let Some(system) = &conversation.system_prompt {
            messages.push(ApiMessage::text("system", system));
        }
        messages.extend(conversation.messages().iter().map(ApiMessage::from_message));

        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
        }
    }

    /// Offer tools to the model
    pub fn with_tools(mut self, tools: &[Tool]) -> Self {
        self.tools = tools.iter().map(ApiTool::from_tool).collect();
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl ApiMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an ApiMessage from a conversation Message
    pub fn from_message(message: &Message) -> Self {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        match &message.content {
            MessageContent::Text(text) => Self::text(role, text.clone()),
            MessageContent::ToolCalls { text, calls } => Self {
                role: role.to_string(),
                content: text.clone(),
                tool_calls: calls.iter().map(ApiToolCall::from_tool_use).collect(),
                tool_call_id: None,
            },
            MessageContent::ToolResult(result) => Self {
                role: role.to_string(),
                content: Some(result.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: Some(result.tool_use_id.clone()),
            },
        }
    }
}

impl ApiToolCall {
    fn from_tool_use(tool_use: &ToolUse) -> Self {
        Self {
            id: tool_use.id.clone(),
            type_: function_type(),
            function: ApiFunctionCall {
                name: tool_use.name.clone(),
                arguments: tool_use.input.to_string(),
            },
        }
    }

    /// Decode into a [`ToolUse`]
    ///
    /// Arguments that are not valid JSON are passed through as a string so the
    /// executor can report the problem back to the model.
    pub fn into_tool_use(self) -> ToolUse {
        let input = if self.function.arguments.trim().is_empty() {
            JsonValue::Object(Default::default())
        } else {
            match serde_json::from_str(&self.function.arguments) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        "Tool call {} has malformed arguments: {}",
                        self.function.name,
                        e
                    );
                    JsonValue::String(self.function.arguments)
                }
            }
        };

        ToolUse {
            id: self.id,
            name: self.function.name,
            input,
        }
    }
}

impl ApiTool {
    fn from_tool(tool: &Tool) -> Self {
        Self {
            type_: function_type(),
            function: ApiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

impl ChatResponse {
    /// Take the first choice as an [`AssistantReply`]
    pub fn into_reply(self) -> Result<AssistantReply, ClientError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyResponse)?;

        Ok(AssistantReply {
            text: choice.message.content.filter(|t| !t.is_empty()),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(ApiToolCall::into_tool_use)
                .collect(),
            finish_reason: choice.finish_reason,
        })
    }
}

/// Chat completions API client
pub struct ChatClient {
    /// API key for authentication
    api_key: String,
    /// HTTP client
    client: reqwest::Client,
    /// API base URL
    base_url: String,
    /// Model name
    model: String,
    /// Sampling temperature
    temperature: f32,
}

impl ChatClient {
    /// Create a new client with default model and endpoint
    pub fn new(api_key: String) -> Self {
        let defaults = AgentConfig::default();
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: defaults.model,
            temperature: defaults.temperature,
        }
    }

    /// Create a client using the model settings from the agent config
    pub fn from_config(api_key: String, config: &AgentConfig) -> Self {
        Self::new(api_key)
            .with_base_url(config.api_base_url.clone())
            .with_model(config.model.clone())
            .with_temperature(config.temperature)
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a request and get the raw response
    pub async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            "Sending {} messages to {} ({})",
            request.messages.len(),
            url,
            request.model
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => ClientError::InvalidApiKey,
                429 => ClientError::RateLimitExceeded,
                _ => ClientError::ApiError(format!("{}: {}", status, error_text)),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ReasoningClient for ChatClient {
    async fn complete(
        &self,
        conversation: &Conversation,
        tools: &[Tool],
    ) -> Result<AssistantReply, ClientError> {
        let request = ChatRequest::from_conversation(conversation, &self.model)
            .with_tools(tools)
            .with_temperature(self.temperature);
        self.send_request(&request).await?.into_reply()
    }
}
