//! time2code agent - the reasoning loop behind the CLI and server
//!
//! This crate provides:
//! - An OpenAI-compatible chat completions client with function calling
//! - The tool surface (filesystem, scaffold, shell) and its executor
//! - Conversation management with context truncation
//! - The agent driver that alternates model calls and tool execution

pub mod client;
pub mod conversation;
pub mod driver;
pub mod tools;

pub use client::{AssistantReply, ChatClient, ClientError, ReasoningClient};
pub use conversation::{Conversation, Message, MessageContent, Role};
pub use driver::{AgentDriver, AgentError, AgenticEvent, TurnOutcome};
pub use tools::{
    all_tools, AutoApprove, Confirmer, DenyAll, StdinConfirmer, Tool, ToolError, ToolExecutor,
    ToolResult, ToolUse,
};
