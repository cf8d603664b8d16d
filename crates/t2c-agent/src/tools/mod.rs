//! Tool definitions and execution
//!
//! This module defines the tools the model can request, their JSON schemas, and the
//! executor that runs them against a workspace.

mod confirm;
mod executor;

pub use confirm::{AutoApprove, Confirmer, DenyAll, StdinConfirmer};
pub use executor::{ToolError, ToolExecutor};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Name of the directory creation tool
pub const CREATE_DIRECTORY: &str = "create_directory";
/// Name of the file lookup tool
pub const FIND_FILE: &str = "find_file";
/// Name of the file creation tool
pub const CREATE_FILE: &str = "create_file";
/// Name of the file append tool
pub const UPDATE_FILE: &str = "update_file";
/// Name of the project scaffold tool
pub const SCAFFOLD_PROJECT: &str = "create_react_app_with_vite";
/// Name of the shell tool
pub const TERMINAL: &str = "terminal";

/// A tool the model can use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: JsonValue,
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Unique ID for this tool use
    pub id: String,
    /// Name of the tool to use
    pub name: String,
    /// Input parameters for the tool
    pub input: JsonValue,
}

/// Result of executing a tool, as handed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool use this is responding to
    pub tool_use_id: String,
    /// Rendered outcome
    pub content: String,
    /// Whether the tool execution failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(tool_use_id: String, content: String) -> Self {
        Self {
            tool_use_id,
            content,
            is_error: None,
        }
    }

    /// Create an error tool result
    pub fn error(tool_use_id: String, error_message: String) -> Self {
        Self {
            tool_use_id,
            content: error_message,
            is_error: Some(true),
        }
    }

    /// Whether this result reports a failure
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Create the directory creation tool definition
pub fn create_directory_tool() -> Tool {
    Tool {
        name: CREATE_DIRECTORY.to_string(),
        description: "Create a new writable directory with the given name if it does not exist. \
                      If the directory exists, it ensures the directory is writable."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory path relative to the workspace root"
                }
            },
            "required": ["directory"]
        }),
    }
}

/// Create the file lookup tool definition
pub fn find_file_tool() -> Tool {
    Tool {
        name: FIND_FILE.to_string(),
        description: "Recursively search for a file by exact name. \
                      Returns the full path of the first match, or reports that it was not found."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Exact file name to look for, e.g. 'App.java'"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search from, relative to the workspace root (defaults to the root)"
                }
            },
            "required": ["filename"]
        }),
    }
}

/// Create the file creation tool definition
pub fn create_file_tool() -> Tool {
    Tool {
        name: CREATE_FILE.to_string(),
        description: "Create a new file with content in the specified directory. \
                      Existing files are never overwritten."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "File name with exactly one extension, e.g. 'Main.java'"
                },
                "content": {
                    "type": "string",
                    "description": "Initial content of the file (defaults to empty)"
                },
                "directory": {
                    "type": "string",
                    "description": "Existing directory relative to the workspace root (defaults to the root)"
                }
            },
            "required": ["filename"]
        }),
    }
}

/// Create the file append tool definition
pub fn update_file_tool() -> Tool {
    Tool {
        name: UPDATE_FILE.to_string(),
        description: "Append content to the end of an existing file. \
                      Without a directory the file is searched for under the workspace root."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the file to update"
                },
                "content": {
                    "type": "string",
                    "description": "Content to append"
                },
                "directory": {
                    "type": "string",
                    "description": "Directory containing the file, relative to the workspace root"
                }
            },
            "required": ["filename", "content"]
        }),
    }
}

/// Create the project scaffold tool definition
pub fn scaffold_tool() -> Tool {
    Tool {
        name: SCAFFOLD_PROJECT.to_string(),
        description: "Create a new React application using Vite in the 'app' directory of the workspace root."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Create the shell tool definition
pub fn terminal_tool() -> Tool {
    Tool {
        name: TERMINAL.to_string(),
        description: "Run shell commands in the workspace root and return their output. \
                      A human may be asked to approve the commands first."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "commands": {
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ],
                    "description": "A command, or a list of commands run one after another"
                }
            },
            "required": ["commands"]
        }),
    }
}

/// Get all available tools
pub fn all_tools() -> Vec<Tool> {
    vec![
        terminal_tool(),
        create_directory_tool(),
        scaffold_tool(),
        find_file_tool(),
        create_file_tool(),
        update_file_tool(),
    ]
}
