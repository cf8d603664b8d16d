//! Tool execution engine
//!
//! This module dispatches tool requests by name. Filesystem tools delegate to
//! [`Workspace`]; the scaffold and shell tools spawn processes in the workspace root.
//! Every outcome, good or bad, comes back as a [`ToolResult`] so the model always gets
//! a readable answer.

use super::confirm::{Confirmer, DenyAll};
use super::{
    ToolResult, ToolUse, CREATE_DIRECTORY, CREATE_FILE, FIND_FILE, SCAFFOLD_PROJECT, TERMINAL,
    UPDATE_FILE,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use t2c_core::config::{Config, ScaffoldConfig};
use t2c_core::{FileCreation, Workspace, WorkspaceError};
use thiserror::Error;

/// Errors that can occur during tool execution
#[derive(Error, Debug)]
pub enum ToolError {
    /// Workspace rejected or failed the operation
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Invalid tool input
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Command execution error
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Human refused the commands
    #[error("Command execution declined by user: {0}")]
    Declined(String),

    /// Background task died
    #[error("An unexpected error occurred: {0}")]
    Unexpected(#[from] tokio::task::JoinError),
}

#[derive(Debug, Deserialize)]
struct CreateDirectoryArgs {
    directory: String,
}

#[derive(Debug, Deserialize)]
struct FindFileArgs {
    filename: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateFileArgs {
    filename: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateFileArgs {
    filename: String,
    content: String,
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Commands {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct TerminalArgs {
    commands: Commands,
}

fn parse_args<T: DeserializeOwned>(tool: &str, input: &serde_json::Value) -> Result<T, ToolError> {
    // Some models send `null` instead of `{}` for tools without parameters
    let input = if input.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        input.clone()
    };
    serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidInput(format!("{} arguments: {}", tool, e)))
}

/// Tool executor that can execute tool requests
#[derive(Clone)]
pub struct ToolExecutor {
    workspace: Workspace,
    scaffold: ScaffoldConfig,
    confirmer: Arc<dyn Confirmer>,
}

impl ToolExecutor {
    /// Create an executor for a workspace.
    ///
    /// Shell commands are refused until a confirmer is installed with
    /// [`ToolExecutor::with_confirmer`].
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            scaffold: ScaffoldConfig::default(),
            confirmer: Arc::new(DenyAll),
        }
    }

    /// Create an executor from loaded configuration
    pub fn from_config(config: &Config, confirmer: Arc<dyn Confirmer>) -> Self {
        Self::new(Workspace::from_config(config))
            .with_scaffold(config.scaffold.clone())
            .with_confirmer(confirmer)
    }

    /// Use a different scaffolding command
    pub fn with_scaffold(mut self, scaffold: ScaffoldConfig) -> Self {
        self.scaffold = scaffold;
        self
    }

    /// Use a different confirmation gate for shell commands
    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    /// The workspace tools operate on
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Execute a tool use request
    pub async fn execute(&self, tool_use: &ToolUse) -> ToolResult {
        tracing::debug!(tool = %tool_use.name, id = %tool_use.id, "executing tool");

        let result = match tool_use.name.as_str() {
            CREATE_DIRECTORY => self.execute_create_directory(&tool_use.input).await,
            FIND_FILE => self.execute_find_file(&tool_use.input).await,
            CREATE_FILE => self.execute_create_file(&tool_use.input).await,
            UPDATE_FILE => self.execute_update_file(&tool_use.input).await,
            SCAFFOLD_PROJECT => self.execute_scaffold(&tool_use.input).await,
            TERMINAL => self.execute_terminal(&tool_use.input).await,
            unknown => Err(ToolError::ToolNotFound(unknown.to_string())),
        };

        match result {
            Ok(content) => ToolResult::success(tool_use.id.clone(), content),
            Err(e) => {
                tracing::warn!(tool = %tool_use.name, "tool failed: {}", e);
                ToolResult::error(tool_use.id.clone(), e.to_string())
            }
        }
    }

    /// Run a workspace operation off the async runtime
    async fn with_workspace<T, F>(&self, operation: F) -> Result<T, ToolError>
    where
        T: Send + 'static,
        F: FnOnce(&Workspace) -> Result<T, WorkspaceError> + Send + 'static,
    {
        let workspace = self.workspace.clone();
        let result = tokio::task::spawn_blocking(move || operation(&workspace)).await?;
        Ok(result?)
    }

    async fn execute_create_directory(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: CreateDirectoryArgs = parse_args(CREATE_DIRECTORY, input)?;
        let directory = args.directory.clone();

        self.with_workspace(move |ws| ws.create_directory(&directory))
            .await?;
        Ok(format!(
            "Directory '{}' successfully created and set as writable.",
            args.directory
        ))
    }

    async fn execute_find_file(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: FindFileArgs = parse_args(FIND_FILE, input)?;
        let filename = args.filename.clone();
        let search_root = args.path.clone().unwrap_or_default();

        let found = self
            .with_workspace(move |ws| ws.find_file(&filename, &search_root))
            .await?;
        Ok(match found {
            Some(path) => path.display().to_string(),
            None => format!(
                "File '{}' not found under '{}'.",
                args.filename,
                args.path.as_deref().unwrap_or(".")
            ),
        })
    }

    async fn execute_create_file(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: CreateFileArgs = parse_args(CREATE_FILE, input)?;
        let filename = args.filename.clone();

        let outcome = self
            .with_workspace(move |ws| {
                ws.create_file(
                    &args.filename,
                    args.content.as_deref(),
                    args.directory.as_deref(),
                )
            })
            .await?;
        Ok(match outcome {
            FileCreation::Created(path) => format!(
                "File '{}' created successfully at: '{}'.",
                filename,
                path.display()
            ),
            FileCreation::AlreadyExists(path) => format!(
                "File '{}' already exists at: '{}'.",
                filename,
                path.display()
            ),
        })
    }

    async fn execute_update_file(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: UpdateFileArgs = parse_args(UPDATE_FILE, input)?;
        let filename = args.filename.clone();

        let path = self
            .with_workspace(move |ws| {
                ws.update_file(&args.filename, &args.content, args.directory.as_deref())
            })
            .await?;
        Ok(format!(
            "File '{}' updated successfully at: '{}'",
            filename,
            path.display()
        ))
    }

    /// Execute the project scaffold tool
    async fn execute_scaffold(&self, _input: &serde_json::Value) -> Result<String, ToolError> {
        let program = &self.scaffold.program;

        let output = tokio::process::Command::new(program)
            .args(&self.scaffold.args)
            .envs(&self.scaffold.env)
            .current_dir(self.workspace.root())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ToolError::CommandFailed(format!("Failed to start '{}': {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::CommandFailed(format!(
                "'{}' exited with code {:?}: {}",
                program,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok("Successfully created a new React app using Vite.".to_string())
    }

    /// Execute the shell tool
    async fn execute_terminal(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: TerminalArgs = parse_args(TERMINAL, input)?;
        let commands: Vec<String> = match args.commands {
            Commands::One(command) => vec![command],
            Commands::Many(commands) => commands,
        }
        .into_iter()
        .filter(|command| !command.trim().is_empty())
        .collect();

        if commands.is_empty() {
            return Err(ToolError::InvalidInput("No commands given".to_string()));
        }

        if !self.confirmer.confirm(&commands).await {
            return Err(ToolError::Declined(commands.join("; ")));
        }

        let script = commands.join(" && ");

        #[cfg(target_os = "windows")]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(target_os = "windows"))]
        let (shell, shell_arg) = ("sh", "-c");

        let output = tokio::process::Command::new(shell)
            .arg(shell_arg)
            .arg(&script)
            .current_dir(self.workspace.root())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ToolError::CommandFailed(format!("Failed to start {}: {}", shell, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::CommandFailed(format!(
                "Command exited with code {:?}: {}",
                output.status.code(),
                stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            Ok("Command completed with no output.".to_string())
        } else {
            Ok(stdout.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::AutoApprove;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn executor() -> (TempDir, ToolExecutor) {
        let temp_dir = TempDir::new().unwrap();
        let executor = ToolExecutor::new(Workspace::new(temp_dir.path()));
        (temp_dir, executor)
    }

    fn tool_use(name: &str, input: serde_json::Value) -> ToolUse {
        ToolUse {
            id: "call_123".to_string(),
            name: name.to_string(),
            input,
        }
    }

    /// Records what it was asked and answers with a fixed decision
    struct RecordingConfirmer {
        answer: bool,
        seen: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Confirmer for RecordingConfirmer {
        async fn confirm(&self, commands: &[String]) -> bool {
            self.seen.lock().unwrap().push(commands.to_vec());
            self.answer
        }
    }

    #[tokio::test]
    async fn test_create_directory_tool() {
        let (temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(CREATE_DIRECTORY, serde_json::json!({"directory": "src/main"})))
            .await;

        assert_eq!(result.tool_use_id, "call_123");
        assert_eq!(result.is_error, None);
        assert!(result.content.contains("successfully created"));
        assert!(temp_dir.path().join("src/main").is_dir());
    }

    #[tokio::test]
    async fn test_create_directory_tool_rejects_traversal() {
        let (temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(CREATE_DIRECTORY, serde_json::json!({"directory": "../evil"})))
            .await;

        assert_eq!(result.is_error, Some(true));
        assert!(result.content.contains(".."));
        assert!(!temp_dir.path().join("../evil").exists());
    }

    #[tokio::test]
    async fn test_create_file_then_exists() {
        let (temp_dir, executor) = executor();

        let first = executor
            .execute(&tool_use(
                CREATE_FILE,
                serde_json::json!({"filename": "notes.txt", "content": "hello"}),
            ))
            .await;
        assert!(!first.is_error());
        assert!(first.content.contains("created successfully"));

        let second = executor
            .execute(&tool_use(
                CREATE_FILE,
                serde_json::json!({"filename": "notes.txt", "content": "other"}),
            ))
            .await;
        assert!(!second.is_error());
        assert!(second.content.contains("already exists"));
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("notes.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_create_file_invalid_extension() {
        let (temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(CREATE_FILE, serde_json::json!({"filename": "bad.exe"})))
            .await;

        assert!(result.is_error());
        assert!(result.content.contains("Invalid filename bad.exe"));
        assert!(result.content.contains("java"));
        assert!(!temp_dir.path().join("bad.exe").exists());
    }

    #[tokio::test]
    async fn test_find_file_tool() {
        let (temp_dir, executor) = executor();
        std::fs::create_dir_all(temp_dir.path().join("lib")).unwrap();
        std::fs::write(temp_dir.path().join("lib/util.py"), "").unwrap();

        let found = executor
            .execute(&tool_use(FIND_FILE, serde_json::json!({"filename": "util.py", "path": "."})))
            .await;
        assert!(!found.is_error());
        assert!(found.content.ends_with("util.py"));

        let missing = executor
            .execute(&tool_use(FIND_FILE, serde_json::json!({"filename": "nope.py"})))
            .await;
        assert!(!missing.is_error());
        assert!(missing.content.contains("not found"));
    }

    #[tokio::test]
    async fn test_update_file_tool_appends() {
        let (temp_dir, executor) = executor();
        std::fs::write(temp_dir.path().join("app.js"), "a").unwrap();

        for chunk in ["b", "c"] {
            let result = executor
                .execute(&tool_use(
                    UPDATE_FILE,
                    serde_json::json!({"filename": "app.js", "content": chunk}),
                ))
                .await;
            assert!(!result.is_error(), "{}", result.content);
        }

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("app.js")).unwrap(),
            "abc"
        );
    }

    #[tokio::test]
    async fn test_update_file_tool_not_found() {
        let (temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(
                UPDATE_FILE,
                serde_json::json!({"filename": "ghost.md", "content": "x"}),
            ))
            .await;

        assert!(result.is_error());
        assert!(result.content.contains("not found"));
        assert!(!temp_dir.path().join("ghost.md").exists());
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let (_temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(UPDATE_FILE, serde_json::json!({"filename": "a.txt"})))
            .await;

        assert!(result.is_error());
        assert!(result.content.contains("Invalid tool input"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use("unknown_tool", serde_json::json!({})))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("Tool not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminal_runs_after_approval() {
        let (temp_dir, executor) = executor();
        let confirmer = Arc::new(RecordingConfirmer {
            answer: true,
            seen: Mutex::new(Vec::new()),
        });
        let executor = executor.with_confirmer(confirmer.clone());

        let result = executor
            .execute(&tool_use(
                TERMINAL,
                serde_json::json!({"commands": ["echo hi > out.txt", "cat out.txt"]}),
            ))
            .await;

        assert!(!result.is_error(), "{}", result.content);
        assert_eq!(result.content.trim(), "hi");
        assert!(temp_dir.path().join("out.txt").exists());
        assert_eq!(
            confirmer.seen.lock().unwrap().as_slice(),
            &[vec!["echo hi > out.txt".to_string(), "cat out.txt".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_terminal_declined_runs_nothing() {
        let (temp_dir, executor) = executor();

        let result = executor
            .execute(&tool_use(
                TERMINAL,
                serde_json::json!({"commands": "echo hi > out.txt"}),
            ))
            .await;

        assert!(result.is_error());
        assert!(result.content.contains("declined"));
        assert!(!temp_dir.path().join("out.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminal_command_failure() {
        let (_temp_dir, executor) = executor();
        let executor = executor.with_confirmer(Arc::new(AutoApprove));

        let result = executor
            .execute(&tool_use(TERMINAL, serde_json::json!({"commands": "exit 3"})))
            .await;

        assert!(result.is_error());
        assert!(result.content.contains("Command exited with code Some(3)"));
    }

    #[tokio::test]
    async fn test_terminal_requires_commands() {
        let (_temp_dir, executor) = executor();
        let executor = executor.with_confirmer(Arc::new(AutoApprove));

        let result = executor
            .execute(&tool_use(TERMINAL, serde_json::json!({"commands": ["  "]})))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("No commands"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scaffold_success_runs_in_root() {
        let (temp_dir, executor) = executor();
        let executor = executor.with_scaffold(ScaffoldConfig {
            program: "mkdir".to_string(),
            args: vec!["app".to_string()],
            env: Default::default(),
        });

        let result = executor
            .execute(&tool_use(SCAFFOLD_PROJECT, serde_json::Value::Null))
            .await;

        assert!(!result.is_error(), "{}", result.content);
        assert!(result.content.contains("Successfully created"));
        assert!(temp_dir.path().join("app").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scaffold_failure_is_reported() {
        let (_temp_dir, executor) = executor();
        let executor = executor.with_scaffold(ScaffoldConfig {
            program: "false".to_string(),
            args: vec![],
            env: Default::default(),
        });

        let result = executor
            .execute(&tool_use(SCAFFOLD_PROJECT, serde_json::json!({})))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("exited with code"));
    }

    #[tokio::test]
    async fn test_scaffold_missing_program() {
        let (_temp_dir, executor) = executor();
        let executor = executor.with_scaffold(ScaffoldConfig {
            program: "t2c-definitely-not-installed".to_string(),
            args: vec![],
            env: Default::default(),
        });

        let result = executor
            .execute(&tool_use(SCAFFOLD_PROJECT, serde_json::json!({})))
            .await;
        assert!(result.is_error());
        assert!(result.content.contains("Failed to start"));
    }
}
