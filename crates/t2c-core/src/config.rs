//! Configuration management for time2code
//!
//! This module handles loading, saving, and validating the project configuration
//! stored in `.time2code/config.toml`. Every section has defaults, so a missing file
//! or a partial file is valid.

use crate::types::DEFAULT_ALLOWED_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project configuration directory
pub const CONFIG_DIR_NAME: &str = ".time2code";

/// Errors that can occur during configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error while reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Where the tools may write and which files they may create
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Agent driver and chat-completion settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Front-end project scaffolding command
    #[serde(default)]
    pub scaffold: ScaffoldConfig,

    /// Shell tool settings
    #[serde(default)]
    pub shell: ShellConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Directory the configuration was loaded from
    #[serde(skip)]
    pub project_root: Option<PathBuf>,
}

/// Tool surface configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Root for all tool paths, relative to the project root
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,

    /// Extensions `create_file` accepts
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// AI agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Model to use (e.g., "gpt-4o")
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Maximum model calls per user prompt
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// History is truncated to this many (estimated) tokens before each call
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// System prompt sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_iterations() -> u32 {
    15
}

fn default_max_context_tokens() -> usize {
    100_000
}

fn default_system_prompt() -> String {
    "You are an expert java developer.".to_string()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_iterations: default_max_iterations(),
            max_context_tokens: default_max_context_tokens(),
            system_prompt: default_system_prompt(),
            api_base_url: default_api_base_url(),
        }
    }
}

/// Scaffolding command run by the project scaffold tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaffoldConfig {
    /// Program to execute
    #[serde(default = "default_scaffold_program")]
    pub program: String,

    /// Arguments passed to the program
    #[serde(default = "default_scaffold_args")]
    pub args: Vec<String>,

    /// Extra environment variables for the process
    #[serde(default = "default_scaffold_env")]
    pub env: BTreeMap<String, String>,
}

fn default_scaffold_program() -> String {
    "npm".to_string()
}

fn default_scaffold_args() -> Vec<String> {
    ["create", "vite@latest", "app", "--", "--template", "react"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

fn default_scaffold_env() -> BTreeMap<String, String> {
    // Skips npm's "Ok to proceed?" prompt for the create package
    BTreeMap::from([("npm_config_yes".to_string(), "true".to_string())])
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            program: default_scaffold_program(),
            args: default_scaffold_args(),
            env: default_scaffold_env(),
        }
    }
}

/// Shell tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    /// Ask a human before running any command
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,
}

fn default_require_confirmation() -> bool {
    true
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            require_confirmation: default_require_confirmation(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from a project's `.time2code` directory
    pub fn load<P: AsRef<Path>>(project_root: P) -> Result<Self, ConfigError> {
        let config_path = Self::config_path(project_root.as_ref());

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&contents)?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Config::default()
        };
        config.project_root = Some(project_root.as_ref().to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a project's `.time2code` directory
    pub fn save<P: AsRef<Path>>(&self, project_root: P) -> Result<(), ConfigError> {
        let config_dir = project_root.as_ref().join(CONFIG_DIR_NAME);

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join("config.toml"), contents)?;

        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "workspace.allowed_extensions must not be empty".to_string(),
            ));
        }
        if let Some(ext) = self
            .workspace
            .allowed_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.contains('.'))
        {
            return Err(ConfigError::Invalid(format!(
                "workspace.allowed_extensions entry '{}' must be a bare extension",
                ext
            )));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(ConfigError::Invalid(format!(
                "agent.temperature must be between 0 and 2, got {}",
                self.agent.temperature
            )));
        }
        if self.scaffold.program.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "scaffold.program must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the config file for a project root
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR_NAME).join("config.toml")
    }

    /// Root directory for the tool surface
    pub fn workspace_root(&self) -> PathBuf {
        match &self.project_root {
            Some(project_root) => project_root.join(&self.workspace.root),
            None => self.workspace.root.clone(),
        }
    }
}
