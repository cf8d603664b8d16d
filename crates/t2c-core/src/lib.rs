//! time2code core - configuration, credentials and the filesystem tool surface
//!
//! This crate provides the pieces shared by the agent and the binaries:
//! - Configuration management (`.time2code/config.toml`)
//! - Encrypted credential storage
//! - The [`Workspace`] operations the model can invoke (create directory,
//!   find file, create file, append to file)

pub mod config;
pub mod credentials;
pub mod types;
pub mod workspace;

pub use config::{Config, ConfigError};
pub use credentials::{resolve_api_key, CredentialStore, CredentialStoreError};
pub use types::*;
pub use workspace::{Workspace, WorkspaceError};
