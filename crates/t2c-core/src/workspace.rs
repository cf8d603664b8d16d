//! Filesystem half of the tool surface
//!
//! Every operation works against an explicit [`Workspace`]: a root directory and the
//! set of file extensions that may be created under it. Paths handed in by the model
//! are always interpreted relative to that root.

use crate::config::Config;
use crate::types::{FileCreation, FileName, DEFAULT_ALLOWED_EXTENSIONS};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that can occur during workspace operations
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Path contains a parent-directory segment
    #[error("Cannot use a path with '..' in it: '{0}'")]
    ParentTraversal(String),

    /// Path would escape the workspace root
    #[error("Path must be relative to the workspace root: '{0}'")]
    AbsolutePath(String),

    /// Filename is not `stem.ext` with an allowed extension
    #[error("Invalid filename {filename} - must end with a valid file type: {allowed}")]
    InvalidFileName { filename: String, allowed: String },

    /// File could not be located
    #[error("File '{filename}' not found at: '{}'", .location.display())]
    NotFound { filename: String, location: PathBuf },

    /// Directory was created but could not be made writable
    #[error("Failed to create or set writable directory '{}': {source}", .path.display())]
    Permission { path: PathBuf, source: io::Error },

    /// Write to a file failed
    #[error("Failed to write file '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Other IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Root directory plus the rules that apply beneath it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    allowed_extensions: BTreeSet<String>,
}

impl Workspace {
    /// Create a workspace with the default extension allow-list
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Build a workspace from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.workspace_root())
            .with_allowed_extensions(config.workspace.allowed_extensions.iter().cloned())
    }

    /// Replace the extension allow-list
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether files with this extension may be created
    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.contains(extension)
    }

    /// Allowed extensions in sorted order
    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    /// Resolve a model-supplied directory against the root.
    ///
    /// An empty string means the root itself.
    fn resolve_dir(&self, dir: &str) -> Result<PathBuf, WorkspaceError> {
        if dir.contains("..") {
            return Err(WorkspaceError::ParentTraversal(dir.to_string()));
        }
        if Path::new(dir).is_absolute() {
            return Err(WorkspaceError::AbsolutePath(dir.to_string()));
        }
        Ok(self.root.join(dir))
    }

    /// Create a directory (and missing parents) and make it writable for its owner.
    ///
    /// Calling this on an existing directory succeeds and re-applies the permission.
    pub fn create_directory(&self, dir: &str) -> Result<PathBuf, WorkspaceError> {
        let path = self.resolve_dir(dir)?;
        fs::create_dir_all(&path)?;
        make_user_writable(&path).map_err(|source| WorkspaceError::Permission {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "directory ready");
        Ok(path)
    }

    /// Find the first file named `filename` under `search_root`.
    ///
    /// Within a directory its files are checked before its subdirectories, and siblings
    /// are visited in name order, so the answer does not depend on the platform's
    /// directory listing order. A missing search root yields `None`.
    pub fn find_file(
        &self,
        filename: &str,
        search_root: &str,
    ) -> Result<Option<PathBuf>, WorkspaceError> {
        let start = self.resolve_dir(search_root)?;
        if filename.is_empty() || !start.is_dir() {
            return Ok(None);
        }

        let found = WalkDir::new(&start)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| !entry.file_type().is_dir() && entry.file_name() == filename)
            .map(|entry| entry.into_path());

        Ok(found)
    }

    /// Create a file unless it already exists.
    ///
    /// The destination directory must already exist; it is not created here.
    pub fn create_file(
        &self,
        filename: &str,
        content: Option<&str>,
        directory: Option<&str>,
    ) -> Result<FileCreation, WorkspaceError> {
        if Path::new(filename).is_absolute() {
            return Err(WorkspaceError::AbsolutePath(filename.to_string()));
        }

        let parsed = FileName::parse(filename)
            .filter(|name| self.is_allowed_extension(name.extension()))
            .ok_or_else(|| WorkspaceError::InvalidFileName {
                filename: filename.to_string(),
                allowed: self.allowed_extensions().collect::<Vec<_>>().join(", "),
            })?;

        let path = self.resolve_dir(directory.unwrap_or(""))?.join(filename);
        if path.exists() {
            tracing::debug!(path = %path.display(), "file already exists, leaving it untouched");
            return Ok(FileCreation::AlreadyExists(path));
        }

        fs::write(&path, content.unwrap_or("")).map_err(|source| WorkspaceError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(file = %parsed, path = %path.display(), "file created");
        Ok(FileCreation::Created(path))
    }

    /// Append `content` to an existing file.
    ///
    /// Without a directory the file is located with [`Workspace::find_file`] from the
    /// root. A file that cannot be resolved is reported as not found and is never created.
    pub fn update_file(
        &self,
        filename: &str,
        content: &str,
        directory: Option<&str>,
    ) -> Result<PathBuf, WorkspaceError> {
        if filename.contains("..") {
            return Err(WorkspaceError::ParentTraversal(filename.to_string()));
        }
        if Path::new(filename).is_absolute() {
            return Err(WorkspaceError::AbsolutePath(filename.to_string()));
        }

        let path = match directory.filter(|dir| !dir.is_empty()) {
            Some(dir) => self.resolve_dir(dir)?.join(filename),
            None => self
                .find_file(filename, "")?
                .ok_or_else(|| WorkspaceError::NotFound {
                    filename: filename.to_string(),
                    location: self.root.clone(),
                })?,
        };

        if !path.is_file() {
            return Err(WorkspaceError::NotFound {
                filename: filename.to_string(),
                location: path,
            });
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        file.write_all(content.as_bytes())
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "file appended");
        Ok(path)
    }
}

/// Add the owner-write bit (`u+w`)
fn make_user_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
}
