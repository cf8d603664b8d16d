//! Shared types used across time2code

use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions accepted by file creation unless the configuration says otherwise
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "txt", "md", "cpp", "c", "h", "hpp", "java", "kt", "asm", "s", "js", "jsx", "html", "css",
    "ts", "tsx", "json", "yml", "yaml", "xml", "csv",
];

/// A filename of the form `stem.extension`, split at its only dot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName {
    stem: String,
    extension: String,
}

impl FileName {
    /// Parse a filename that contains exactly one `.`
    ///
    /// Returns `None` for names without a dot or with more than one.
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(stem), Some(extension), None) => Some(Self {
                stem: stem.to_string(),
                extension: extension.to_string(),
            }),
            _ => None,
        }
    }

    /// The part before the dot
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// The part after the dot
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stem, self.extension)
    }
}

/// Result of a file creation request that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCreation {
    /// A new file was written
    Created(PathBuf),
    /// A file was already present; nothing was written
    AlreadyExists(PathBuf),
}

impl FileCreation {
    /// Path of the file that was created or found
    pub fn path(&self) -> &Path {
        match self {
            FileCreation::Created(path) | FileCreation::AlreadyExists(path) => path,
        }
    }

    /// Whether this call wrote the file
    pub fn was_created(&self) -> bool {
        matches!(self, FileCreation::Created(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_name() {
        let name = FileName::parse("notes.txt").unwrap();
        assert_eq!(name.stem(), "notes");
        assert_eq!(name.extension(), "txt");
        assert_eq!(name.to_string(), "notes.txt");
    }

    #[test]
    fn test_parse_rejects_wrong_dot_count() {
        assert!(FileName::parse("Makefile").is_none());
        assert!(FileName::parse("archive.tar.gz").is_none());
        assert!(FileName::parse("../escape.txt").is_none());
    }

    #[test]
    fn test_parse_keeps_subdirectory_in_stem() {
        let name = FileName::parse("src/Main.java").unwrap();
        assert_eq!(name.stem(), "src/Main");
        assert_eq!(name.extension(), "java");
    }

    #[test]
    fn test_default_allow_list() {
        assert_eq!(DEFAULT_ALLOWED_EXTENSIONS.len(), 22);
        assert!(DEFAULT_ALLOWED_EXTENSIONS.contains(&"java"));
        assert!(!DEFAULT_ALLOWED_EXTENSIONS.contains(&"exe"));
    }

    #[test]
    fn test_file_creation_accessors() {
        let created = FileCreation::Created(PathBuf::from("a.txt"));
        assert!(created.was_created());
        assert_eq!(created.path(), Path::new("a.txt"));

        let existing = FileCreation::AlreadyExists(PathBuf::from("b.txt"));
        assert!(!existing.was_created());
    }
}
