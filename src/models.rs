//! Data models for the project scanner.
//!
//! This module contains the nested map produced by a scan: directories
//! keyed by their path relative to the scan root, each holding one
//! record per listed file.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// What a scan recorded about a single file.
///
/// Serializes to `{}`, `{"content": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FileRecord {
    /// Content inlined as text.
    Content { content: String },
    /// Reading the file failed; holds the full message.
    Error { error: String },
    /// Metadata only (content not requested or extension not allowed).
    Empty {},
}

impl FileRecord {
    /// Create a record holding inlined content.
    pub fn content(content: impl Into<String>) -> Self {
        FileRecord::Content {
            content: content.into(),
        }
    }

    /// Create a record holding a read failure message.
    pub fn error(message: impl Into<String>) -> Self {
        FileRecord::Error {
            error: message.into(),
        }
    }

    /// Create a metadata-only record.
    pub fn empty() -> Self {
        FileRecord::Empty {}
    }

    /// Returns the inlined content, if any.
    pub fn as_content(&self) -> Option<&str> {
        match self {
            FileRecord::Content { content } => Some(content),
            _ => None,
        }
    }

    /// Returns the read failure message, if any.
    pub fn as_error(&self) -> Option<&str> {
        match self {
            FileRecord::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FileRecord::Empty {})
    }
}

/// Files directly inside one directory, keyed by file name.
pub type DirectoryEntry = BTreeMap<String, FileRecord>;

/// Every visited directory keyed by its `/`-separated path relative to the
/// scan root (`""` for the root itself).
pub type ProjectMap = BTreeMap<String, DirectoryEntry>;

/// Summary counts over a project map, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub directories: usize,
    pub files: usize,
    pub with_content: usize,
    pub with_errors: usize,
    pub metadata_only: usize,
}

impl ScanSummary {
    /// Count directories, files and record shapes in a map.
    pub fn from_map(map: &ProjectMap) -> Self {
        let mut summary = ScanSummary {
            directories: map.len(),
            ..Default::default()
        };

        for record in map.values().flat_map(|entry| entry.values()) {
            summary.files += 1;
            if record.as_content().is_some() {
                summary.with_content += 1;
            } else if record.as_error().is_some() {
                summary.with_errors += 1;
            } else if record.is_empty() {
                summary.metadata_only += 1;
            }
        }

        summary
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} directories, {} files ({} inlined, {} unreadable, {} metadata only)",
            self.directories,
            self.files,
            self.with_content,
            self.with_errors,
            self.metadata_only
        )
    }
}
