//! File workspace reconstruction.
//!
//! Owns the set of files being written by the current generation, tracks
//! which single file is the append target, and enforces the monotonic
//! `Writing -> Done` status transition. The workspace itself is pure state:
//! it is mutated only from the session's processing task, and the router
//! emits the matching [`SessionEvent`](super::runtime::SessionEvent)s.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::FileStatus;

/// One file being reconstructed from the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: String,
    /// Append-only while `Writing`; frozen once `Done`.
    pub content: String,
    pub status: FileStatus,
    /// Editor language id derived from the path extension.
    pub language: String,
}

/// Full observable workspace state, for hosts that pull instead of push.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    /// Records sorted by path.
    pub files: Vec<FileRecord>,
    pub active_path: Option<String>,
    /// Appends that arrived with no open file and were dropped.
    pub orphaned_appends: u64,
}

/// Reconstructs the generated file set from routed frames.
#[derive(Debug, Default)]
pub struct FileWorkspace {
    files: HashMap<String, FileRecord>,
    /// Paths in recency-of-open order; last entry is the newest open.
    open_order: Vec<String>,
    current_path: Option<String>,
    orphaned_appends: u64,
}

impl FileWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` and make it the append target.
    ///
    /// Re-opening an existing path is idempotent (content and status are
    /// untouched) but still retargets appends and refreshes recency.
    /// Returns `true` when the record was newly created.
    pub fn open(&mut self, path: &str) -> bool {
        let created = if self.files.contains_key(path) {
            false
        } else {
            self.files.insert(
                path.to_string(),
                FileRecord {
                    path: path.to_string(),
                    content: String::new(),
                    status: FileStatus::Writing,
                    language: language_for_path(path).to_string(),
                },
            );
            true
        };

        self.open_order.retain(|p| p != path);
        self.open_order.push(path.to_string());
        self.current_path = Some(path.to_string());
        created
    }

    /// Append `text` verbatim to the current file.
    ///
    /// Returns the routed path, or `None` when there is no open target, in
    /// which case the text is dropped, counted, and logged so the condition
    /// stays detectable.
    pub fn append(&mut self, text: &str) -> Option<String> {
        let Some(path) = self.current_path.clone() else {
            self.orphaned_appends += 1;
            log::warn!(
                "dropping {}-byte append with no open file (total dropped: {})",
                text.len(),
                self.orphaned_appends
            );
            return None;
        };

        if let Some(record) = self.files.get_mut(&path) {
            // A record stays append-only while writing and frozen once done.
            if record.status == FileStatus::Writing {
                record.content.push_str(text);
            }
        }
        Some(path)
    }

    /// Mark `path` done. Idempotent; closing an unknown path is a no-op.
    ///
    /// When the closed path was the append target, the target moves to the
    /// most recently opened file still writing (or `None`).
    /// Returns `true` when the path was known.
    pub fn close(&mut self, path: &str) -> bool {
        let Some(record) = self.files.get_mut(path) else {
            log::debug!("FILE_CLOSE for unknown path {path}");
            return false;
        };
        record.status = FileStatus::Done;

        if self.current_path.as_deref() == Some(path) {
            self.current_path = self
                .open_order
                .iter()
                .rev()
                .find(|p| {
                    self.files
                        .get(*p)
                        .is_some_and(|r| r.status == FileStatus::Writing)
                })
                .cloned();
        }
        true
    }

    /// Path currently receiving appends.
    pub fn active_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// All records, sorted by path for deterministic display.
    pub fn files(&self) -> Vec<FileRecord> {
        let mut files: Vec<FileRecord> = self.files.values().cloned().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    pub fn orphaned_appends(&self) -> u64 {
        self.orphaned_appends
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            files: self.files(),
            active_path: self.current_path.clone(),
            orphaned_appends: self.orphaned_appends,
        }
    }
}

/// Editor language id for a file path, from its extension.
pub fn language_for_path(path: &str) -> &'static str {
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    match extension.to_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        _ => "plaintext",
    }
}
