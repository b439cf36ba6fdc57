//! # History Stack
//!
//! Undo/redo over committed patches, with conflict-aware undo.
//!
//! ## Design
//!
//! - One append-only entry list plus an undone-count cursor; entries past
//!   the cursor are the redo tail
//! - A new push discards the redo tail; no branching history
//! - Undo applies the stored inverse through the engine; redo replays the
//!   forward patch
//! - Before undoing, `preflight_undo` re-checks the entry's conflict hunks
//!   against the live project; the caller resolves conflicts by forcing,
//!   cancelling, or undoing only the untouched regions
//!
//! A partial undo pushes a **new** entry (itself undoable) and never
//! rewrites the original entry.

use serde::{Deserialize, Serialize};
use tilestudio_project::{now_ms, PatchOp, PatchV1, Project};
use tracing::debug;

use crate::conflict::{
    build_conflict_hunks, detect_conflicts, op_to_hunk_ref, ConflictHunk, ConflictReport,
};
use crate::engine::{self, PatchApplication};
use crate::errors::EditorError;

/// Who produced a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    Manual,
    Ai,
}

#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub origin: Origin,
    pub summary: String,
    pub timestamp_ms: u64,
    pub hunks: Vec<ConflictHunk>,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub patch: PatchV1,
    pub inverse: PatchV1,
    pub meta: EntryMeta,
}

/// How the caller wants a conflicted undo handled.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoResolution {
    /// Undo anyway; conflicting regions lose their outside edits.
    Force,
    /// Abort with no state change.
    Cancel,
    /// Undo only ops whose hunk ref is in the safe list.
    Partial { safe_refs: Vec<String> },
}

pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    undone: usize,
    max_levels: usize,
}

impl HistoryStack {
    /// Default depth, matching the editor's shipped configuration.
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// `max_levels == 0` means unlimited.
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            entries: Vec::new(),
            undone: 0,
            max_levels,
        }
    }

    /// Record a committed patch. Any redo tail is discarded first.
    pub fn push(&mut self, patch: PatchV1, inverse: PatchV1, meta: EntryMeta) {
        if self.undone > 0 {
            let keep = self.entries.len() - self.undone;
            debug!(discarded = self.undone, "truncating redo tail");
            self.entries.truncate(keep);
            self.undone = 0;
        }

        self.entries.push(HistoryEntry {
            patch,
            inverse,
            meta,
        });

        if self.max_levels > 0 && self.entries.len() > self.max_levels {
            self.entries.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undone < self.entries.len()
    }

    pub fn can_redo(&self) -> bool {
        self.undone > 0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.undone = 0;
    }

    /// Human summary of what `undo` would revert.
    pub fn undo_summary(&self) -> Option<&str> {
        self.peek_undo().map(|e| e.meta.summary.as_str())
    }

    /// Human summary of what `redo` would reapply.
    pub fn redo_summary(&self) -> Option<&str> {
        self.peek_redo().map(|e| e.meta.summary.as_str())
    }

    fn peek_undo(&self) -> Option<&HistoryEntry> {
        if self.can_undo() {
            self.entries.get(self.entries.len() - self.undone - 1)
        } else {
            None
        }
    }

    fn peek_redo(&self) -> Option<&HistoryEntry> {
        if self.can_redo() {
            self.entries.get(self.entries.len() - self.undone)
        } else {
            None
        }
    }

    /// Undo the most recent non-undone entry, ignoring conflicts.
    pub fn undo(&mut self, project: &Project) -> Result<Option<PatchApplication>, EditorError> {
        let Some(entry) = self.peek_undo() else {
            return Ok(None);
        };

        let application = engine::apply(project, &entry.inverse)?;
        self.undone += 1;
        Ok(Some(application))
    }

    /// Reapply the most recently undone entry.
    pub fn redo(&mut self, project: &Project) -> Result<Option<PatchApplication>, EditorError> {
        let Some(entry) = self.peek_redo() else {
            return Ok(None);
        };

        let application = engine::apply(project, &entry.patch)?;
        self.undone -= 1;
        Ok(Some(application))
    }

    /// Re-check the next undo candidate's hunks against the live project.
    /// `None` when there is nothing to undo.
    pub fn preflight_undo(&self, project: &Project) -> Option<ConflictReport> {
        self.peek_undo()
            .map(|entry| detect_conflicts(project, &entry.meta.hunks))
    }

    /// Undo with an explicit conflict resolution.
    ///
    /// `Force` behaves like `undo`. `Cancel` changes nothing. `Partial`
    /// applies an inverse filtered to the given safe refs and pushes it as
    /// a new entry; the original entry stays applied and untouched.
    pub fn undo_with_resolution(
        &mut self,
        project: &Project,
        resolution: UndoResolution,
    ) -> Result<Option<PatchApplication>, EditorError> {
        match resolution {
            UndoResolution::Force => self.undo(project),
            UndoResolution::Cancel => Ok(None),
            UndoResolution::Partial { safe_refs } => {
                let Some(entry) = self.peek_undo() else {
                    return Ok(None);
                };

                let Some(filtered) = build_filtered_inverse(entry, &safe_refs) else {
                    return Ok(None);
                };

                let origin = entry.meta.origin;
                let summary = format!("Partial undo: {}", entry.meta.summary);
                let application = engine::apply(project, &filtered)?;

                let meta = EntryMeta {
                    origin,
                    summary,
                    timestamp_ms: now_ms(),
                    hunks: build_conflict_hunks(&application.project, &filtered),
                };
                self.push(filtered, application.inverse.clone(), meta);

                Ok(Some(application))
            }
        }
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Inverse of `entry` restricted to ops touching only safe regions.
/// `None` when nothing survives the filter.
pub fn build_filtered_inverse(entry: &HistoryEntry, safe_refs: &[String]) -> Option<PatchV1> {
    let ops: Vec<PatchOp> = entry
        .inverse
        .ops
        .iter()
        .filter(|op| {
            let (_, hunk_ref) = op_to_hunk_ref(op);
            safe_refs.contains(&hunk_ref)
        })
        .cloned()
        .collect();

    if ops.is_empty() {
        return None;
    }

    Some(PatchV1::new(
        format!("{}-partial", entry.patch.patch_id),
        entry.inverse.base_schema_version,
        ops,
    ))
}
