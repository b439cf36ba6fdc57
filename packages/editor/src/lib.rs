//! # Tilestudio Editor
//!
//! Transactional mutation core for Tilestudio projects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ view/controller: gestures → transactions    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: transactional mutation core         │
//! │  - Accumulate gestures into drafts          │
//! │  - Apply patches with exact inverses        │
//! │  - Guardrail policy checks                  │
//! │  - Conflict-aware undo/redo history         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ project: document types + patch vocabulary  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Patches are the only mutation path**: every change, human or AI,
//!    is an ordered op list applied atomically
//! 2. **Exact inverses**: apply-then-invert restores the prior project
//!    byte-for-byte; undo never approximates
//! 3. **No partial applies**: an op that fails rejects the whole patch
//! 4. **Conflict-aware history**: undo compares content snapshots, not
//!    positions in a timeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilestudio_editor::{CellEdit, HistoryStack, ToolType, TransactionManager};
//!
//! let mut manager = TransactionManager::new("session-1");
//! let mut history = HistoryStack::new();
//!
//! let tx = manager.begin(ToolType::Brush, "start", "ground");
//! manager.add_cells(&[CellEdit { x: 0, y: 0, value: 0 }]);
//!
//! if let Some(outcome) = manager.commit(&tx, &project, selected_tile)? {
//!     project = outcome.application.project.clone();
//!     history.push(outcome.patch, outcome.application.inverse, outcome.meta);
//! }
//! ```

mod conflict;
mod engine;
mod errors;
mod guardrails;
mod history;
mod summary;
mod transaction;

pub use conflict::{
    build_conflict_hunks, collision_ref, detect_conflicts, dialogue_ref, entity_ref,
    op_to_hunk_ref, quest_ref, tile_layer_ref, trigger_ref, Conflict, ConflictHunk,
    ConflictReport, HunkKind,
};
pub use engine::{apply, dry_run, PatchApplication, PatchError, RefKind};
pub use errors::EditorError;
pub use guardrails::{check, ExceededThreshold, GuardrailConfig, GuardrailVerdict};
pub use history::{
    build_filtered_inverse, EntryMeta, HistoryEntry, HistoryStack, Origin, UndoResolution,
};
pub use summary::{CategoryCounts, ChangeSummary};
pub use transaction::{
    CellEdit, CommitOutcome, ToolType, Transaction, TransactionId, TransactionManager,
};
