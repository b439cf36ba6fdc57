//! # Gesture Transactions
//!
//! Accumulates one user gesture (a brush stroke, a drag) into a draft, then
//! commits it as a single patch.
//!
//! The manager is a two-state machine: idle or one active draft. `begin`
//! returns the draft's id synchronously, and `commit` demands that id back:
//! a caller that began a transaction can always commit it, regardless of
//! what any view layer has or hasn't observed in between. Calling `begin`
//! while a draft is active cancels the old draft; callers that care should
//! commit or cancel explicitly first.

use serde::{Deserialize, Serialize};
use tilestudio_project::{
    now_ms, Cell, CollisionCell, IdGenerator, PatchOp, PatchV1, Project, TileCell,
};
use tracing::debug;

use crate::conflict::build_conflict_hunks;
use crate::engine::{self, PatchApplication};
use crate::errors::EditorError;
use crate::history::{EntryMeta, Origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolType {
    Brush,
    Eraser,
    Collision,
    Entity,
}

/// One accumulated cell edit. For collision gestures `value` is 0/1; for
/// brush gestures the painted tile is chosen at commit time instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    pub x: u32,
    pub y: u32,
    pub value: i32,
}

/// Opaque handle returned by `begin` and required by `commit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An in-progress, uncommitted gesture.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub tool: ToolType,
    pub map_id: String,
    pub layer_id: String,
    pub cells: Vec<CellEdit>,
    pub entity_ops: Vec<PatchOp>,
    pub started_at_ms: u64,
}

impl Transaction {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.entity_ops.is_empty()
    }
}

/// Everything a successful commit hands back: the patch, its application,
/// and ready-made history metadata.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub patch: PatchV1,
    pub application: PatchApplication,
    pub meta: EntryMeta,
}

/// Owns at most one draft at a time.
pub struct TransactionManager {
    ids: IdGenerator,
    active: Option<Transaction>,
}

impl TransactionManager {
    pub fn new(session_label: &str) -> Self {
        Self {
            ids: IdGenerator::new(session_label),
            active: None,
        }
    }

    /// Start a draft for a gesture. An already-active draft is cancelled.
    pub fn begin(
        &mut self,
        tool: ToolType,
        map_id: impl Into<String>,
        layer_id: impl Into<String>,
    ) -> TransactionId {
        if let Some(old) = self.active.take() {
            debug!(transaction = %old.id, "implicitly cancelling prior draft");
        }

        let id = TransactionId(self.ids.new_id());
        self.active = Some(Transaction {
            id: id.clone(),
            tool,
            map_id: map_id.into(),
            layer_id: layer_id.into(),
            cells: Vec::new(),
            entity_ops: Vec::new(),
            started_at_ms: now_ms(),
        });
        id
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Transaction> {
        self.active.as_ref()
    }

    /// Append cell edits to the active draft; no-op while idle.
    pub fn add_cells(&mut self, cells: &[CellEdit]) {
        if let Some(tx) = self.active.as_mut() {
            tx.cells.extend_from_slice(cells);
        }
    }

    /// Append entity/trigger ops to the active draft; no-op while idle.
    pub fn add_ops(&mut self, ops: Vec<PatchOp>) {
        if let Some(tx) = self.active.as_mut() {
            tx.entity_ops.extend(ops);
        }
    }

    /// Discard the active draft without touching the engine.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }

    /// Commit the draft identified by `id`.
    ///
    /// Returns `Ok(None)` for a draft with no accumulated changes; the
    /// draft is discarded and no patch is built, so empty patches never
    /// reach history. `selected_tile` supplies the tile index for brush
    /// gestures.
    pub fn commit(
        &mut self,
        id: &TransactionId,
        project: &Project,
        selected_tile: i32,
    ) -> Result<Option<CommitOutcome>, EditorError> {
        let tx = match self.active.take() {
            Some(tx) if tx.id == *id => tx,
            other => {
                // A mismatched draft stays active.
                self.active = other;
                return Err(EditorError::StaleTransaction {
                    given: id.to_string(),
                });
            }
        };

        if tx.is_empty() {
            debug!(transaction = %tx.id, "discarding empty draft");
            return Ok(None);
        }

        let ops = build_ops(&tx, selected_tile);
        let patch = PatchV1::new(self.ids.new_id(), project.schema_version, ops);
        let application = engine::apply(project, &patch)?;

        let meta = EntryMeta {
            origin: Origin::Manual,
            summary: application.summary.describe(),
            timestamp_ms: now_ms(),
            hunks: build_conflict_hunks(&application.project, &patch),
        };
        debug!(patch = %patch.patch_id, summary = %meta.summary, "committed gesture");

        Ok(Some(CommitOutcome {
            patch,
            application,
            meta,
        }))
    }
}

/// Translate accumulated edits into patch ops. Tile values come from the
/// tool: brush writes the selected tile, the eraser writes empty, collision
/// writes the per-cell 0/1 the gesture recorded.
fn build_ops(tx: &Transaction, selected_tile: i32) -> Vec<PatchOp> {
    let mut ops = Vec::new();

    if !tx.cells.is_empty() {
        match tx.tool {
            ToolType::Brush => ops.push(PatchOp::SetTiles {
                map_id: tx.map_id.clone(),
                layer_id: tx.layer_id.clone(),
                cells: tx
                    .cells
                    .iter()
                    .map(|c| TileCell {
                        x: c.x,
                        y: c.y,
                        tile: selected_tile,
                    })
                    .collect(),
            }),
            ToolType::Eraser => ops.push(PatchOp::ClearTiles {
                map_id: tx.map_id.clone(),
                layer_id: tx.layer_id.clone(),
                cells: tx.cells.iter().map(|c| Cell { x: c.x, y: c.y }).collect(),
            }),
            ToolType::Collision => ops.push(PatchOp::SetCollisionCells {
                map_id: tx.map_id.clone(),
                cells: tx
                    .cells
                    .iter()
                    .map(|c| CollisionCell {
                        x: c.x,
                        y: c.y,
                        solid: u8::from(c.value != 0),
                    })
                    .collect(),
            }),
            // Entity gestures carry their edits as explicit ops.
            ToolType::Entity => {}
        }
    }

    ops.extend(tx.entity_ops.iter().cloned());
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TransactionManager {
        TransactionManager::new("test-session")
    }

    #[test]
    fn brush_commit_paints_selected_tile() {
        let project = Project::starter("Tx");
        let mut manager = manager();

        let id = manager.begin(ToolType::Brush, "start", "ground");
        manager.add_cells(&[
            CellEdit { x: 0, y: 0, value: 0 },
            CellEdit { x: 1, y: 0, value: 0 },
        ]);

        let outcome = manager.commit(&id, &project, 5).unwrap().unwrap();
        let layer = &outcome.application.project.maps["start"].tile_layers["ground"];
        assert_eq!(layer.data[0], 5);
        assert_eq!(layer.data[1], 5);
        assert!(layer.data[2..].iter().all(|&t| t == 0));
        assert_eq!(outcome.application.summary.total_tile_cells(), 2);
        assert_eq!(outcome.meta.origin, Origin::Manual);
        assert!(!manager.is_active());
    }

    #[test]
    fn empty_draft_commits_to_none() {
        let project = Project::starter("Tx");
        let mut manager = manager();

        let id = manager.begin(ToolType::Brush, "start", "ground");
        let outcome = manager.commit(&id, &project, 5).unwrap();

        assert!(outcome.is_none());
        assert!(!manager.is_active());
    }

    #[test]
    fn add_cells_while_idle_is_noop() {
        let mut manager = manager();
        manager.add_cells(&[CellEdit { x: 0, y: 0, value: 1 }]);
        assert!(!manager.is_active());
    }

    #[test]
    fn stale_handle_is_rejected() {
        let project = Project::starter("Tx");
        let mut manager = manager();

        let old = manager.begin(ToolType::Brush, "start", "ground");
        manager.add_cells(&[CellEdit { x: 0, y: 0, value: 0 }]);

        // A second begin cancels the first draft.
        let new = manager.begin(ToolType::Eraser, "start", "ground");

        assert!(matches!(
            manager.commit(&old, &project, 5),
            Err(EditorError::StaleTransaction { .. })
        ));

        // The new draft is still usable.
        manager.add_cells(&[CellEdit { x: 2, y: 0, value: 0 }]);
        assert!(manager.commit(&new, &project, 5).unwrap().is_some());
    }

    #[test]
    fn cancel_discards_without_applying() {
        let mut manager = manager();
        manager.begin(ToolType::Brush, "start", "ground");
        manager.add_cells(&[CellEdit { x: 0, y: 0, value: 0 }]);

        assert!(manager.cancel());
        assert!(!manager.is_active());
        assert!(!manager.cancel());
    }

    #[test]
    fn collision_commit_uses_recorded_values() {
        let project = Project::starter("Tx");
        let mut manager = manager();

        let id = manager.begin(ToolType::Collision, "start", "ground");
        manager.add_cells(&[
            CellEdit { x: 0, y: 0, value: 1 },
            CellEdit { x: 1, y: 0, value: 0 },
        ]);

        let outcome = manager.commit(&id, &project, 99).unwrap().unwrap();
        let map = &outcome.application.project.maps["start"];
        assert_eq!(map.collision[0], 1);
        assert_eq!(map.collision[1], 0);
        // Cell (1,0) was already 0, so only one cell actually changed.
        assert_eq!(outcome.application.summary.total_collision_cells(), 1);
    }

    #[test]
    fn entity_ops_commit_through_the_draft() {
        let project = Project::starter("Tx");
        let mut manager = manager();

        let id = manager.begin(ToolType::Entity, "start", "ground");
        manager.add_ops(vec![PatchOp::PlaceEntity {
            map_id: "start".to_string(),
            entity: tilestudio_project::EntityInstance {
                instance_id: "guard-1".to_string(),
                entity_def_id: "guard".to_string(),
                x: 4,
                y: 4,
            },
            index: None,
        }]);

        let outcome = manager.commit(&id, &project, 0).unwrap().unwrap();
        assert_eq!(outcome.application.project.maps["start"].entities.len(), 1);
        assert_eq!(outcome.meta.hunks.len(), 1);
        assert_eq!(outcome.meta.hunks[0].hunk_ref, "map:start:entity:guard-1");
    }
}
