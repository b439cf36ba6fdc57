//! # Patch Application Engine
//!
//! Pure state transition over project documents.
//!
//! `apply` takes a project and a patch and produces the next project, the
//! exact inverse patch, and a change summary, or an error and no visible
//! mutation at all. There are no partial applies: the engine works on a
//! clone and only hands it back when every op succeeded.
//!
//! ## Op Semantics
//!
//! - Ops apply strictly in list order; an op may target an entity or
//!   trigger created by an earlier op in the same patch, never a later one
//! - Tile and collision writes address flat arrays at `y * width + x`
//! - `deleteEntity` fails on a missing instance unless flagged idempotent
//!
//! ## Inverse Synthesis
//!
//! Each forward op records the op that restores its pre-image while it
//! applies: tile writes capture prior cell values, `placeEntity` pairs with
//! `deleteEntity`, deletions capture the full removed record and its list
//! position. Inverse ops are emitted in reverse order (and cell lists
//! reversed within each op), so overlapping writes inside one patch still
//! restore correctly. Round-trip invariant: applying the inverse to the
//! result yields the original project, byte-for-byte in canonical JSON.

use std::fmt;

use thiserror::Error;
use tilestudio_project::{
    CollisionCell, EntityInstance, GameMap, PatchOp, PatchV1, Project, TileCell, TileLayer,
    TriggerRegion, PATCH_VERSION,
};

use crate::conflict::{collision_ref, tile_layer_ref};
use crate::summary::ChangeSummary;

/// What a reference failure pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Map,
    Layer,
    Entity,
    Trigger,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Map => write!(f, "map"),
            RefKind::Layer => write!(f, "layer"),
            RefKind::Entity => write!(f, "entity"),
            RefKind::Trigger => write!(f, "trigger"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("unsupported patch version {0}")]
    UnsupportedVersion(u32),

    #[error("op {op_index} ({op_tag}): {message}")]
    Structural {
        op_index: usize,
        op_tag: &'static str,
        message: String,
    },

    #[error("op {op_index} ({op_tag}): unknown {kind} '{id}'")]
    Reference {
        op_index: usize,
        op_tag: &'static str,
        kind: RefKind,
        id: String,
    },

    #[error("op {op_index} ({op_tag}): cell ({x}, {y}) outside {width}x{height} map")]
    Bounds {
        op_index: usize,
        op_tag: &'static str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

impl PatchError {
    /// Index of the op that failed, if the failure is op-scoped.
    pub fn op_index(&self) -> Option<usize> {
        match self {
            PatchError::UnsupportedVersion(_) => None,
            PatchError::Structural { op_index, .. }
            | PatchError::Reference { op_index, .. }
            | PatchError::Bounds { op_index, .. } => Some(*op_index),
        }
    }

    /// Wire tag of the op that failed, if op-scoped.
    pub fn op_tag(&self) -> Option<&'static str> {
        match self {
            PatchError::UnsupportedVersion(_) => None,
            PatchError::Structural { op_tag, .. }
            | PatchError::Reference { op_tag, .. }
            | PatchError::Bounds { op_tag, .. } => Some(op_tag),
        }
    }
}

/// Result of a successful apply.
#[derive(Debug, Clone)]
pub struct PatchApplication {
    /// The next project state.
    pub project: Project,
    /// Patch that restores the pre-apply project exactly.
    pub inverse: PatchV1,
    pub summary: ChangeSummary,
}

/// Apply `patch` to `project`, producing the next state, the inverse patch
/// and a change summary. Pure: the input project is untouched, and on error
/// nothing is returned.
pub fn apply(project: &Project, patch: &PatchV1) -> Result<PatchApplication, PatchError> {
    if patch.patch_version != PATCH_VERSION {
        return Err(PatchError::UnsupportedVersion(patch.patch_version));
    }

    let mut next = project.clone();
    let mut summary = ChangeSummary::default();
    let mut inverse_ops: Vec<PatchOp> = Vec::with_capacity(patch.ops.len());

    for (op_index, op) in patch.ops.iter().enumerate() {
        if let Some(inverse) = apply_op(&mut next, op_index, op, &mut summary)? {
            inverse_ops.push(inverse);
        }
    }

    // Pre-images restore correctly only when replayed newest-first.
    inverse_ops.reverse();
    let inverse = PatchV1::new(
        format!("{}-inverse", patch.patch_id),
        patch.base_schema_version,
        inverse_ops,
    );

    Ok(PatchApplication {
        project: next,
        inverse,
        summary,
    })
}

/// Validate `patch` against `project` without keeping the result.
///
/// Runs the full apply path (reference resolution, bounds checks,
/// structural checks) and discards the document. Used by the AI proposal
/// flow before anything reaches history.
pub fn dry_run(project: &Project, patch: &PatchV1) -> Result<ChangeSummary, PatchError> {
    apply(project, patch).map(|application| application.summary)
}

/// Apply one op in place; returns its inverse op, or `None` when the op was
/// an allowed no-op (idempotent delete of a missing entity).
fn apply_op(
    next: &mut Project,
    op_index: usize,
    op: &PatchOp,
    summary: &mut ChangeSummary,
) -> Result<Option<PatchOp>, PatchError> {
    let op_tag = op.tag();

    match op {
        PatchOp::SetTiles {
            map_id,
            layer_id,
            cells,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let (width, height) = (map.width, map.height);
            let indices = cell_indices(
                op_index,
                op_tag,
                width,
                height,
                cells.iter().map(|c| (c.x, c.y)),
            )?;
            let layer = layer_mut(map, op_index, op_tag, layer_id)?;

            let mut prior = Vec::with_capacity(cells.len());
            let mut changed = 0;
            for (cell, idx) in cells.iter().zip(indices) {
                prior.push(TileCell {
                    x: cell.x,
                    y: cell.y,
                    tile: layer.data[idx],
                });
                if layer.data[idx] != cell.tile {
                    changed += 1;
                }
                layer.data[idx] = cell.tile;
            }

            // A cell listed twice must unwind newest-first, so the inverse
            // replays pre-images in reverse.
            prior.reverse();
            summary.count_tile_cells(&tile_layer_ref(map_id, layer_id), changed);
            Ok(Some(PatchOp::SetTiles {
                map_id: map_id.clone(),
                layer_id: layer_id.clone(),
                cells: prior,
            }))
        }

        PatchOp::ClearTiles {
            map_id,
            layer_id,
            cells,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let (width, height) = (map.width, map.height);
            let indices = cell_indices(
                op_index,
                op_tag,
                width,
                height,
                cells.iter().map(|c| (c.x, c.y)),
            )?;
            let layer = layer_mut(map, op_index, op_tag, layer_id)?;

            let mut prior = Vec::with_capacity(cells.len());
            let mut changed = 0;
            for (cell, idx) in cells.iter().zip(indices) {
                prior.push(TileCell {
                    x: cell.x,
                    y: cell.y,
                    tile: layer.data[idx],
                });
                if layer.data[idx] != 0 {
                    changed += 1;
                }
                layer.data[idx] = 0;
            }

            prior.reverse();
            summary.count_tile_cells(&tile_layer_ref(map_id, layer_id), changed);
            Ok(Some(PatchOp::SetTiles {
                map_id: map_id.clone(),
                layer_id: layer_id.clone(),
                cells: prior,
            }))
        }

        PatchOp::PaintRect {
            map_id,
            layer_id,
            x,
            y,
            width,
            height,
            tile,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            check_rect(op_index, op_tag, map, *x, *y, *width, *height)?;
            let map_width = map.width;
            let layer = layer_mut(map, op_index, op_tag, layer_id)?;

            let mut prior = Vec::with_capacity((*width as usize) * (*height as usize));
            let mut changed = 0;
            for cy in *y..*y + *height {
                for cx in *x..*x + *width {
                    let idx = (cy * map_width + cx) as usize;
                    prior.push(TileCell {
                        x: cx,
                        y: cy,
                        tile: layer.data[idx],
                    });
                    if layer.data[idx] != *tile {
                        changed += 1;
                    }
                    layer.data[idx] = *tile;
                }
            }

            summary.count_tile_cells(&tile_layer_ref(map_id, layer_id), changed);
            Ok(Some(PatchOp::SetTiles {
                map_id: map_id.clone(),
                layer_id: layer_id.clone(),
                cells: prior,
            }))
        }

        PatchOp::SetCollisionCells { map_id, cells } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let indices = cell_indices(
                op_index,
                op_tag,
                map.width,
                map.height,
                cells.iter().map(|c| (c.x, c.y)),
            )?;

            let mut prior = Vec::with_capacity(cells.len());
            let mut changed = 0;
            for (cell, idx) in cells.iter().zip(indices) {
                let solid = u8::from(cell.solid != 0);
                prior.push(CollisionCell {
                    x: cell.x,
                    y: cell.y,
                    solid: map.collision[idx],
                });
                if map.collision[idx] != solid {
                    changed += 1;
                }
                map.collision[idx] = solid;
            }

            prior.reverse();
            summary.count_collision_cells(&collision_ref(map_id), changed);
            Ok(Some(PatchOp::SetCollisionCells {
                map_id: map_id.clone(),
                cells: prior,
            }))
        }

        PatchOp::SetCollisionRect {
            map_id,
            x,
            y,
            width,
            height,
            solid,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            check_rect(op_index, op_tag, map, *x, *y, *width, *height)?;
            let map_width = map.width;
            let solid = u8::from(*solid != 0);

            let mut prior = Vec::with_capacity((*width as usize) * (*height as usize));
            let mut changed = 0;
            for cy in *y..*y + *height {
                for cx in *x..*x + *width {
                    let idx = (cy * map_width + cx) as usize;
                    prior.push(CollisionCell {
                        x: cx,
                        y: cy,
                        solid: map.collision[idx],
                    });
                    if map.collision[idx] != solid {
                        changed += 1;
                    }
                    map.collision[idx] = solid;
                }
            }

            summary.count_collision_cells(&collision_ref(map_id), changed);
            Ok(Some(PatchOp::SetCollisionCells {
                map_id: map_id.clone(),
                cells: prior,
            }))
        }

        PatchOp::PlaceEntity {
            map_id,
            entity,
            index,
        } => {
            check_id(op_index, op_tag, "entity instance id", &entity.instance_id)?;
            let map = map_mut(next, op_index, op_tag, map_id)?;
            if map.entity(&entity.instance_id).is_some() {
                return Err(PatchError::Structural {
                    op_index,
                    op_tag,
                    message: format!("entity instance '{}' already exists", entity.instance_id),
                });
            }

            let at = index.unwrap_or(map.entities.len()).min(map.entities.len());
            map.entities.insert(at, entity.clone());
            summary.entities.created += 1;
            Ok(Some(PatchOp::DeleteEntity {
                map_id: map_id.clone(),
                instance_id: entity.instance_id.clone(),
                idempotent: false,
            }))
        }

        PatchOp::MoveEntity {
            map_id,
            instance_id,
            x,
            y,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let entity =
                map.entity_mut(instance_id)
                    .ok_or_else(|| PatchError::Reference {
                        op_index,
                        op_tag,
                        kind: RefKind::Entity,
                        id: instance_id.clone(),
                    })?;

            let (prev_x, prev_y) = (entity.x, entity.y);
            entity.x = *x;
            entity.y = *y;
            summary.entities.modified += 1;
            Ok(Some(PatchOp::MoveEntity {
                map_id: map_id.clone(),
                instance_id: instance_id.clone(),
                x: prev_x,
                y: prev_y,
            }))
        }

        PatchOp::DeleteEntity {
            map_id,
            instance_id,
            idempotent,
        } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let position = map
                .entities
                .iter()
                .position(|e| e.instance_id == *instance_id);

            let Some(position) = position else {
                if *idempotent {
                    return Ok(None);
                }
                return Err(PatchError::Reference {
                    op_index,
                    op_tag,
                    kind: RefKind::Entity,
                    id: instance_id.clone(),
                });
            };

            let removed: EntityInstance = map.entities.remove(position);
            summary.entities.deleted += 1;
            // The inverse pins the list position, so undoing a deletion in
            // the middle of the list restores the document exactly.
            Ok(Some(PatchOp::PlaceEntity {
                map_id: map_id.clone(),
                entity: removed,
                index: Some(position),
            }))
        }

        PatchOp::CreateTrigger {
            map_id,
            trigger,
            index,
        } => {
            check_id(op_index, op_tag, "trigger id", &trigger.id)?;
            let map = map_mut(next, op_index, op_tag, map_id)?;
            if map.trigger(&trigger.id).is_some() {
                return Err(PatchError::Structural {
                    op_index,
                    op_tag,
                    message: format!("trigger '{}' already exists", trigger.id),
                });
            }

            let at = index.unwrap_or(map.triggers.len()).min(map.triggers.len());
            map.triggers.insert(at, trigger.clone());
            summary.triggers.created += 1;
            Ok(Some(PatchOp::DeleteTrigger {
                map_id: map_id.clone(),
                trigger_id: trigger.id.clone(),
            }))
        }

        PatchOp::DeleteTrigger { map_id, trigger_id } => {
            let map = map_mut(next, op_index, op_tag, map_id)?;
            let position = map.triggers.iter().position(|t| t.id == *trigger_id);
            let Some(position) = position else {
                return Err(PatchError::Reference {
                    op_index,
                    op_tag,
                    kind: RefKind::Trigger,
                    id: trigger_id.clone(),
                });
            };

            let removed: TriggerRegion = map.triggers.remove(position);
            summary.triggers.deleted += 1;
            Ok(Some(PatchOp::CreateTrigger {
                map_id: map_id.clone(),
                trigger: removed,
                index: Some(position),
            }))
        }
    }
}

fn map_mut<'a>(
    project: &'a mut Project,
    op_index: usize,
    op_tag: &'static str,
    map_id: &str,
) -> Result<&'a mut GameMap, PatchError> {
    project.maps.get_mut(map_id).ok_or_else(|| PatchError::Reference {
        op_index,
        op_tag,
        kind: RefKind::Map,
        id: map_id.to_string(),
    })
}

fn layer_mut<'a>(
    map: &'a mut GameMap,
    op_index: usize,
    op_tag: &'static str,
    layer_id: &str,
) -> Result<&'a mut TileLayer, PatchError> {
    map.tile_layers
        .get_mut(layer_id)
        .ok_or_else(|| PatchError::Reference {
            op_index,
            op_tag,
            kind: RefKind::Layer,
            id: layer_id.to_string(),
        })
}

/// Resolve every `(x, y)` to a flat index, rejecting the first out-of-bounds
/// coordinate before anything is written.
fn cell_indices(
    op_index: usize,
    op_tag: &'static str,
    width: u32,
    height: u32,
    coords: impl Iterator<Item = (u32, u32)>,
) -> Result<Vec<usize>, PatchError> {
    let mut indices = Vec::new();
    for (x, y) in coords {
        if x >= width || y >= height {
            return Err(PatchError::Bounds {
                op_index,
                op_tag,
                x,
                y,
                width,
                height,
            });
        }
        indices.push((y * width + x) as usize);
    }
    Ok(indices)
}

fn check_rect(
    op_index: usize,
    op_tag: &'static str,
    map: &GameMap,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<(), PatchError> {
    if x.saturating_add(width) > map.width || y.saturating_add(height) > map.height {
        return Err(PatchError::Bounds {
            op_index,
            op_tag,
            x: x.saturating_add(width.saturating_sub(1)),
            y: y.saturating_add(height.saturating_sub(1)),
            width: map.width,
            height: map.height,
        });
    }
    Ok(())
}

/// Identifiers become hunk-ref components; the delimiter is forbidden.
fn check_id(
    op_index: usize,
    op_tag: &'static str,
    what: &str,
    id: &str,
) -> Result<(), PatchError> {
    if id.is_empty() {
        return Err(PatchError::Structural {
            op_index,
            op_tag,
            message: format!("{} is empty", what),
        });
    }
    if id.contains(':') {
        return Err(PatchError::Structural {
            op_index,
            op_tag,
            message: format!("{} '{}' contains ':'", what, id),
        });
    }
    Ok(())
}
