//! # Conflict Detection
//!
//! Content-addressed conflict detection for undo.
//!
//! When a patch commits, every region it touched is snapshotted: serialized
//! to canonical JSON immediately after the patch applied. Before that patch
//! is undone later, each snapshot is compared against the same region of the
//! *current* project. A mismatch means some other edit (a different tool, an
//! AI patch) has since changed the region, and blindly applying the inverse
//! would clobber it.
//!
//! Regions are addressed by colon-delimited hunk refs:
//!
//! ```text
//! map:<mapId>:layer:<layerId>   tile layer data
//! map:<mapId>:collision         collision array
//! map:<mapId>:entity:<id>       one entity instance
//! map:<mapId>:trigger:<id>      one trigger region
//! dialogue:<id>                 one dialogue
//! quest:<id>                    one quest
//! ```
//!
//! Identifiers must never contain `:`. The application engine rejects ids
//! that would make ref parsing ambiguous.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use tilestudio_project::{PatchOp, PatchV1, Project};

/// Which kind of region a hunk addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HunkKind {
    Tiles,
    Collision,
    Entity,
    Trigger,
    Dialogue,
    Quest,
}

/// A named region plus its serialized value captured right after a patch
/// was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictHunk {
    pub kind: HunkKind,
    pub hunk_ref: String,
    pub post_patch_snapshot: String,
}

/// One detected mismatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub hunk_ref: String,
    pub expected: String,
    pub current: String,
    pub description: String,
}

/// Result of re-checking a set of hunks against the live project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub conflicts: Vec<Conflict>,
    pub safe_hunks: Vec<String>,
}

pub fn tile_layer_ref(map_id: &str, layer_id: &str) -> String {
    format!("map:{}:layer:{}", map_id, layer_id)
}

pub fn collision_ref(map_id: &str) -> String {
    format!("map:{}:collision", map_id)
}

pub fn entity_ref(map_id: &str, instance_id: &str) -> String {
    format!("map:{}:entity:{}", map_id, instance_id)
}

pub fn trigger_ref(map_id: &str, trigger_id: &str) -> String {
    format!("map:{}:trigger:{}", map_id, trigger_id)
}

pub fn dialogue_ref(dialogue_id: &str) -> String {
    format!("dialogue:{}", dialogue_id)
}

pub fn quest_ref(quest_id: &str) -> String {
    format!("quest:{}", quest_id)
}

/// The region an op writes to. Exhaustive over the op vocabulary: a new op
/// tag must decide its region here before it can reach history.
pub fn op_to_hunk_ref(op: &PatchOp) -> (HunkKind, String) {
    match op {
        PatchOp::SetTiles {
            map_id, layer_id, ..
        }
        | PatchOp::ClearTiles {
            map_id, layer_id, ..
        }
        | PatchOp::PaintRect {
            map_id, layer_id, ..
        } => (HunkKind::Tiles, tile_layer_ref(map_id, layer_id)),

        PatchOp::SetCollisionCells { map_id, .. } | PatchOp::SetCollisionRect { map_id, .. } => {
            (HunkKind::Collision, collision_ref(map_id))
        }

        PatchOp::PlaceEntity { map_id, entity, .. } => {
            (HunkKind::Entity, entity_ref(map_id, &entity.instance_id))
        }
        PatchOp::MoveEntity {
            map_id,
            instance_id,
            ..
        }
        | PatchOp::DeleteEntity {
            map_id,
            instance_id,
            ..
        } => (HunkKind::Entity, entity_ref(map_id, instance_id)),

        PatchOp::CreateTrigger {
            map_id, trigger, ..
        } => (HunkKind::Trigger, trigger_ref(map_id, &trigger.id)),
        PatchOp::DeleteTrigger {
            map_id, trigger_id, ..
        } => (HunkKind::Trigger, trigger_ref(map_id, trigger_id)),
    }
}

/// Build the conflict hunks for a freshly applied patch.
///
/// `project` must be the post-patch document. Duplicate refs across ops are
/// deduplicated here, not at detection time; the snapshot is the same either
/// way because it reads the final state.
pub fn build_conflict_hunks(project: &Project, patch: &PatchV1) -> Vec<ConflictHunk> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut hunks = Vec::new();

    for op in &patch.ops {
        let (kind, hunk_ref) = op_to_hunk_ref(op);
        if !seen.insert(hunk_ref.clone()) {
            continue;
        }
        let post_patch_snapshot = snapshot_region(project, kind, &hunk_ref);
        hunks.push(ConflictHunk {
            kind,
            hunk_ref,
            post_patch_snapshot,
        });
    }

    hunks
}

/// Compare each hunk's stored snapshot against the live project.
///
/// Pure and order-independent. A region that no longer resolves serializes
/// as `null`, so deletion-since-capture reads as a conflict unless the
/// snapshot itself captured the deletion.
pub fn detect_conflicts(project: &Project, hunks: &[ConflictHunk]) -> ConflictReport {
    let mut conflicts = Vec::new();
    let mut safe_hunks = Vec::new();

    for hunk in hunks {
        let current = snapshot_region(project, hunk.kind, &hunk.hunk_ref);
        if current == hunk.post_patch_snapshot {
            safe_hunks.push(hunk.hunk_ref.clone());
        } else {
            conflicts.push(Conflict {
                hunk_ref: hunk.hunk_ref.clone(),
                expected: hunk.post_patch_snapshot.clone(),
                current,
                description: describe_ref(hunk.kind, &hunk.hunk_ref),
            });
        }
    }

    ConflictReport {
        has_conflicts: !conflicts.is_empty(),
        conflicts,
        safe_hunks,
    }
}

/// Serialize the region a ref addresses, or `"null"` when it is missing.
///
/// Uses the same encoding as `build_conflict_hunks`: serde_json over
/// BTreeMap-backed structures, so key order is canonical.
fn snapshot_region(project: &Project, kind: HunkKind, hunk_ref: &str) -> String {
    let parts: Vec<&str> = hunk_ref.split(':').collect();

    let value = match (kind, parts.as_slice()) {
        (HunkKind::Tiles, ["map", map_id, "layer", layer_id]) => project
            .maps
            .get(*map_id)
            .and_then(|m| m.tile_layers.get(*layer_id))
            .map(to_json),
        (HunkKind::Collision, ["map", map_id, "collision"]) => {
            project.maps.get(*map_id).map(|m| to_json(&m.collision))
        }
        (HunkKind::Entity, ["map", map_id, "entity", instance_id]) => project
            .maps
            .get(*map_id)
            .and_then(|m| m.entity(instance_id))
            .map(to_json),
        (HunkKind::Trigger, ["map", map_id, "trigger", trigger_id]) => project
            .maps
            .get(*map_id)
            .and_then(|m| m.trigger(trigger_id))
            .map(to_json),
        (HunkKind::Dialogue, ["dialogue", dialogue_id]) => {
            project.dialogues.get(*dialogue_id).map(to_json)
        }
        (HunkKind::Quest, ["quest", quest_id]) => project.quests.get(*quest_id).map(to_json),
        _ => None,
    };

    value.unwrap_or_else(|| "null".to_string())
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn describe_ref(kind: HunkKind, hunk_ref: &str) -> String {
    let parts: Vec<&str> = hunk_ref.split(':').collect();
    match (kind, parts.as_slice()) {
        (HunkKind::Tiles, ["map", map_id, "layer", layer_id]) => format!(
            "Layer '{}' of map '{}' changed since this edit",
            layer_id, map_id
        ),
        (HunkKind::Collision, ["map", map_id, "collision"]) => {
            format!("Collision data of map '{}' changed since this edit", map_id)
        }
        (HunkKind::Entity, ["map", map_id, "entity", instance_id]) => format!(
            "Entity '{}' on map '{}' changed since this edit",
            instance_id, map_id
        ),
        (HunkKind::Trigger, ["map", map_id, "trigger", trigger_id]) => format!(
            "Trigger '{}' on map '{}' changed since this edit",
            trigger_id, map_id
        ),
        (HunkKind::Dialogue, ["dialogue", dialogue_id]) => {
            format!("Dialogue '{}' changed since this edit", dialogue_id)
        }
        (HunkKind::Quest, ["quest", quest_id]) => {
            format!("Quest '{}' changed since this edit", quest_id)
        }
        _ => format!("Region '{}' changed since this edit", hunk_ref),
    }
}
