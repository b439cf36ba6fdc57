//! Patch wire format.
//!
//! A patch is an ordered, versioned list of typed operations. Ops apply
//! strictly in list order; an op may reference an entity or trigger created
//! by an earlier op in the same patch, never a later one.
//!
//! The op vocabulary is closed: `PatchOp` is an internally tagged enum keyed
//! by its `op` field, so an unknown tag fails deserialization instead of
//! being silently dropped. Every consumer (apply, invert, guardrail
//! counting, hunk-ref derivation) matches on it exhaustively.

use serde::{Deserialize, Serialize};

use crate::model::{Cell, CollisionCell, EntityInstance, TileCell, TriggerRegion};

/// Patch format version accepted by the engine.
pub const PATCH_VERSION: u32 = 1;

/// A versioned, ordered list of operations describing one document mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchV1 {
    pub patch_version: u32,
    /// Opaque caller-supplied id, unique within a session.
    pub patch_id: String,
    pub base_schema_version: u32,
    pub ops: Vec<PatchOp>,
}

impl PatchV1 {
    pub fn new(patch_id: impl Into<String>, base_schema_version: u32, ops: Vec<PatchOp>) -> Self {
        Self {
            patch_version: PATCH_VERSION,
            patch_id: patch_id.into(),
            base_schema_version,
            ops,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One typed, atomic edit instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum PatchOp {
    /// Write tile indices at explicit cells.
    #[serde(rename = "setTiles", rename_all = "camelCase")]
    SetTiles {
        map_id: String,
        layer_id: String,
        cells: Vec<TileCell>,
    },

    /// Reset explicit cells to empty (tile 0).
    #[serde(rename = "clearTiles", rename_all = "camelCase")]
    ClearTiles {
        map_id: String,
        layer_id: String,
        cells: Vec<Cell>,
    },

    /// Fill a rectangle with one tile index.
    #[serde(rename = "paintRect", rename_all = "camelCase")]
    PaintRect {
        map_id: String,
        layer_id: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        tile: i32,
    },

    /// Write collision values at explicit cells.
    #[serde(rename = "setCollisionCells", rename_all = "camelCase")]
    SetCollisionCells {
        map_id: String,
        cells: Vec<CollisionCell>,
    },

    /// Fill a rectangle of the collision layer.
    #[serde(rename = "setCollisionRect", rename_all = "camelCase")]
    SetCollisionRect {
        map_id: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        solid: u8,
    },

    /// Add an entity instance to a map. Appends unless `index` names an
    /// insertion position; inverse patches use `index` to restore a deleted
    /// entity to its exact place in the list.
    #[serde(rename = "placeEntity", rename_all = "camelCase")]
    PlaceEntity {
        map_id: String,
        entity: EntityInstance,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Move an existing entity instance.
    #[serde(rename = "moveEntity", rename_all = "camelCase")]
    MoveEntity {
        map_id: String,
        instance_id: String,
        x: u32,
        y: u32,
    },

    /// Remove an entity instance. Fails when the instance is absent unless
    /// `idempotent` is set.
    #[serde(rename = "deleteEntity", rename_all = "camelCase")]
    DeleteEntity {
        map_id: String,
        instance_id: String,
        #[serde(default)]
        idempotent: bool,
    },

    /// Add a trigger region to a map. `index` works as in `placeEntity`.
    #[serde(rename = "createTrigger", rename_all = "camelCase")]
    CreateTrigger {
        map_id: String,
        trigger: TriggerRegion,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Remove a trigger region.
    #[serde(rename = "deleteTrigger", rename_all = "camelCase")]
    DeleteTrigger { map_id: String, trigger_id: String },
}

impl PatchOp {
    /// Wire tag for this op, as it appears in the JSON `op` field.
    pub fn tag(&self) -> &'static str {
        match self {
            PatchOp::SetTiles { .. } => "setTiles",
            PatchOp::ClearTiles { .. } => "clearTiles",
            PatchOp::PaintRect { .. } => "paintRect",
            PatchOp::SetCollisionCells { .. } => "setCollisionCells",
            PatchOp::SetCollisionRect { .. } => "setCollisionRect",
            PatchOp::PlaceEntity { .. } => "placeEntity",
            PatchOp::MoveEntity { .. } => "moveEntity",
            PatchOp::DeleteEntity { .. } => "deleteEntity",
            PatchOp::CreateTrigger { .. } => "createTrigger",
            PatchOp::DeleteTrigger { .. } => "deleteTrigger",
        }
    }
}
