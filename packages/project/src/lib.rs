//! # Tilestudio Project Model
//!
//! Core data types for Tilestudio documents.
//!
//! A Project is the root document of a game: tile maps, entity definitions,
//! dialogues, quests and triggers, all keyed by stable string identifiers.
//! This crate holds the data shapes and the patch vocabulary only; applying
//! patches lives in `tilestudio-editor`.
//!
//! ## Design Principles
//!
//! 1. **Deterministic encoding**: keyed collections are `BTreeMap`s so JSON
//!    output and summary iteration are stable without explicit sorting
//! 2. **Closed op vocabulary**: `PatchOp` is a tagged enum; unknown op tags
//!    fail deserialization instead of being ignored
//! 3. **No behavior**: types, constructors and lookups only

pub mod id_generator;
pub mod model;
pub mod patch;
pub mod runtime;
pub mod validate;

pub use id_generator::{get_session_id, IdGenerator};
pub use model::{
    now_ms, Cell, CollisionCell, Dialogue, DialogueChoice, DialogueNode, EntityDef,
    EntityInstance, GameMap, Project, ProjectConfig, ProjectMeta, Quest, QuestStage, Rect,
    TileCell, TileLayer, Tileset, TriggerActivation, TriggerRegion,
};
pub use patch::{PatchOp, PatchV1, PATCH_VERSION};
pub use runtime::TriggerRuntimeState;
pub use validate::{StructuralValidator, ValidationIssue};
