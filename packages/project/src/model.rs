//! Project document types.
//!
//! The Project is the single source of truth for everything an editing
//! session touches. All collections are keyed by stable string identifiers;
//! iteration order is never semantically significant, but `BTreeMap` keeps
//! serialization deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current on-disk schema version for projects.
pub const SCHEMA_VERSION: u32 = 1;

/// Root document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub schema_version: u32,
    pub meta: ProjectMeta,
    pub config: ProjectConfig,
    pub tilesets: BTreeMap<String, Tileset>,
    pub maps: BTreeMap<String, GameMap>,
    pub entity_defs: BTreeMap<String, EntityDef>,
    pub dialogues: BTreeMap<String, Dialogue>,
    pub quests: BTreeMap<String, Quest>,
}

/// Project metadata (display only, never referenced by patches).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub name: String,
    pub author: String,
    pub description: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Global playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub starting_map_id: String,
    pub player_spawn: Cell,
    pub tile_size: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub name: String,
    pub image: String,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub tile_count: u32,
}

/// One tile map. Tile and collision data are flat row-major arrays of
/// length `width * height`; cell `(x, y)` lives at index `y * width + x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMap {
    pub width: u32,
    pub height: u32,
    pub tileset_id: String,
    pub tile_layers: BTreeMap<String, TileLayer>,
    pub collision: Vec<u8>,
    pub entities: Vec<EntityInstance>,
    pub triggers: Vec<TriggerRegion>,
}

impl GameMap {
    /// Create an empty map backed by `tileset_id`, with no layers.
    pub fn new(width: u32, height: u32, tileset_id: impl Into<String>) -> Self {
        Self {
            width,
            height,
            tileset_id: tileset_id.into(),
            tile_layers: BTreeMap::new(),
            collision: vec![0; (width * height) as usize],
            entities: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Flat index for `(x, y)`, or `None` when out of bounds.
    pub fn cell_index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }

    pub fn entity(&self, instance_id: &str) -> Option<&EntityInstance> {
        self.entities.iter().find(|e| e.instance_id == instance_id)
    }

    pub fn entity_mut(&mut self, instance_id: &str) -> Option<&mut EntityInstance> {
        self.entities
            .iter_mut()
            .find(|e| e.instance_id == instance_id)
    }

    pub fn trigger(&self, trigger_id: &str) -> Option<&TriggerRegion> {
        self.triggers.iter().find(|t| t.id == trigger_id)
    }
}

/// One z-ordered tile layer. `data[i] == 0` means empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    pub data: Vec<i32>,
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
}

impl TileLayer {
    pub fn empty(width: u32, height: u32, z_index: i32) -> Self {
        Self {
            data: vec![0; (width * height) as usize],
            z_index,
            opacity: 1.0,
            visible: true,
        }
    }
}

/// A placed entity on a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInstance {
    pub instance_id: String,
    pub entity_def_id: String,
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned tile rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRegion {
    pub id: String,
    pub bounds: Rect,
    pub on_enter: Vec<String>,
    pub on_exit: Vec<String>,
    pub activation: TriggerActivation,
}

/// Whether a trigger fires every time or only once per play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerActivation {
    Always,
    Once,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    pub name: String,
    pub sprite: String,
    pub category: String,
    #[serde(default)]
    pub default_props: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    pub start_node: String,
    pub nodes: Vec<DialogueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    pub id: String,
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueChoice {
    pub text: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub name: String,
    pub description: String,
    pub stages: Vec<QuestStage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStage {
    pub id: String,
    pub objective: String,
    pub completion_event: String,
}

/// A bare `(x, y)` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

/// `(x, y)` plus the tile index to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCell {
    pub x: u32,
    pub y: u32,
    pub tile: i32,
}

/// `(x, y)` plus a 0/1 solidity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCell {
    pub x: u32,
    pub y: u32,
    pub solid: u8,
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Project {
    /// Minimal playable project: one tileset, one 16x16 map with a single
    /// ground layer, default config. Useful for tests and new documents.
    pub fn starter(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = now_ms();

        let mut map = GameMap::new(16, 16, "main");
        map.tile_layers
            .insert("ground".to_string(), TileLayer::empty(16, 16, 0));

        let mut maps = BTreeMap::new();
        maps.insert("start".to_string(), map);

        let mut tilesets = BTreeMap::new();
        tilesets.insert(
            "main".to_string(),
            Tileset {
                name: "Main".to_string(),
                image: "tilesets/main.png".to_string(),
                tile_width: 16,
                tile_height: 16,
                columns: 16,
                tile_count: 256,
            },
        );

        Self {
            schema_version: SCHEMA_VERSION,
            meta: ProjectMeta {
                name,
                author: String::new(),
                description: String::new(),
                created_at_ms: now,
                updated_at_ms: now,
            },
            config: ProjectConfig {
                starting_map_id: "start".to_string(),
                player_spawn: Cell { x: 8, y: 8 },
                tile_size: 16,
                viewport_width: 20,
                viewport_height: 15,
            },
            tilesets,
            maps,
            entity_defs: BTreeMap::new(),
            dialogues: BTreeMap::new(),
            quests: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
