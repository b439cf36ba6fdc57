//! Token-bounded project summaries.
//!
//! The provider never sees the whole project: tile and collision arrays
//! alone would blow any context budget on a large map. The summary carries
//! ids, dimensions and cross-references, which is what a model needs to
//! emit valid ops. Output is deterministic: every list is sorted, so the
//! same project always produces the same prompt bytes.

use serde::Serialize;

use tilestudio_project::{Cell, Project};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounts {
    pub maps: usize,
    pub tilesets: usize,
    pub entity_defs: usize,
    pub dialogues: usize,
    pub quests: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub instance_id: String,
    pub entity_def_id: String,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub tileset_id: String,
    pub layer_ids: Vec<String>,
    pub entities: Vec<EntitySummary>,
    pub trigger_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub schema_version: u32,
    pub starting_map_id: String,
    pub player_spawn: Cell,
    pub counts: SummaryCounts,
    pub maps: Vec<MapSummary>,
    pub tileset_ids: Vec<String>,
    pub entity_def_ids: Vec<String>,
    pub dialogue_ids: Vec<String>,
    pub quest_ids: Vec<String>,
}

impl ProjectSummary {
    pub fn build(project: &Project) -> Self {
        let maps = project
            .maps
            .iter()
            .map(|(id, map)| {
                let mut entities: Vec<EntitySummary> = map
                    .entities
                    .iter()
                    .map(|e| EntitySummary {
                        instance_id: e.instance_id.clone(),
                        entity_def_id: e.entity_def_id.clone(),
                        x: e.x,
                        y: e.y,
                    })
                    .collect();
                entities.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));

                let mut trigger_ids: Vec<String> =
                    map.triggers.iter().map(|t| t.id.clone()).collect();
                trigger_ids.sort();

                MapSummary {
                    id: id.clone(),
                    width: map.width,
                    height: map.height,
                    tileset_id: map.tileset_id.clone(),
                    // BTreeMap keys are already sorted.
                    layer_ids: map.tile_layers.keys().cloned().collect(),
                    entities,
                    trigger_ids,
                }
            })
            .collect();

        Self {
            schema_version: project.schema_version,
            starting_map_id: project.config.starting_map_id.clone(),
            player_spawn: project.config.player_spawn,
            counts: SummaryCounts {
                maps: project.maps.len(),
                tilesets: project.tilesets.len(),
                entity_defs: project.entity_defs.len(),
                dialogues: project.dialogues.len(),
                quests: project.quests.len(),
            },
            maps,
            tileset_ids: project.tilesets.keys().cloned().collect(),
            entity_def_ids: project.entity_defs.keys().cloned().collect(),
            dialogue_ids: project.dialogues.keys().cloned().collect(),
            quest_ids: project.quests.keys().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
