//! Change summaries.
//!
//! A `ChangeSummary` is produced alongside every patch application. It feeds
//! two consumers: UI display (via `describe`) and guardrail accounting in
//! callers that want post-hoc numbers rather than patch-declared ones.

use serde::Serialize;
use std::collections::BTreeMap;

/// Created/modified/deleted counts for one resource category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        self.created + self.modified + self.deleted
    }
}

/// What a patch actually changed.
///
/// Cell counts only include cells whose value differs from the pre-image;
/// painting a tile over itself is not a change. Keys of the cell maps are
/// hunk refs (`map:<id>:layer:<id>`, `map:<id>:collision`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub maps: CategoryCounts,
    pub entities: CategoryCounts,
    pub triggers: CategoryCounts,
    pub dialogues: CategoryCounts,
    pub quests: CategoryCounts,
    pub tile_cells_changed: BTreeMap<String, usize>,
    pub collision_cells_changed: BTreeMap<String, usize>,
}

impl ChangeSummary {
    pub fn total_tile_cells(&self) -> usize {
        self.tile_cells_changed.values().sum()
    }

    pub fn total_collision_cells(&self) -> usize {
        self.collision_cells_changed.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.total() == 0
            && self.entities.total() == 0
            && self.triggers.total() == 0
            && self.dialogues.total() == 0
            && self.quests.total() == 0
            && self.total_tile_cells() == 0
            && self.total_collision_cells() == 0
    }

    pub(crate) fn count_tile_cells(&mut self, layer_ref: &str, changed: usize) {
        if changed > 0 {
            *self
                .tile_cells_changed
                .entry(layer_ref.to_string())
                .or_insert(0) += changed;
        }
    }

    pub(crate) fn count_collision_cells(&mut self, map_ref: &str, changed: usize) {
        if changed > 0 {
            *self
                .collision_cells_changed
                .entry(map_ref.to_string())
                .or_insert(0) += changed;
        }
    }

    /// One human-readable line for history entries and UI toasts.
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        let tiles = self.total_tile_cells();
        if tiles > 0 {
            parts.push(format!("painted {} {}", tiles, plural(tiles, "tile")));
        }
        let collision = self.total_collision_cells();
        if collision > 0 {
            parts.push(format!(
                "changed {} collision {}",
                collision,
                plural(collision, "cell")
            ));
        }
        if self.entities.created > 0 {
            parts.push(format!(
                "placed {} {}",
                self.entities.created,
                plural(self.entities.created, "entity")
            ));
        }
        if self.entities.modified > 0 {
            parts.push(format!(
                "moved {} {}",
                self.entities.modified,
                plural(self.entities.modified, "entity")
            ));
        }
        if self.entities.deleted > 0 {
            parts.push(format!(
                "removed {} {}",
                self.entities.deleted,
                plural(self.entities.deleted, "entity")
            ));
        }
        if self.triggers.created > 0 {
            parts.push(format!(
                "added {} {}",
                self.triggers.created,
                plural(self.triggers.created, "trigger")
            ));
        }
        if self.triggers.deleted > 0 {
            parts.push(format!(
                "removed {} {}",
                self.triggers.deleted,
                plural(self.triggers.deleted, "trigger")
            ));
        }

        if parts.is_empty() {
            return "No changes".to_string();
        }

        let mut line = parts.join(", ");
        if let Some(first) = line.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        line
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        noun.to_string()
    } else if noun == "entity" {
        "entities".to_string()
    } else {
        format!("{}s", noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_empty_summary() {
        assert_eq!(ChangeSummary::default().describe(), "No changes");
    }

    #[test]
    fn describe_combines_phrases() {
        let mut summary = ChangeSummary::default();
        summary.count_tile_cells("map:start:layer:ground", 2);
        summary.entities.created = 1;

        assert_eq!(summary.describe(), "Painted 2 tiles, placed 1 entity");
    }

    #[test]
    fn unchanged_cells_are_not_counted() {
        let mut summary = ChangeSummary::default();
        summary.count_tile_cells("map:start:layer:ground", 0);
        assert!(summary.tile_cells_changed.is_empty());
        assert!(summary.is_empty());
    }
}
