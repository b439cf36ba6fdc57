//! # Guardrails
//!
//! Policy thresholds applied to a patch before it reaches history.
//!
//! Guardrails are pure: they read the patch (not the project) and a config,
//! and return a verdict. Destructive ops are rejected by default; a prompt
//! hint that lexically asks for removal downgrades the rejection to a
//! warning, since the user said what they meant.

use serde::{Deserialize, Serialize};
use tilestudio_project::{PatchOp, PatchV1};

/// Keywords that signal the prompt intends deletion.
const DESTRUCTIVE_KEYWORDS: [&str; 7] = [
    "delete",
    "remove",
    "clear",
    "wipe",
    "destroy",
    "erase",
    "get rid of",
];

/// Thresholds. All fields are overridable; the defaults match the shipped
/// editor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardrailConfig {
    pub max_ops: usize,
    pub max_tile_edits: usize,
    pub max_collision_edits: usize,
    pub allow_destructive: bool,
    pub require_confirmation_threshold: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_ops: 40,
            max_tile_edits: 20_000,
            max_collision_edits: 20_000,
            allow_destructive: false,
            require_confirmation_threshold: 20,
        }
    }
}

/// One threshold that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceededThreshold {
    pub threshold: String,
    pub value: usize,
    pub limit: usize,
}

/// The checker's decision. `exceeded` may name several thresholds at once;
/// callers must not assume only one fired.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    pub requires_confirmation: bool,
    pub exceeded: Vec<ExceededThreshold>,
}

/// Check `patch` against `config`. `prompt_hint` is the user prompt that
/// produced the patch, when one exists (AI proposals).
pub fn check(
    patch: &PatchV1,
    config: &GuardrailConfig,
    prompt_hint: Option<&str>,
) -> GuardrailVerdict {
    let op_count = patch.ops.len();
    let tile_edits: usize = patch.ops.iter().map(tile_edit_count).sum();
    let collision_edits: usize = patch.ops.iter().map(collision_edit_count).sum();
    let destructive: usize = patch.ops.iter().filter(|op| is_destructive(op)).count();

    let mut exceeded = Vec::new();
    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    if op_count > config.max_ops {
        exceeded.push(ExceededThreshold {
            threshold: "maxOps".to_string(),
            value: op_count,
            limit: config.max_ops,
        });
        reasons.push(format!(
            "patch has {} ops (limit {})",
            op_count, config.max_ops
        ));
    }

    if tile_edits > config.max_tile_edits {
        exceeded.push(ExceededThreshold {
            threshold: "maxTileEdits".to_string(),
            value: tile_edits,
            limit: config.max_tile_edits,
        });
        reasons.push(format!(
            "patch edits {} tiles (limit {})",
            tile_edits, config.max_tile_edits
        ));
    }

    if collision_edits > config.max_collision_edits {
        exceeded.push(ExceededThreshold {
            threshold: "maxCollisionEdits".to_string(),
            value: collision_edits,
            limit: config.max_collision_edits,
        });
        reasons.push(format!(
            "patch edits {} collision cells (limit {})",
            collision_edits, config.max_collision_edits
        ));
    }

    if destructive > 0 && !config.allow_destructive {
        if prompt_signals_destructive(prompt_hint) {
            warnings.push(format!(
                "patch deletes {} object(s); allowed because the prompt asks for removal",
                destructive
            ));
        } else {
            exceeded.push(ExceededThreshold {
                threshold: "allowDestructive".to_string(),
                value: destructive,
                limit: 0,
            });
            reasons.push(format!(
                "patch deletes {} object(s) but destructive ops are disabled",
                destructive
            ));
        }
    }

    let allowed = exceeded.is_empty();
    let requires_confirmation = allowed && op_count >= config.require_confirmation_threshold;

    GuardrailVerdict {
        allowed,
        reason: if allowed {
            None
        } else {
            Some(reasons.join("; "))
        },
        warnings,
        requires_confirmation,
        exceeded,
    }
}

/// Tile cells an op writes, for threshold accounting. Counts the payload,
/// not the effect; a rect painted over identical tiles still counts.
fn tile_edit_count(op: &PatchOp) -> usize {
    match op {
        PatchOp::SetTiles { cells, .. } => cells.len(),
        PatchOp::ClearTiles { cells, .. } => cells.len(),
        PatchOp::PaintRect { width, height, .. } => (*width as usize) * (*height as usize),
        PatchOp::SetCollisionCells { .. }
        | PatchOp::SetCollisionRect { .. }
        | PatchOp::PlaceEntity { .. }
        | PatchOp::MoveEntity { .. }
        | PatchOp::DeleteEntity { .. }
        | PatchOp::CreateTrigger { .. }
        | PatchOp::DeleteTrigger { .. } => 0,
    }
}

fn collision_edit_count(op: &PatchOp) -> usize {
    match op {
        PatchOp::SetCollisionCells { cells, .. } => cells.len(),
        PatchOp::SetCollisionRect { width, height, .. } => (*width as usize) * (*height as usize),
        PatchOp::SetTiles { .. }
        | PatchOp::ClearTiles { .. }
        | PatchOp::PaintRect { .. }
        | PatchOp::PlaceEntity { .. }
        | PatchOp::MoveEntity { .. }
        | PatchOp::DeleteEntity { .. }
        | PatchOp::CreateTrigger { .. }
        | PatchOp::DeleteTrigger { .. } => 0,
    }
}

fn is_destructive(op: &PatchOp) -> bool {
    matches!(
        op,
        PatchOp::DeleteEntity { .. } | PatchOp::DeleteTrigger { .. }
    )
}

fn prompt_signals_destructive(prompt_hint: Option<&str>) -> bool {
    let Some(hint) = prompt_hint else {
        return false;
    };
    let lowered = hint.to_lowercase();
    DESTRUCTIVE_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilestudio_project::TileCell;

    fn tile_op() -> PatchOp {
        PatchOp::SetTiles {
            map_id: "start".to_string(),
            layer_id: "ground".to_string(),
            cells: vec![TileCell { x: 0, y: 0, tile: 1 }],
        }
    }

    fn delete_op() -> PatchOp {
        PatchOp::DeleteEntity {
            map_id: "start".to_string(),
            instance_id: "guard-1".to_string(),
            idempotent: false,
        }
    }

    fn patch_with_ops(ops: Vec<PatchOp>) -> PatchV1 {
        PatchV1::new("p-1", 1, ops)
    }

    #[test]
    fn exactly_max_ops_is_allowed() {
        let config = GuardrailConfig {
            max_ops: 5,
            require_confirmation_threshold: 100,
            ..Default::default()
        };

        let at_limit = patch_with_ops(vec![tile_op(); 5]);
        assert!(check(&at_limit, &config, None).allowed);

        let over = patch_with_ops(vec![tile_op(); 6]);
        let verdict = check(&over, &config, None);
        assert!(!verdict.allowed);
        assert_eq!(verdict.exceeded.len(), 1);
        assert_eq!(verdict.exceeded[0].threshold, "maxOps");
        assert_eq!(verdict.exceeded[0].value, 6);
        assert_eq!(verdict.exceeded[0].limit, 5);
    }

    #[test]
    fn destructive_without_keyword_is_rejected() {
        let patch = patch_with_ops(vec![delete_op()]);
        let verdict = check(
            &patch,
            &GuardrailConfig::default(),
            Some("make the castle prettier"),
        );

        assert!(!verdict.allowed);
        assert_eq!(
            verdict.exceeded,
            vec![ExceededThreshold {
                threshold: "allowDestructive".to_string(),
                value: 1,
                limit: 0,
            }]
        );
    }

    #[test]
    fn destructive_with_keyword_downgrades_to_warning() {
        let patch = patch_with_ops(vec![delete_op()]);
        let verdict = check(
            &patch,
            &GuardrailConfig::default(),
            Some("Remove the guard by the gate"),
        );

        assert!(verdict.allowed);
        assert_eq!(verdict.warnings.len(), 1);
        assert!(verdict.exceeded.is_empty());
    }

    #[test]
    fn allow_destructive_config_skips_the_check() {
        let patch = patch_with_ops(vec![delete_op()]);
        let config = GuardrailConfig {
            allow_destructive: true,
            ..Default::default()
        };

        let verdict = check(&patch, &config, None);
        assert!(verdict.allowed);
        assert!(verdict.warnings.is_empty());
    }

    #[test]
    fn paint_rect_counts_area() {
        let patch = patch_with_ops(vec![PatchOp::PaintRect {
            map_id: "start".to_string(),
            layer_id: "ground".to_string(),
            x: 0,
            y: 0,
            width: 200,
            height: 150,
            tile: 1,
        }]);
        let config = GuardrailConfig::default();

        let verdict = check(&patch, &config, None);
        assert!(!verdict.allowed);
        assert_eq!(verdict.exceeded[0].threshold, "maxTileEdits");
        assert_eq!(verdict.exceeded[0].value, 30_000);
    }

    #[test]
    fn multiple_thresholds_accumulate() {
        let mut ops = vec![tile_op(); 50];
        ops.push(delete_op());
        let patch = patch_with_ops(ops);
        let config = GuardrailConfig {
            max_ops: 40,
            ..Default::default()
        };

        let verdict = check(&patch, &config, None);
        assert!(!verdict.allowed);
        let thresholds: Vec<&str> = verdict
            .exceeded
            .iter()
            .map(|e| e.threshold.as_str())
            .collect();
        assert_eq!(thresholds, vec!["maxOps", "allowDestructive"]);
        let reason = verdict.reason.unwrap();
        assert!(reason.contains("ops"));
        assert!(reason.contains("destructive"));
    }

    #[test]
    fn confirmation_threshold_sets_flag_when_allowed() {
        let patch = patch_with_ops(vec![tile_op(); 20]);
        let verdict = check(&patch, &GuardrailConfig::default(), None);

        assert!(verdict.allowed);
        assert!(verdict.requires_confirmation);

        let small = patch_with_ops(vec![tile_op(); 3]);
        assert!(!check(&small, &GuardrailConfig::default(), None).requires_confirmation);
    }
}
