//! Integration tests for the editor crate
//!
//! Exercises the full gesture → commit → history → conflict-aware undo
//! flow the way a controller layer drives it.

use anyhow::Result;
use tilestudio_editor::{
    check, CellEdit, GuardrailConfig, HistoryStack, ToolType, TransactionManager, UndoResolution,
};
use tilestudio_project::{PatchV1, Project};

#[test]
fn gesture_commit_undo_redo_lifecycle() -> Result<()> {
    let mut project = Project::starter("Lifecycle");
    let mut manager = TransactionManager::new("session-1");
    let mut history = HistoryStack::new();

    // Brush stroke over three cells.
    let tx = manager.begin(ToolType::Brush, "start", "ground");
    manager.add_cells(&[
        CellEdit { x: 0, y: 0, value: 0 },
        CellEdit { x: 1, y: 0, value: 0 },
        CellEdit { x: 2, y: 0, value: 0 },
    ]);

    let outcome = manager.commit(&tx, &project, 7)?.expect("non-empty commit");
    let before = project.to_json()?;
    project = outcome.application.project.clone();
    history.push(outcome.patch, outcome.application.inverse, outcome.meta);

    assert_eq!(project.maps["start"].tile_layers["ground"].data[0], 7);
    assert_eq!(history.undo_summary(), Some("Painted 3 tiles"));

    // Undo restores the original document exactly.
    let undone = history.undo(&project)?.expect("undo available");
    assert_eq!(undone.project.to_json()?, before);

    // Redo brings the stroke back.
    let redone = history.redo(&undone.project)?.expect("redo available");
    assert_eq!(redone.project.to_json()?, project.to_json()?);

    Ok(())
}

#[test]
fn history_truncation_after_undo_and_new_commit() -> Result<()> {
    let mut project = Project::starter("Truncation");
    let mut manager = TransactionManager::new("session-2");
    let mut history = HistoryStack::new();

    // Three commits on distinct cells.
    for (i, x) in [0u32, 1, 2].iter().enumerate() {
        let tx = manager.begin(ToolType::Brush, "start", "ground");
        manager.add_cells(&[CellEdit {
            x: *x,
            y: 0,
            value: 0,
        }]);
        let outcome = manager
            .commit(&tx, &project, (i as i32) + 1)?
            .expect("non-empty commit");
        project = outcome.application.project.clone();
        history.push(outcome.patch, outcome.application.inverse, outcome.meta);
    }

    // Undo twice, then commit something new: the redo tail is gone.
    let u1 = history.undo(&project)?.unwrap();
    let u2 = history.undo(&u1.project)?.unwrap();
    project = u2.project.clone();
    assert!(history.can_redo());

    let tx = manager.begin(ToolType::Brush, "start", "ground");
    manager.add_cells(&[CellEdit { x: 5, y: 5, value: 0 }]);
    let outcome = manager.commit(&tx, &project, 9)?.expect("non-empty commit");
    history.push(outcome.patch, outcome.application.inverse, outcome.meta);

    assert!(!history.can_redo());
    assert_eq!(history.len(), 2);

    Ok(())
}

#[test]
fn empty_commit_leaves_history_untouched() -> Result<()> {
    let project = Project::starter("Empty");
    let mut manager = TransactionManager::new("session-3");
    let mut history = HistoryStack::new();

    let tx = manager.begin(ToolType::Brush, "start", "ground");
    let outcome = manager.commit(&tx, &project, 5)?;

    assert!(outcome.is_none());
    assert!(history.is_empty());
    assert!(!history.can_undo());

    Ok(())
}

#[test]
fn conflicted_undo_resolved_partially() -> Result<()> {
    let mut project = Project::starter("Conflict");
    let mut manager = TransactionManager::new("session-4");
    let mut history = HistoryStack::new();

    // One gesture paints tiles and carves collision in two commits so the
    // top entry touches two regions.
    let tx = manager.begin(ToolType::Brush, "start", "ground");
    manager.add_cells(&[CellEdit { x: 0, y: 0, value: 0 }]);
    let outcome = manager.commit(&tx, &project, 4)?.unwrap();
    project = outcome.application.project.clone();
    history.push(outcome.patch, outcome.application.inverse, outcome.meta);

    let tx = manager.begin(ToolType::Collision, "start", "ground");
    manager.add_cells(&[
        CellEdit { x: 3, y: 3, value: 1 },
        CellEdit { x: 4, y: 3, value: 1 },
    ]);
    let outcome = manager.commit(&tx, &project, 0)?.unwrap();
    project = outcome.application.project.clone();
    history.push(outcome.patch, outcome.application.inverse, outcome.meta);

    // An outside edit changes the collision data after the commit.
    project.maps.get_mut("start").unwrap().collision[0] = 1;

    let report = history.preflight_undo(&project).expect("entry to undo");
    assert!(report.has_conflicts);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].hunk_ref, "map:start:collision");

    // Nothing safe to keep in this entry, so a partial undo is a no-op...
    let none = history.undo_with_resolution(
        &project,
        UndoResolution::Partial {
            safe_refs: report.safe_hunks.clone(),
        },
    )?;
    assert!(none.is_none());

    // ...while force undoes the collision edits, clobbering the outside
    // change on the conflicting region.
    let forced = history
        .undo_with_resolution(&project, UndoResolution::Force)?
        .expect("forced undo");
    assert_eq!(forced.project.maps["start"].collision[3 * 16 + 3], 0);

    Ok(())
}

#[test]
fn wire_patch_passes_guardrails_and_applies() -> Result<()> {
    let project = Project::starter("Wire");

    // A patch as it would arrive from an external producer.
    let json = r#"{
        "patchVersion": 1,
        "patchId": "ext-1",
        "baseSchemaVersion": 1,
        "ops": [
            { "op": "paintRect", "mapId": "start", "layerId": "ground",
              "x": 0, "y": 0, "width": 4, "height": 4, "tile": 3 },
            { "op": "placeEntity", "mapId": "start",
              "entity": { "instanceId": "chest-1", "entityDefId": "chest", "x": 2, "y": 2 } }
        ]
    }"#;

    let patch = PatchV1::from_json(json)?;
    let verdict = check(&patch, &GuardrailConfig::default(), None);
    assert!(verdict.allowed);
    assert!(!verdict.requires_confirmation);

    let application = tilestudio_editor::apply(&project, &patch)?;
    assert_eq!(application.summary.total_tile_cells(), 16);
    assert_eq!(application.summary.entities.created, 1);

    // And the inverse takes it all back.
    let restored = tilestudio_editor::apply(&application.project, &application.inverse)?;
    assert_eq!(restored.project.to_json()?, project.to_json()?);

    Ok(())
}
