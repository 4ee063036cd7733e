use card_studio::command::{Command, CommandHistory};
use card_studio::scene::{
    BackgroundImage, Color, FitMode, ImageSource, LockFlags, ObjectId, ObjectKind, ObjectPatch,
    ReorderDirection, SceneDocument, SceneObject, ShapeAttrs, ShapeKind, TextAttrs, TextPatch,
};
use card_studio::tools;
use egui::{pos2, vec2};

fn text_at(content: &str, x: f32, y: f32) -> SceneObject {
    SceneObject::new(
        ObjectKind::Text(TextAttrs {
            content: content.to_owned(),
            ..TextAttrs::default()
        }),
        pos2(x, y),
    )
}

fn rect_at(x: f32, y: f32) -> SceneObject {
    SceneObject::new(
        ObjectKind::Shape(ShapeAttrs::new(ShapeKind::Rect {
            width: 50.0,
            height: 50.0,
        })),
        pos2(x, y),
    )
}

fn run(history: &mut CommandHistory, doc: &mut SceneDocument, command: Command) {
    history.execute(command, doc).unwrap();
}

#[test]
fn every_command_kind_undoes_and_redoes() {
    let mut doc = SceneDocument::new(800, 600);
    let mut history = CommandHistory::new();
    let mut snapshots = vec![doc.clone()];

    let text = text_at("Nikah", 400.0, 300.0);
    let text_id = text.id;
    run(&mut history, &mut doc, Command::add_object(text));
    snapshots.push(doc.clone());

    let rect = rect_at(100.0, 100.0);
    let rect_id = rect.id;
    run(&mut history, &mut doc, Command::add_object(rect));
    snapshots.push(doc.clone());

    run(
        &mut history,
        &mut doc,
        Command::update_object(text_id, ObjectPatch::move_to(pos2(10.0, 20.0))),
    );
    snapshots.push(doc.clone());

    run(
        &mut history,
        &mut doc,
        Command::reorder(text_id, ReorderDirection::Front),
    );
    snapshots.push(doc.clone());

    run(
        &mut history,
        &mut doc,
        Command::SetBackground {
            background: Some(BackgroundImage {
                source: ImageSource::DataUrl("data:image/png;base64,QUJD".to_owned()),
                natural_size: vec2(200.0, 100.0),
                fit: FitMode::Cover,
                scale_pct: 100.0,
            }),
            prev: None,
        },
    );
    snapshots.push(doc.clone());

    run(
        &mut history,
        &mut doc,
        Command::ApplyCanvasSettings {
            width: 1024,
            height: 768,
            background_color: Color::from_rgb(240, 240, 255),
            prev: None,
        },
    );
    snapshots.push(doc.clone());

    run(&mut history, &mut doc, Command::remove_objects(vec![rect_id]));
    snapshots.push(doc.clone());

    // Walk all the way back, checking each intermediate state exactly
    for expected in snapshots.iter().rev().skip(1) {
        assert!(history.undo(&mut doc));
        assert_eq!(&doc, expected);
    }
    assert!(!history.can_undo());
    assert!(!history.undo(&mut doc));

    // And all the way forward again
    for expected in snapshots.iter().skip(1) {
        assert!(history.redo(&mut doc));
        assert_eq!(&doc, expected);
    }
    assert!(!history.can_redo());
    assert!(!history.redo(&mut doc));
}

#[test]
fn atomic_multi_delete_restores_z_order_on_one_undo() {
    let mut doc = SceneDocument::default();
    let a = doc.add_object(rect_at(0.0, 0.0));
    let b = doc.add_object(rect_at(1.0, 1.0));
    let c = doc.add_object(rect_at(2.0, 2.0));
    let d = doc.add_object(rect_at(3.0, 3.0));
    let mut history = CommandHistory::new();

    // Deletion order scrambled on purpose; restore must not care
    run(&mut history, &mut doc, Command::remove_objects(vec![d, b]));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![a, c]);

    assert!(history.undo(&mut doc));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![a, b, c, d]);
    assert!(!history.can_undo());

    assert!(history.redo(&mut doc));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![a, c]);
}

#[test]
fn bottom_up_delete_order_restores_the_same_z_order() {
    let mut doc = SceneDocument::default();
    let a = doc.add_object(rect_at(0.0, 0.0));
    let b = doc.add_object(rect_at(1.0, 1.0));
    let c = doc.add_object(rect_at(2.0, 2.0));
    let mut history = CommandHistory::new();

    // Removing bottom-up shifts every later index while the batch runs
    run(&mut history, &mut doc, Command::remove_objects(vec![a, b]));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![c]);

    assert!(history.undo(&mut doc));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![a, b, c]);

    assert!(history.redo(&mut doc));
    let ids: Vec<ObjectId> = doc.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![c]);
}

#[test]
fn no_ops_stay_out_of_history() {
    let mut doc = SceneDocument::default();
    let top = doc.add_object(rect_at(10.0, 10.0));
    let mut pinned = text_at("pinned", 50.0, 50.0);
    pinned.locks = LockFlags::pinned_editable();
    let pinned_id = doc.add_object(pinned);
    let mut history = CommandHistory::new();

    run(
        &mut history,
        &mut doc,
        Command::remove_objects(vec![ObjectId::new()]),
    );
    assert!(!history.can_undo());

    run(
        &mut history,
        &mut doc,
        Command::reorder(pinned_id, ReorderDirection::Front),
    );
    assert!(!history.can_undo());

    run(
        &mut history,
        &mut doc,
        Command::update_object(ObjectId::new(), ObjectPatch::move_to(pos2(1.0, 1.0))),
    );
    assert!(!history.can_undo());

    // The movement lock eats the whole patch, leaving nothing to record
    run(
        &mut history,
        &mut doc,
        Command::update_object(pinned_id, ObjectPatch::move_to(pos2(200.0, 200.0))),
    );
    assert!(!history.can_undo());
    assert_eq!(doc.object(pinned_id).unwrap().position, pos2(50.0, 50.0));
    assert_eq!(doc.object(top).unwrap().position, pos2(10.0, 10.0));
}

#[test]
fn new_commands_clear_the_redo_stack() {
    let mut doc = SceneDocument::default();
    let mut history = CommandHistory::new();

    let first = text_at("first", 10.0, 10.0);
    run(&mut history, &mut doc, Command::add_object(first));
    assert!(history.undo(&mut doc));
    assert!(history.can_redo());

    let second = text_at("second", 20.0, 20.0);
    run(&mut history, &mut doc, Command::add_object(second));
    assert!(!history.can_redo());
    assert!(!history.redo(&mut doc));

    assert_eq!(doc.objects().len(), 1);
    let attrs = doc.objects()[0].kind.as_text().unwrap();
    assert_eq!(attrs.content, "second");
}

#[test]
fn gesture_snapshot_undoes_as_one_step() {
    let mut doc = SceneDocument::default();
    let id = doc.add_object(rect_at(100.0, 100.0));
    let before = doc.object(id).unwrap().clone();

    // Live drag frames write straight to the document
    doc.update_object(id, &ObjectPatch::move_to(pos2(120.0, 110.0)));
    doc.update_object(id, &ObjectPatch::move_to(pos2(180.0, 160.0)));

    // Commit with the snapshot taken when the gesture started
    let mut history = CommandHistory::new();
    history
        .execute(
            Command::UpdateObject {
                id,
                patch: ObjectPatch::move_to(pos2(180.0, 160.0)),
                prev: Some(Box::new(before.clone())),
            },
            &mut doc,
        )
        .unwrap();
    assert_eq!(doc.object(id).unwrap().position, pos2(180.0, 160.0));

    assert!(history.undo(&mut doc));
    assert_eq!(doc.object(id).unwrap(), &before);
    assert!(!history.can_undo());

    assert!(history.redo(&mut doc));
    assert_eq!(doc.object(id).unwrap().position, pos2(180.0, 160.0));
}

#[test]
fn text_patch_round_trips_under_undo() {
    let mut doc = SceneDocument::default();
    let id = doc.add_object(text_at("Save the date", 300.0, 200.0));
    let mut history = CommandHistory::new();

    run(
        &mut history,
        &mut doc,
        Command::update_object(
            id,
            ObjectPatch::text(TextPatch {
                content: Some("Ayesha & Hamza".to_owned()),
                font_size: Some(48.0),
                ..Default::default()
            }),
        ),
    );
    let attrs = doc.object(id).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Ayesha & Hamza");
    assert_eq!(attrs.font_size, 48.0);

    assert!(history.undo(&mut doc));
    let attrs = doc.object(id).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Save the date");
    assert_eq!(attrs.font_size, 24.0);

    assert!(history.redo(&mut doc));
    let attrs = doc.object(id).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Ayesha & Hamza");
}

#[test]
fn field_registration_rides_the_add_command() {
    let mut doc = SceneDocument::default();
    let mut history = CommandHistory::new();

    let place = tools::place_text(&doc);
    run(&mut history, &mut doc, place);
    assert_eq!(doc.objects().len(), 1);
    assert_eq!(doc.editable_fields().len(), 1);
    assert!(doc.objects()[0].is_editable_field());

    // Undo takes the descriptor with the object
    assert!(history.undo(&mut doc));
    assert!(doc.objects().is_empty());
    assert!(doc.editable_fields().is_empty());

    assert!(history.redo(&mut doc));
    assert_eq!(doc.editable_fields().len(), 1);
}
