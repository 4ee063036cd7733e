use std::sync::Arc;
use std::time::{Duration, Instant};

use egui::pos2;

use card_studio::assets::fonts::{FontFetcher, SharedFontLibrary};
use card_studio::error::SessionError;
use card_studio::remote::memory::MemoryStore;
use card_studio::remote::{TemplateId, TemplateStore};
use card_studio::scene::{Color, LockFlags, ObjectId, ObjectPatch, TextPatch};
use card_studio::session::EditorSession;
use card_studio::{Command, PublicSession};

struct NoFonts;

impl FontFetcher for NoFonts {
    fn fetch(&self, _family: &str) -> Result<Vec<u8>, String> {
        Err("offline".to_owned())
    }
}

fn test_fonts() -> SharedFontLibrary {
    let _ = env_logger::builder().is_test(true).try_init();
    SharedFontLibrary::new(Arc::new(NoFonts))
}

/// A 640x400 card with one customer field, one fixed caption and one shape.
const CARD_SETTINGS: &str = r##"{
    "width": 640,
    "height": 400,
    "canvasJSON": {
        "version": "5.3.0",
        "background": "#fdf6ec",
        "objects": [
            {"type": "i-text", "text": "Ayesha & Hamza", "fieldId": "couple-names",
             "left": 320.0, "top": 120.0, "originX": "center", "originY": "center",
             "fontSize": 40.0},
            {"type": "i-text", "text": "Est. 2026", "left": 320.0, "top": 200.0},
            {"type": "rect", "left": 320.0, "top": 320.0, "width": 200.0, "height": 60.0,
             "fill": "#d7385e"}
        ]
    },
    "editableFields": [
        {"id": "couple-names", "type": "text", "defaultText": "Ayesha & Hamza"}
    ]
}"##;

fn open_ready(store: &Arc<MemoryStore>, id: TemplateId) -> PublicSession {
    let store: Arc<dyn TemplateStore> = store.clone();
    let mut public = PublicSession::open(store, test_fonts(), id);
    let deadline = Instant::now() + Duration::from_secs(5);
    while public.is_loading() {
        assert!(Instant::now() < deadline, "fetch never settled");
        public.poll();
        std::thread::sleep(Duration::from_millis(2));
    }
    public
}

fn text_id(session: &EditorSession, content: &str) -> ObjectId {
    session
        .document()
        .objects()
        .iter()
        .find(|o| o.kind.as_text().is_some_and(|t| t.content == content))
        .map(|o| o.id)
        .expect("text object present")
}

fn shape_id(session: &EditorSession) -> ObjectId {
    session
        .document()
        .objects()
        .iter()
        .find(|o| o.kind.as_shape().is_some())
        .map(|o| o.id)
        .expect("shape object present")
}

#[test]
fn customer_locks_follow_field_registration() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-1", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();

    let field = text_id(session, "Ayesha & Hamza");
    let caption = text_id(session, "Est. 2026");
    let shape = shape_id(session);
    let doc = session.document();
    assert_eq!(doc.object(field).unwrap().locks, LockFlags::pinned_editable());
    assert_eq!(doc.object(caption).unwrap().locks, LockFlags::frozen());
    assert_eq!(doc.object(shape).unwrap().locks, LockFlags::frozen());
}

#[test]
fn dragging_a_pinned_field_leaves_it_in_place() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-2", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let field = text_id(session, "Ayesha & Hamza");

    session.apply(Command::update_object(
        field,
        ObjectPatch::move_to(pos2(10.0, 10.0)),
    ));

    assert_eq!(
        session.document().object(field).unwrap().position,
        pos2(320.0, 120.0)
    );
    // Nothing changed, so nothing was recorded
    assert!(!session.can_undo());
}

#[test]
fn field_text_edits_apply_and_undo() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-3", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let field = text_id(session, "Ayesha & Hamza");

    session.apply(Command::update_object(
        field,
        ObjectPatch::text(TextPatch {
            content: Some("Zara & Bilal".to_owned()),
            fill: Some(Color::from_rgb(90, 20, 40)),
            ..Default::default()
        }),
    ));

    let attrs = session.document().object(field).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Zara & Bilal");
    assert_eq!(attrs.fill, Color::from_rgb(90, 20, 40));

    session.undo();
    let attrs = session.document().object(field).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Ayesha & Hamza");
}

#[test]
fn frozen_captions_ignore_content_patches() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-8", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let caption = text_id(session, "Est. 2026");

    session.apply(Command::update_object(
        caption,
        ObjectPatch::text(TextPatch {
            content: Some("Est. 1999".to_owned()),
            fill: Some(Color::from_rgb(255, 0, 0)),
            ..Default::default()
        }),
    ));

    let attrs = session.document().object(caption).unwrap().kind.as_text().unwrap();
    assert_eq!(attrs.content, "Est. 2026");
    assert!(!session.can_undo());
}

#[test]
fn frozen_objects_cannot_be_selected() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-4", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let field = text_id(session, "Ayesha & Hamza");
    let caption = text_id(session, "Est. 2026");
    let shape = shape_id(session);

    session.select(caption, false);
    session.select(shape, true);
    assert!(session.selection().is_empty());

    session.select(field, false);
    assert_eq!(session.selection(), &[field]);
}

#[test]
fn structural_edits_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-5", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let shape = shape_id(session);
    let caption = text_id(session, "Est. 2026");
    let before = session.document().clone();

    session.apply(Command::remove_objects(vec![shape]));
    session.apply(Command::remove_objects(vec![caption]));
    session.apply(Command::ApplyCanvasSettings {
        width: 100,
        height: 100,
        background_color: Color::WHITE,
        prev: None,
    });
    session.apply(Command::SetBackground { background: None, prev: None });
    session.apply(Command::reorder(
        shape,
        card_studio::scene::ReorderDirection::Back,
    ));

    assert_eq!(session.document(), &before);
    assert!(!session.can_undo());
}

#[test]
fn field_deletion_is_allowed_and_undoable() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-6", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();
    let field = text_id(session, "Ayesha & Hamza");

    session.select(field, false);
    session.delete_selection();
    assert!(session.document().object(field).is_none());

    session.undo();
    assert!(session.document().object(field).is_some());
}

#[test]
fn customer_export_uses_the_canvas_resolution() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed("card-7", "editable", CARD_SETTINGS);
    let mut public = open_ready(&store, id);
    let session = public.session_mut().unwrap();

    let (name, bytes) = session.export_png().unwrap();
    assert_eq!(name, "customized-wedding-card.png");
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.width(), 640);
    assert_eq!(decoded.height(), 400);
}

#[test]
fn missing_template_is_a_terminal_failure() {
    let store = Arc::new(MemoryStore::new());
    let public = open_ready(&store, TemplateId::from_raw("card-404"));
    assert_eq!(public.failure(), Some(&SessionError::TemplateNotFound));
    assert!(public.session().is_none());
}
