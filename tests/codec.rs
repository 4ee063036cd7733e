use std::sync::Arc;
use std::time::{Duration, Instant};

use egui::{pos2, vec2};
use serde_json::{json, Value};

use card_studio::assets::fonts::{FontFetcher, SharedFontLibrary};
use card_studio::codec::{self, DecodeWarning, NoAssets};
use card_studio::remote::memory::MemoryStore;
use card_studio::scene::{
    Color, EditableFieldDescriptor, FieldId, FieldKind, FitMode, FontStyle, FontWeight,
    ImageAttrs, ImageFilterKind, ImageSource, ObjectKind, SceneDocument, SceneObject, ShapeAttrs,
    ShapeKind, TextAlign, TextAttrs,
};
use card_studio::session::EditorSession;
use card_studio::tools;

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

/// Encode with no gallery behind it and decode straight back.
fn round_trip(doc: &SceneDocument) -> (SceneDocument, codec::DecodeReport) {
    let settings = codec::encode_settings(doc, &NoAssets).unwrap();
    let value: Value = serde_json::from_str(&settings).unwrap();
    codec::decode_document(&value)
}

fn wait_for_save(session: &mut EditorSession) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while session.is_saving() {
        assert!(Instant::now() < deadline, "save never settled");
        session.poll_transfers();
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn text_attributes_survive_the_stored_form() {
    let mut doc = SceneDocument::new(640, 480);
    let mut object = SceneObject::new(
        ObjectKind::Text(TextAttrs {
            content: "Mehndi Night".to_owned(),
            font_family: "Great Vibes".to_owned(),
            font_size: 36.0,
            fill: Color::from_rgb(120, 40, 60),
            align: TextAlign::Center,
            weight: FontWeight::Bold,
            style: FontStyle::Italic,
            underline: true,
            line_height: 1.5,
            letter_spacing: 250.0,
        }),
        pos2(100.0, 80.0),
    );
    object.scale = vec2(1.25, 0.75);
    object.rotation_degrees = 15.0;
    object.opacity = 0.75;
    doc.add_object(object);

    let (decoded, report) = round_trip(&doc);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(decoded.width, 640);
    assert_eq!(decoded.height, 480);
    assert_eq!(decoded.objects(), doc.objects());
}

#[test]
fn every_shape_kind_survives_the_stored_form() {
    let styled = |kind| ShapeAttrs {
        kind,
        fill: Some(Color::from_rgb(200, 120, 40)),
        stroke: Color::from_rgb(10, 20, 30),
        stroke_width: 3.0,
    };
    let mut doc = SceneDocument::new(800, 600);
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Rect { width: 120.0, height: 80.0 })),
        pos2(50.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Circle { radius: 45.0 })),
        pos2(150.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Triangle { width: 90.0, height: 70.0 })),
        pos2(250.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(ShapeAttrs {
            kind: ShapeKind::Line { length: 160.0 },
            // Lines have no interior; the stored form never carries a fill
            fill: None,
            stroke: Color::from_rgb(10, 20, 30),
            stroke_width: 3.0,
        }),
        pos2(350.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Polygon)),
        pos2(450.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Star)),
        pos2(550.0, 50.0),
    ));
    doc.add_object(SceneObject::new(
        ObjectKind::Shape(styled(ShapeKind::Heart)),
        pos2(650.0, 50.0),
    ));

    let (decoded, report) = round_trip(&doc);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(decoded.objects(), doc.objects());
}

#[test]
fn image_attributes_survive_the_stored_form() {
    let mut doc = SceneDocument::new(800, 600);
    doc.add_object(SceneObject::new(
        ObjectKind::Image(ImageAttrs {
            source: ImageSource::DataUrl("data:image/png;base64,QUJD".to_owned()),
            natural_size: vec2(320.0, 200.0),
            filter: ImageFilterKind::Blur,
            filter_intensity: 0.75,
            stroke: Color::from_rgb(5, 6, 7),
            stroke_width: 2.0,
        }),
        pos2(400.0, 300.0),
    ));

    let (decoded, report) = round_trip(&doc);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(decoded.objects(), doc.objects());
}

#[test]
fn fields_and_background_survive_the_stored_form() {
    let mut doc = SceneDocument::new(900, 500);
    doc.background_color = Color::from_rgb(250, 240, 230);
    doc.background = Some(card_studio::scene::BackgroundImage {
        source: ImageSource::DataUrl("data:image/jpeg;base64,QUJD".to_owned()),
        natural_size: vec2(400.0, 300.0),
        fit: FitMode::Contain,
        scale_pct: 120.0,
    });
    let mut blessing = SceneObject::new(
        ObjectKind::Text(TextAttrs {
            content: "With love".to_owned(),
            ..TextAttrs::default()
        }),
        pos2(450.0, 250.0),
    );
    blessing.field_id = Some(FieldId::from_raw("blessing"));
    doc.add_object(blessing);
    doc.register_field(EditableFieldDescriptor {
        id: FieldId::from_raw("blessing"),
        kind: FieldKind::Text,
        default_content: "With love".to_owned(),
    });

    let (decoded, report) = round_trip(&doc);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(decoded, doc);
}

#[test]
fn string_encoded_settings_match_a_manual_parse() {
    let mut doc = SceneDocument::new(700, 350);
    doc.add_object(SceneObject::new(
        ObjectKind::Text(TextAttrs::default()),
        pos2(350.0, 175.0),
    ));
    let settings = codec::encode_settings(&doc, &NoAssets).unwrap();

    // Stored double-encoded: the payload column holds one big JSON string
    let (wrapped, wrapped_report) = codec::decode_document(&Value::String(settings.clone()));
    let parsed: Value = serde_json::from_str(&settings).unwrap();
    let (direct, direct_report) = codec::decode_document(&parsed);

    assert_eq!(wrapped, direct);
    assert!(wrapped_report
        .warnings
        .contains(&DecodeWarning::StringEncodedSettings));
    assert!(!wrapped_report.has_structural_loss());
    assert!(direct_report.is_clean());
}

#[test]
fn missing_dimensions_default_to_800_by_600() {
    let settings = json!({
        "canvasJSON": {"version": "5.3.0", "objects": [], "background": "#ffffff"}
    });
    let (doc, report) = codec::decode_document(&settings);
    assert_eq!(doc.width, 800);
    assert_eq!(doc.height, 600);
    assert!(report.warnings.contains(&DecodeWarning::DefaultedDimensions));
}

#[test]
fn unreadable_objects_are_skipped_with_a_warning() {
    let settings = json!({
        "width": 400,
        "height": 300,
        "canvasJSON": {
            "version": "5.3.0",
            "background": "#ffffff",
            "objects": [
                {"type": "rect", "left": 10.0, "top": 10.0, "width": 50.0, "height": 50.0},
                {"type": "martian"},
                17
            ]
        }
    });
    let (doc, report) = codec::decode_document(&settings);
    assert_eq!(doc.objects().len(), 1);
    let skipped: Vec<usize> = report
        .warnings
        .iter()
        .filter_map(|w| match w {
            DecodeWarning::SkippedObject { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![1, 2]);
    assert!(report.has_structural_loss());
}

#[test]
fn string_encoded_snapshot_is_not_structural_loss() {
    let snapshot = json!({
        "version": "5.3.0",
        "background": "#fafafa",
        "objects": [{"type": "circle", "left": 30.0, "top": 30.0, "radius": 12.0}]
    });
    let settings = json!({
        "width": 300,
        "height": 300,
        "canvasJSON": serde_json::to_string(&snapshot).unwrap()
    });
    let (doc, report) = codec::decode_document(&settings);
    assert_eq!(doc.objects().len(), 1);
    assert!(report
        .warnings
        .contains(&DecodeWarning::StringEncodedSnapshot));
    assert!(!report.has_structural_loss());
}

#[test]
fn legacy_color_spellings_decode() {
    let settings = json!({
        "width": 400,
        "height": 300,
        "canvasJSON": {
            "version": "2.4.0",
            "background": "rgb(255, 128, 0)",
            "objects": [
                {"type": "i-text", "text": "Walima", "fill": "rgba(10, 20, 30, 0.5)"}
            ]
        }
    });
    let (doc, _) = codec::decode_document(&settings);
    assert_eq!(doc.background_color, Color::from_rgb(255, 128, 0));
    let attrs = doc.objects()[0].kind.as_text().unwrap();
    assert_eq!(attrs.fill, Color::from_rgba(10, 20, 30, 128));
}

#[test]
fn oversized_documents_never_reach_the_store() {
    let store = Arc::new(MemoryStore::new());
    let mut session = EditorSession::new(store.clone(), test_fonts());
    session.apply(tools::place_text(&SceneDocument::default()));
    let id = session.document().objects()[0].id;
    session.apply(card_studio::Command::update_object(
        id,
        card_studio::scene::ObjectPatch::text(card_studio::scene::TextPatch {
            content: Some("x".repeat(16 * 1024 * 1024)),
            ..Default::default()
        }),
    ));

    session.begin_save();

    assert!(!session.is_saving());
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.update_calls(), 0);
    let messages: Vec<String> = session
        .notices
        .items()
        .iter()
        .map(|n| n.message.clone())
        .collect();
    assert!(
        messages.iter().any(|m| m.contains("too large to save")),
        "no size notice in {messages:?}"
    );
}

#[test]
fn saved_settings_reload_into_the_same_document() {
    let store = Arc::new(MemoryStore::new());
    let mut session = EditorSession::new(store.clone(), test_fonts());
    session.apply(tools::place_text(&SceneDocument::default()));
    session.apply(tools::place_shape(
        session.document(),
        ShapeAttrs::new(ShapeKind::Circle { radius: 30.0 }),
    ));

    session.begin_save();
    wait_for_save(&mut session);
    assert_eq!(store.create_calls(), 1);
    let id = session.template_id().expect("save assigns an id").clone();

    let stored = store.stored_settings(&id).unwrap();
    let value: Value = serde_json::from_str(&stored).unwrap();
    let (decoded, report) = codec::decode_document(&value);
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    assert_eq!(decoded.objects(), session.document().objects());
    assert_eq!(decoded.editable_fields(), session.document().editable_fields());

    // A second save on the same session updates in place
    session.begin_save();
    wait_for_save(&mut session);
    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.update_calls(), 1);
}
