//! End-to-end scenarios through the public API: a workspace, its engines,
//! the AI dispatcher and a store, wired together the way a host would.

use std::sync::{Arc, Mutex};

use studyboard::ai::{AiDispatcher, AiError, AiKind, AiOutput, AiRequest, AiService, SummaryPoint};
use studyboard::camera::{Camera, Point};
use studyboard::config::{EngineConfig, StoreConfig};
use studyboard::doc::{CardContent, CardKind, CardStatus};
use studyboard::engine::{Action, EngineCore};
use studyboard::input::{Button, Key, Modifiers, Tool, WheelDelta};
use studyboard::placement::padded;
use studyboard::render::export_scene;
use studyboard::session::Workspace;
use studyboard::store::{load_workspace, save_workspace, MemoryStore, PersistencePolicy, SaveOutcome};
use tracing::Level;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(Level::DEBUG).try_init();
}

fn config() -> EngineConfig {
    EngineConfig { jitter_seed: Some(11), ..EngineConfig::with_surface(400, 300) }
}

fn engine() -> EngineCore {
    let mut core = EngineCore::new(&config()).unwrap();
    core.set_viewport(800.0, 600.0);
    core
}

fn none() -> Modifiers {
    Modifiers::default()
}

fn pen_stroke(core: &mut EngineCore, from: Point, to: Point) {
    core.set_tool(Tool::Pen);
    core.on_pointer_down(from, Button::Primary, none());
    core.on_pointer_move(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0 + 10.0), none());
    core.on_pointer_move(to, none());
    core.on_pointer_up(to, Button::Primary, none());
}

fn requested(actions: &[Action]) -> Option<AiRequest> {
    actions.iter().find_map(|a| match a {
        Action::AiRequested(req) => Some(req.clone()),
        _ => None,
    })
}

/// Answers from a queue, echoing the input text when it runs dry.
struct ScriptedAi {
    answers: Mutex<Vec<Result<AiOutput, AiError>>>,
}

impl ScriptedAi {
    fn new(answers: Vec<Result<AiOutput, AiError>>) -> Arc<Self> {
        Arc::new(Self { answers: Mutex::new(answers) })
    }
}

#[async_trait::async_trait]
impl AiService for ScriptedAi {
    async fn run(&self, request: &AiRequest) -> Result<AiOutput, AiError> {
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() { Ok(AiOutput::Transcript(request.text.clone())) } else { answers.remove(0) }
    }
}

// =============================================================================
// Ink history
// =============================================================================

#[test]
fn stroke_undo_redo_is_pixel_exact() {
    init_tracing();
    let mut core = engine();
    let start = core.ink().clone();

    pen_stroke(&mut core, Point::new(20.0, 20.0), Point::new(200.0, 120.0));
    assert_eq!(core.history().index(), Some(0));
    assert_eq!(core.history().len(), 1);
    let drawn = core.ink().clone();
    assert_ne!(drawn, start);

    core.on_key_down(&Key("z".into()), Modifiers { ctrl: true, ..none() });
    assert_eq!(core.ink(), &start);
    core.on_key_down(&Key("y".into()), Modifiers { ctrl: true, ..none() });
    assert_eq!(core.ink(), &drawn);
}

#[test]
fn n_strokes_then_n_undos_is_blank() {
    let mut core = engine();
    for i in 0..5 {
        let y = 20.0 + 40.0 * f64::from(i);
        pen_stroke(&mut core, Point::new(10.0, y), Point::new(300.0, y));
    }
    for _ in 0..5 {
        assert!(!core.undo().is_empty());
    }
    assert!(core.ink().is_blank());
    assert!(core.undo().is_empty());
}

#[test]
fn history_cap_drops_oldest() {
    let mut core = EngineCore::new(&EngineConfig { history_limit: 3, ..config() }).unwrap();
    for i in 0..5 {
        let y = 20.0 + 30.0 * f64::from(i);
        pen_stroke(&mut core, Point::new(10.0, y), Point::new(300.0, y));
    }
    assert_eq!(core.history().len(), 3);
    while !core.undo().is_empty() {}
    // The blank baseline was evicted, so the oldest kept stroke remains.
    assert!(!core.ink().is_blank());
}

// =============================================================================
// Camera
// =============================================================================

#[test]
fn zoom_sequences_keep_anchor_fixed() {
    let mut core = engine();
    let anchor = Point::new(321.0, 123.0);
    let scene_under = core.camera.screen_to_world(anchor);
    for dy in [-120.0, -40.0, 300.0, -900.0, 45.0, 2000.0, -10.0] {
        core.on_wheel(anchor, WheelDelta { dx: 0.0, dy }, Modifiers { meta: true, ..none() });
        let back = core.camera.world_to_screen(scene_under);
        assert!(back.distance(anchor) < 1e-6, "anchor drifted to {back:?}");
    }
}

#[test]
fn screen_scene_round_trip() {
    let camera = Camera { pan_x: -123.5, pan_y: 77.25, zoom: 2.75 };
    for p in [Point::new(0.0, 0.0), Point::new(799.0, 1.0), Point::new(-50.0, 640.5)] {
        let back = camera.world_to_screen(camera.screen_to_world(p));
        assert!(back.distance(p) < 1e-9);
    }
}

// =============================================================================
// Placement & lasso
// =============================================================================

#[test]
fn third_card_avoids_two_stacked_cards() {
    let mut core = engine();
    core.create_card(CardKind::TextNote, Some(Point::new(100.0, 100.0)), None, CardContent::text("a"));
    core.create_card(CardKind::TextNote, Some(Point::new(100.0, 100.0)), None, CardContent::text("b"));
    let (id, _) = core.create_card(CardKind::TextNote, None, None, CardContent::text("c"));

    let third = core.card(&id).unwrap().clone();
    assert_eq!((third.x, third.y), (450.0, 100.0));
    for other in core.doc.iter().filter(|c| c.id != id) {
        assert!(!padded(&third.bounds()).overlaps(&padded(&other.bounds())));
    }

    let mut again = engine();
    again.create_card(CardKind::TextNote, Some(Point::new(100.0, 100.0)), None, CardContent::text("a"));
    again.create_card(CardKind::TextNote, Some(Point::new(100.0, 100.0)), None, CardContent::text("b"));
    let (id2, _) = again.create_card(CardKind::TextNote, None, None, CardContent::text("c"));
    let repeat = again.card(&id2).unwrap();
    assert_eq!((repeat.x, repeat.y), (third.x, third.y));
}

#[test]
fn lasso_selects_by_center_only() {
    let mut core = engine();
    let mut ids = Vec::new();
    // Centers at (50,50) and (90,90) inside, (125,50) outside though the box overlaps.
    for (x, y) in [(25.0, 25.0), (65.0, 65.0), (100.0, 25.0)] {
        let (id, _) = core.create_card(CardKind::AiResult, Some(Point::new(x, y)), Some((50.0, 50.0)), CardContent::text("x"));
        ids.push(id);
    }
    core.set_tool(Tool::Lasso);
    core.on_pointer_down(Point::new(0.0, 0.0), Button::Primary, none());
    for p in [Point::new(100.0, 0.0), Point::new(100.0, 100.0), Point::new(0.0, 100.0)] {
        core.on_pointer_move(p, none());
    }
    let actions = core.on_pointer_up(Point::new(0.0, 100.0), Button::Primary, none());

    assert!(actions.iter().any(|a| matches!(a, Action::LassoMenuRequested { .. })));
    assert!(core.ui.selected_ids.contains(&ids[0]));
    assert!(core.ui.selected_ids.contains(&ids[1]));
    assert!(!core.ui.selected_ids.contains(&ids[2]));
}

// =============================================================================
// AI round trips
// =============================================================================

#[tokio::test]
async fn deleted_card_ignores_late_result() {
    init_tracing();
    let mut ws = Workspace::new(config()).unwrap();
    let session_id = ws.active_id();
    let mut dispatcher = AiDispatcher::new(
        ScriptedAi::new(vec![Ok(AiOutput::Keywords(vec!["late".into()]))]),
        tokio::runtime::Handle::current(),
        5,
    );

    let core = &mut ws.active_mut().core;
    let (source, _) = core.create_card(CardKind::TextNote, Some(Point::new(0.0, 0.0)), None, CardContent::text("ions"));
    core.ui.selected_ids.insert(source);
    let req = requested(&core.request_ai(AiKind::Keywords).unwrap()).unwrap();
    let placeholder = core.doc.find_pending(req.token).unwrap();
    core.delete_card(&placeholder);
    dispatcher.dispatch(session_id, req);

    let done = dispatcher.next().await.unwrap();
    assert!(ws.deliver(done).is_empty());
    assert!(ws.active().core.card(&placeholder).is_none());
    assert_eq!(ws.active().core.doc.len(), 1);
}

#[tokio::test]
async fn summary_round_trip_spawns_cards() {
    let mut ws = Workspace::new(config()).unwrap();
    ws.active_mut().core.set_viewport(800.0, 600.0);
    let session_id = ws.active_id();
    let points = vec![
        SummaryPoint { text: "Light reactions".into(), source_quote: Some("in the thylakoid".into()) },
        SummaryPoint { text: "Calvin cycle".into(), source_quote: Some("in the stroma".into()) },
    ];
    let mut dispatcher =
        AiDispatcher::new(ScriptedAi::new(vec![Ok(AiOutput::Summary(points))]), tokio::runtime::Handle::current(), 5);

    let core = &mut ws.active_mut().core;
    let (file, _) = core.add_file_card("lecture.pdf", "Photosynthesis happens in two stages...");
    core.ui.selected_ids.insert(file);
    let req = requested(&core.request_ai(AiKind::Summarize).unwrap()).unwrap();
    dispatcher.dispatch(session_id, req);

    let done = dispatcher.next().await.unwrap();
    ws.deliver(done);
    let core = &ws.active().core;
    let ai_cards: Vec<_> = core.doc.iter().filter(|c| c.kind == CardKind::AiResult).collect();
    assert_eq!(ai_cards.len(), 2);
    assert!(ai_cards.iter().all(|c| c.status == CardStatus::Ready && c.source_excerpt.is_some()));
    assert!(!core.has_pending_requests());
}

#[tokio::test]
async fn timeout_marks_card_failed() {
    struct Never;

    #[async_trait::async_trait]
    impl AiService for Never {
        async fn run(&self, _request: &AiRequest) -> Result<AiOutput, AiError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Err(AiError::Request("unreachable".into()))
        }
    }

    let mut ws = Workspace::new(config()).unwrap();
    let session_id = ws.active_id();
    let mut dispatcher = AiDispatcher::new(Arc::new(Never), tokio::runtime::Handle::current(), 0);
    let core = &mut ws.active_mut().core;
    let (source, _) = core.create_card(CardKind::Sticky, Some(Point::new(0.0, 0.0)), None, CardContent::text("um so"));
    core.ui.selected_ids.insert(source);
    let req = requested(&core.request_ai(AiKind::CleanTranscript).unwrap()).unwrap();
    let token = req.token;
    dispatcher.dispatch(session_id, req);

    let actions = ws.deliver(dispatcher.next().await.unwrap());
    assert!(actions.iter().any(|a| matches!(a, Action::Notify(_))));
    let core = &ws.active().core;
    let card = core.doc.iter().find(|c| c.kind == CardKind::AiResult).unwrap();
    assert_eq!(card.status, CardStatus::Failed);
    assert!(core.doc.find_pending(token).is_none());
}

#[tokio::test]
async fn handwriting_becomes_text_and_is_undoable() {
    let mut ws = Workspace::new(config()).unwrap();
    let session_id = ws.active_id();
    let mut dispatcher = AiDispatcher::new(
        ScriptedAi::new(vec![Ok(AiOutput::Handwriting("E = mc²".into()))]),
        tokio::runtime::Handle::current(),
        5,
    );

    let core = &mut ws.active_mut().core;
    pen_stroke(core, Point::new(40.0, 40.0), Point::new(140.0, 60.0));
    core.set_tool(Tool::Lasso);
    core.on_pointer_down(Point::new(20.0, 20.0), Button::Primary, none());
    for p in [Point::new(180.0, 20.0), Point::new(180.0, 100.0), Point::new(20.0, 100.0)] {
        core.on_pointer_move(p, none());
    }
    core.on_pointer_up(Point::new(20.0, 100.0), Button::Primary, none());
    let req = requested(&core.request_ai(AiKind::Handwriting).unwrap()).unwrap();
    assert!(req.image.as_ref().is_some_and(|png| !png.is_empty()));
    dispatcher.dispatch(session_id, req);

    ws.deliver(dispatcher.next().await.unwrap());
    let core = &mut ws.active_mut().core;
    let text = core.doc.iter().find(|c| c.kind == CardKind::FreeText).unwrap();
    assert_eq!(text.content, CardContent::text("E = mc²"));
    assert_eq!((text.x, text.y, text.width, text.height), (20.0, 20.0, Some(160.0), Some(80.0)));
    assert!(core.ink().is_blank());
    core.undo();
    assert!(!core.ink().is_blank());
}

// =============================================================================
// Persistence & export
// =============================================================================

#[test]
fn quota_pressure_degrades_but_keeps_drawing() {
    init_tracing();
    let mut ws = Workspace::new(config()).unwrap();
    for i in 0..6 {
        let y = 20.0 + 40.0 * f64::from(i);
        pen_stroke(&mut ws.active_mut().core, Point::new(10.0, y), Point::new(390.0, y + 5.0));
    }
    let lean = serde_json::to_vec(&ws.snapshot(PersistencePolicy { exclude_ink_history: true }).unwrap()).unwrap();
    let store = MemoryStore::new(StoreConfig { max_bytes: lean.len() + 64 });

    let outcome = save_workspace(&store, &ws, PersistencePolicy::default()).unwrap();
    assert_eq!(outcome, SaveOutcome::Degraded);

    let loaded = load_workspace(&store, config()).unwrap();
    let core = &loaded.active().core;
    assert_eq!(core.history().len(), 1);
    assert!(!core.ink().is_blank());
}

#[test]
fn export_includes_ink_and_cards() {
    let mut core = engine();
    pen_stroke(&mut core, Point::new(10.0, 10.0), Point::new(60.0, 10.0));
    core.create_card(CardKind::AiResult, Some(Point::new(500.0, 400.0)), Some((100.0, 50.0)), CardContent::text("Quiz"));
    core.on_key_down(&Key("Escape".into()), none());

    let export = export_scene(&core).unwrap();
    assert!(export.origin.x < 10.0 && export.origin.y < 10.0);
    assert!(f64::from(export.width) + export.origin.x >= 600.0);
    assert!(f64::from(export.height) + export.origin.y >= 450.0);
    assert_eq!(export.text_blocks.len(), 1);
}
