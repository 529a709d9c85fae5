use super::*;

// =============================================================
// Tool
// =============================================================

#[test]
fn tool_default_is_select() {
    assert_eq!(Tool::default(), Tool::Select);
}

#[test]
fn tool_ink_mapping() {
    assert_eq!(Tool::Pen.ink_tool(), Some(InkTool::Pen));
    assert_eq!(Tool::Highlighter.ink_tool(), Some(InkTool::Highlighter));
    assert_eq!(Tool::Eraser.ink_tool(), Some(InkTool::Eraser));
    assert_eq!(Tool::Rectangle.ink_tool(), None);
}

#[test]
fn tool_shape_mapping() {
    assert_eq!(Tool::Rectangle.shape(), Some(ShapeKind::Rect));
    assert_eq!(Tool::Ellipse.shape(), Some(ShapeKind::Ellipse));
    assert_eq!(Tool::Line.shape(), Some(ShapeKind::Line));
    assert_eq!(Tool::Arrow.shape(), Some(ShapeKind::Arrow));
    assert_eq!(Tool::Pen.shape(), None);
}

#[test]
fn only_text_and_sticky_revert_after_placement() {
    for tool in Tool::ALL {
        let expected = match tool {
            Tool::Text | Tool::StickyNote => Tool::Select,
            other => other,
        };
        assert_eq!(tool.after_placement(), expected, "{tool:?}");
    }
}

#[test]
fn shortcuts_cover_every_tool_once() {
    let keys = ["v", "l", "t", "n", "p", "h", "e", "r", "o", "i", "a"];
    let tools: Vec<Tool> = keys.iter().filter_map(|k| Tool::from_shortcut(k)).collect();
    assert_eq!(tools, Tool::ALL.to_vec());
    assert_eq!(Tool::from_shortcut("P"), Some(Tool::Pen));
    assert_eq!(Tool::from_shortcut("Escape"), None);
}

// =============================================================
// Modifiers
// =============================================================

#[test]
fn modifiers_additive() {
    assert!(!Modifiers::default().is_additive());
    assert!(Modifiers { shift: true, ..Default::default() }.is_additive());
    assert!(Modifiers { ctrl: true, ..Default::default() }.is_additive());
    assert!(Modifiers { meta: true, ..Default::default() }.is_additive());
    assert!(!Modifiers { alt: true, ..Default::default() }.is_additive());
}

#[test]
fn modifiers_command() {
    assert!(Modifiers { meta: true, ..Default::default() }.command());
    assert!(!Modifiers { shift: true, ..Default::default() }.command());
}

// =============================================================
// UiState / InputState
// =============================================================

#[test]
fn ui_state_clear_selection() {
    let mut ui = UiState::default();
    ui.selected_ids.insert(uuid::Uuid::new_v4());
    ui.lasso_bounds = Some(Bounds::from_xywh(0.0, 0.0, 1.0, 1.0));
    ui.clear_selection();
    assert!(ui.selected_ids.is_empty());
    assert!(ui.lasso_bounds.is_none());
}

#[test]
fn input_state_default_is_idle() {
    assert!(InputState::default().is_idle());
    assert!(!InputState::Lasso { points: Vec::new() }.is_idle());
}
