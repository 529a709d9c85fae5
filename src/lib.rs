//! Infinite-canvas whiteboard engine for a study-notes tool.
//!
//! The engine owns everything spatial about a study session: the pan/zoom
//! camera, a raster ink layer with snapshot undo, structured cards that can
//! be dragged, resized and rotated, a placement planner for new content, and
//! the lasso that feeds AI actions. Every handler is synchronous and returns
//! [`engine::Action`]s for the host to carry out. The only asynchronous seam
//! is the AI collaborator, run by [`ai::AiDispatcher`] on a tokio runtime.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Per-session [`engine::EngineCore`]: input handlers, card ops, AI results |
//! | [`session`] | Session aggregate and the multi-session [`session::Workspace`] |
//! | [`store`] | Persistence boundary, JSON file and in-memory stores |
//! | [`ai`] | AI request/response types, service trait and dispatcher |
//! | [`doc`] | Card types and the in-memory card store |
//! | [`camera`] | Pan/zoom camera, points and boxes |
//! | [`raster`] | Pixel surfaces behind the ink and preview layers |
//! | [`ink`] | Pen, highlighter, eraser and shape rasterization |
//! | [`history`] | Bounded snapshot undo/redo for the ink layer |
//! | [`input`] | Tools, input event types and the gesture state machine |
//! | [`hit`] | Hit-testing cards, resize and rotate handles |
//! | [`placement`] | Collision-avoiding position planner |
//! | [`lasso`] | Lasso reduction, membership and ink capture |
//! | [`render`] | Scene export to a single bitmap |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared numeric constants (zoom limits, minimum sizes, etc.) |

pub mod ai;
pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod history;
pub mod hit;
pub mod ink;
pub mod input;
pub mod lasso;
pub mod placement;
pub mod raster;
pub mod render;
pub mod session;
pub mod store;
