#![forbid(unsafe_code)]

//! Host-agnostic drag-to-reorder engine.
//!
//! # Role
//! `sortable-core` owns the model: a [`Surface`] holding an explicit, ordered
//! sequence of [`Block`]s, and a [`DragController`] that reorders them in
//! response to pointer gestures. Rendering and event delivery live outside;
//! `sortable-web` adapts browser pointer lifecycles onto the controller.
//!
//! # Lifecycle
//! - pointer-down on a block: [`DragController::start_session`]
//! - pointer-move anywhere: [`DragController::on_pointer_move`]
//! - pointer-up anywhere: [`DragController::end_session`]
//!
//! During a drag the block follows the pointer and a placeholder marks the
//! slot it will land in on release.

pub mod block;
pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod surface;

pub use block::{Block, BlockFactory, BlockId, Emphasis, Positioning};
pub use config::{DEFAULT_LIFT_SHADOW_BLUR, ReorderConfig, TailPolicy};
pub use controller::{
    DragController, DragEffect, DragState, DragTransition, ListenerSubscription, Session,
    SurfaceListeners,
};
pub use error::{ConfigError, ReorderError, Result};
pub use geometry::{Point, Rect, Size};
pub use surface::{FlowLayout, Placeholder, StackLayout, Surface, SurfaceNode};
