#![forbid(unsafe_code)]

//! Deterministic pointer adapter for drag-to-reorder on web hosts.
//!
//! This module bridges browser pointer lifecycle signals into
//! [`DragController`] operations while enforcing:
//! - one active pointer at a time,
//! - explicit surface listener subscribe/unsubscribe commands for JS hosts,
//!   emitted exactly once per gesture, and
//! - cancellation on interruption paths (pointer-cancel, blur).

use serde::{Deserialize, Serialize};
use sortable_core::{
    BlockId, DragController, DragEffect, DragTransition, FlowLayout, Point, ReorderError, Size,
    StackLayout,
};
use tracing::debug;

/// Pointer button reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerAdapterConfig {
    /// Button required to begin a drag.
    pub activation_button: PointerButton,
    /// If true, window blur cancels the active drag and restores the order.
    pub cancel_on_blur: bool,
}

impl Default for PointerAdapterConfig {
    fn default() -> Self {
        Self {
            activation_button: PointerButton::Primary,
            cancel_on_blur: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActivePointer {
    pointer_id: u32,
    block: BlockId,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DispatchContext {
    phase: PointerLifecyclePhase,
    pointer_id: Option<u32>,
    block: Option<BlockId>,
    position: Option<Point>,
}

/// Host command for the surface-wide `pointermove`/`pointerup` listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ListenerCommand {
    Subscribe { pointer_id: u32, generation: u64 },
    Unsubscribe { pointer_id: u32, generation: u64 },
}

/// Lifecycle phase recorded for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerLifecyclePhase {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    Blur,
}

/// Deterministic reason why an incoming lifecycle signal was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerIgnoredReason {
    InvalidPointerId,
    ButtonNotAllowed,
    ActivePointerAlreadyInProgress,
    NoActivePointer,
    PointerMismatch,
    NoBlockAtPoint,
    BlurIgnored,
    ControllerRejected,
}

/// Outcome category for one lifecycle dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PointerLogOutcome {
    Forwarded,
    Ignored(PointerIgnoredReason),
}

/// Structured lifecycle log record for one adapter dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerLogEntry {
    pub phase: PointerLifecyclePhase,
    pub sequence: Option<u64>,
    pub pointer_id: Option<u32>,
    pub block: Option<BlockId>,
    pub position: Option<Point>,
    pub listener_command: Option<ListenerCommand>,
    pub outcome: PointerLogOutcome,
}

/// Result of one pointer lifecycle dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerDispatch {
    pub transition: Option<DragTransition>,
    pub listener_command: Option<ListenerCommand>,
    pub error: Option<ReorderError>,
    pub log: PointerLogEntry,
}

impl PointerDispatch {
    fn ignored(context: DispatchContext, reason: PointerIgnoredReason) -> Self {
        debug!(
            phase = ?context.phase,
            pointer_id = ?context.pointer_id,
            ?reason,
            "pointer signal ignored"
        );
        Self {
            transition: None,
            listener_command: None,
            error: None,
            log: PointerLogEntry {
                phase: context.phase,
                sequence: None,
                pointer_id: context.pointer_id,
                block: context.block,
                position: context.position,
                listener_command: None,
                outcome: PointerLogOutcome::Ignored(reason),
            },
        }
    }

    fn with_command(mut self, command: ListenerCommand) -> Self {
        self.listener_command = Some(command);
        self.log.listener_command = Some(command);
        self
    }

    /// Whether the signal reached the controller and was accepted.
    #[must_use]
    pub const fn is_forwarded(&self) -> bool {
        matches!(self.log.outcome, PointerLogOutcome::Forwarded)
    }
}

/// Deterministic pointer adapter for one reorderable surface.
///
/// Pointer-down is scoped to a block; pointer-move and pointer-up are scoped
/// to the whole surface while the returned [`ListenerCommand::Subscribe`] is
/// in effect.
#[derive(Debug, Clone)]
pub struct ReorderPointerAdapter<L: FlowLayout = StackLayout> {
    controller: DragController<L>,
    config: PointerAdapterConfig,
    active: Option<ActivePointer>,
    next_sequence: u64,
}

impl<L: FlowLayout> ReorderPointerAdapter<L> {
    #[must_use]
    pub fn new(controller: DragController<L>, config: PointerAdapterConfig) -> Self {
        Self {
            controller,
            config,
            active: None,
            next_sequence: 1,
        }
    }

    #[must_use]
    pub const fn config(&self) -> PointerAdapterConfig {
        self.config
    }

    #[must_use]
    pub const fn controller(&self) -> &DragController<L> {
        &self.controller
    }

    #[must_use]
    pub fn into_controller(self) -> DragController<L> {
        self.controller
    }

    /// Active pointer ID, if any.
    #[must_use]
    pub fn active_pointer_id(&self) -> Option<u32> {
        self.active.map(|active| active.pointer_id)
    }

    /// Block under the active pointer, if any.
    #[must_use]
    pub fn active_block(&self) -> Option<BlockId> {
        self.active.map(|active| active.block)
    }

    /// Add a block to the surface (the host's "add block" action).
    pub fn spawn_block(&mut self, size: Size) -> Result<BlockId, ReorderError> {
        self.controller.spawn_block(size)
    }

    /// Handle pointer-down on a block.
    pub fn pointer_down(
        &mut self,
        block: BlockId,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        let context = DispatchContext {
            phase: PointerLifecyclePhase::PointerDown,
            pointer_id: Some(pointer_id),
            block: Some(block),
            position: Some(position),
        };
        if let Some(reason) = self.down_rejection(pointer_id, button) {
            return PointerDispatch::ignored(context, reason);
        }

        let result = self.controller.start_session(position, block);
        let dispatch = self.forward(context, result);
        if let Some(DragTransition {
            effect: DragEffect::Started { subscription, .. },
            ..
        }) = dispatch.transition
        {
            self.active = Some(ActivePointer {
                pointer_id,
                block,
                generation: subscription.generation(),
            });
            return dispatch.with_command(ListenerCommand::Subscribe {
                pointer_id,
                generation: subscription.generation(),
            });
        }
        dispatch
    }

    /// Handle pointer-down at a surface position, hit-testing for the block.
    pub fn pointer_down_at(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        if self.down_rejection(pointer_id, button).is_none()
            && let Some(block) = self.controller.surface().hit_test(position)
        {
            return self.pointer_down(block, pointer_id, button, position);
        }
        let context = DispatchContext {
            phase: PointerLifecyclePhase::PointerDown,
            pointer_id: Some(pointer_id),
            block: None,
            position: Some(position),
        };
        let reason = self
            .down_rejection(pointer_id, button)
            .unwrap_or(PointerIgnoredReason::NoBlockAtPoint);
        PointerDispatch::ignored(context, reason)
    }

    /// Handle a surface-wide pointer-move during an active drag.
    pub fn pointer_move(&mut self, pointer_id: u32, position: Point) -> PointerDispatch {
        let context = DispatchContext {
            phase: PointerLifecyclePhase::PointerMove,
            pointer_id: Some(pointer_id),
            block: self.active_block(),
            position: Some(position),
        };
        let active = match self.matching_active(pointer_id) {
            Ok(active) => active,
            Err(reason) => return PointerDispatch::ignored(context, reason),
        };
        let result = self.controller.on_pointer_move(position, active.block);
        self.forward(context, result)
    }

    /// Handle a surface-wide pointer-up; commits the drag.
    ///
    /// Any button releases: a chorded press may end on a different button
    /// than the one that started the drag.
    pub fn pointer_up(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        let context = DispatchContext {
            phase: PointerLifecyclePhase::PointerUp,
            pointer_id: Some(pointer_id),
            block: self.active_block(),
            position: Some(position),
        };
        let active = match self.matching_active(pointer_id) {
            Ok(active) => active,
            Err(reason) => return PointerDispatch::ignored(context, reason),
        };
        debug!(pointer_id, ?button, block = %active.block, "pointer released");
        let result = self.controller.end_session(position, active.block);
        let dispatch = self.forward(context, result);
        self.release_if_idle(dispatch)
    }

    /// Handle browser `pointercancel`; restores the pre-drag order.
    pub fn pointer_cancel(&mut self, pointer_id: Option<u32>) -> PointerDispatch {
        let context = DispatchContext {
            phase: PointerLifecyclePhase::PointerCancel,
            pointer_id,
            block: self.active_block(),
            position: None,
        };
        let Some(active) = self.active else {
            return PointerDispatch::ignored(context, PointerIgnoredReason::NoActivePointer);
        };
        if let Some(id) = pointer_id
            && id != active.pointer_id
        {
            return PointerDispatch::ignored(context, PointerIgnoredReason::PointerMismatch);
        }
        let result = self.controller.cancel_session();
        let dispatch = self.forward(context, result);
        self.release_if_idle(dispatch)
    }

    /// Handle window blur.
    pub fn blur(&mut self) -> PointerDispatch {
        let context = DispatchContext {
            phase: PointerLifecyclePhase::Blur,
            pointer_id: self.active_pointer_id(),
            block: self.active_block(),
            position: None,
        };
        if self.active.is_none() {
            return PointerDispatch::ignored(context, PointerIgnoredReason::NoActivePointer);
        }
        if !self.config.cancel_on_blur {
            return PointerDispatch::ignored(context, PointerIgnoredReason::BlurIgnored);
        }
        let result = self.controller.cancel_session();
        let dispatch = self.forward(context, result);
        self.release_if_idle(dispatch)
    }

    fn down_rejection(&self, pointer_id: u32, button: PointerButton) -> Option<PointerIgnoredReason> {
        if pointer_id == 0 {
            Some(PointerIgnoredReason::InvalidPointerId)
        } else if button != self.config.activation_button {
            Some(PointerIgnoredReason::ButtonNotAllowed)
        } else if self.active.is_some() {
            Some(PointerIgnoredReason::ActivePointerAlreadyInProgress)
        } else {
            None
        }
    }

    fn matching_active(&self, pointer_id: u32) -> Result<ActivePointer, PointerIgnoredReason> {
        match self.active {
            None => Err(PointerIgnoredReason::NoActivePointer),
            Some(active) if active.pointer_id != pointer_id => {
                Err(PointerIgnoredReason::PointerMismatch)
            }
            Some(active) => Ok(active),
        }
    }

    /// Clear the active pointer once the controller is idle and tell the host
    /// to drop its listeners. Runs on rejected releases too, so a breach that
    /// still ended the session never leaks a subscription.
    fn release_if_idle(&mut self, dispatch: PointerDispatch) -> PointerDispatch {
        if self.controller.is_dragging() {
            return dispatch;
        }
        let Some(active) = self.active.take() else {
            return dispatch;
        };
        dispatch.with_command(ListenerCommand::Unsubscribe {
            pointer_id: active.pointer_id,
            generation: active.generation,
        })
    }

    fn forward(
        &mut self,
        context: DispatchContext,
        result: Result<DragTransition, ReorderError>,
    ) -> PointerDispatch {
        match result {
            Ok(transition) => PointerDispatch {
                transition: Some(transition),
                listener_command: None,
                error: None,
                log: PointerLogEntry {
                    phase: context.phase,
                    sequence: Some(self.next_sequence()),
                    pointer_id: context.pointer_id,
                    block: context.block,
                    position: context.position,
                    listener_command: None,
                    outcome: PointerLogOutcome::Forwarded,
                },
            },
            Err(error) => {
                let mut dispatch =
                    PointerDispatch::ignored(context, PointerIgnoredReason::ControllerRejected);
                dispatch.error = Some(error);
                dispatch
            }
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        sequence
    }
}
