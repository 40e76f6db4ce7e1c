#![forbid(unsafe_code)]

//! Drag controller: session lifecycle and placeholder tracking.
//!
//! The controller is a two-state machine, `Idle -> Dragging -> Idle`.
//! [`DragController::start_session`] is the only way into `Dragging`;
//! [`DragController::end_session`] and [`DragController::cancel_session`] are
//! the only ways out. Pointer moves are a self-loop on `Dragging` that update
//! the dragged block's offset and the placeholder's slot.
//!
//! While a session is active:
//! - the dragged block is pinned (absolute) and sits at the tail of the
//!   child sequence,
//! - exactly one placeholder occupies the prospective landing slot,
//! - surface-wide listeners are installed (see [`SurfaceListeners`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::block::{Block, BlockFactory, BlockId, Emphasis};
use crate::config::{ReorderConfig, TailPolicy};
use crate::error::{ReorderError, Result};
use crate::geometry::{Point, Size};
use crate::surface::{FlowLayout, StackLayout, Surface, SurfaceNode};

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Dragging { block: BlockId },
}

/// Transient state of one drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    block: BlockId,
    pointer_origin: Point,
    block_origin: Point,
    origin_index: usize,
}

impl Session {
    /// The dragged block.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Pointer position at drag start.
    #[must_use]
    pub const fn pointer_origin(&self) -> Point {
        self.pointer_origin
    }

    /// Dragged block's offset at drag start.
    #[must_use]
    pub const fn block_origin(&self) -> Point {
        self.block_origin
    }

    /// Dragged block's slot at drag start.
    #[must_use]
    pub const fn origin_index(&self) -> usize {
        self.origin_index
    }

    /// Offset the dragged block takes for a pointer at `pointer`.
    #[must_use]
    pub const fn offset_for(&self, pointer: Point) -> Point {
        self.block_origin
            .translate(pointer.delta_from(self.pointer_origin))
    }
}

/// Handle for one installation of the surface-wide move/up listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerSubscription(u64);

impl ListenerSubscription {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

/// Surface-wide pointer listener registry.
///
/// Holds at most one subscription. Installing replaces whatever was there;
/// there is never a stack of handlers.
#[derive(Debug, Clone, Default)]
pub struct SurfaceListeners {
    installed: Option<ListenerSubscription>,
    next_generation: u64,
}

impl SurfaceListeners {
    #[must_use]
    pub const fn installed(&self) -> Option<ListenerSubscription> {
        self.installed
    }

    #[must_use]
    pub const fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// Install a fresh subscription, returning it and the one it replaced.
    pub fn install(&mut self) -> (ListenerSubscription, Option<ListenerSubscription>) {
        self.next_generation = self.next_generation.saturating_add(1);
        let subscription = ListenerSubscription(self.next_generation);
        (subscription, self.installed.replace(subscription))
    }

    pub fn uninstall(&mut self) -> Option<ListenerSubscription> {
        self.installed.take()
    }
}

/// Observable effect of one controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DragEffect {
    Started {
        block: BlockId,
        subscription: ListenerSubscription,
        placeholder_index: usize,
        origin: Point,
    },
    Moved {
        block: BlockId,
        offset: Point,
        previous_index: usize,
        placeholder_index: usize,
    },
    Committed {
        block: BlockId,
        subscription: Option<ListenerSubscription>,
        from_index: usize,
        to_index: usize,
    },
    Canceled {
        block: BlockId,
        subscription: Option<ListenerSubscription>,
        restored_index: usize,
    },
}

impl DragEffect {
    #[must_use]
    pub const fn block(&self) -> BlockId {
        match self {
            Self::Started { block, .. }
            | Self::Moved { block, .. }
            | Self::Committed { block, .. }
            | Self::Canceled { block, .. } => *block,
        }
    }
}

/// Diagnostic record for one accepted controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragTransition {
    pub transition_id: u64,
    pub from: DragState,
    pub to: DragState,
    pub effect: DragEffect,
}

/// Owns a surface and reorders its blocks in response to drag gestures.
///
/// One controller per surface. Operations are synchronous and atomic from the
/// caller's perspective: a rejected call leaves both the session and the
/// surface exactly as they were.
#[derive(Debug, Clone)]
pub struct DragController<L: FlowLayout = StackLayout> {
    surface: Surface<L>,
    factory: BlockFactory,
    config: ReorderConfig,
    session: Option<Session>,
    listeners: SurfaceListeners,
    transition_counter: u64,
}

impl Default for DragController<StackLayout> {
    fn default() -> Self {
        Self {
            surface: Surface::default(),
            factory: BlockFactory::new(),
            config: ReorderConfig::default(),
            session: None,
            listeners: SurfaceListeners::default(),
            transition_counter: 0,
        }
    }
}

impl<L: FlowLayout> DragController<L> {
    /// Controller over an empty surface.
    pub fn new(layout: L, config: ReorderConfig) -> Result<Self> {
        Self::from_parts(Surface::new(layout), BlockFactory::new(), config)
    }

    /// Controller over an existing surface and the factory that labelled it.
    pub fn from_parts(
        surface: Surface<L>,
        factory: BlockFactory,
        config: ReorderConfig,
    ) -> Result<Self> {
        config.validate()?;
        if surface.placeholder().is_some() {
            return Err(ReorderError::PlaceholderPresent);
        }
        if let Some(highest) = surface.blocks().map(Block::id).max()
            && factory.next_label() <= highest
        {
            return Err(ReorderError::StaleFactory {
                next: factory.next_label(),
                highest,
            });
        }
        Ok(Self {
            surface,
            factory,
            config,
            session: None,
            listeners: SurfaceListeners::default(),
            transition_counter: 0,
        })
    }

    #[must_use]
    pub const fn surface(&self) -> &Surface<L> {
        &self.surface
    }

    #[must_use]
    pub const fn config(&self) -> ReorderConfig {
        self.config
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn listeners(&self) -> &SurfaceListeners {
        &self.listeners
    }

    #[must_use]
    pub const fn state(&self) -> DragState {
        match self.session {
            Some(session) => DragState::Dragging {
                block: session.block,
            },
            None => DragState::Idle,
        }
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Create a new block at the end of the flow.
    ///
    /// During a drag the new block lands just before the dragged one, which
    /// stays at the tail.
    pub fn spawn_block(&mut self, size: Size) -> Result<BlockId> {
        let id = self.factory.spawn(&mut self.surface, size)?;
        if let Some(session) = self.session {
            self.surface
                .insert_before(SurfaceNode::Block(id), SurfaceNode::Block(session.block))?;
        }
        Ok(id)
    }

    /// Spawn `count` equally sized blocks.
    pub fn populate(&mut self, count: usize, size: Size) -> Result<Vec<BlockId>> {
        (0..count).map(|_| self.spawn_block(size)).collect()
    }

    /// Begin dragging `block` from pointer position `pointer`.
    pub fn start_session(&mut self, pointer: Point, block: BlockId) -> Result<DragTransition> {
        if let Some(active) = self.session {
            warn!(
                active = %active.block,
                requested = %block,
                "drag session already active; start rejected"
            );
            return Err(ReorderError::SessionActive {
                active: active.block,
            });
        }
        let Some((block_origin, size)) = self.surface.block(block).map(|b| (b.offset(), b.size()))
        else {
            warn!(%block, "start requested for a block outside the surface");
            return Err(ReorderError::UnknownBlock { block });
        };
        if self.surface.placeholder().is_some() {
            return Err(self.breach(ReorderError::PlaceholderPresent, "start"));
        }

        let placeholder_index = self.surface.insert_placeholder_before(block, size)?;
        self.surface.append(SurfaceNode::Block(block))?;
        self.surface.pin_block(block, block_origin)?;
        self.surface.set_emphasis(
            block,
            Emphasis::Lifted {
                shadow_blur: self.config.lift_shadow_blur,
            },
        )?;

        let (subscription, replaced) = self.listeners.install();
        if let Some(stale) = replaced {
            warn!(
                generation = stale.generation(),
                "replaced stale surface listeners"
            );
        }
        self.session = Some(Session {
            block,
            pointer_origin: pointer,
            block_origin,
            origin_index: placeholder_index,
        });
        debug!(
            %block,
            %pointer,
            origin = %block_origin,
            placeholder_index,
            subscription = subscription.generation(),
            "drag session started"
        );
        Ok(self.transition(
            DragState::Idle,
            DragState::Dragging { block },
            DragEffect::Started {
                block,
                subscription,
                placeholder_index,
                origin: block_origin,
            },
        ))
    }

    /// Begin dragging whichever block is under `pointer`.
    pub fn start_session_at(&mut self, pointer: Point) -> Result<DragTransition> {
        if let Some(active) = self.session {
            warn!(
                active = %active.block,
                %pointer,
                "drag session already active; start rejected"
            );
            return Err(ReorderError::SessionActive {
                active: active.block,
            });
        }
        let Some(block) = self.surface.hit_test(pointer) else {
            warn!(%pointer, "no block under pointer; start rejected");
            return Err(ReorderError::NoBlockAtPoint { point: pointer });
        };
        self.start_session(pointer, block)
    }

    /// Track one pointer-move sample.
    ///
    /// Moves the dragged block by the pointer's displacement since drag start,
    /// then places the placeholder before the first other block whose top is
    /// at or below the dragged block's top. Ties resolve to the first block in
    /// display order. When no block qualifies the configured [`TailPolicy`]
    /// decides.
    pub fn on_pointer_move(&mut self, pointer: Point, block: BlockId) -> Result<DragTransition> {
        let session = self.active_session(block)?;
        let Some(previous_index) = self.surface.placeholder_index() else {
            return Err(self.breach(ReorderError::PlaceholderMissing, "move"));
        };

        let offset = session.offset_for(pointer);
        self.surface.pin_block(block, offset)?;

        let reference = self
            .surface
            .blocks()
            .filter(|candidate| candidate.id() != block)
            .find(|candidate| candidate.top() >= offset.y)
            .map(Block::id);
        let placeholder_index = match (reference, self.config.tail_policy) {
            (Some(reference), _) => self
                .surface
                .insert_before(SurfaceNode::Placeholder, SurfaceNode::Block(reference))?,
            (None, TailPolicy::Append) => self
                .surface
                .insert_before(SurfaceNode::Placeholder, SurfaceNode::Block(block))?,
            (None, TailPolicy::Hold) => previous_index,
        };

        trace!(
            %block,
            %pointer,
            %offset,
            previous_index,
            placeholder_index,
            "drag moved"
        );
        let state = DragState::Dragging { block };
        Ok(self.transition(
            state,
            state,
            DragEffect::Moved {
                block,
                offset,
                previous_index,
                placeholder_index,
            },
        ))
    }

    /// Release the drag: the block takes the placeholder's slot.
    ///
    /// Once the call is accepted the session is over on every exit path and
    /// the surface listeners are uninstalled, even if the surface turns out
    /// to be inconsistent.
    pub fn end_session(&mut self, pointer: Point, block: BlockId) -> Result<DragTransition> {
        let session = self.active_session(block)?;
        self.session = None;
        let subscription = self.listeners.uninstall();

        let Some(to_index) = self.surface.placeholder_index() else {
            self.settle(block)?;
            return Err(self.breach(ReorderError::PlaceholderMissing, "end"));
        };
        self.surface
            .insert_before(SurfaceNode::Block(block), SurfaceNode::Placeholder)?;
        self.surface.remove(SurfaceNode::Placeholder)?;
        self.settle(block)?;

        debug!(
            %block,
            %pointer,
            from_index = session.origin_index,
            to_index,
            "drag session committed"
        );
        Ok(self.transition(
            DragState::Dragging { block },
            DragState::Idle,
            DragEffect::Committed {
                block,
                subscription,
                from_index: session.origin_index,
                to_index,
            },
        ))
    }

    /// Abort the drag and put the block back where it started.
    pub fn cancel_session(&mut self) -> Result<DragTransition> {
        let Some(session) = self.session.take() else {
            warn!("cancel requested with no active drag session");
            return Err(ReorderError::NoActiveSession);
        };
        let subscription = self.listeners.uninstall();
        let block = session.block;

        let placeholder_present = self.surface.placeholder().is_some();
        if placeholder_present {
            self.surface.remove(SurfaceNode::Placeholder)?;
        }
        let dragged = SurfaceNode::Block(block);
        let reference = self
            .surface
            .children()
            .iter()
            .copied()
            .filter(|node| *node != dragged)
            .nth(session.origin_index);
        match reference {
            Some(reference) => self.surface.insert_before(dragged, reference)?,
            None => self.surface.append(dragged)?,
        };
        self.settle(block)?;
        if !placeholder_present {
            return Err(self.breach(ReorderError::PlaceholderMissing, "cancel"));
        }

        let restored_index = self
            .surface
            .index_of(block)
            .ok_or(ReorderError::UnknownBlock { block })?;
        debug!(%block, restored_index, "drag session canceled");
        Ok(self.transition(
            DragState::Dragging { block },
            DragState::Idle,
            DragEffect::Canceled {
                block,
                subscription,
                restored_index,
            },
        ))
    }

    fn active_session(&self, block: BlockId) -> Result<Session> {
        match self.session {
            None => {
                warn!(%block, "pointer signal with no active drag session");
                Err(ReorderError::NoActiveSession)
            }
            Some(session) if session.block != block => {
                warn!(
                    expected = %session.block,
                    got = %block,
                    "pointer signal for a block other than the dragged one"
                );
                Err(ReorderError::BlockMismatch {
                    expected: session.block,
                    got: block,
                })
            }
            Some(session) => Ok(session),
        }
    }

    /// Return `block` to normal flow without emphasis.
    fn settle(&mut self, block: BlockId) -> Result<()> {
        self.surface.unpin_block(block)?;
        self.surface.set_emphasis(block, Emphasis::None)
    }

    fn breach(&self, error: ReorderError, operation: &'static str) -> ReorderError {
        error!(%error, operation, "surface invariant breached");
        debug_assert!(false, "surface invariant breached during {operation}: {error}");
        error
    }

    fn transition(&mut self, from: DragState, to: DragState, effect: DragEffect) -> DragTransition {
        self.transition_counter = self.transition_counter.saturating_add(1);
        DragTransition {
            transition_id: self.transition_counter,
            from,
            to,
            effect,
        }
    }
}
