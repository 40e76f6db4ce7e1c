#![forbid(unsafe_code)]

//! Blocks and the factory that labels them.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::geometry::{Point, Rect, Size};
use crate::surface::{FlowLayout, Surface};

/// Stable block identity: the label assigned at creation.
///
/// Labels are handed out monotonically by a [`BlockFactory`] and never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    #[must_use]
    pub const fn new(label: u64) -> Self {
        Self(label)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a block's offset is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    /// Placed by the surface's flow layout.
    #[default]
    Flow,
    /// Pinned at an explicit offset; takes no space in the flow.
    Absolute,
}

/// Visual emphasis applied to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    #[default]
    None,
    /// Elevation shadow signalling an active drag.
    Lifted { shadow_blur: u16 },
}

/// A positioned visual unit on a [`Surface`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    size: Size,
    offset: Point,
    positioning: Positioning,
    emphasis: Emphasis,
}

impl Block {
    pub(crate) const fn new(id: BlockId, size: Size) -> Self {
        Self {
            id,
            size,
            offset: Point::ZERO,
            positioning: Positioning::Flow,
            emphasis: Emphasis::None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Current rendered top-left offset.
    #[must_use]
    pub const fn offset(&self) -> Point {
        self.offset
    }

    #[must_use]
    pub const fn top(&self) -> i32 {
        self.offset.y
    }

    #[must_use]
    pub const fn left(&self) -> i32 {
        self.offset.x
    }

    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(self.offset, self.size)
    }

    #[must_use]
    pub const fn positioning(&self) -> Positioning {
        self.positioning
    }

    #[must_use]
    pub const fn emphasis(&self) -> Emphasis {
        self.emphasis
    }

    #[must_use]
    pub const fn is_in_flow(&self) -> bool {
        matches!(self.positioning, Positioning::Flow)
    }

    pub(crate) fn pin(&mut self, offset: Point) {
        self.positioning = Positioning::Absolute;
        self.offset = offset;
    }

    pub(crate) fn unpin(&mut self) {
        self.positioning = Positioning::Flow;
    }

    pub(crate) fn set_emphasis(&mut self, emphasis: Emphasis) {
        self.emphasis = emphasis;
    }

    pub(crate) fn place(&mut self, offset: Point) {
        self.offset = offset;
    }
}

/// Produces uniquely labelled blocks and appends them to a surface.
#[derive(Debug, Clone, Default)]
pub struct BlockFactory {
    next_label: u64,
}

impl BlockFactory {
    #[must_use]
    pub const fn new() -> Self {
        Self { next_label: 0 }
    }

    /// Label the next spawned block will receive.
    #[must_use]
    pub const fn next_label(&self) -> BlockId {
        BlockId(self.next_label)
    }

    /// Create a block in normal flow and append it to `surface`.
    ///
    /// Labels already held by `surface` are skipped.
    pub fn spawn<L: FlowLayout>(
        &mut self,
        surface: &mut Surface<L>,
        size: Size,
    ) -> Result<BlockId, ConfigError> {
        if !size.is_positive() {
            return Err(ConfigError::InvalidBlockSize { size });
        }
        let mut id = BlockId(self.next_label);
        while surface.contains(id) && id.0 < u64::MAX {
            id = BlockId(id.0.saturating_add(1));
        }
        self.next_label = id.0.saturating_add(1);
        surface.push_block(Block::new(id, size));
        debug!(block = id.get(), %size, "spawned block");
        Ok(id)
    }

    /// Spawn `count` equally sized blocks, returning their labels in order.
    pub fn populate<L: FlowLayout>(
        &mut self,
        surface: &mut Surface<L>,
        count: usize,
        size: Size,
    ) -> Result<Vec<BlockId>, ConfigError> {
        (0..count).map(|_| self.spawn(surface, size)).collect()
    }
}
