#![forbid(unsafe_code)]

//! The surface: an explicit, indexable child sequence of blocks plus at most
//! one placeholder.
//!
//! Display order, logical order, and sequence order are the same thing here.
//! Rendered offsets are derived from that order by a [`FlowLayout`] and are
//! recomputed after every mutation, so readers always observe the current
//! layout.
//!
//! Invariants maintained by every public operation:
//! - each block appears exactly once in the child sequence,
//! - at most one [`SurfaceNode::Placeholder`] is present,
//! - a failed operation leaves the sequence untouched.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, Emphasis};
use crate::error::{ConfigError, ReorderError, Result};
use crate::geometry::{Point, Rect, Size};

/// One slot in the surface's child sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceNode {
    Block(BlockId),
    Placeholder,
}

/// Invisible marker standing in for the gap left by a dragged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    size: Size,
    offset: Point,
}

impl Placeholder {
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn offset(&self) -> Point {
        self.offset
    }

    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(self.offset, self.size)
    }
}

/// Computes offsets for in-flow children.
///
/// This is the rendering-layer seam: the surface hands over the extents of
/// every in-flow child (flow-positioned blocks and the placeholder) in
/// display order and receives one offset per extent.
pub trait FlowLayout {
    fn place(&self, extents: &[Size]) -> Vec<Point>;
}

/// Vertical stack: each child sits below the previous one, separated by `gap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackLayout {
    pub origin: Point,
    pub gap: i32,
}

impl StackLayout {
    pub fn new(origin: Point, gap: i32) -> std::result::Result<Self, ConfigError> {
        let layout = Self { origin, gap };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.gap < 0 {
            return Err(ConfigError::NegativeGap { gap: self.gap });
        }
        Ok(())
    }
}

impl FlowLayout for StackLayout {
    fn place(&self, extents: &[Size]) -> Vec<Point> {
        let mut top = self.origin.y;
        extents
            .iter()
            .map(|extent| {
                let offset = Point::new(self.origin.x, top);
                top = top.saturating_add(extent.height).saturating_add(self.gap);
                offset
            })
            .collect()
    }
}

/// Ordered container of blocks.
#[derive(Debug, Clone)]
pub struct Surface<L: FlowLayout = StackLayout> {
    children: Vec<SurfaceNode>,
    blocks: FxHashMap<BlockId, Block>,
    placeholder: Option<Placeholder>,
    layout: L,
}

impl Default for Surface<StackLayout> {
    fn default() -> Self {
        Self::new(StackLayout::default())
    }
}

impl<L: FlowLayout> Surface<L> {
    #[must_use]
    pub fn new(layout: L) -> Self {
        Self {
            children: Vec::new(),
            blocks: FxHashMap::default(),
            placeholder: None,
            layout,
        }
    }

    #[must_use]
    pub const fn layout(&self) -> &L {
        &self.layout
    }

    /// Child sequence, placeholder included.
    #[must_use]
    pub fn children(&self) -> &[SurfaceNode] {
        &self.children
    }

    /// Number of children, placeholder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Blocks in display order, placeholder skipped.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.children.iter().filter_map(|node| match node {
            SurfaceNode::Block(id) => self.blocks.get(id),
            SurfaceNode::Placeholder => None,
        })
    }

    /// Block labels in display order, placeholder skipped.
    #[must_use]
    pub fn order(&self) -> Vec<BlockId> {
        self.blocks().map(Block::id).collect()
    }

    #[must_use]
    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.position(SurfaceNode::Block(id))
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    #[must_use]
    pub fn placeholder_index(&self) -> Option<usize> {
        self.position(SurfaceNode::Placeholder)
    }

    /// Topmost block under `point`. Pinned blocks render above the flow.
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<BlockId> {
        let pinned = self
            .blocks()
            .filter(|block| !block.is_in_flow())
            .find(|block| block.rect().contains(point));
        pinned
            .or_else(|| {
                self.blocks()
                    .filter(|block| block.is_in_flow())
                    .find(|block| block.rect().contains(point))
            })
            .map(Block::id)
    }

    /// Move `node` so it sits immediately before `reference`.
    ///
    /// Returns the node's new index.
    pub fn insert_before(&mut self, node: SurfaceNode, reference: SurfaceNode) -> Result<usize> {
        let from = self.require(node)?;
        let before = self.require(reference)?;
        if node == reference {
            return Ok(from);
        }
        self.children.remove(from);
        let to = if from < before { before - 1 } else { before };
        self.children.insert(to, node);
        self.relayout();
        Ok(to)
    }

    /// Move `node` to the end of the child sequence.
    pub fn append(&mut self, node: SurfaceNode) -> Result<usize> {
        let from = self.require(node)?;
        self.children.remove(from);
        self.children.push(node);
        self.relayout();
        Ok(self.children.len() - 1)
    }

    /// Detach and discard `node`.
    pub fn remove(&mut self, node: SurfaceNode) -> Result<()> {
        let index = self.require(node)?;
        self.children.remove(index);
        match node {
            SurfaceNode::Block(id) => {
                self.blocks.remove(&id);
            }
            SurfaceNode::Placeholder => self.placeholder = None,
        }
        self.relayout();
        Ok(())
    }

    /// Create the placeholder immediately before `reference`.
    pub fn insert_placeholder_before(&mut self, reference: BlockId, size: Size) -> Result<usize> {
        if self.placeholder.is_some() {
            return Err(ReorderError::PlaceholderPresent);
        }
        let index = self.require(SurfaceNode::Block(reference))?;
        self.children.insert(index, SurfaceNode::Placeholder);
        self.placeholder = Some(Placeholder {
            size,
            offset: Point::ZERO,
        });
        self.relayout();
        Ok(index)
    }

    pub(crate) fn push_block(&mut self, block: Block) {
        let id = block.id();
        debug_assert!(!self.blocks.contains_key(&id), "duplicate block {id}");
        self.children.push(SurfaceNode::Block(id));
        self.blocks.insert(id, block);
        self.relayout();
    }

    pub(crate) fn pin_block(&mut self, id: BlockId, offset: Point) -> Result<()> {
        self.block_mut(id)?.pin(offset);
        self.relayout();
        Ok(())
    }

    pub(crate) fn unpin_block(&mut self, id: BlockId) -> Result<()> {
        self.block_mut(id)?.unpin();
        self.relayout();
        Ok(())
    }

    pub(crate) fn set_emphasis(&mut self, id: BlockId, emphasis: Emphasis) -> Result<()> {
        self.block_mut(id)?.set_emphasis(emphasis);
        Ok(())
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(&id)
            .ok_or(ReorderError::UnknownBlock { block: id })
    }

    fn position(&self, node: SurfaceNode) -> Option<usize> {
        self.children.iter().position(|child| *child == node)
    }

    fn require(&self, node: SurfaceNode) -> Result<usize> {
        self.position(node).ok_or(match node {
            SurfaceNode::Block(block) => ReorderError::UnknownBlock { block },
            SurfaceNode::Placeholder => ReorderError::PlaceholderMissing,
        })
    }

    /// Recompute offsets of every in-flow child. Pinned blocks keep theirs.
    fn relayout(&mut self) {
        let flow: Vec<(SurfaceNode, Size)> = self
            .children
            .iter()
            .filter_map(|node| match node {
                SurfaceNode::Block(id) => self
                    .blocks
                    .get(id)
                    .filter(|block| block.is_in_flow())
                    .map(|block| (*node, block.size())),
                SurfaceNode::Placeholder => self.placeholder.map(|p| (*node, p.size)),
            })
            .collect();
        let extents: Vec<Size> = flow.iter().map(|(_, size)| *size).collect();
        let offsets = self.layout.place(&extents);
        debug_assert_eq!(offsets.len(), extents.len(), "layout must place every child");

        for ((node, _), offset) in flow.into_iter().zip(offsets) {
            match node {
                SurfaceNode::Block(id) => {
                    if let Some(block) = self.blocks.get_mut(&id) {
                        block.place(offset);
                    }
                }
                SurfaceNode::Placeholder => {
                    if let Some(placeholder) = self.placeholder.as_mut() {
                        placeholder.offset = offset;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockFactory, Positioning};

    const SIZE: Size = Size::new(100, 40);

    fn surface_with(count: usize) -> (Surface, Vec<BlockId>) {
        let mut surface = Surface::new(StackLayout::new(Point::new(8, 8), 10).expect("gap"));
        let ids = BlockFactory::new()
            .populate(&mut surface, count, SIZE)
            .expect("valid size");
        (surface, ids)
    }

    fn tops(surface: &Surface) -> Vec<i32> {
        surface.blocks().map(Block::top).collect()
    }

    #[test]
    fn stack_layout_places_children_top_down() {
        let (surface, _) = surface_with(3);
        assert_eq!(tops(&surface), vec![8, 58, 108]);
        assert!(surface.blocks().all(|block| block.left() == 8));
    }

    #[test]
    fn negative_gap_is_rejected() {
        assert_eq!(
            StackLayout::new(Point::ZERO, -2),
            Err(ConfigError::NegativeGap { gap: -2 })
        );
    }

    #[test]
    fn insert_before_moves_existing_node() {
        let (mut surface, ids) = surface_with(3);
        let index = surface
            .insert_before(SurfaceNode::Block(ids[2]), SurfaceNode::Block(ids[0]))
            .expect("both present");
        assert_eq!(index, 0);
        assert_eq!(surface.order(), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(tops(&surface), vec![8, 58, 108]);
    }

    #[test]
    fn insert_before_self_is_noop() {
        let (mut surface, ids) = surface_with(2);
        let node = SurfaceNode::Block(ids[1]);
        assert_eq!(surface.insert_before(node, node), Ok(1));
        assert_eq!(surface.order(), ids);
    }

    #[test]
    fn failed_insert_leaves_sequence_untouched() {
        let (mut surface, ids) = surface_with(2);
        let before = surface.children().to_vec();
        let err = surface
            .insert_before(SurfaceNode::Block(ids[0]), SurfaceNode::Placeholder)
            .expect_err("no placeholder");
        assert_eq!(err, ReorderError::PlaceholderMissing);
        assert_eq!(surface.children(), before.as_slice());

        let missing = BlockId::new(99);
        let err = surface
            .append(SurfaceNode::Block(missing))
            .expect_err("unknown block");
        assert_eq!(err, ReorderError::UnknownBlock { block: missing });
        assert_eq!(surface.children(), before.as_slice());
    }

    #[test]
    fn placeholder_takes_space_in_flow() {
        let (mut surface, ids) = surface_with(2);
        let index = surface
            .insert_placeholder_before(ids[0], SIZE)
            .expect("block present");
        assert_eq!(index, 0);
        assert_eq!(surface.placeholder_index(), Some(0));
        assert_eq!(
            surface.placeholder().map(Placeholder::offset),
            Some(Point::new(8, 8))
        );
        assert_eq!(tops(&surface), vec![58, 108]);
        assert_eq!(
            surface.insert_placeholder_before(ids[1], SIZE),
            Err(ReorderError::PlaceholderPresent)
        );
    }

    #[test]
    fn pinned_block_leaves_the_flow() {
        let (mut surface, ids) = surface_with(3);
        surface
            .pin_block(ids[0], Point::new(30, 200))
            .expect("block present");
        let pinned = surface.block(ids[0]).expect("present");
        assert_eq!(pinned.positioning(), Positioning::Absolute);
        assert_eq!(pinned.offset(), Point::new(30, 200));
        assert_eq!(surface.block(ids[1]).map(Block::top), Some(8));
        assert_eq!(surface.block(ids[2]).map(Block::top), Some(58));

        surface.unpin_block(ids[0]).expect("block present");
        assert_eq!(tops(&surface), vec![8, 58, 108]);
    }

    #[test]
    fn hit_test_prefers_pinned_block() {
        let (mut surface, ids) = surface_with(3);
        assert_eq!(surface.hit_test(Point::new(20, 60)), Some(ids[1]));
        assert_eq!(surface.hit_test(Point::new(20, 52)), None);
        surface
            .pin_block(ids[2], Point::new(8, 50))
            .expect("block present");
        assert_eq!(surface.hit_test(Point::new(20, 60)), Some(ids[2]));
    }

    #[test]
    fn remove_discards_block() {
        let (mut surface, ids) = surface_with(3);
        surface
            .remove(SurfaceNode::Block(ids[1]))
            .expect("block present");
        assert!(!surface.contains(ids[1]));
        assert_eq!(surface.order(), vec![ids[0], ids[2]]);
        assert_eq!(tops(&surface), vec![8, 58]);
    }
}
