//! Property-based invariants for the drag controller.
//!
//! 1. Start then release with no movement leaves the order unchanged
//! 2. After every move the placeholder precedes the first other block at or
//!    below the dragged block's top (or follows the tail policy)
//! 3. Repeating a move with the same pointer position changes nothing
//! 4. While dragging: one placeholder, one pinned block, dragged block at tail
//! 5. After release: no placeholder, every block in flow, same block set
//! 6. Cancel always restores the pre-drag order

use proptest::prelude::*;
use sortable_core::{
    Block, BlockId, DragController, Emphasis, Point, ReorderConfig, Size, StackLayout,
    SurfaceNode, TailPolicy,
};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Gesture {
    heights: Vec<i32>,
    gap: i32,
    dragged: usize,
    start: (i32, i32),
    path: Vec<(i32, i32)>,
    hold_tail: bool,
}

fn gesture_strategy() -> impl Strategy<Value = Gesture> {
    (
        prop::collection::vec(8i32..80, 1..10),
        0i32..16,
        any::<prop::sample::Index>(),
        (0i32..100, 0i32..400),
        prop::collection::vec((-200i32..300, -300i32..900), 0..24),
        any::<bool>(),
    )
        .prop_map(|(heights, gap, dragged, start, path, hold_tail)| Gesture {
            dragged: dragged.index(heights.len()),
            heights,
            gap,
            start,
            path,
            hold_tail,
        })
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn build(gesture: &Gesture) -> (DragController, Vec<BlockId>) {
    let layout = StackLayout::new(Point::ZERO, gesture.gap).expect("non-negative gap");
    let tail_policy = if gesture.hold_tail {
        TailPolicy::Hold
    } else {
        TailPolicy::Append
    };
    let config = ReorderConfig::default().with_tail_policy(tail_policy);
    let mut controller = DragController::new(layout, config).expect("valid config");
    let ids = gesture
        .heights
        .iter()
        .map(|&height| controller.spawn_block(Size::new(120, height)))
        .collect::<Result<Vec<_>, _>>()
        .expect("positive sizes");
    (controller, ids)
}

fn point((x, y): (i32, i32)) -> Point {
    Point::new(x, y)
}

fn assert_dragging_shape(controller: &DragController, dragged: BlockId) {
    let surface = controller.surface();
    let placeholders = surface
        .children()
        .iter()
        .filter(|node| **node == SurfaceNode::Placeholder)
        .count();
    assert_eq!(placeholders, 1, "exactly one placeholder while dragging");
    let pinned: Vec<BlockId> = surface
        .blocks()
        .filter(|block| !block.is_in_flow())
        .map(Block::id)
        .collect();
    assert_eq!(pinned, vec![dragged], "only the dragged block is pinned");
    assert_eq!(
        surface.children().last(),
        Some(&SurfaceNode::Block(dragged)),
        "dragged block stays at the tail"
    );
    assert!(controller.listeners().is_installed());
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn release_without_move_keeps_order(gesture in gesture_strategy()) {
        let (mut controller, ids) = build(&gesture);
        let block = ids[gesture.dragged];
        controller.start_session(point(gesture.start), block).expect("start");
        assert_dragging_shape(&controller, block);
        controller.end_session(point(gesture.start), block).expect("end");
        prop_assert_eq!(controller.surface().order(), ids);
    }

    #[test]
    fn placeholder_follows_first_block_at_or_below(gesture in gesture_strategy()) {
        let (mut controller, ids) = build(&gesture);
        let block = ids[gesture.dragged];
        controller.start_session(point(gesture.start), block).expect("start");

        for &step in &gesture.path {
            let pointer = point(step);
            let before = controller.clone();
            let session = *before.session().expect("dragging");
            let top = session.offset_for(pointer).y;
            let expected = before
                .surface()
                .blocks()
                .filter(|candidate| candidate.id() != block)
                .find(|candidate| candidate.top() >= top)
                .map(Block::id);

            controller.on_pointer_move(pointer, block).expect("move");
            assert_dragging_shape(&controller, block);

            let surface = controller.surface();
            let index = surface.placeholder_index().expect("placeholder present");
            match (expected, gesture.hold_tail) {
                (Some(reference), _) => {
                    prop_assert_eq!(surface.children()[index + 1], SurfaceNode::Block(reference));
                }
                (None, false) => {
                    prop_assert_eq!(surface.children()[index + 1], SurfaceNode::Block(block));
                }
                (None, true) => {
                    prop_assert_eq!(Some(index), before.surface().placeholder_index());
                }
            }
            prop_assert_eq!(
                surface.block(block).map(Block::offset),
                Some(session.offset_for(pointer))
            );
        }
    }

    #[test]
    fn repeated_move_is_idempotent(gesture in gesture_strategy()) {
        let (mut controller, ids) = build(&gesture);
        let block = ids[gesture.dragged];
        controller.start_session(point(gesture.start), block).expect("start");

        for &step in &gesture.path {
            controller.on_pointer_move(point(step), block).expect("move");
            let children = controller.surface().children().to_vec();
            let offset = controller.surface().block(block).map(Block::offset);

            controller.on_pointer_move(point(step), block).expect("repeat");
            prop_assert_eq!(controller.surface().children(), children.as_slice());
            prop_assert_eq!(controller.surface().block(block).map(Block::offset), offset);
        }
    }

    #[test]
    fn release_leaves_clean_surface(gesture in gesture_strategy()) {
        let (mut controller, ids) = build(&gesture);
        let block = ids[gesture.dragged];
        controller.start_session(point(gesture.start), block).expect("start");
        for &step in &gesture.path {
            controller.on_pointer_move(point(step), block).expect("move");
        }
        let landing = controller.surface().placeholder_index().expect("placeholder present");
        let release = gesture.path.last().copied().unwrap_or(gesture.start);
        controller.end_session(point(release), block).expect("end");

        let surface = controller.surface();
        prop_assert!(surface.placeholder().is_none());
        prop_assert_eq!(surface.index_of(block), Some(landing));
        prop_assert!(surface.blocks().all(Block::is_in_flow));
        prop_assert!(surface.blocks().all(|b| b.emphasis() == Emphasis::None));
        prop_assert!(!controller.is_dragging());
        prop_assert!(!controller.listeners().is_installed());

        let mut order = surface.order();
        order.sort();
        prop_assert_eq!(order, ids);
    }

    #[test]
    fn cancel_restores_pre_drag_order(gesture in gesture_strategy()) {
        let (mut controller, ids) = build(&gesture);
        let block = ids[gesture.dragged];
        controller.start_session(point(gesture.start), block).expect("start");
        for &step in &gesture.path {
            controller.on_pointer_move(point(step), block).expect("move");
        }
        controller.cancel_session().expect("cancel");
        prop_assert_eq!(controller.surface().order(), ids);
        prop_assert!(controller.surface().placeholder().is_none());
    }
}
