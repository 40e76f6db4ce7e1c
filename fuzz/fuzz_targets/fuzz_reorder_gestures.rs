#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sortable_core::{
    Block, BlockId, DragController, Point, ReorderConfig, Size, StackLayout, SurfaceNode,
    TailPolicy,
};
use sortable_web::{PointerAdapterConfig, PointerButton, ReorderPointerAdapter};

#[derive(Debug, Arbitrary)]
enum Signal {
    Down { block: u8, pointer: u8, secondary: bool, x: i16, y: i16 },
    DownAt { pointer: u8, x: i16, y: i16 },
    Move { pointer: u8, x: i16, y: i16 },
    Up { pointer: u8, secondary: bool, x: i16, y: i16 },
    Cancel { pointer: Option<u8> },
    Blur,
    Spawn { height: u8 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    heights: Vec<u8>,
    gap: u8,
    hold_tail: bool,
    signals: Vec<Signal>,
}

fn button(secondary: bool) -> PointerButton {
    if secondary {
        PointerButton::Secondary
    } else {
        PointerButton::Primary
    }
}

fn point(x: i16, y: i16) -> Point {
    Point::new(i32::from(x), i32::from(y))
}

fn size(height: u8) -> Size {
    Size::new(64, i32::from(height.max(1)))
}

fuzz_target!(|input: Input| {
    let Ok(layout) = StackLayout::new(Point::ZERO, i32::from(input.gap)) else {
        return;
    };
    let tail_policy = if input.hold_tail {
        TailPolicy::Hold
    } else {
        TailPolicy::Append
    };
    let Ok(mut controller) =
        DragController::new(layout, ReorderConfig::default().with_tail_policy(tail_policy))
    else {
        return;
    };
    for &height in input.heights.iter().take(32) {
        if controller.spawn_block(size(height)).is_err() {
            return;
        }
    }
    let mut adapter = ReorderPointerAdapter::new(controller, PointerAdapterConfig::default());

    for signal in input.signals.iter().take(256) {
        match *signal {
            Signal::Down { block, pointer, secondary, x, y } => {
                adapter.pointer_down(
                    BlockId::new(u64::from(block)),
                    u32::from(pointer),
                    button(secondary),
                    point(x, y),
                );
            }
            Signal::DownAt { pointer, x, y } => {
                adapter.pointer_down_at(u32::from(pointer), PointerButton::Primary, point(x, y));
            }
            Signal::Move { pointer, x, y } => {
                adapter.pointer_move(u32::from(pointer), point(x, y));
            }
            Signal::Up { pointer, secondary, x, y } => {
                adapter.pointer_up(u32::from(pointer), button(secondary), point(x, y));
            }
            Signal::Cancel { pointer } => {
                adapter.pointer_cancel(pointer.map(u32::from));
            }
            Signal::Blur => {
                adapter.blur();
            }
            Signal::Spawn { height } => {
                let _ = adapter.spawn_block(size(height));
            }
        }

        // Post-conditions that must always hold:
        let controller = adapter.controller();
        let surface = controller.surface();
        let placeholders = surface
            .children()
            .iter()
            .filter(|node| **node == SurfaceNode::Placeholder)
            .count();
        let pinned: Vec<BlockId> = surface
            .blocks()
            .filter(|block| !block.is_in_flow())
            .map(Block::id)
            .collect();
        assert_eq!(surface.block_count() + placeholders, surface.len());
        match controller.session() {
            Some(session) => {
                assert_eq!(placeholders, 1, "dragging without a placeholder");
                assert_eq!(pinned, vec![session.block()], "wrong pinned set");
                assert!(controller.listeners().is_installed());
                assert_eq!(adapter.active_block(), Some(session.block()));
            }
            None => {
                assert_eq!(placeholders, 0, "placeholder outlived the session");
                assert!(pinned.is_empty(), "pinned block outlived the session");
                assert!(!controller.listeners().is_installed());
                assert_eq!(adapter.active_pointer_id(), None);
            }
        }
    }
});
