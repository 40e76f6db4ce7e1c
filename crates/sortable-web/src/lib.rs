#![forbid(unsafe_code)]

//! `sortable-web` adapts browser pointer lifecycles onto the
//! `sortable-core` drag controller.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes pointer
//!   signals and applies the listener commands it gets back.
//! - **Deterministic**: every dispatch is logged with a sequence number and
//!   gestures can be recorded and replayed bit-for-bit.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.

pub mod pointer_capture;
#[cfg(feature = "trace")]
pub mod trace;

pub use pointer_capture::{
    ListenerCommand, PointerAdapterConfig, PointerButton, PointerDispatch, PointerIgnoredReason,
    PointerLifecyclePhase, PointerLogEntry, PointerLogOutcome, ReorderPointerAdapter,
};
