#![forbid(unsafe_code)]

//! Deterministic gesture recording and replay.
//!
//! [`GestureRecorder`] wraps a [`ReorderPointerAdapter`] and records every
//! pointer signal it forwards, plus order checkpoints. [`replay`] rebuilds a
//! fresh surface from the trace header, feeds the same signals back, and
//! compares each checkpoint with the order it reproduces.
//!
//! Traces serialize as JSON Lines, one [`TraceRecord`] per line:
//!
//! - **Header**: schema, layout, controller and adapter config, block sizes.
//! - **Down / Move / Up / Cancel / Blur**: pointer lifecycle signals.
//! - **Order**: block order checkpoint.
//! - **Summary**: signal and checkpoint counts (must be last).

use serde::{Deserialize, Serialize};
use sortable_core::{BlockId, DragController, Point, ReorderConfig, ReorderError, Size, StackLayout};
use thiserror::Error;
use tracing::{debug, warn};

use crate::pointer_capture::{
    PointerAdapterConfig, PointerButton, PointerDispatch, ReorderPointerAdapter,
};

/// Schema version for gesture traces.
pub const SCHEMA_VERSION: &str = "sortable-gesture-trace-v1";

/// A single record in a gesture trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceRecord {
    Header {
        schema: String,
        layout: StackLayout,
        config: ReorderConfig,
        adapter: PointerAdapterConfig,
        blocks: Vec<Size>,
    },
    /// Pointer-down; `block` is `None` when the host hit-tested by position.
    Down {
        block: Option<BlockId>,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    },
    Move {
        pointer_id: u32,
        position: Point,
    },
    Up {
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    },
    Cancel {
        pointer_id: Option<u32>,
    },
    Blur,
    Spawn {
        size: Size,
    },
    Order {
        order: Vec<BlockId>,
    },
    Summary {
        signals: u64,
        checkpoints: u64,
    },
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace does not start with a header record")]
    MissingHeader,

    #[error("unsupported trace schema {found:?}")]
    SchemaMismatch { found: String },

    #[error("trace line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Reorder(#[from] ReorderError),
}

/// A complete recorded gesture trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GestureTrace {
    pub records: Vec<TraceRecord>,
}

impl GestureTrace {
    /// Number of order checkpoints.
    #[must_use]
    pub fn checkpoint_count(&self) -> u64 {
        self.records
            .iter()
            .filter(|record| matches!(record, TraceRecord::Order { .. }))
            .count() as u64
    }

    /// Order recorded by the last checkpoint.
    #[must_use]
    pub fn final_order(&self) -> Option<&[BlockId]> {
        self.records.iter().rev().find_map(|record| match record {
            TraceRecord::Order { order } => Some(order.as_slice()),
            _ => None,
        })
    }

    /// Serialize to JSON Lines.
    pub fn to_jsonl(&self) -> Result<String, TraceError> {
        let mut out = String::new();
        for (index, record) in self.records.iter().enumerate() {
            let line = serde_json::to_string(record).map_err(|source| TraceError::Json {
                line: index + 1,
                source,
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse JSON Lines; blank lines are skipped.
    pub fn from_jsonl(input: &str) -> Result<Self, TraceError> {
        let records = input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|source| TraceError::Json {
                    line: index + 1,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }
}

/// Records a reorder session for deterministic replay.
#[derive(Debug, Clone)]
pub struct GestureRecorder {
    adapter: ReorderPointerAdapter,
    records: Vec<TraceRecord>,
    signals: u64,
    checkpoints: u64,
}

impl GestureRecorder {
    /// Build a surface with one block per entry in `blocks` and start recording.
    pub fn new(
        layout: StackLayout,
        config: ReorderConfig,
        adapter_config: PointerAdapterConfig,
        blocks: &[Size],
    ) -> Result<Self, TraceError> {
        let adapter = build_adapter(layout, config, adapter_config, blocks)?;
        let header = TraceRecord::Header {
            schema: SCHEMA_VERSION.to_owned(),
            layout,
            config,
            adapter: adapter_config,
            blocks: blocks.to_vec(),
        };
        Ok(Self {
            adapter,
            records: vec![header],
            signals: 0,
            checkpoints: 0,
        })
    }

    #[must_use]
    pub const fn adapter(&self) -> &ReorderPointerAdapter {
        &self.adapter
    }

    pub fn pointer_down(
        &mut self,
        block: BlockId,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        self.record(TraceRecord::Down {
            block: Some(block),
            pointer_id,
            button,
            position,
        });
        self.adapter.pointer_down(block, pointer_id, button, position)
    }

    pub fn pointer_down_at(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        self.record(TraceRecord::Down {
            block: None,
            pointer_id,
            button,
            position,
        });
        self.adapter.pointer_down_at(pointer_id, button, position)
    }

    pub fn pointer_move(&mut self, pointer_id: u32, position: Point) -> PointerDispatch {
        self.record(TraceRecord::Move {
            pointer_id,
            position,
        });
        self.adapter.pointer_move(pointer_id, position)
    }

    pub fn pointer_up(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: Point,
    ) -> PointerDispatch {
        self.record(TraceRecord::Up {
            pointer_id,
            button,
            position,
        });
        self.adapter.pointer_up(pointer_id, button, position)
    }

    pub fn pointer_cancel(&mut self, pointer_id: Option<u32>) -> PointerDispatch {
        self.record(TraceRecord::Cancel { pointer_id });
        self.adapter.pointer_cancel(pointer_id)
    }

    pub fn blur(&mut self) -> PointerDispatch {
        self.record(TraceRecord::Blur);
        self.adapter.blur()
    }

    pub fn spawn_block(&mut self, size: Size) -> Result<BlockId, TraceError> {
        let id = self.adapter.spawn_block(size)?;
        self.record(TraceRecord::Spawn { size });
        Ok(id)
    }

    /// Record the current block order.
    pub fn checkpoint(&mut self) {
        let order = self.adapter.controller().surface().order();
        self.checkpoints += 1;
        self.records.push(TraceRecord::Order { order });
    }

    /// Close the trace with a final checkpoint and summary.
    #[must_use]
    pub fn finish(mut self) -> GestureTrace {
        self.checkpoint();
        self.records.push(TraceRecord::Summary {
            signals: self.signals,
            checkpoints: self.checkpoints,
        });
        GestureTrace {
            records: self.records,
        }
    }

    fn record(&mut self, record: TraceRecord) {
        self.signals += 1;
        self.records.push(record);
    }
}

/// One checkpoint whose replayed order differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMismatch {
    pub checkpoint: u64,
    pub expected: Vec<BlockId>,
    pub actual: Vec<BlockId>,
}

/// Result of replaying a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    pub checkpoints: u64,
    pub mismatches: Vec<CheckpointMismatch>,
    pub final_order: Vec<BlockId>,
}

impl ReplayResult {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Replay a trace through a fresh surface.
pub fn replay(trace: &GestureTrace) -> Result<ReplayResult, TraceError> {
    let Some(TraceRecord::Header {
        schema,
        layout,
        config,
        adapter,
        blocks,
    }) = trace.records.first()
    else {
        return Err(TraceError::MissingHeader);
    };
    if schema != SCHEMA_VERSION {
        return Err(TraceError::SchemaMismatch {
            found: schema.clone(),
        });
    }
    let mut adapter = build_adapter(*layout, *config, *adapter, blocks)?;
    let mut checkpoints = 0;
    let mut mismatches = Vec::new();

    for record in &trace.records[1..] {
        match record {
            TraceRecord::Header { .. } => {
                warn!("ignoring header record past the start of the trace");
            }
            TraceRecord::Down {
                block: Some(block),
                pointer_id,
                button,
                position,
            } => {
                adapter.pointer_down(*block, *pointer_id, *button, *position);
            }
            TraceRecord::Down {
                block: None,
                pointer_id,
                button,
                position,
            } => {
                adapter.pointer_down_at(*pointer_id, *button, *position);
            }
            TraceRecord::Move {
                pointer_id,
                position,
            } => {
                adapter.pointer_move(*pointer_id, *position);
            }
            TraceRecord::Up {
                pointer_id,
                button,
                position,
            } => {
                adapter.pointer_up(*pointer_id, *button, *position);
            }
            TraceRecord::Cancel { pointer_id } => {
                adapter.pointer_cancel(*pointer_id);
            }
            TraceRecord::Blur => {
                adapter.blur();
            }
            TraceRecord::Spawn { size } => {
                adapter.spawn_block(*size)?;
            }
            TraceRecord::Order { order } => {
                checkpoints += 1;
                let actual = adapter.controller().surface().order();
                if actual != *order {
                    mismatches.push(CheckpointMismatch {
                        checkpoint: checkpoints,
                        expected: order.clone(),
                        actual,
                    });
                }
            }
            TraceRecord::Summary { .. } => break,
        }
    }

    debug!(checkpoints, mismatches = mismatches.len(), "trace replayed");
    Ok(ReplayResult {
        checkpoints,
        mismatches,
        final_order: adapter.controller().surface().order(),
    })
}

fn build_adapter(
    layout: StackLayout,
    config: ReorderConfig,
    adapter_config: PointerAdapterConfig,
    blocks: &[Size],
) -> Result<ReorderPointerAdapter, TraceError> {
    layout.validate().map_err(ReorderError::from)?;
    let mut controller = DragController::new(layout, config)?;
    for &size in blocks {
        controller.spawn_block(size)?;
    }
    Ok(ReorderPointerAdapter::new(controller, adapter_config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Size = Size::new(100, 40);

    fn recorder() -> GestureRecorder {
        GestureRecorder::new(
            StackLayout::default(),
            ReorderConfig::default(),
            PointerAdapterConfig::default(),
            &[SIZE; 3],
        )
        .expect("valid setup")
    }

    fn recorded_swap() -> GestureTrace {
        let mut recorder = recorder();
        recorder.pointer_down(BlockId::new(0), 1, PointerButton::Primary, Point::new(10, 10));
        recorder.pointer_move(1, Point::new(10, 35));
        recorder.pointer_move(1, Point::new(10, 60));
        recorder.pointer_up(1, PointerButton::Primary, Point::new(10, 60));
        recorder.checkpoint();
        recorder.pointer_down_at(2, PointerButton::Primary, Point::new(10, 85));
        recorder.pointer_move(2, Point::new(10, 0));
        recorder.blur();
        recorder.finish()
    }

    #[test]
    fn recorder_captures_signals_and_checkpoints() {
        let trace = recorded_swap();
        assert!(matches!(trace.records.first(), Some(TraceRecord::Header { .. })));
        assert_eq!(
            trace.records.last(),
            Some(&TraceRecord::Summary {
                signals: 7,
                checkpoints: 2
            })
        );
        assert_eq!(trace.checkpoint_count(), 2);
        assert_eq!(
            trace.final_order(),
            Some([BlockId::new(1), BlockId::new(0), BlockId::new(2)].as_slice())
        );
    }

    #[test]
    fn replay_reproduces_every_checkpoint() {
        let trace = recorded_swap();
        let result = replay(&trace).expect("replayable");
        assert!(result.ok(), "mismatches: {:?}", result.mismatches);
        assert_eq!(result.checkpoints, 2);
        assert_eq!(
            result.final_order,
            vec![BlockId::new(1), BlockId::new(0), BlockId::new(2)]
        );
    }

    #[test]
    fn jsonl_survives_a_round_trip_and_replays() {
        let trace = recorded_swap();
        let jsonl = trace.to_jsonl().expect("serializable");
        assert!(jsonl.starts_with(r#"{"kind":"header","schema":"sortable-gesture-trace-v1""#));
        let parsed = GestureTrace::from_jsonl(&jsonl).expect("parseable");
        assert_eq!(parsed, trace);
        assert!(replay(&parsed).expect("replayable").ok());
    }

    #[test]
    fn tampered_checkpoint_is_reported() {
        let mut trace = recorded_swap();
        let checkpoint = trace
            .records
            .iter_mut()
            .find_map(|record| match record {
                TraceRecord::Order { order } => Some(order),
                _ => None,
            })
            .expect("checkpoint recorded");
        checkpoint.reverse();
        let result = replay(&trace).expect("replayable");
        assert!(!result.ok());
        assert_eq!(result.mismatches.len(), 1);
        assert_eq!(result.mismatches[0].checkpoint, 1);
    }

    #[test]
    fn spawned_blocks_replay() {
        let mut recorder = recorder();
        let spawned = recorder.spawn_block(SIZE).expect("valid size");
        assert_eq!(spawned, BlockId::new(3));
        recorder.pointer_down(spawned, 1, PointerButton::Primary, Point::new(5, 125));
        recorder.pointer_move(1, Point::new(5, 0));
        recorder.pointer_up(1, PointerButton::Primary, Point::new(5, 0));
        let trace = recorder.finish();
        let result = replay(&trace).expect("replayable");
        assert!(result.ok());
        assert_eq!(result.final_order.first(), Some(&spawned));
    }

    #[test]
    fn missing_header_and_wrong_schema_are_rejected() {
        let empty = GestureTrace::default();
        assert!(matches!(replay(&empty), Err(TraceError::MissingHeader)));

        let mut trace = recorded_swap();
        if let Some(TraceRecord::Header { schema, .. }) = trace.records.first_mut() {
            *schema = "golden-trace-v0".to_owned();
        }
        assert!(matches!(
            replay(&trace),
            Err(TraceError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = GestureTrace::from_jsonl("{\"kind\":\"blur\"}\n\nnot json\n")
            .expect_err("third line is malformed");
        assert!(matches!(err, TraceError::Json { line: 3, .. }));
    }
}
