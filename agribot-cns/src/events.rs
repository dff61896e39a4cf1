//! Structured record of everything the control loop does

use crate::outcome::DispatchOutcome;
use agribot_core::GridCoordinate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const DEFAULT_CAPACITY: usize = 1024;

/// Who asked for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DispatchOrigin {
    AutoLoop { cycle: u64 },
    ControlSurface,
}

/// Loop lifecycle and dispatch events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LoopEvent {
    /// Controller moved to Running and spawned an executor
    LoopStarted { generation: u64 },
    /// Controller moved to Idle; the executor winds down at its next checkpoint
    StopRequested { generation: u64 },
    /// Executor finished on its own (panic or runtime shutdown) while still current
    ExecutorExited { generation: u64, cycles: u64 },
    CycleStarted { cycle: u64 },
    TargetsDetected { cycle: u64, targets: Vec<GridCoordinate> },
    Dispatched {
        origin: DispatchOrigin,
        payload: Value,
        outcome: DispatchOutcome,
    },
    CycleCompleted { cycle: u64 },
}

/// Event with the time it was emitted
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LoopEvent,
}

/// Receives loop events. Must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LoopEvent);
}

/// Logs every event and fans it out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest records; emitters never wait.
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn log(event: &LoopEvent) {
        match event {
            LoopEvent::LoopStarted { generation } => info!("Auto loop started (generation {})", generation),
            LoopEvent::StopRequested { generation } => {
                info!("Auto loop stop requested (generation {})", generation)
            }
            LoopEvent::ExecutorExited { generation, cycles } => warn!(
                "Auto loop executor {} exited after {} cycles without a stop request",
                generation, cycles
            ),
            LoopEvent::CycleStarted { cycle } => debug!("Cycle {} started", cycle),
            LoopEvent::TargetsDetected { cycle, targets } => {
                debug!("Cycle {} detected {} targets: {:?}", cycle, targets.len(), targets)
            }
            LoopEvent::Dispatched { origin, payload, outcome } => match outcome {
                DispatchOutcome::Success(response) => {
                    info!("Dispatched {} ({:?}) -> {}", payload, origin, response)
                }
                DispatchOutcome::Failure(failure) => {
                    warn!("Dispatch of {} ({:?}) failed: {}", payload, origin, failure)
                }
            },
            LoopEvent::CycleCompleted { cycle } => debug!("Cycle {} completed", cycle),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: LoopEvent) {
        Self::log(&event);
        // No subscribers is not an error
        let _ = self.sender.send(EventRecord {
            timestamp: Utc::now(),
            event,
        });
    }
}
