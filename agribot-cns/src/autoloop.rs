//! The autonomous detect-and-actuate loop
//!
//! One controller owns the loop state behind a single lock. `start()` spawns
//! an executor task; `stop()` flips the state and signals the executor, which
//! winds down at its next checkpoint. A restarted executor waits for its
//! predecessor before dispatching anything, so the actuator link never sees
//! two sequences interleaved.

use crate::config::{ChannelMap, LoopConfig};
use crate::error::CnsError;
use crate::events::{DispatchOrigin, EventSink, LoopEvent};
use crate::transport::Dispatcher;
use agribot_core::{Command, GridDetector};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Running,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Running => "running",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Slot {
    state: LoopState,
    generation: u64,
    cancel: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

struct Shared {
    slot: Mutex<Slot>,
    live_executors: AtomicUsize,
}

/// Collaborators every executor gets a handle to
#[derive(Clone)]
struct Wiring {
    detector: Arc<dyn GridDetector>,
    dispatcher: Arc<dyn Dispatcher>,
    events: Arc<dyn EventSink>,
    config: Arc<LoopConfig>,
    channels: Arc<ChannelMap>,
}

pub struct AutoLoopController {
    shared: Arc<Shared>,
    wiring: Wiring,
}

impl AutoLoopController {
    pub fn new(
        detector: Arc<dyn GridDetector>,
        dispatcher: Arc<dyn Dispatcher>,
        events: Arc<dyn EventSink>,
        config: LoopConfig,
        channels: ChannelMap,
    ) -> Result<Self, CnsError> {
        config.validate().map_err(CnsError::Validation)?;
        channels.validate().map_err(CnsError::Validation)?;

        Ok(Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: LoopState::Idle,
                    generation: 0,
                    cancel: None,
                    handle: None,
                }),
                live_executors: AtomicUsize::new(0),
            }),
            wiring: Wiring {
                detector,
                dispatcher,
                events,
                config: Arc::new(config),
                channels: Arc::new(channels),
            },
        })
    }

    /// Start the loop. Returns `false` without side effects if it is
    /// already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.state == LoopState::Running {
            debug!("Auto loop already running (generation {})", slot.generation);
            return false;
        }

        slot.generation += 1;
        let generation = slot.generation;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let predecessor = slot.handle.take();

        // Precedes every event of the new executor
        self.wiring.events.emit(LoopEvent::LoopStarted { generation });

        let shared = Arc::clone(&self.shared);
        let wiring = self.wiring.clone();
        let handle = tokio::spawn(async move {
            // Built on first poll: a task dropped unpolled must not touch the slot
            let guard = ExitGuard {
                shared,
                events: Arc::clone(&wiring.events),
                generation,
                cycles: 0,
                counted: false,
                finished: false,
            };
            let executor = Executor {
                wiring,
                cancel: cancel_rx,
                guard,
            };
            if let Some(previous) = predecessor {
                if let Err(e) = previous.await {
                    debug!("Previous executor ended with {}", e);
                }
            }
            executor.run().await;
        });

        slot.state = LoopState::Running;
        slot.cancel = Some(cancel_tx);
        slot.handle = Some(handle);
        true
    }

    /// Request the loop to stop. Returns immediately; an in-flight dispatch
    /// completes before the executor exits. Returns `false` if the loop was
    /// not running.
    pub fn stop(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.state != LoopState::Running {
            return false;
        }

        slot.state = LoopState::Idle;
        if let Some(cancel) = slot.cancel.take() {
            let _ = cancel.send(true);
        }
        self.wiring.events.emit(LoopEvent::StopRequested {
            generation: slot.generation,
        });
        true
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn state(&self) -> LoopState {
        self.shared.slot.lock().state
    }

    /// Generation of the most recently started executor; 0 before the first start.
    pub fn generation(&self) -> u64 {
        self.shared.slot.lock().generation
    }

    /// Executors currently past their predecessor and able to dispatch.
    pub fn active_executors(&self) -> usize {
        self.shared.live_executors.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &LoopConfig {
        &self.wiring.config
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.wiring.channels
    }

    /// Stop and wait for the executor to finish its in-flight step.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.shared.slot.lock().handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Auto loop executor failed during shutdown: {}", e);
            }
        }
        info!("Auto loop shut down");
    }
}

impl Drop for AutoLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Puts the controller back to Idle if its executor ends without a stop
/// request, including by panic.
struct ExitGuard {
    shared: Arc<Shared>,
    events: Arc<dyn EventSink>,
    generation: u64,
    cycles: u64,
    counted: bool,
    finished: bool,
}

impl ExitGuard {
    fn enter(&mut self) {
        self.shared.live_executors.fetch_add(1, Ordering::SeqCst);
        self.counted = true;
    }

    /// Still the current executor and nobody asked it to stop.
    fn owns(&self, slot: &Slot) -> bool {
        slot.generation == self.generation && slot.state == LoopState::Running
    }

    fn exited_unexpectedly(&self, slot: &Slot) -> bool {
        !self.finished && self.owns(slot)
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if self.counted {
            self.shared.live_executors.fetch_sub(1, Ordering::SeqCst);
        }

        let mut slot = self.shared.slot.lock();
        if self.exited_unexpectedly(&slot) {
            error!(
                "Auto loop executor {} terminated abnormally after {} cycles",
                self.generation, self.cycles
            );
        } else if !self.finished {
            debug!(
                "Auto loop executor {} dropped after stop ({} cycles)",
                self.generation, self.cycles
            );
        }

        if self.owns(&slot) {
            slot.state = LoopState::Idle;
            slot.cancel = None;
            self.events.emit(LoopEvent::ExecutorExited {
                generation: self.generation,
                cycles: self.cycles,
            });
        }
    }
}

struct Executor {
    wiring: Wiring,
    cancel: watch::Receiver<bool>,
    guard: ExitGuard,
}

impl Executor {
    async fn run(mut self) {
        self.guard.enter();
        debug!("Auto loop executor {} running", self.guard.generation);

        let channels = Arc::clone(&self.wiring.channels);
        let config = Arc::clone(&self.wiring.config);

        while !self.is_cancelled() {
            self.guard.cycles += 1;
            let cycle = self.guard.cycles;
            self.wiring.events.emit(LoopEvent::CycleStarted { cycle });

            self.dispatch(cycle, &channels.motion, config.reverse_value.clone()).await;

            let targets = self.wiring.detector.detect().await;
            self.wiring.events.emit(LoopEvent::TargetsDetected {
                cycle,
                targets: targets.clone(),
            });
            if self.is_cancelled() {
                break;
            }

            // First detection wins; the rest wait for a later cycle
            if let Some(target) = targets.first() {
                self.dispatch(cycle, &channels.target_x, json!(target.i)).await;
                self.dispatch(cycle, &channels.target_y, json!(target.j)).await;

                if self.pause(config.settle_delay()).await {
                    break;
                }
                self.dispatch(cycle, &channels.trigger, config.trigger_value.clone()).await;
            }

            self.wiring.events.emit(LoopEvent::CycleCompleted { cycle });
            if self.pause(config.cycle_interval()).await {
                break;
            }
        }

        debug!(
            "Auto loop executor {} stopped after {} cycles",
            self.guard.generation, self.guard.cycles
        );
        self.guard.finished = true;
    }

    async fn dispatch(&self, cycle: u64, channel: &str, value: Value) {
        let payload = Command::new(channel, value).to_payload();
        let outcome = self.wiring.dispatcher.dispatch(&payload).await;
        self.wiring.events.emit(LoopEvent::Dispatched {
            origin: DispatchOrigin::AutoLoop { cycle },
            payload,
            outcome,
        });
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.cancel.has_changed().is_err()
    }

    /// Sleep for `duration` unless cancelled first. Returns whether the
    /// executor should exit.
    async fn pause(&mut self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let cancel = &mut self.cancel;
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = cancel.changed() => {}
        }
        self.is_cancelled()
    }
}
