//! Tests for the auto loop: sequencing, timing and lifecycle
//!
//! All tests run on a paused clock, so sleeps advance virtual time only.

use agribot_cns::{
    AutoLoopController, ChannelMap, DispatchFailure, DispatchOrigin, DispatchOutcome, Dispatcher,
    EventBus, LoopConfig, LoopEvent, LoopState,
};
use agribot_core::{GridCoordinate, GridDetector};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct ScriptedDetector {
    script: Mutex<VecDeque<Vec<GridCoordinate>>>,
}

impl ScriptedDetector {
    fn new(script: Vec<Vec<(u32, u32)>>) -> Self {
        let script = script
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|(i, j)| GridCoordinate::new(i, j)).collect())
            .collect();
        Self {
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl GridDetector for ScriptedDetector {
    async fn detect(&self) -> Vec<GridCoordinate> {
        self.script.lock().pop_front().unwrap_or_default()
    }
}

struct PanickingDetector;

#[async_trait]
impl GridDetector for PanickingDetector {
    async fn detect(&self) -> Vec<GridCoordinate> {
        panic!("camera driver crashed");
    }
}

struct RecordingDispatcher {
    origin: Instant,
    outcome: DispatchOutcome,
    latency: Duration,
    log: Mutex<Vec<(u128, Value)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingDispatcher {
    fn new() -> Self {
        Self::with(DispatchOutcome::Success(json!({"ok": true})), Duration::ZERO)
    }

    fn with(outcome: DispatchOutcome, latency: Duration) -> Self {
        Self {
            origin: Instant::now(),
            outcome,
            latency,
            log: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// (milliseconds since creation, payload) for every dispatch start
    fn log(&self) -> Vec<(u128, Value)> {
        self.log.lock().clone()
    }

    fn payloads(&self) -> Vec<Value> {
        self.log().into_iter().map(|(_, payload)| payload).collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, payload: &Value) -> DispatchOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log
            .lock()
            .push((self.origin.elapsed().as_millis(), payload.clone()));
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn endpoint(&self) -> String {
        "recording".to_string()
    }
}

fn controller(
    detector: Arc<dyn GridDetector>,
    dispatcher: Arc<RecordingDispatcher>,
    bus: Arc<EventBus>,
) -> AutoLoopController {
    AutoLoopController::new(detector, dispatcher, bus, LoopConfig::default(), ChannelMap::default()).unwrap()
}

fn assert_schedule(log: &[(u128, Value)], expected: &[(u128, Value)]) {
    assert_eq!(log.len(), expected.len(), "dispatch log: {:?}", log);
    for ((at, payload), (want_at, want_payload)) in log.iter().zip(expected) {
        assert_eq!(payload, want_payload);
        assert!(
            at.abs_diff(*want_at) <= 1,
            "{} dispatched at {}ms, expected {}ms",
            payload,
            at,
            want_at
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_sequence_uses_first_target_only() {
    let detector = Arc::new(ScriptedDetector::new(vec![vec![(6, 2), (1, 1)]]));
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let loop_ctl = controller(detector, dispatcher.clone(), Arc::new(EventBus::new()));

    assert!(loop_ctl.start());
    sleep(Duration::from_millis(7500)).await;

    assert_schedule(
        &dispatcher.log(),
        &[
            (0, json!({"0": "reverse"})),
            (0, json!({"3": 6})),
            (0, json!({"4": 2})),
            (2000, json!({"5": 1})),
            (7000, json!({"0": "reverse"})),
        ],
    );
    loop_ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_detection_only_reverses() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(Vec::new())),
        dispatcher.clone(),
        Arc::new(EventBus::new()),
    );

    loop_ctl.start();
    sleep(Duration::from_millis(11_000)).await;

    assert_schedule(
        &dispatcher.log(),
        &[
            (0, json!({"0": "reverse"})),
            (5000, json!({"0": "reverse"})),
            (10_000, json!({"0": "reverse"})),
        ],
    );
    loop_ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failures_keep_schedule() {
    let dispatcher = Arc::new(RecordingDispatcher::with(
        DispatchOutcome::Failure(DispatchFailure::Timeout),
        Duration::ZERO,
    ));
    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe();
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(vec![vec![(1, 1)]])),
        dispatcher.clone(),
        bus,
    );

    loop_ctl.start();
    sleep(Duration::from_millis(7500)).await;

    assert_eq!(dispatcher.log().len(), 5);
    assert_eq!(dispatcher.log()[4].0, 7000);
    assert!(loop_ctl.is_running());

    let mut failures = 0;
    while let Ok(record) = events.try_recv() {
        if let LoopEvent::Dispatched { origin, outcome, .. } = record.event {
            assert!(matches!(origin, DispatchOrigin::AutoLoop { .. }));
            assert_eq!(outcome.failure(), Some(DispatchFailure::Timeout));
            failures += 1;
        }
    }
    assert_eq!(failures, 5);
    loop_ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_event_order_for_one_cycle() {
    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe();
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(vec![vec![(0, 7)]])),
        Arc::new(RecordingDispatcher::new()),
        bus,
    );

    loop_ctl.start();
    sleep(Duration::from_millis(2500)).await;
    loop_ctl.stop();

    let mut kinds = Vec::new();
    while let Ok(record) = events.try_recv() {
        kinds.push(match record.event {
            LoopEvent::LoopStarted { generation } => format!("started:{}", generation),
            LoopEvent::CycleStarted { cycle } => format!("cycle:{}", cycle),
            LoopEvent::TargetsDetected { targets, .. } => format!("targets:{}", targets.len()),
            LoopEvent::Dispatched { payload, .. } => format!("dispatch:{}", payload),
            LoopEvent::CycleCompleted { cycle } => format!("done:{}", cycle),
            LoopEvent::StopRequested { generation } => format!("stop:{}", generation),
            LoopEvent::ExecutorExited { generation, .. } => format!("exited:{}", generation),
        });
    }

    assert_eq!(
        kinds,
        vec![
            "started:1",
            "cycle:1",
            r#"dispatch:{"0":"reverse"}"#,
            "targets:1",
            r#"dispatch:{"3":0}"#,
            r#"dispatch:{"4":7}"#,
            r#"dispatch:{"5":1}"#,
            "done:1",
            "stop:1",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_noop() {
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(Vec::new())),
        Arc::new(RecordingDispatcher::new()),
        Arc::new(EventBus::new()),
    );

    assert!(loop_ctl.start());
    assert!(!loop_ctl.start());
    sleep(Duration::from_millis(100)).await;

    assert_eq!(loop_ctl.generation(), 1);
    assert_eq!(loop_ctl.active_executors(), 1);
    loop_ctl.shutdown().await;
    assert_eq!(loop_ctl.active_executors(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_start_stop_leaves_idle() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(Vec::new())),
        dispatcher.clone(),
        Arc::new(EventBus::new()),
    );

    assert!(!loop_ctl.stop());
    assert!(loop_ctl.start());
    assert!(loop_ctl.stop());
    assert_eq!(loop_ctl.state(), LoopState::Idle);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(loop_ctl.state(), LoopState::Idle);
    assert_eq!(loop_ctl.active_executors(), 0);
    assert!(dispatcher.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_settle_skips_trigger() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(vec![vec![(2, 3)]])),
        dispatcher.clone(),
        Arc::new(EventBus::new()),
    );

    loop_ctl.start();
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(dispatcher.log().len(), 3);

    assert!(loop_ctl.stop());
    sleep(Duration::from_millis(10_000)).await;

    assert_eq!(
        dispatcher.payloads(),
        vec![json!({"0": "reverse"}), json!({"3": 2}), json!({"4": 3})]
    );
    assert_eq!(loop_ctl.active_executors(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_waits_for_in_flight_dispatch() {
    let dispatcher = Arc::new(RecordingDispatcher::with(
        DispatchOutcome::Success(json!({})),
        Duration::from_millis(1000),
    ));
    let loop_ctl = controller(
        Arc::new(ScriptedDetector::new(Vec::new())),
        dispatcher.clone(),
        Arc::new(EventBus::new()),
    );

    loop_ctl.start();
    sleep(Duration::from_millis(500)).await;

    // First executor is mid-dispatch
    assert!(loop_ctl.stop());
    assert!(loop_ctl.start());
    assert_eq!(loop_ctl.generation(), 2);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(loop_ctl.active_executors(), 1);

    sleep(Duration::from_millis(3000)).await;

    let log = dispatcher.log();
    assert_eq!(log.len(), 2, "dispatch log: {:?}", log);
    assert_eq!(log[0].0, 0);
    assert!(log[1].0 >= 1000, "second executor dispatched at {}ms", log[1].0);
    assert_eq!(dispatcher.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(loop_ctl.active_executors(), 1);
    loop_ctl.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_executor_panic_resets_state() {
    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe();
    let loop_ctl = controller(Arc::new(PanickingDetector), Arc::new(RecordingDispatcher::new()), bus);

    assert!(loop_ctl.start());
    sleep(Duration::from_millis(10)).await;

    assert_eq!(loop_ctl.state(), LoopState::Idle);
    assert_eq!(loop_ctl.active_executors(), 0);

    let mut exited = None;
    while let Ok(record) = events.try_recv() {
        if let LoopEvent::ExecutorExited { generation, cycles } = record.event {
            exited = Some((generation, cycles));
        }
    }
    assert_eq!(exited, Some((1, 1)));

    // The controller can be started again
    assert!(loop_ctl.start());
    assert_eq!(loop_ctl.generation(), 2);
    loop_ctl.stop();
}

#[tokio::test(start_paused = true)]
async fn test_custom_channels_and_timing() {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let config = LoopConfig {
        cycle_interval_ms: 1000,
        settle_delay_ms: 250,
        reverse_value: json!("back"),
        trigger_value: json!("fire"),
    };
    let channels = ChannelMap {
        motion: "drive".to_string(),
        target_x: "x".to_string(),
        target_y: "y".to_string(),
        trigger: "laser".to_string(),
    };
    let loop_ctl = AutoLoopController::new(
        Arc::new(ScriptedDetector::new(vec![vec![(4, 5)]])),
        dispatcher.clone(),
        Arc::new(EventBus::new()),
        config,
        channels,
    )
    .unwrap();

    loop_ctl.start();
    sleep(Duration::from_millis(1300)).await;

    assert_schedule(
        &dispatcher.log(),
        &[
            (0, json!({"drive": "back"})),
            (0, json!({"x": 4})),
            (0, json!({"y": 5})),
            (250, json!({"laser": "fire"})),
            (1250, json!({"drive": "back"})),
        ],
    );
    loop_ctl.shutdown().await;
}
