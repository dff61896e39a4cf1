//! Routing of external control requests

use crate::autoloop::AutoLoopController;
use crate::events::{DispatchOrigin, EventSink, LoopEvent};
use crate::outcome::DispatchOutcome;
use crate::transport::Dispatcher;
use agribot_core::Command;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

const START_TOKEN: &str = "auto";
const STOP_TOKEN: &str = "stop";

/// What a control request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlDirective {
    /// `{"<motion>": "auto"}`
    StartLoop,
    /// `{"<motion>": "stop"}`; also forwarded to the actuators
    StopLoop,
    /// Anything else, forwarded verbatim
    Forward,
}

/// What handling a request did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlReceipt {
    pub directive: ControlDirective,
    /// Whether the loop state changed
    pub loop_changed: bool,
    /// Outcome of the forwarded dispatch, if there was one
    pub outcome: Option<DispatchOutcome>,
}

pub struct ControlSurface {
    controller: Arc<AutoLoopController>,
    dispatcher: Arc<dyn Dispatcher>,
    events: Arc<dyn EventSink>,
}

impl ControlSurface {
    pub fn new(
        controller: Arc<AutoLoopController>,
        dispatcher: Arc<dyn Dispatcher>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            controller,
            dispatcher,
            events,
        }
    }

    pub fn controller(&self) -> &Arc<AutoLoopController> {
        &self.controller
    }

    /// Directives match only a single-key command on the motion channel.
    pub fn classify(&self, cmd: &Value) -> ControlDirective {
        let motion = &self.controller.channels().motion;
        match Command::from_payload(cmd) {
            Some(command) if &command.channel == motion => match command.value.as_str() {
                Some(START_TOKEN) => ControlDirective::StartLoop,
                Some(STOP_TOKEN) => ControlDirective::StopLoop,
                _ => ControlDirective::Forward,
            },
            _ => ControlDirective::Forward,
        }
    }

    pub async fn handle(&self, cmd: Value) -> ControlReceipt {
        let directive = self.classify(&cmd);
        match directive {
            ControlDirective::StartLoop => {
                let loop_changed = self.controller.start();
                if !loop_changed {
                    info!("Ignoring start request: auto loop already running");
                }
                ControlReceipt {
                    directive,
                    loop_changed,
                    outcome: None,
                }
            }
            ControlDirective::StopLoop => {
                let loop_changed = self.controller.stop();
                let outcome = self.forward(cmd).await;
                ControlReceipt {
                    directive,
                    loop_changed,
                    outcome: Some(outcome),
                }
            }
            ControlDirective::Forward => {
                let outcome = self.forward(cmd).await;
                ControlReceipt {
                    directive,
                    loop_changed: false,
                    outcome: Some(outcome),
                }
            }
        }
    }

    async fn forward(&self, payload: Value) -> DispatchOutcome {
        let outcome = self.dispatcher.dispatch(&payload).await;
        self.events.emit(LoopEvent::Dispatched {
            origin: DispatchOrigin::ControlSurface,
            payload,
            outcome: outcome.clone(),
        });
        outcome
    }
}
