//! agribot-cns: actuation side of the agribot control loop
//!
//! Provides:
//! - HTTP dispatch of commands to the remote actuator controller
//! - Structured outcomes and an event bus for every dispatch
//! - The autonomous detect-and-actuate loop with cooperative cancellation
//! - Routing of control-surface requests into loop directives

pub mod autoloop;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod outcome;
pub mod transport;

pub use autoloop::{AutoLoopController, LoopState};
pub use config::{ActuatorConfig, ChannelMap, LoopConfig};
pub use control::{ControlDirective, ControlReceipt, ControlSurface};
pub use error::CnsError;
pub use events::{DispatchOrigin, EventBus, EventRecord, EventSink, LoopEvent};
pub use outcome::{DispatchFailure, DispatchOutcome};
pub use transport::{ActuatorClient, Dispatcher};
