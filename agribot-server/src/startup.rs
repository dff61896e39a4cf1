// Component wiring for the server process

use crate::config::AgribotConfig;
use crate::http::AppState;
use agribot_cns::{ActuatorClient, AutoLoopController, CnsError, ControlSurface, EventBus};
use agribot_eye::{DebugSink, DetectionPipeline, FileDebugSink, VisionError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Vision setup failed: {0}")]
    Vision(#[from] VisionError),

    #[error("Actuation setup failed: {0}")]
    Actuation(#[from] CnsError),
}

/// Everything the running server holds on to.
pub struct Agribot {
    pub state: AppState,
    pub controller: Arc<AutoLoopController>,
    pub events: Arc<EventBus>,
}

/// Build every component from a validated configuration. Nothing is started.
pub fn build(config: &AgribotConfig) -> Result<Agribot, StartupError> {
    let debug: Arc<dyn DebugSink> = Arc::new(FileDebugSink::new(config.vision.debug_output.clone()));
    let pipeline = Arc::new(DetectionPipeline::from_config(&config.vision, Arc::clone(&debug))?);
    info!(
        "Vision: {}x{} frames from {}, {}x{} grid",
        config.vision.image_size,
        config.vision.image_size,
        pipeline.describe_source(),
        config.vision.grid_size,
        config.vision.grid_size
    );
    if !pipeline.has_model() {
        warn!("No inference endpoint configured; detection will report no targets");
    }

    let actuator = Arc::new(ActuatorClient::new(&config.actuator)?);
    info!("Actuator commands go to {}", actuator.command_url());

    let events = Arc::new(EventBus::new());
    let controller = Arc::new(AutoLoopController::new(
        pipeline.clone(),
        actuator.clone(),
        events.clone(),
        config.autoloop.clone(),
        config.channels.clone(),
    )?);
    let control = Arc::new(ControlSurface::new(controller.clone(), actuator, events.clone()));

    Ok(Agribot {
        state: AppState::new(control, pipeline, debug),
        controller,
        events,
    })
}
