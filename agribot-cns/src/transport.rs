//! Command dispatch to the remote actuator controller

use crate::config::ActuatorConfig;
use crate::error::CnsError;
use crate::outcome::{DispatchFailure, DispatchOutcome};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Anything that can deliver a command payload to the actuators.
///
/// Implementations never fail: every attempt is reduced to a
/// [`DispatchOutcome`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, payload: &Value) -> DispatchOutcome;

    fn endpoint(&self) -> String;
}

/// HTTP client for the actuator controller.
///
/// Posts `application/x-www-form-urlencoded` with a single field `body`
/// holding the JSON command. No retries.
pub struct ActuatorClient {
    client: reqwest::Client,
    command_url: String,
}

impl ActuatorClient {
    pub fn new(config: &ActuatorConfig) -> Result<Self, CnsError> {
        config.validate().map_err(CnsError::Validation)?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CnsError::Transport(format!("Failed to build actuator client: {}", e)))?;

        Ok(Self {
            client,
            command_url: format!("{}/cmd", config.base_url.trim_end_matches('/')),
        })
    }

    pub fn command_url(&self) -> &str {
        &self.command_url
    }

    /// Deliver one payload and classify the result.
    pub async fn send(&self, payload: &Value) -> DispatchOutcome {
        let body = payload.to_string();
        debug!("POST {} body={}", self.command_url, body);

        let response = match self
            .client
            .post(&self.command_url)
            .form(&[("body", body.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e).into(),
        };

        let status = response.status();
        if !status.is_success() {
            return DispatchFailure::HttpError(status.as_u16()).into();
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return classify_transport_error(&e).into(),
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => DispatchOutcome::Success(value),
            Err(_) => DispatchFailure::InvalidResponse.into(),
        }
    }
}

fn classify_transport_error(err: &reqwest::Error) -> DispatchFailure {
    if err.is_timeout() {
        DispatchFailure::Timeout
    } else {
        DispatchFailure::ConnectionError
    }
}

#[async_trait]
impl Dispatcher for ActuatorClient {
    async fn dispatch(&self, payload: &Value) -> DispatchOutcome {
        self.send(payload).await
    }

    fn endpoint(&self) -> String {
        self.command_url.clone()
    }
}
