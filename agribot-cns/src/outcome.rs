//! Result of a single dispatch to the actuator controller

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a dispatch did not produce a usable answer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum DispatchFailure {
    #[error("actuator did not answer in time")]
    Timeout,

    #[error("actuator unreachable")]
    ConnectionError,

    #[error("actuator answered with HTTP {0}")]
    HttpError(u16),

    #[error("actuator answer was not JSON")]
    InvalidResponse,
}

/// Every dispatch attempt ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Success(Value),
    Failure(DispatchFailure),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<DispatchFailure> {
        match self {
            DispatchOutcome::Failure(failure) => Some(*failure),
            DispatchOutcome::Success(_) => None,
        }
    }
}

impl From<DispatchFailure> for DispatchOutcome {
    fn from(failure: DispatchFailure) -> Self {
        DispatchOutcome::Failure(failure)
    }
}
