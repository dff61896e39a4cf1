//! Seam between the control loop and whatever produces grid targets

use crate::types::GridCoordinate;
use async_trait::async_trait;

/// Produces the grid cells of the objects visible right now.
///
/// Implementations must not fail: a cycle that cannot capture or infer
/// yields an empty list and reports the cause through its own logging.
/// The order of the returned coordinates is detection order.
#[async_trait]
pub trait GridDetector: Send + Sync {
    async fn detect(&self) -> Vec<GridCoordinate>;
}

/// Detector that never sees anything.
pub struct NoTargets;

#[async_trait]
impl GridDetector for NoTargets {
    async fn detect(&self) -> Vec<GridCoordinate> {
        Vec::new()
    }
}
