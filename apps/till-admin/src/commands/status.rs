//! # Status Command

use till_engine::{EngineResult, HealthReport, TillService};

pub async fn health(service: &TillService) -> EngineResult<HealthReport> {
    service.health().await
}
