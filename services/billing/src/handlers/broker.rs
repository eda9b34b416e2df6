use axum::{Json, extract::State};
use serde::Deserialize;

use crate::infra::broker::{BrokerStats, FailureSimulationStatus};
use crate::state::AppState;

pub async fn broker_stats(State(state): State<AppState>) -> Json<BrokerStats> {
    Json(state.broker.stats())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSimulationRequest {
    pub failures_before_success: u32,
}

pub async fn configure_failure_simulation(
    State(state): State<AppState>,
    Json(body): Json<FailureSimulationRequest>,
) -> Json<FailureSimulationStatus> {
    state
        .broker
        .configure_failure_simulation(body.failures_before_success);
    Json(state.broker.failure_simulation_status())
}

pub async fn reset_failure_simulation(
    State(state): State<AppState>,
) -> Json<FailureSimulationStatus> {
    state.broker.reset_failure_simulation();
    Json(state.broker.failure_simulation_status())
}
