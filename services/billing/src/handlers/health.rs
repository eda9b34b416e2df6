use axum::{extract::State, http::StatusCode};

use paydesk_core::health::database_ready;

use crate::state::AppState;

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    database_ready(&state.db).await
}
