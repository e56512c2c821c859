//! JSON routes, mounted under `/api/v1`.

mod campaigns;
mod crm;
mod documents;
mod opportunities;


use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::main_lib::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    mode: &'static str,
    remote_configured: bool,
    generation_configured: bool,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        mode: state.mode.label(),
        remote_configured: state.mode.is_remote(),
        generation_configured: state.generation.is_some(),
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .merge(crm::router())
        .merge(campaigns::router())
        .merge(documents::router())
        .merge(opportunities::router())
}
