//! Email campaign routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use qsleads_core::campaigns::{
    CampaignStatus, CampaignUpdate, EmailCampaign, EmailStep, NewCampaign,
};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: CampaignStatus,
}

#[derive(Debug, Deserialize)]
struct StepsRequest {
    steps: Vec<EmailStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkContactsRequest {
    contact_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateStepsRequest {
    opportunity_id: String,
}

fn missing(id: &str) -> ApiError {
    ApiError::not_found("Campaign", id)
}

async fn list_campaigns(State(state): State<Arc<AppState>>) -> Json<Vec<EmailCampaign>> {
    Json(state.campaigns.lock().await.campaigns().to_vec())
}

async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EmailCampaign>> {
    state
        .campaigns
        .lock()
        .await
        .campaign(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| missing(&id))
}

async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewCampaign>,
) -> ApiResult<(StatusCode, Json<EmailCampaign>)> {
    let campaign = state.campaigns.lock().await.create_campaign(body).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn update_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CampaignUpdate>,
) -> ApiResult<Json<EmailCampaign>> {
    state
        .campaigns
        .lock()
        .await
        .update_campaign(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| missing(&id))
}

async fn delete_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.campaigns.lock().await.delete_campaign(&id).await;
    ApiError::removed(found, "Campaign", &id)
}

async fn duplicate_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<EmailCampaign>)> {
    let copy = state
        .campaigns
        .lock()
        .await
        .duplicate_campaign(&id)
        .await?
        .ok_or_else(|| missing(&id))?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<EmailCampaign>> {
    state
        .campaigns
        .lock()
        .await
        .change_status(&id, body.status)
        .await
        .map(Json)
        .ok_or_else(|| missing(&id))
}

async fn update_steps(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StepsRequest>,
) -> ApiResult<Json<EmailCampaign>> {
    state
        .campaigns
        .lock()
        .await
        .update_steps(&id, body.steps)
        .await
        .map(Json)
        .ok_or_else(|| missing(&id))
}

async fn link_contacts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<LinkContactsRequest>,
) -> ApiResult<Json<EmailCampaign>> {
    state
        .campaigns
        .lock()
        .await
        .link_contacts(&id, body.contact_ids)
        .await
        .map(Json)
        .ok_or_else(|| missing(&id))
}

/// Draft steps for an opportunity; nothing is saved.
async fn generate_steps(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateStepsRequest>,
) -> ApiResult<Json<Vec<EmailStep>>> {
    let generation = state.generation()?;
    let opportunity = state.opportunity(&body.opportunity_id).await?;
    let steps = generation.generate_campaign_steps(&opportunity).await?;
    Ok(Json(steps))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/generate-steps", post(generate_steps))
        .route(
            "/campaigns/:id",
            get(get_campaign)
                .patch(update_campaign)
                .delete(delete_campaign),
        )
        .route("/campaigns/:id/duplicate", post(duplicate_campaign))
        .route("/campaigns/:id/status", put(change_status))
        .route("/campaigns/:id/steps", put(update_steps))
        .route("/campaigns/:id/contacts", put(link_contacts))
}
