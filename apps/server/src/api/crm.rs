//! Contacts, companies, pipeline stages, deals and activities.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use qsleads_core::crm::{
    ActivityType, Company, CompanyUpdate, Contact, ContactUpdate, CrmActivity, DealUpdate,
    NewCompany, NewContact, NewDeal, PipelineDeal, PipelineStage, StageChanges, StagePosition,
};
use qsleads_core::opportunities::Opportunity;
use qsleads_core::sync::CrmState;
use qsleads_core::views::{self, PipelineSummary};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactDetail {
    contact: Contact,
    company: Option<Company>,
    deals: Vec<PipelineDeal>,
    activities: Vec<CrmActivity>,
    linked_opportunities: Vec<Opportunity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompanyDetail {
    company: Company,
    contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkOpportunitiesRequest {
    opportunity_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveDealRequest {
    stage_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StageColumn {
    stage: PipelineStage,
    deals: Vec<PipelineDeal>,
}

/// Activity form. Without a contact the activity goes to the first contact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogActivityRequest {
    #[serde(default)]
    contact_id: Option<String>,
    #[serde(rename = "type")]
    activity_type: ActivityType,
    title: String,
    #[serde(default)]
    description: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Overview
// ─────────────────────────────────────────────────────────────────────────────

async fn get_crm_state(State(state): State<Arc<AppState>>) -> Json<CrmState> {
    Json(state.crm.lock().await.state().clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Contacts
// ─────────────────────────────────────────────────────────────────────────────

async fn list_contacts(State(state): State<Arc<AppState>>) -> Json<Vec<Contact>> {
    Json(state.crm.lock().await.contacts().to_vec())
}

async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ContactDetail>> {
    let opportunities = state.opportunities.lock().await.all_opportunities();
    let crm = state.crm.lock().await;
    let contact = crm
        .contact(&id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Contact", &id))?;
    Ok(Json(ContactDetail {
        company: views::company_for_contact(&contact, crm.companies()).cloned(),
        deals: views::deals_for_contact(crm.deals(), &id),
        activities: views::activities_for_contact(crm.activities(), &id),
        linked_opportunities: views::linked_opportunities(&contact, &opportunities),
        contact,
    }))
}

async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = state.crm.lock().await.create_contact(body).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ContactUpdate>,
) -> ApiResult<Json<Contact>> {
    state
        .crm
        .lock()
        .await
        .update_contact(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact", &id))
}

async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.crm.lock().await.delete_contact(&id).await;
    ApiError::removed(found, "Contact", &id)
}

async fn link_opportunities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<LinkOpportunitiesRequest>,
) -> ApiResult<Json<Contact>> {
    state
        .crm
        .lock()
        .await
        .link_opportunities(&id, body.opportunity_ids)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact", &id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Companies
// ─────────────────────────────────────────────────────────────────────────────

async fn list_companies(State(state): State<Arc<AppState>>) -> Json<Vec<Company>> {
    Json(state.crm.lock().await.companies().to_vec())
}

async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompanyDetail>> {
    let crm = state.crm.lock().await;
    let company = crm
        .company(&id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Company", &id))?;
    Ok(Json(CompanyDetail {
        contacts: views::contacts_for_company(crm.contacts(), &id),
        company,
    }))
}

async fn create_company(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewCompany>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let company = state.crm.lock().await.create_company(body).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CompanyUpdate>,
) -> ApiResult<Json<Company>> {
    state
        .crm
        .lock()
        .await
        .update_company(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company", &id))
}

async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.crm.lock().await.delete_company(&id).await;
    ApiError::removed(found, "Company", &id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

async fn list_stages(State(state): State<Arc<AppState>>) -> Json<Vec<PipelineStage>> {
    Json(state.crm.lock().await.stages().to_vec())
}

async fn apply_stage_changes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StageChanges>,
) -> Json<Vec<PipelineStage>> {
    let mut crm = state.crm.lock().await;
    crm.apply_stage_changes(body).await;
    Json(crm.stages().to_vec())
}

async fn reorder_stages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Vec<StagePosition>>,
) -> Json<Vec<PipelineStage>> {
    let mut crm = state.crm.lock().await;
    crm.reorder_stages(body).await;
    Json(crm.stages().to_vec())
}

async fn get_pipeline_summary(State(state): State<Arc<AppState>>) -> Json<Vec<PipelineSummary>> {
    let crm = state.crm.lock().await;
    Json(views::pipeline_summary(crm.stages(), crm.deals()))
}

async fn get_pipeline_board(State(state): State<Arc<AppState>>) -> Json<Vec<StageColumn>> {
    let crm = state.crm.lock().await;
    let columns = crm
        .stages()
        .iter()
        .cloned()
        .zip(views::deals_by_stage(crm.stages(), crm.deals()))
        .map(|(stage, (_, deals))| StageColumn { stage, deals })
        .collect();
    Json(columns)
}

// ─────────────────────────────────────────────────────────────────────────────
// Deals
// ─────────────────────────────────────────────────────────────────────────────

async fn list_deals(State(state): State<Arc<AppState>>) -> Json<Vec<PipelineDeal>> {
    Json(state.crm.lock().await.deals().to_vec())
}

async fn create_deal(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewDeal>,
) -> ApiResult<(StatusCode, Json<PipelineDeal>)> {
    let deal = state.crm.lock().await.create_deal(body).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

async fn update_deal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DealUpdate>,
) -> ApiResult<Json<PipelineDeal>> {
    state
        .crm
        .lock()
        .await
        .update_deal(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Deal", &id))
}

async fn delete_deal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.crm.lock().await.delete_deal(&id).await;
    ApiError::removed(found, "Deal", &id)
}

/// Returns the `deal_moved` activity, or `null` when nothing moved.
async fn move_deal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<MoveDealRequest>,
) -> Json<Option<CrmActivity>> {
    Json(state.crm.lock().await.move_deal(&id, &body.stage_id).await)
}

async fn list_deal_activities(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Vec<CrmActivity>> {
    let crm = state.crm.lock().await;
    Json(views::activities_for_deal(crm.activities(), &id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Activities
// ─────────────────────────────────────────────────────────────────────────────

async fn list_activities(State(state): State<Arc<AppState>>) -> Json<Vec<CrmActivity>> {
    Json(state.crm.lock().await.activities().to_vec())
}

async fn log_activity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogActivityRequest>,
) -> ApiResult<(StatusCode, Json<CrmActivity>)> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let mut crm = state.crm.lock().await;
    let activity = match body.contact_id.as_deref().filter(|id| !id.is_empty()) {
        Some(contact_id) => {
            if crm.contact(contact_id).is_none() {
                return Err(ApiError::not_found("Contact", contact_id));
            }
            crm.log_activity(contact_id, body.activity_type, &body.title, &body.description)
                .await
        }
        None => crm
            .log_global_activity(body.activity_type, &body.title, &body.description)
            .await
            .ok_or_else(|| {
                ApiError::BadRequest("Add a contact before logging activities".to_string())
            })?,
    };
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.crm.lock().await.delete_activity(&id).await;
    ApiError::removed(found, "Activity", &id)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/crm", get(get_crm_state))
        // Contacts
        .route("/crm/contacts", get(list_contacts).post(create_contact))
        .route(
            "/crm/contacts/:id",
            get(get_contact).patch(update_contact).delete(delete_contact),
        )
        .route("/crm/contacts/:id/opportunities", put(link_opportunities))
        // Companies
        .route("/crm/companies", get(list_companies).post(create_company))
        .route(
            "/crm/companies/:id",
            get(get_company).patch(update_company).delete(delete_company),
        )
        // Pipeline
        .route("/crm/stages", get(list_stages))
        .route("/crm/stages/changes", post(apply_stage_changes))
        .route("/crm/stages/reorder", post(reorder_stages))
        .route("/crm/pipeline", get(get_pipeline_summary))
        .route("/crm/pipeline/board", get(get_pipeline_board))
        // Deals
        .route("/crm/deals", get(list_deals).post(create_deal))
        .route("/crm/deals/:id", patch(update_deal).delete(delete_deal))
        .route("/crm/deals/:id/move", post(move_deal))
        .route("/crm/deals/:id/activities", get(list_deal_activities))
        // Activities
        .route("/crm/activities", get(list_activities).post(log_activity))
        .route("/crm/activities/:id", delete(delete_activity))
}
