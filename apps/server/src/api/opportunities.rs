//! Lead search, watchlist, analysis and document generation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use qsleads_core::documents::{
    DocumentContent, DocumentKind, GeneratedDocument, NewDocument, ProposalSectionKey,
};
use qsleads_core::generation::{AnalysisResult, GroundingSource};
use qsleads_core::opportunities::Opportunity;

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OpportunitiesResponse {
    found: Vec<Opportunity>,
    sources: Vec<GroundingSource>,
    watchlist: Vec<Opportunity>,
    /// Found and watched leads, deduplicated by id.
    all: Vec<Opportunity>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    location: String,
    sector: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    text: String,
    sources: Vec<GroundingSource>,
    opportunities: Vec<Opportunity>,
}

#[derive(Debug, Serialize)]
struct WatchResponse {
    watched: bool,
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    location: String,
}

#[derive(Debug, Deserialize)]
struct GenerateDocumentRequest {
    kind: DocumentKind,
    /// Proposal sections; omitted means the standard proposal.
    #[serde(default)]
    sections: Option<Vec<ProposalSectionKey>>,
}

async fn list_opportunities(State(state): State<Arc<AppState>>) -> Json<OpportunitiesResponse> {
    let opportunities = state.opportunities.lock().await;
    Json(OpportunitiesResponse {
        found: opportunities.found().to_vec(),
        sources: opportunities.sources().to_vec(),
        watchlist: opportunities.watchlist().to_vec(),
        all: opportunities.all_opportunities(),
    })
}

/// Grounded search followed by extraction; the results replace the last search.
async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    if body.location.trim().is_empty() {
        return Err(ApiError::BadRequest("location is required".to_string()));
    }
    let generation = state.generation()?;
    let result = generation
        .find_opportunities(&body.location, &body.sector)
        .await?;
    let found = generation.parse_opportunities(&result.text).await?;
    info!(
        "Search in {} ({}) found {} leads",
        body.location,
        body.sector,
        found.len()
    );

    state
        .opportunities
        .lock()
        .await
        .record_search(found.clone(), result.sources.clone())
        .await;

    Ok(Json(SearchResponse {
        text: result.text,
        sources: result.sources,
        opportunities: found,
    }))
}

async fn list_watchlist(State(state): State<Arc<AppState>>) -> Json<Vec<Opportunity>> {
    Json(state.opportunities.lock().await.watchlist().to_vec())
}

async fn toggle_watch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WatchResponse>> {
    let mut opportunities = state.opportunities.lock().await;
    let opportunity = opportunities
        .opportunity(&id)
        .ok_or_else(|| ApiError::not_found("Opportunity", &id))?;
    let watched = opportunities.toggle_watchlist(opportunity).await;
    Ok(Json(WatchResponse { watched }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisResult>> {
    let generation = state.generation()?;
    let opportunity = state.opportunity(&id).await?;
    Ok(Json(generation.analyze_lead(&opportunity).await?))
}

async fn local_firms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Json<Vec<GroundingSource>>> {
    let generation = state.generation()?;
    Ok(Json(generation.find_local_firms(&query.location).await?))
}

/// Generate a document for a lead and save it.
async fn generate_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<GenerateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<GeneratedDocument>)> {
    let generation = state.generation()?;
    let opportunity = state.opportunity(&id).await?;

    let content = match body.kind {
        DocumentKind::EmailSequence => {
            DocumentContent::EmailSequence(generation.generate_email_sequence(&opportunity).await?)
        }
        DocumentKind::Proposal => match body.sections {
            Some(sections) => DocumentContent::Proposal(
                generation
                    .generate_custom_proposal(&opportunity, &sections)
                    .await?,
            ),
            None => DocumentContent::Proposal(generation.generate_proposal(&opportunity).await?),
        },
        DocumentKind::OnePager => {
            DocumentContent::OnePager(generation.generate_one_pager(&opportunity).await?)
        }
    };

    let document = state
        .documents
        .lock()
        .await
        .save_document(NewDocument {
            opportunity_id: opportunity.id,
            opportunity_title: opportunity.title,
            content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/opportunities", get(list_opportunities))
        .route("/opportunities/search", post(search))
        .route("/opportunities/watchlist", get(list_watchlist))
        .route("/opportunities/local-firms", get(local_firms))
        .route("/opportunities/:id/watch", post(toggle_watch))
        .route("/opportunities/:id/analysis", post(analyze))
        .route("/opportunities/:id/documents", post(generate_document))
}
