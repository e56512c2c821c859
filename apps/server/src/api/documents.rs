//! Generated document routes: outreach assets and proposals.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use qsleads_core::documents::{DocumentContent, GeneratedDocument, NewDocument};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentFilter {
    #[serde(default)]
    opportunity_id: Option<String>,
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DocumentFilter>,
) -> Json<Vec<GeneratedDocument>> {
    let documents = state.documents.lock().await;
    match filter.opportunity_id {
        Some(opportunity_id) => Json(documents.documents_for_opportunity(&opportunity_id)),
        None => Json(documents.documents().to_vec()),
    }
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<GeneratedDocument>> {
    state
        .documents
        .lock()
        .await
        .document(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Document", &id))
}

async fn save_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<GeneratedDocument>)> {
    let document = state.documents.lock().await.save_document(body).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Replace the edited content. The kind must stay the same.
async fn update_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DocumentContent>,
) -> ApiResult<Json<GeneratedDocument>> {
    state
        .documents
        .lock()
        .await
        .update_document_content(&id, body)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Document", &id))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let found = state.documents.lock().await.delete_document(&id).await;
    ApiError::removed(found, "Document", &id)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents).post(save_document))
        .route("/documents/:id", get(get_document).delete(delete_document))
        .route("/documents/:id/content", put(update_content))
}
