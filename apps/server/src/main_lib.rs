//! Shared application state and router assembly.

use std::sync::Arc;

use axum::Router;
use tokio::sync::Mutex;

use qsleads_core::generation::GenerationServiceTrait;
use qsleads_core::ids::IdentityGenerator;
use qsleads_core::opportunities::Opportunity;
use qsleads_core::store::RemoteStoreGateway;
use qsleads_core::sync::{
    CampaignSynchronizer, CrmSynchronizer, DocumentSynchronizer, OpportunitySynchronizer,
    SyncMode,
};

use crate::api;
use crate::error::{ApiError, ApiResult};

/// One synchronizer per entity group, each behind its own lock so intents
/// apply in arrival order.
pub struct AppState {
    pub mode: SyncMode,
    pub crm: Mutex<CrmSynchronizer>,
    pub campaigns: Mutex<CampaignSynchronizer>,
    pub documents: Mutex<DocumentSynchronizer>,
    pub opportunities: Mutex<OpportunitySynchronizer>,
    pub generation: Option<Arc<dyn GenerationServiceTrait>>,
}

impl AppState {
    pub fn new(
        gateway: Option<Arc<dyn RemoteStoreGateway>>,
        generation: Option<Arc<dyn GenerationServiceTrait>>,
    ) -> Self {
        let mode = SyncMode::select(gateway);
        let ids = Arc::new(IdentityGenerator::new());
        Self {
            crm: Mutex::new(CrmSynchronizer::new(mode.clone(), Arc::clone(&ids))),
            campaigns: Mutex::new(CampaignSynchronizer::new(mode.clone(), Arc::clone(&ids))),
            documents: Mutex::new(DocumentSynchronizer::new(mode.clone(), ids)),
            opportunities: Mutex::new(OpportunitySynchronizer::new(mode.clone())),
            mode,
            generation,
        }
    }

    /// Initial load of every entity group.
    pub async fn load(&self) {
        futures::join!(
            async { self.crm.lock().await.load().await },
            async { self.campaigns.lock().await.load().await },
            async { self.documents.lock().await.load().await },
            async { self.opportunities.lock().await.load().await },
        );
    }

    pub fn generation(&self) -> ApiResult<Arc<dyn GenerationServiceTrait>> {
        self.generation.clone().ok_or_else(|| {
            ApiError::ServiceUnavailable("Generation is not configured".to_string())
        })
    }

    /// A lead from the current search results or the watchlist.
    pub async fn opportunity(&self, id: &str) -> ApiResult<Opportunity> {
        self.opportunities
            .lock()
            .await
            .opportunity(id)
            .ok_or_else(|| ApiError::not_found("Opportunity", id))
    }
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", api::router())
        .with_state(state)
}
