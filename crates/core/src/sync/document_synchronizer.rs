//! Synchronizer for generated documents (email sequences, proposals, one-pagers).

use std::sync::Arc;

use log::{debug, warn};

use super::sync_mode::{SyncEntity, SyncMode, SyncOperation};
use super::{local_identity, log_intent};
use crate::documents::{DocumentContent, GeneratedDocument, NewDocument};
use crate::errors::{require_text, Result};
use crate::ids::IdentityGenerator;

pub struct DocumentSynchronizer {
    mode: SyncMode,
    ids: Arc<IdentityGenerator>,
    documents: Vec<GeneratedDocument>,
}

impl DocumentSynchronizer {
    pub fn new(mode: SyncMode, ids: Arc<IdentityGenerator>) -> Self {
        Self {
            mode,
            ids,
            documents: Vec::new(),
        }
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn documents(&self) -> &[GeneratedDocument] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&GeneratedDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn documents_for_opportunity(&self, opportunity_id: &str) -> Vec<GeneratedDocument> {
        self.documents
            .iter()
            .filter(|d| d.opportunity_id == opportunity_id)
            .cloned()
            .collect()
    }

    pub async fn load(&mut self) {
        if let Some(gateway) = self.mode.gateway() {
            self.documents = gateway.list_documents().await;
            debug!("Loaded {} generated documents", self.documents.len());
        }
    }

    /// Persist a generation result.
    pub async fn save_document(&mut self, new: NewDocument) -> Result<GeneratedDocument> {
        require_text("opportunityId", &new.opportunity_id)?;

        let remote = match self.mode.gateway() {
            Some(gateway) => gateway.create_document(&new).await,
            None => None,
        };
        let document = match remote {
            Some(document) => document,
            None => {
                let (id, ts) = local_identity(&self.mode, &self.ids, SyncEntity::Document);
                GeneratedDocument::from_new(id, ts, new)
            }
        };
        log_intent(&self.mode, SyncEntity::Document, SyncOperation::Create, &document.id);
        self.documents.insert(0, document.clone());
        Ok(document)
    }

    /// Replace a document's content after an edit. The kind may not change.
    pub async fn update_document_content(
        &mut self,
        id: &str,
        content: DocumentContent,
    ) -> Result<Option<GeneratedDocument>> {
        if let Some(existing) = self.document(id) {
            if existing.kind() != content.kind() {
                return Err(crate::Error::validation(format!(
                    "document {} is a {}, not a {}",
                    id,
                    existing.kind().as_str(),
                    content.kind().as_str()
                )));
            }
        }

        let remote = match self.mode.gateway_for(id) {
            Some(gateway) => gateway.update_document_content(id, &content).await,
            None => None,
        };
        log_intent(&self.mode, SyncEntity::Document, SyncOperation::Update, id);
        let now = self.ids.now();
        let Some(slot) = self.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(remote);
        };
        match remote {
            Some(row) => *slot = row,
            None => {
                slot.content = content;
                slot.updated_at = now;
            }
        }
        Ok(Some(slot.clone()))
    }

    pub async fn delete_document(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_document(id).await {
                warn!("Remote delete of document {} failed; removing locally", id);
            }
        }
        log_intent(&self.mode, SyncEntity::Document, SyncOperation::Delete, id);
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        self.documents.len() != before
    }
}
