//! Synchronizer for email campaigns.

use std::sync::Arc;

use log::{debug, warn};

use super::sync_mode::{SyncEntity, SyncMode, SyncOperation};
use super::{local_identity, log_intent};
use crate::campaigns::{CampaignStatus, CampaignUpdate, EmailCampaign, EmailStep, NewCampaign};
use crate::errors::{require_text, Result};
use crate::ids::IdentityGenerator;
use crate::utils::dedup_ids;

pub struct CampaignSynchronizer {
    mode: SyncMode,
    ids: Arc<IdentityGenerator>,
    campaigns: Vec<EmailCampaign>,
}

impl CampaignSynchronizer {
    pub fn new(mode: SyncMode, ids: Arc<IdentityGenerator>) -> Self {
        Self {
            mode,
            ids,
            campaigns: Vec::new(),
        }
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn campaigns(&self) -> &[EmailCampaign] {
        &self.campaigns
    }

    pub fn campaign(&self, id: &str) -> Option<&EmailCampaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    /// Replace the collection with the store's campaigns. Local mode keeps
    /// whatever this session created.
    pub async fn load(&mut self) {
        if let Some(gateway) = self.mode.gateway() {
            self.campaigns = gateway.list_campaigns().await;
            debug!("Loaded {} campaigns", self.campaigns.len());
        }
    }

    pub async fn create_campaign(&mut self, new: NewCampaign) -> Result<EmailCampaign> {
        require_text("name", &new.name)?;

        let remote = match self.mode.gateway() {
            Some(gateway) => gateway.create_campaign(&new).await,
            None => None,
        };
        let campaign = match remote {
            Some(campaign) => campaign,
            None => {
                let (id, ts) = local_identity(&self.mode, &self.ids, SyncEntity::Campaign);
                EmailCampaign::from_new(id, ts, new)
            }
        };
        log_intent(&self.mode, SyncEntity::Campaign, SyncOperation::Create, &campaign.id);
        self.campaigns.insert(0, campaign.clone());
        Ok(campaign)
    }

    pub async fn update_campaign(
        &mut self,
        id: &str,
        update: CampaignUpdate,
    ) -> Result<Option<EmailCampaign>> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }

        let remote = match self.mode.gateway_for(id) {
            Some(gateway) => gateway.update_campaign(id, &update).await,
            None => None,
        };
        log_intent(&self.mode, SyncEntity::Campaign, SyncOperation::Update, id);
        let now = self.ids.now();
        let Some(slot) = self.campaigns.iter_mut().find(|c| c.id == id) else {
            return Ok(remote);
        };
        match remote {
            Some(row) => *slot = row,
            None => slot.apply(&update, now),
        }
        Ok(Some(slot.clone()))
    }

    pub async fn delete_campaign(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_campaign(id).await {
                warn!("Remote delete of campaign {} failed; removing locally", id);
            }
        }
        log_intent(&self.mode, SyncEntity::Campaign, SyncOperation::Delete, id);
        let before = self.campaigns.len();
        self.campaigns.retain(|c| c.id != id);
        self.campaigns.len() != before
    }

    /// Create a draft copy named `"{name} (Copy)"` with the same steps and links.
    pub async fn duplicate_campaign(&mut self, id: &str) -> Result<Option<EmailCampaign>> {
        let Some(source) = self.campaign(id) else {
            return Ok(None);
        };
        let request = source.duplicate_request();
        self.create_campaign(request).await.map(Some)
    }

    /// Any transition is allowed.
    pub async fn change_status(
        &mut self,
        id: &str,
        status: CampaignStatus,
    ) -> Option<EmailCampaign> {
        self.update_campaign(id, CampaignUpdate::status(status))
            .await
            .ok()
            .flatten()
    }

    pub async fn update_steps(&mut self, id: &str, steps: Vec<EmailStep>) -> Option<EmailCampaign> {
        self.update_campaign(id, CampaignUpdate::steps(steps))
            .await
            .ok()
            .flatten()
    }

    pub async fn link_contacts(
        &mut self,
        id: &str,
        contact_ids: Vec<String>,
    ) -> Option<EmailCampaign> {
        self.update_campaign(id, CampaignUpdate::linked_contacts(dedup_ids(contact_ids)))
            .await
            .ok()
            .flatten()
    }
}
