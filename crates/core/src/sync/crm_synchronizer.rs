//! Synchronizer for contacts, companies, pipeline stages, deals and activities.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::sync_mode::{SyncEntity, SyncMode, SyncOperation};
use super::{local_identity, log_intent};
use crate::crm::{
    default_pipeline_stages, sort_stages, ActivityType, Company, CompanyUpdate, Contact,
    ContactUpdate, CrmActivity, DealUpdate, NewActivity, NewCompany, NewContact, NewDeal,
    PipelineDeal, PipelineStage, StageChanges, StagePosition,
};
use crate::errors::{require_text, Error, Result};
use crate::ids::IdentityGenerator;
use crate::store::ACTIVITY_FEED_LIMIT;
use crate::utils::dedup_ids;

/// Placeholder for a stage name that no longer resolves.
pub const UNKNOWN_STAGE: &str = "unknown";

/// The in-memory CRM collections presented to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmState {
    pub contacts: Vec<Contact>,
    pub companies: Vec<Company>,
    pub stages: Vec<PipelineStage>,
    pub deals: Vec<PipelineDeal>,
    pub activities: Vec<CrmActivity>,
}

pub struct CrmSynchronizer {
    mode: SyncMode,
    ids: Arc<IdentityGenerator>,
    state: CrmState,
}

impl CrmSynchronizer {
    pub fn new(mode: SyncMode, ids: Arc<IdentityGenerator>) -> Self {
        Self {
            mode,
            ids,
            state: CrmState::default(),
        }
    }

    pub fn mode(&self) -> &SyncMode {
        &self.mode
    }

    pub fn state(&self) -> &CrmState {
        &self.state
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.state.contacts
    }

    pub fn companies(&self) -> &[Company] {
        &self.state.companies
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.state.stages
    }

    pub fn deals(&self) -> &[PipelineDeal] {
        &self.state.deals
    }

    pub fn activities(&self) -> &[CrmActivity] {
        &self.state.activities
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.state.contacts.iter().find(|c| c.id == id)
    }

    pub fn company(&self, id: &str) -> Option<&Company> {
        self.state.companies.iter().find(|c| c.id == id)
    }

    pub fn deal(&self, id: &str) -> Option<&PipelineDeal> {
        self.state.deals.iter().find(|d| d.id == id)
    }

    fn has_stage(&self, id: &str) -> bool {
        self.state.stages.iter().any(|s| s.id == id)
    }

    fn stage_label(&self, id: &str) -> String {
        self.state
            .stages
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| UNKNOWN_STAGE.to_string())
    }

    fn mint(&self, entity: SyncEntity) -> (String, String) {
        local_identity(&self.mode, &self.ids, entity)
    }

    fn log_intent(&self, entity: SyncEntity, operation: SyncOperation, id: &str) {
        log_intent(&self.mode, entity, operation, id);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Load
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch every collection (remote branch) and seed an empty pipeline.
    pub async fn load(&mut self) {
        if let Some(gateway) = self.mode.gateway().cloned() {
            let (contacts, companies, stages, deals, activities) = futures::join!(
                gateway.list_contacts(),
                gateway.list_companies(),
                gateway.list_stages(),
                gateway.list_deals(),
                gateway.list_activities(ACTIVITY_FEED_LIMIT),
            );
            debug!(
                "Loaded {} contacts, {} companies, {} stages, {} deals, {} activities",
                contacts.len(),
                companies.len(),
                stages.len(),
                deals.len(),
                activities.len()
            );
            self.state = CrmState {
                contacts,
                companies,
                stages,
                deals,
                activities,
            };
            sort_stages(&mut self.state.stages);
        }
        self.bootstrap_stages().await;
    }

    async fn bootstrap_stages(&mut self) {
        if !self.state.stages.is_empty() {
            return;
        }
        let template = default_pipeline_stages();
        if let Some(gateway) = self.mode.gateway() {
            let mut created = gateway.initialize_default_stages(&template).await;
            if !created.is_empty() {
                sort_stages(&mut created);
                self.state.stages = created;
                return;
            }
            warn!("Default stage initialization returned nothing; using a local pipeline");
        }
        self.state.stages = template
            .iter()
            .map(|stage| {
                let (id, ts) = self.ids.mint();
                PipelineStage::from_new(id, ts, stage)
            })
            .collect();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Contacts
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a contact and log its `contact_created` activity.
    pub async fn create_contact(&mut self, new: NewContact) -> Result<Contact> {
        require_text("firstName", &new.first_name)?;
        require_text("lastName", &new.last_name)?;

        let remote = match self.mode.gateway() {
            Some(gateway) => gateway.create_contact(&new).await,
            None => None,
        };
        let contact = match remote {
            Some(contact) => contact,
            None => {
                let (id, ts) = self.mint(SyncEntity::Contact);
                Contact::from_new(id, ts, new)
            }
        };
        self.log_intent(SyncEntity::Contact, SyncOperation::Create, &contact.id);
        self.state.contacts.insert(0, contact.clone());

        self.record_activity(NewActivity {
            contact_id: contact.id.clone(),
            deal_id: None,
            activity_type: ActivityType::ContactCreated,
            title: format!("{} was added", contact.full_name()),
            description: String::new(),
        })
        .await;
        Ok(contact)
    }

    pub async fn update_contact(
        &mut self,
        id: &str,
        update: ContactUpdate,
    ) -> Result<Option<Contact>> {
        if let Some(first_name) = &update.first_name {
            require_text("firstName", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            require_text("lastName", last_name)?;
        }

        let remote = match self.mode.gateway_for(id) {
            Some(gateway) => gateway.update_contact(id, &update).await,
            None => None,
        };
        self.log_intent(SyncEntity::Contact, SyncOperation::Update, id);
        let now = self.ids.now();
        let Some(slot) = self.state.contacts.iter_mut().find(|c| c.id == id) else {
            return Ok(remote);
        };
        match remote {
            Some(row) => *slot = row,
            None => slot.apply(&update, now),
        }
        Ok(Some(slot.clone()))
    }

    /// Delete a contact together with its deals and activities.
    pub async fn delete_contact(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_contact(id).await {
                warn!("Remote delete of contact {} failed; removing locally", id);
            }
        }
        self.log_intent(SyncEntity::Contact, SyncOperation::Delete, id);
        let before = self.state.contacts.len();
        self.state.contacts.retain(|c| c.id != id);
        self.state.deals.retain(|d| d.contact_id != id);
        self.state.activities.retain(|a| a.contact_id != id);
        self.state.contacts.len() != before
    }

    /// Replace a contact's linked opportunities.
    pub async fn link_opportunities(
        &mut self,
        contact_id: &str,
        opportunity_ids: Vec<String>,
    ) -> Option<Contact> {
        let update = ContactUpdate {
            linked_opportunity_ids: Some(dedup_ids(opportunity_ids)),
            ..Default::default()
        };
        // No form fields in the update, so validation cannot fail.
        self.update_contact(contact_id, update).await.ok().flatten()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_company(&mut self, new: NewCompany) -> Result<Company> {
        require_text("name", &new.name)?;

        let remote = match self.mode.gateway() {
            Some(gateway) => gateway.create_company(&new).await,
            None => None,
        };
        let company = match remote {
            Some(company) => company,
            None => {
                let (id, ts) = self.mint(SyncEntity::Company);
                Company::from_new(id, ts, new)
            }
        };
        self.log_intent(SyncEntity::Company, SyncOperation::Create, &company.id);
        self.state.companies.insert(0, company.clone());
        Ok(company)
    }

    pub async fn update_company(
        &mut self,
        id: &str,
        update: CompanyUpdate,
    ) -> Result<Option<Company>> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }

        let remote = match self.mode.gateway_for(id) {
            Some(gateway) => gateway.update_company(id, &update).await,
            None => None,
        };
        self.log_intent(SyncEntity::Company, SyncOperation::Update, id);
        let now = self.ids.now();
        let Some(slot) = self.state.companies.iter_mut().find(|c| c.id == id) else {
            return Ok(remote);
        };
        match remote {
            Some(row) => *slot = row,
            None => slot.apply(&update, now),
        }
        Ok(Some(slot.clone()))
    }

    /// Delete a company. Its contacts stay, with the company link cleared.
    pub async fn delete_company(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_company(id).await {
                warn!("Remote delete of company {} failed; removing locally", id);
            }
        }
        self.log_intent(SyncEntity::Company, SyncOperation::Delete, id);
        let before = self.state.companies.len();
        self.state.companies.retain(|c| c.id != id);
        for contact in self.state.contacts.iter_mut() {
            if contact.company_id.as_deref() == Some(id) {
                contact.company_id = None;
            }
        }
        self.state.companies.len() != before
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deals
    // ─────────────────────────────────────────────────────────────────────────

    fn require_stage(&self, stage_id: &str) -> Result<()> {
        if !self.has_stage(stage_id) {
            return Err(Error::validation(format!(
                "stageId {} does not match a pipeline stage",
                stage_id
            )));
        }
        Ok(())
    }

    pub async fn create_deal(&mut self, new: NewDeal) -> Result<PipelineDeal> {
        let new = new.normalized();
        require_text("title", &new.title)?;
        require_text("contactId", &new.contact_id)?;
        self.require_stage(&new.stage_id)?;

        let remote = match self.mode.gateway() {
            Some(gateway) => gateway.create_deal(&new).await,
            None => None,
        };
        let deal = match remote {
            Some(deal) => deal,
            None => {
                let (id, ts) = self.mint(SyncEntity::Deal);
                PipelineDeal::from_new(id, ts, new)
            }
        };
        self.log_intent(SyncEntity::Deal, SyncOperation::Create, &deal.id);
        self.state.deals.insert(0, deal.clone());
        Ok(deal)
    }

    pub async fn update_deal(
        &mut self,
        id: &str,
        update: DealUpdate,
    ) -> Result<Option<PipelineDeal>> {
        let update = update.normalized();
        if let Some(title) = &update.title {
            require_text("title", title)?;
        }
        if let Some(contact_id) = &update.contact_id {
            require_text("contactId", contact_id)?;
        }
        if let Some(stage_id) = &update.stage_id {
            self.require_stage(stage_id)?;
        }

        let remote = match self.mode.gateway_for(id) {
            Some(gateway) => gateway.update_deal(id, &update).await,
            None => None,
        };
        self.log_intent(SyncEntity::Deal, SyncOperation::Update, id);
        let now = self.ids.now();
        let Some(slot) = self.state.deals.iter_mut().find(|d| d.id == id) else {
            return Ok(remote);
        };
        match remote {
            Some(row) => *slot = row,
            None => slot.apply(&update, now),
        }
        Ok(Some(slot.clone()))
    }

    pub async fn delete_deal(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_deal(id).await {
                warn!("Remote delete of deal {} failed; removing locally", id);
            }
        }
        self.log_intent(SyncEntity::Deal, SyncOperation::Delete, id);
        let before = self.state.deals.len();
        self.state.deals.retain(|d| d.id != id);
        self.state.deals.len() != before
    }

    /// Move a deal to another stage and log a `deal_moved` activity.
    ///
    /// Unknown deals and moves to the current stage change nothing. An
    /// unknown target stage is accepted and rendered as `unknown`.
    pub async fn move_deal(&mut self, deal_id: &str, to_stage_id: &str) -> Option<CrmActivity> {
        let deal = self.deal(deal_id)?.clone();
        if deal.stage_id == to_stage_id {
            return None;
        }
        let from = self.stage_label(&deal.stage_id);
        let to = self.stage_label(to_stage_id);

        let remote = match self.mode.gateway_for(deal_id) {
            Some(gateway) => gateway.move_deal(deal_id, to_stage_id).await,
            None => None,
        };
        self.log_intent(SyncEntity::Deal, SyncOperation::Move, deal_id);
        let now = self.ids.now();
        if let Some(slot) = self.state.deals.iter_mut().find(|d| d.id == deal_id) {
            match remote {
                Some(row) => *slot = row,
                None => {
                    slot.stage_id = to_stage_id.to_string();
                    slot.updated_at = now;
                }
            }
        }

        let activity = self
            .record_activity(NewActivity {
                contact_id: deal.contact_id.clone(),
                deal_id: Some(deal.id.clone()),
                activity_type: ActivityType::DealMoved,
                title: format!("Deal \"{}\" moved to {}", deal.title, to),
                description: format!("From {} to {}", from, to),
            })
            .await;
        Some(activity)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Activities
    // ─────────────────────────────────────────────────────────────────────────

    async fn record_activity(&mut self, new: NewActivity) -> CrmActivity {
        let remote = match self.mode.gateway_for(&new.contact_id) {
            Some(gateway) => gateway.create_activity(&new).await,
            None => None,
        };
        let activity = match remote {
            Some(activity) => activity,
            None => {
                let (id, ts) = self.mint(SyncEntity::Activity);
                CrmActivity::from_new(id, ts, new)
            }
        };
        self.log_intent(SyncEntity::Activity, SyncOperation::Create, &activity.id);
        self.state.activities.insert(0, activity.clone());
        activity
    }

    /// Append an activity for a contact.
    pub async fn log_activity(
        &mut self,
        contact_id: &str,
        activity_type: ActivityType,
        title: &str,
        description: &str,
    ) -> CrmActivity {
        self.record_activity(NewActivity {
            contact_id: contact_id.to_string(),
            deal_id: None,
            activity_type,
            title: title.to_string(),
            description: description.to_string(),
        })
        .await
    }

    /// Append an activity to the first contact; nothing happens without contacts.
    pub async fn log_global_activity(
        &mut self,
        activity_type: ActivityType,
        title: &str,
        description: &str,
    ) -> Option<CrmActivity> {
        let contact_id = self.state.contacts.first()?.id.clone();
        Some(
            self.log_activity(&contact_id, activity_type, title, description)
                .await,
        )
    }

    pub async fn delete_activity(&mut self, id: &str) -> bool {
        if let Some(gateway) = self.mode.gateway_for(id) {
            if !gateway.delete_activity(id).await {
                warn!("Remote delete of activity {} failed; removing locally", id);
            }
        }
        self.log_intent(SyncEntity::Activity, SyncOperation::Delete, id);
        let before = self.state.activities.len();
        self.state.activities.retain(|a| a.id != id);
        self.state.activities.len() != before
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stages
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a stage-manager batch: delete, then update, then create.
    ///
    /// Deals of deleted stages go with them. In remote mode the stage list is
    /// re-fetched afterwards since new stage ids are assigned by the store.
    pub async fn apply_stage_changes(&mut self, changes: StageChanges) {
        let deleted: HashSet<&str> = changes.deleted.iter().map(String::as_str).collect();

        for id in &changes.deleted {
            if let Some(gateway) = self.mode.gateway_for(id) {
                if !gateway.delete_stage(id).await {
                    warn!("Remote delete of stage {} failed", id);
                }
            }
            self.log_intent(SyncEntity::Stage, SyncOperation::Delete, id);
        }
        self.state.stages.retain(|s| !deleted.contains(s.id.as_str()));

        for edit in &changes.updated {
            if let Some(gateway) = self.mode.gateway_for(&edit.id) {
                if gateway.update_stage(&edit.id, &edit.patch()).await.is_none() {
                    warn!("Remote update of stage {} returned no row", edit.id);
                }
            }
            self.log_intent(SyncEntity::Stage, SyncOperation::Update, &edit.id);
            if let Some(stage) = self.state.stages.iter_mut().find(|s| s.id == edit.id) {
                stage.name = edit.name.clone();
                stage.color = edit.color;
                stage.position = edit.position;
            }
        }

        for new in &changes.created {
            let remote = match self.mode.gateway() {
                Some(gateway) => gateway.create_stage(new).await,
                None => None,
            };
            let stage = match remote {
                Some(stage) => stage,
                None => {
                    let (id, ts) = self.mint(SyncEntity::Stage);
                    PipelineStage::from_new(id, ts, new)
                }
            };
            self.log_intent(SyncEntity::Stage, SyncOperation::Create, &stage.id);
            self.state.stages.push(stage);
        }
        sort_stages(&mut self.state.stages);
        self.state
            .deals
            .retain(|d| !deleted.contains(d.stage_id.as_str()));

        if let Some(gateway) = self.mode.gateway() {
            let mut fresh = gateway.list_stages().await;
            if fresh.is_empty() {
                warn!("Stage re-fetch returned nothing; keeping the locally applied stages");
                return;
            }
            sort_stages(&mut fresh);
            self.state.stages = fresh;
            let known: HashSet<&str> = self.state.stages.iter().map(|s| s.id.as_str()).collect();
            self.state
                .deals
                .retain(|d| known.contains(d.stage_id.as_str()));
        }
    }

    /// Persist position-only changes and re-sort.
    pub async fn reorder_stages(&mut self, positions: Vec<StagePosition>) {
        if let Some(gateway) = self.mode.gateway() {
            let remote: Vec<StagePosition> = positions
                .iter()
                .filter(|p| self.mode.gateway_for(&p.id).is_some())
                .cloned()
                .collect();
            if !remote.is_empty() && !gateway.reorder_stages(&remote).await {
                warn!("Remote stage reorder did not complete; applying locally");
            }
        }
        for entry in &positions {
            if let Some(stage) = self.state.stages.iter_mut().find(|s| s.id == entry.id) {
                stage.position = entry.position;
            }
        }
        sort_stages(&mut self.state.stages);
    }
}

impl std::fmt::Debug for CrmSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmSynchronizer")
            .field("mode", &self.mode)
            .field("contacts", &self.state.contacts.len())
            .field("stages", &self.state.stages.len())
            .field("deals", &self.state.deals.len())
            .finish()
    }
}
