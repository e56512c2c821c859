//! Process-local gateway that behaves like the hosted store.
//!
//! Test double for observing gateway traffic, built for this crate's tests
//! and behind the `test-utils` feature for other crates. Ids are UUIDs, as
//! the hosted store mints them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use super::RemoteStoreGateway;
use crate::campaigns::{CampaignUpdate, EmailCampaign, NewCampaign};
use crate::crm::{
    sort_stages, Company, CompanyUpdate, Contact, ContactUpdate, CrmActivity, DealUpdate,
    NewActivity, NewCompany, NewContact, NewDeal, NewStage, PipelineDeal, PipelineStage,
    StagePatch, StagePosition,
};
use crate::documents::{DocumentContent, GeneratedDocument, NewDocument};
use crate::ids::now_timestamp;
use crate::opportunities::Opportunity;

#[derive(Default)]
struct Tables {
    companies: Vec<Company>,
    contacts: Vec<Contact>,
    stages: Vec<PipelineStage>,
    deals: Vec<PipelineDeal>,
    activities: Vec<CrmActivity>,
    campaigns: Vec<EmailCampaign>,
    documents: Vec<GeneratedDocument>,
    opportunities: Vec<Opportunity>,
    watchlist: Vec<String>,
}

/// In-memory [`RemoteStoreGateway`] with a call counter and failure switches.
pub struct InMemoryGateway {
    configured: bool,
    tables: Mutex<Tables>,
    calls: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_initialize: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::with_configured(true)
    }

    /// A gateway that reports itself as not configured.
    pub fn unconfigured() -> Self {
        Self::with_configured(false)
    }

    fn with_configured(configured: bool) -> Self {
        Self {
            configured,
            tables: Mutex::new(Tables::default()),
            calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
        }
    }

    /// Number of data calls issued (`is_configured` is not counted).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every write degrade to `None` / `false`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every list call degrade to an empty result.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make default-stage initialization degrade to an empty result.
    pub fn set_fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    /// Seed stages directly, bypassing the call counter.
    pub fn seed_stages(&self, stages: Vec<PipelineStage>) {
        let mut tables = self.lock();
        tables.stages = stages;
        sort_stages(&mut tables.stages);
    }

    pub fn stage_count(&self) -> usize {
        self.lock().stages.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a panicking test thread; the data is still usable.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, operation: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("in-memory gateway: {}", operation);
    }

    fn read(&self, operation: &str) -> Option<MutexGuard<'_, Tables>> {
        self.record(operation);
        if self.fail_reads.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.lock())
    }

    fn write(&self, operation: &str) -> Option<MutexGuard<'_, Tables>> {
        self.record(operation);
        if self.fail_writes.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.lock())
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn remove_by_id<T>(rows: &mut Vec<T>, id: &str, key: impl Fn(&T) -> &str) -> bool {
    let before = rows.len();
    rows.retain(|row| key(row) != id);
    rows.len() != before
}

#[async_trait]
impl RemoteStoreGateway for InMemoryGateway {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn list_companies(&self) -> Vec<Company> {
        let Some(tables) = self.read("list_companies") else {
            return Vec::new();
        };
        let mut companies = tables.companies.clone();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        companies
    }

    async fn get_company(&self, id: &str) -> Option<Company> {
        let tables = self.read("get_company")?;
        tables.companies.iter().find(|c| c.id == id).cloned()
    }

    async fn create_company(&self, company: &NewCompany) -> Option<Company> {
        let mut tables = self.write("create_company")?;
        let row = Company::from_new(new_id(), now_timestamp(), company.clone());
        tables.companies.insert(0, row.clone());
        Some(row)
    }

    async fn update_company(&self, id: &str, update: &CompanyUpdate) -> Option<Company> {
        let mut tables = self.write("update_company")?;
        let row = tables.companies.iter_mut().find(|c| c.id == id)?;
        row.apply(update, now_timestamp());
        Some(row.clone())
    }

    async fn delete_company(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_company") else {
            return false;
        };
        // Mirrors the ON DELETE SET NULL foreign key.
        for contact in tables.contacts.iter_mut() {
            if contact.company_id.as_deref() == Some(id) {
                contact.company_id = None;
            }
        }
        remove_by_id(&mut tables.companies, id, |c| &c.id)
    }

    async fn list_contacts(&self) -> Vec<Contact> {
        self.read("list_contacts")
            .map(|t| t.contacts.clone())
            .unwrap_or_default()
    }

    async fn get_contact(&self, id: &str) -> Option<Contact> {
        let tables = self.read("get_contact")?;
        tables.contacts.iter().find(|c| c.id == id).cloned()
    }

    async fn list_contacts_by_company(&self, company_id: &str) -> Vec<Contact> {
        let Some(tables) = self.read("list_contacts_by_company") else {
            return Vec::new();
        };
        let mut contacts: Vec<Contact> = tables
            .contacts
            .iter()
            .filter(|c| c.company_id.as_deref() == Some(company_id))
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.last_name.cmp(&b.last_name));
        contacts
    }

    async fn create_contact(&self, contact: &NewContact) -> Option<Contact> {
        let mut tables = self.write("create_contact")?;
        let row = Contact::from_new(new_id(), now_timestamp(), contact.clone());
        tables.contacts.insert(0, row.clone());
        Some(row)
    }

    async fn update_contact(&self, id: &str, update: &ContactUpdate) -> Option<Contact> {
        let mut tables = self.write("update_contact")?;
        let row = tables.contacts.iter_mut().find(|c| c.id == id)?;
        row.apply(update, now_timestamp());
        Some(row.clone())
    }

    async fn delete_contact(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_contact") else {
            return false;
        };
        tables.deals.retain(|d| d.contact_id != id);
        tables.activities.retain(|a| a.contact_id != id);
        remove_by_id(&mut tables.contacts, id, |c| &c.id)
    }

    async fn list_stages(&self) -> Vec<PipelineStage> {
        self.read("list_stages")
            .map(|t| t.stages.clone())
            .unwrap_or_default()
    }

    async fn create_stage(&self, stage: &NewStage) -> Option<PipelineStage> {
        let mut tables = self.write("create_stage")?;
        let row = PipelineStage::from_new(new_id(), now_timestamp(), stage);
        tables.stages.push(row.clone());
        sort_stages(&mut tables.stages);
        Some(row)
    }

    async fn update_stage(&self, id: &str, patch: &StagePatch) -> Option<PipelineStage> {
        let mut tables = self.write("update_stage")?;
        let row = tables.stages.iter_mut().find(|s| s.id == id)?;
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(color) = patch.color {
            row.color = color;
        }
        if let Some(position) = patch.position {
            row.position = position;
        }
        let updated = row.clone();
        sort_stages(&mut tables.stages);
        Some(updated)
    }

    async fn delete_stage(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_stage") else {
            return false;
        };
        tables.deals.retain(|d| d.stage_id != id);
        remove_by_id(&mut tables.stages, id, |s| &s.id)
    }

    async fn reorder_stages(&self, positions: &[StagePosition]) -> bool {
        let Some(mut tables) = self.write("reorder_stages") else {
            return false;
        };
        let mut all_found = true;
        for entry in positions {
            match tables.stages.iter_mut().find(|s| s.id == entry.id) {
                Some(stage) => stage.position = entry.position,
                None => all_found = false,
            }
        }
        sort_stages(&mut tables.stages);
        all_found
    }

    async fn initialize_default_stages(&self, stages: &[NewStage]) -> Vec<PipelineStage> {
        self.record("initialize_default_stages");
        if self.fail_initialize.load(Ordering::SeqCst) || self.fail_writes.load(Ordering::SeqCst)
        {
            return Vec::new();
        }
        let mut tables = self.lock();
        let timestamp = now_timestamp();
        let rows: Vec<PipelineStage> = stages
            .iter()
            .map(|s| PipelineStage::from_new(new_id(), timestamp.clone(), s))
            .collect();
        tables.stages.extend(rows.iter().cloned());
        sort_stages(&mut tables.stages);
        rows
    }

    async fn list_deals(&self) -> Vec<PipelineDeal> {
        self.read("list_deals")
            .map(|t| t.deals.clone())
            .unwrap_or_default()
    }

    async fn list_deals_by_stage(&self, stage_id: &str) -> Vec<PipelineDeal> {
        self.read("list_deals_by_stage")
            .map(|t| {
                t.deals
                    .iter()
                    .rev()
                    .filter(|d| d.stage_id == stage_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn create_deal(&self, deal: &NewDeal) -> Option<PipelineDeal> {
        let mut tables = self.write("create_deal")?;
        let row = PipelineDeal::from_new(new_id(), now_timestamp(), deal.clone());
        tables.deals.insert(0, row.clone());
        Some(row)
    }

    async fn update_deal(&self, id: &str, update: &DealUpdate) -> Option<PipelineDeal> {
        let mut tables = self.write("update_deal")?;
        let row = tables.deals.iter_mut().find(|d| d.id == id)?;
        row.apply(update, now_timestamp());
        Some(row.clone())
    }

    async fn delete_deal(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_deal") else {
            return false;
        };
        remove_by_id(&mut tables.deals, id, |d| &d.id)
    }

    async fn move_deal(&self, id: &str, stage_id: &str) -> Option<PipelineDeal> {
        let mut tables = self.write("move_deal")?;
        let row = tables.deals.iter_mut().find(|d| d.id == id)?;
        row.stage_id = stage_id.to_string();
        row.updated_at = now_timestamp();
        Some(row.clone())
    }

    async fn list_activities(&self, limit: usize) -> Vec<CrmActivity> {
        self.read("list_activities")
            .map(|t| t.activities.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    async fn list_activities_by_contact(&self, contact_id: &str) -> Vec<CrmActivity> {
        self.read("list_activities_by_contact")
            .map(|t| {
                t.activities
                    .iter()
                    .filter(|a| a.contact_id == contact_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn list_activities_by_deal(&self, deal_id: &str) -> Vec<CrmActivity> {
        self.read("list_activities_by_deal")
            .map(|t| {
                t.activities
                    .iter()
                    .filter(|a| a.deal_id.as_deref() == Some(deal_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn create_activity(&self, activity: &NewActivity) -> Option<CrmActivity> {
        let mut tables = self.write("create_activity")?;
        let row = CrmActivity::from_new(new_id(), now_timestamp(), activity.clone());
        tables.activities.insert(0, row.clone());
        Some(row)
    }

    async fn delete_activity(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_activity") else {
            return false;
        };
        remove_by_id(&mut tables.activities, id, |a| &a.id)
    }

    async fn list_campaigns(&self) -> Vec<EmailCampaign> {
        self.read("list_campaigns")
            .map(|t| t.campaigns.clone())
            .unwrap_or_default()
    }

    async fn get_campaign(&self, id: &str) -> Option<EmailCampaign> {
        let tables = self.read("get_campaign")?;
        tables.campaigns.iter().find(|c| c.id == id).cloned()
    }

    async fn create_campaign(&self, campaign: &NewCampaign) -> Option<EmailCampaign> {
        let mut tables = self.write("create_campaign")?;
        let row = EmailCampaign::from_new(new_id(), now_timestamp(), campaign.clone());
        tables.campaigns.insert(0, row.clone());
        Some(row)
    }

    async fn update_campaign(&self, id: &str, update: &CampaignUpdate) -> Option<EmailCampaign> {
        let mut tables = self.write("update_campaign")?;
        let index = tables.campaigns.iter().position(|c| c.id == id)?;
        let mut row = tables.campaigns.remove(index);
        row.apply(update, now_timestamp());
        tables.campaigns.insert(0, row.clone());
        Some(row)
    }

    async fn delete_campaign(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_campaign") else {
            return false;
        };
        remove_by_id(&mut tables.campaigns, id, |c| &c.id)
    }

    async fn list_documents(&self) -> Vec<GeneratedDocument> {
        self.read("list_documents")
            .map(|t| t.documents.clone())
            .unwrap_or_default()
    }

    async fn list_documents_for_opportunity(&self, opportunity_id: &str) -> Vec<GeneratedDocument> {
        self.read("list_documents_for_opportunity")
            .map(|t| {
                t.documents
                    .iter()
                    .filter(|d| d.opportunity_id == opportunity_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn create_document(&self, document: &NewDocument) -> Option<GeneratedDocument> {
        let mut tables = self.write("create_document")?;
        let row = GeneratedDocument::from_new(new_id(), now_timestamp(), document.clone());
        tables.documents.insert(0, row.clone());
        Some(row)
    }

    async fn update_document_content(
        &self,
        id: &str,
        content: &DocumentContent,
    ) -> Option<GeneratedDocument> {
        let mut tables = self.write("update_document_content")?;
        let row = tables.documents.iter_mut().find(|d| d.id == id)?;
        row.content = content.clone();
        row.updated_at = now_timestamp();
        Some(row.clone())
    }

    async fn delete_document(&self, id: &str) -> bool {
        let Some(mut tables) = self.write("delete_document") else {
            return false;
        };
        remove_by_id(&mut tables.documents, id, |d| &d.id)
    }

    async fn save_opportunities(&self, opportunities: &[Opportunity]) -> bool {
        let Some(mut tables) = self.write("save_opportunities") else {
            return false;
        };
        for opportunity in opportunities {
            match tables
                .opportunities
                .iter_mut()
                .find(|o| o.id == opportunity.id)
            {
                Some(existing) => *existing = opportunity.clone(),
                None => tables.opportunities.insert(0, opportunity.clone()),
            }
        }
        true
    }

    async fn list_opportunities(&self) -> Vec<Opportunity> {
        self.read("list_opportunities")
            .map(|t| t.opportunities.clone())
            .unwrap_or_default()
    }

    async fn add_to_watchlist(&self, opportunity_id: &str) -> bool {
        let Some(mut tables) = self.write("add_to_watchlist") else {
            return false;
        };
        if !tables.watchlist.iter().any(|id| id == opportunity_id) {
            tables.watchlist.insert(0, opportunity_id.to_string());
        }
        true
    }

    async fn remove_from_watchlist(&self, opportunity_id: &str) -> bool {
        let Some(mut tables) = self.write("remove_from_watchlist") else {
            return false;
        };
        tables.watchlist.retain(|id| id != opportunity_id);
        true
    }

    async fn list_watchlist(&self) -> Vec<Opportunity> {
        let Some(tables) = self.read("list_watchlist") else {
            return Vec::new();
        };
        tables
            .watchlist
            .iter()
            .filter_map(|id| tables.opportunities.iter().find(|o| &o.id == id).cloned())
            .collect()
    }
}
