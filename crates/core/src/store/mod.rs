//! Remote store gateway contract.
//!
//! Every method is fail-soft: implementations catch transport, auth,
//! constraint and decode failures, log them, and degrade to `None`, an empty
//! list or `false`. Callers check [`RemoteStoreGateway::is_configured`]
//! before issuing anything else; the gateway does not guard itself.

#[cfg(any(test, feature = "test-utils"))]
mod memory;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryGateway;

use async_trait::async_trait;

use crate::campaigns::{CampaignUpdate, EmailCampaign, NewCampaign};
use crate::crm::{
    Company, CompanyUpdate, Contact, ContactUpdate, CrmActivity, DealUpdate, NewActivity,
    NewCompany, NewContact, NewDeal, NewStage, PipelineDeal, PipelineStage, StagePatch,
    StagePosition,
};
use crate::documents::{DocumentContent, GeneratedDocument, NewDocument};
use crate::opportunities::Opportunity;

/// Row cap for the global activity feed.
pub const ACTIVITY_FEED_LIMIT: usize = 100;

#[async_trait]
pub trait RemoteStoreGateway: Send + Sync {
    fn is_configured(&self) -> bool;

    // Companies, ordered by name
    async fn list_companies(&self) -> Vec<Company>;
    async fn get_company(&self, id: &str) -> Option<Company>;
    async fn create_company(&self, company: &NewCompany) -> Option<Company>;
    async fn update_company(&self, id: &str, update: &CompanyUpdate) -> Option<Company>;
    async fn delete_company(&self, id: &str) -> bool;

    // Contacts, newest first
    async fn list_contacts(&self) -> Vec<Contact>;
    async fn get_contact(&self, id: &str) -> Option<Contact>;
    /// Contacts of one company, ordered by last name.
    async fn list_contacts_by_company(&self, company_id: &str) -> Vec<Contact>;
    async fn create_contact(&self, contact: &NewContact) -> Option<Contact>;
    async fn update_contact(&self, id: &str, update: &ContactUpdate) -> Option<Contact>;
    async fn delete_contact(&self, id: &str) -> bool;

    // Stages, ordered by position
    async fn list_stages(&self) -> Vec<PipelineStage>;
    async fn create_stage(&self, stage: &NewStage) -> Option<PipelineStage>;
    async fn update_stage(&self, id: &str, patch: &StagePatch) -> Option<PipelineStage>;
    async fn delete_stage(&self, id: &str) -> bool;
    /// Position-only updates; true when every write succeeded.
    async fn reorder_stages(&self, positions: &[StagePosition]) -> bool;
    /// Bulk insert of the default template.
    async fn initialize_default_stages(&self, stages: &[NewStage]) -> Vec<PipelineStage>;

    // Deals, newest first
    async fn list_deals(&self) -> Vec<PipelineDeal>;
    /// Deals of one stage, oldest first.
    async fn list_deals_by_stage(&self, stage_id: &str) -> Vec<PipelineDeal>;
    async fn create_deal(&self, deal: &NewDeal) -> Option<PipelineDeal>;
    async fn update_deal(&self, id: &str, update: &DealUpdate) -> Option<PipelineDeal>;
    async fn delete_deal(&self, id: &str) -> bool;
    async fn move_deal(&self, id: &str, stage_id: &str) -> Option<PipelineDeal>;

    // Activities, newest first
    async fn list_activities(&self, limit: usize) -> Vec<CrmActivity>;
    async fn list_activities_by_contact(&self, contact_id: &str) -> Vec<CrmActivity>;
    async fn list_activities_by_deal(&self, deal_id: &str) -> Vec<CrmActivity>;
    async fn create_activity(&self, activity: &NewActivity) -> Option<CrmActivity>;
    async fn delete_activity(&self, id: &str) -> bool;

    // Campaigns, most recently updated first
    async fn list_campaigns(&self) -> Vec<EmailCampaign>;
    async fn get_campaign(&self, id: &str) -> Option<EmailCampaign>;
    async fn create_campaign(&self, campaign: &NewCampaign) -> Option<EmailCampaign>;
    async fn update_campaign(&self, id: &str, update: &CampaignUpdate) -> Option<EmailCampaign>;
    async fn delete_campaign(&self, id: &str) -> bool;

    // Generated documents, newest first
    async fn list_documents(&self) -> Vec<GeneratedDocument>;
    async fn list_documents_for_opportunity(&self, opportunity_id: &str) -> Vec<GeneratedDocument>;
    async fn create_document(&self, document: &NewDocument) -> Option<GeneratedDocument>;
    async fn update_document_content(
        &self,
        id: &str,
        content: &DocumentContent,
    ) -> Option<GeneratedDocument>;
    async fn delete_document(&self, id: &str) -> bool;

    // Opportunities and watchlist, newest first
    /// Upsert keyed on id.
    async fn save_opportunities(&self, opportunities: &[Opportunity]) -> bool;
    async fn list_opportunities(&self) -> Vec<Opportunity>;
    async fn add_to_watchlist(&self, opportunity_id: &str) -> bool;
    async fn remove_from_watchlist(&self, opportunity_id: &str) -> bool;
    async fn list_watchlist(&self) -> Vec<Opportunity>;
}
