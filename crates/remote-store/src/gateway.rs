//! Fail-soft [`RemoteStoreGateway`] backed by the hosted PostgREST endpoint.
//!
//! Every failure is logged and degrades to `None`, an empty list or `false`.

use async_trait::async_trait;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use qsleads_core::campaigns::{CampaignUpdate, EmailCampaign, NewCampaign};
use qsleads_core::crm::{
    Company, CompanyUpdate, Contact, ContactUpdate, CrmActivity, DealUpdate, NewActivity,
    NewCompany, NewContact, NewDeal, NewStage, PipelineDeal, PipelineStage, StagePatch,
    StagePosition,
};
use qsleads_core::documents::{DocumentContent, GeneratedDocument, NewDocument};
use qsleads_core::ids::now_timestamp;
use qsleads_core::opportunities::Opportunity;
use qsleads_core::store::RemoteStoreGateway;
use qsleads_core::sync::SyncEntity;

use crate::client::{Order, PostgrestClient, Query};
use crate::config::RemoteStoreConfig;
use crate::error::{RemoteStoreError, Result};
use crate::rows::{
    ActivityRow, CampaignRow, CompanyRow, ContactRow, DealRow, DocumentContentUpdate,
    DocumentInsert, DocumentRow, OpportunityRow, StageRow, WatchlistInsert, WatchlistRow,
    ACTIVITY_COLUMNS, CAMPAIGN_COLUMNS, COMPANY_COLUMNS, CONTACT_COLUMNS, DEAL_COLUMNS,
    STAGE_COLUMNS,
};

const CREATED_AT: &str = "created_at";

/// Log a failure and fall back to the empty value.
fn soft<T: Default>(operation: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to {}: {}", operation, e);
            T::default()
        }
    }
}

fn by_id(id: &str) -> Query {
    Query::new().eq("id", id)
}

fn newest_first() -> Query {
    Query::new().select("*").order(CREATED_AT, Order::Desc)
}

/// Gateway to the hosted store. Unconfigured when built without settings.
#[derive(Debug, Clone, Default)]
pub struct SupabaseGateway {
    client: Option<PostgrestClient>,
}

impl SupabaseGateway {
    /// A client that cannot be built leaves the gateway unconfigured.
    pub fn new(config: Option<RemoteStoreConfig>) -> Self {
        let client = config.and_then(|config| match PostgrestClient::new(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                error!("Failed to build store client: {}", e);
                None
            }
        });
        Self { client }
    }

    pub fn from_env() -> Self {
        Self::new(RemoteStoreConfig::from_env())
    }

    fn client(&self) -> Result<&PostgrestClient> {
        self.client
            .as_ref()
            .ok_or_else(|| RemoteStoreError::auth("Remote store is not configured"))
    }

    async fn select_all<R, T>(&self, entity: SyncEntity, query: Query) -> Result<Vec<T>>
    where
        R: DeserializeOwned,
        T: From<R>,
    {
        let rows: Vec<R> = self.client()?.select(entity.table_name(), &query).await?;
        Ok(rows.into_iter().map(T::from).collect())
    }

    async fn select_one<R, T>(&self, entity: SyncEntity, id: &str) -> Result<Option<T>>
    where
        R: DeserializeOwned,
        T: From<R>,
    {
        let rows: Vec<R> = self
            .client()?
            .select(entity.table_name(), &by_id(id).select("*"))
            .await?;
        Ok(rows.into_iter().next().map(T::from))
    }

    async fn insert_one<B, R, T>(&self, entity: SyncEntity, body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
        T: From<R>,
    {
        let table = entity.table_name();
        let rows: Vec<R> = self.client()?.insert(table, body).await?;
        first_row(table, rows).map(|row| Some(T::from(row)))
    }

    async fn update_one<B, R, T>(&self, entity: SyncEntity, id: &str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
        T: From<R>,
    {
        let table = entity.table_name();
        let rows: Vec<R> = self.client()?.update(table, &by_id(id), body).await?;
        first_row(table, rows).map(|row| Some(T::from(row)))
    }

    async fn delete_where(&self, entity: SyncEntity, query: Query) -> Result<bool> {
        self.client()?.delete(entity.table_name(), &query).await?;
        Ok(true)
    }

    async fn select_documents(&self, query: Query) -> Result<Vec<GeneratedDocument>> {
        let rows: Vec<DocumentRow> = self
            .client()?
            .select(SyncEntity::Document.table_name(), &query)
            .await?;
        Ok(rows.into_iter().filter_map(decode_document).collect())
    }

    async fn reorder(&self, positions: &[StagePosition]) -> Result<bool> {
        let client = self.client()?;
        let table = SyncEntity::Stage.table_name();
        let mut all_written = true;
        for position in positions {
            let body = STAGE_COLUMNS.to_columns(&StagePatch::position(position.position))?;
            if let Err(e) = client
                .update::<_, Value>(table, &by_id(&position.id), &body)
                .await
            {
                warn!("Failed to move stage {}: {}", position.id, e);
                all_written = false;
            }
        }
        Ok(all_written)
    }
}

fn first_row<R>(table: &str, rows: Vec<R>) -> Result<R> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RemoteStoreError::NoRow(table.to_string()))
}

fn decode_document(row: DocumentRow) -> Option<GeneratedDocument> {
    let id = row.id.clone();
    match GeneratedDocument::try_from(row) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!("Skipping unreadable document {}: {}", id, e);
            None
        }
    }
}

#[async_trait]
impl RemoteStoreGateway for SupabaseGateway {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_companies(&self) -> Vec<Company> {
        let query = Query::new().select("*").order("name", Order::Asc);
        soft(
            "fetch companies",
            self.select_all::<CompanyRow, _>(SyncEntity::Company, query).await,
        )
    }

    async fn get_company(&self, id: &str) -> Option<Company> {
        soft(
            "fetch company",
            self.select_one::<CompanyRow, _>(SyncEntity::Company, id).await,
        )
    }

    async fn create_company(&self, company: &NewCompany) -> Option<Company> {
        let result = match COMPANY_COLUMNS.to_columns(company) {
            Ok(body) => {
                self.insert_one::<_, CompanyRow, _>(SyncEntity::Company, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("create company", result)
    }

    async fn update_company(&self, id: &str, update: &CompanyUpdate) -> Option<Company> {
        let result = match COMPANY_COLUMNS.to_update_columns(update, &now_timestamp()) {
            Ok(body) => {
                self.update_one::<_, CompanyRow, _>(SyncEntity::Company, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("update company", result)
    }

    async fn delete_company(&self, id: &str) -> bool {
        soft(
            "delete company",
            self.delete_where(SyncEntity::Company, by_id(id)).await,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Contacts
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_contacts(&self) -> Vec<Contact> {
        soft(
            "fetch contacts",
            self.select_all::<ContactRow, _>(SyncEntity::Contact, newest_first())
                .await,
        )
    }

    async fn get_contact(&self, id: &str) -> Option<Contact> {
        soft(
            "fetch contact",
            self.select_one::<ContactRow, _>(SyncEntity::Contact, id).await,
        )
    }

    async fn list_contacts_by_company(&self, company_id: &str) -> Vec<Contact> {
        let query = Query::new()
            .select("*")
            .eq("company_id", company_id)
            .order("last_name", Order::Asc);
        soft(
            "fetch contacts by company",
            self.select_all::<ContactRow, _>(SyncEntity::Contact, query).await,
        )
    }

    async fn create_contact(&self, contact: &NewContact) -> Option<Contact> {
        let result = match CONTACT_COLUMNS.to_columns(contact) {
            Ok(body) => {
                self.insert_one::<_, ContactRow, _>(SyncEntity::Contact, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("create contact", result)
    }

    async fn update_contact(&self, id: &str, update: &ContactUpdate) -> Option<Contact> {
        let result = match CONTACT_COLUMNS.to_update_columns(update, &now_timestamp()) {
            Ok(body) => {
                self.update_one::<_, ContactRow, _>(SyncEntity::Contact, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("update contact", result)
    }

    async fn delete_contact(&self, id: &str) -> bool {
        soft(
            "delete contact",
            self.delete_where(SyncEntity::Contact, by_id(id)).await,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline stages
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_stages(&self) -> Vec<PipelineStage> {
        let query = Query::new().select("*").order("position", Order::Asc);
        soft(
            "fetch stages",
            self.select_all::<StageRow, _>(SyncEntity::Stage, query).await,
        )
    }

    async fn create_stage(&self, stage: &NewStage) -> Option<PipelineStage> {
        let result = match STAGE_COLUMNS.to_columns(stage) {
            Ok(body) => {
                self.insert_one::<_, StageRow, _>(SyncEntity::Stage, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("create stage", result)
    }

    async fn update_stage(&self, id: &str, patch: &StagePatch) -> Option<PipelineStage> {
        let result = match STAGE_COLUMNS.to_columns(patch) {
            Ok(body) => {
                self.update_one::<_, StageRow, _>(SyncEntity::Stage, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("update stage", result)
    }

    async fn delete_stage(&self, id: &str) -> bool {
        soft(
            "delete stage",
            self.delete_where(SyncEntity::Stage, by_id(id)).await,
        )
    }

    async fn reorder_stages(&self, positions: &[StagePosition]) -> bool {
        soft("reorder stages", self.reorder(positions).await)
    }

    async fn initialize_default_stages(&self, stages: &[NewStage]) -> Vec<PipelineStage> {
        let result: Result<_> = async {
            let body = stages
                .iter()
                .map(|stage| STAGE_COLUMNS.to_columns(stage))
                .collect::<Result<Vec<_>>>()?;
            let rows: Vec<StageRow> = self
                .client()?
                .insert(SyncEntity::Stage.table_name(), &body)
                .await?;
            let mut created: Vec<PipelineStage> = rows.into_iter().map(Into::into).collect();
            created.sort_by_key(|s| s.position);
            Ok(created)
        }
        .await;
        soft("initialize default stages", result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deals
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_deals(&self) -> Vec<PipelineDeal> {
        soft(
            "fetch deals",
            self.select_all::<DealRow, _>(SyncEntity::Deal, newest_first())
                .await,
        )
    }

    async fn list_deals_by_stage(&self, stage_id: &str) -> Vec<PipelineDeal> {
        let query = Query::new()
            .select("*")
            .eq("stage_id", stage_id)
            .order(CREATED_AT, Order::Asc);
        soft(
            "fetch deals by stage",
            self.select_all::<DealRow, _>(SyncEntity::Deal, query).await,
        )
    }

    async fn create_deal(&self, deal: &NewDeal) -> Option<PipelineDeal> {
        let deal = deal.normalized();
        let result = match DEAL_COLUMNS.to_columns(&deal) {
            Ok(body) => self.insert_one::<_, DealRow, _>(SyncEntity::Deal, &body).await,
            Err(e) => Err(e),
        };
        soft("create deal", result)
    }

    async fn update_deal(&self, id: &str, update: &DealUpdate) -> Option<PipelineDeal> {
        let update = update.normalized();
        let result = match DEAL_COLUMNS.to_update_columns(&update, &now_timestamp()) {
            Ok(body) => {
                self.update_one::<_, DealRow, _>(SyncEntity::Deal, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("update deal", result)
    }

    async fn delete_deal(&self, id: &str) -> bool {
        soft(
            "delete deal",
            self.delete_where(SyncEntity::Deal, by_id(id)).await,
        )
    }

    async fn move_deal(&self, id: &str, stage_id: &str) -> Option<PipelineDeal> {
        let update = DealUpdate {
            stage_id: Some(stage_id.to_string()),
            ..Default::default()
        };
        let result = match DEAL_COLUMNS.to_update_columns(&update, &now_timestamp()) {
            Ok(body) => {
                self.update_one::<_, DealRow, _>(SyncEntity::Deal, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("move deal", result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Activities
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_activities(&self, limit: usize) -> Vec<CrmActivity> {
        soft(
            "fetch activities",
            self.select_all::<ActivityRow, _>(SyncEntity::Activity, newest_first().limit(limit))
                .await,
        )
    }

    async fn list_activities_by_contact(&self, contact_id: &str) -> Vec<CrmActivity> {
        let query = newest_first().eq("contact_id", contact_id);
        soft(
            "fetch contact activities",
            self.select_all::<ActivityRow, _>(SyncEntity::Activity, query)
                .await,
        )
    }

    async fn list_activities_by_deal(&self, deal_id: &str) -> Vec<CrmActivity> {
        let query = newest_first().eq("deal_id", deal_id);
        soft(
            "fetch deal activities",
            self.select_all::<ActivityRow, _>(SyncEntity::Activity, query)
                .await,
        )
    }

    async fn create_activity(&self, activity: &NewActivity) -> Option<CrmActivity> {
        let result = match ACTIVITY_COLUMNS.to_columns(activity) {
            Ok(body) => {
                self.insert_one::<_, ActivityRow, _>(SyncEntity::Activity, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("create activity", result)
    }

    async fn delete_activity(&self, id: &str) -> bool {
        soft(
            "delete activity",
            self.delete_where(SyncEntity::Activity, by_id(id)).await,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Campaigns
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_campaigns(&self) -> Vec<EmailCampaign> {
        let query = Query::new().select("*").order("updated_at", Order::Desc);
        soft(
            "fetch campaigns",
            self.select_all::<CampaignRow, _>(SyncEntity::Campaign, query)
                .await,
        )
    }

    async fn get_campaign(&self, id: &str) -> Option<EmailCampaign> {
        soft(
            "fetch campaign",
            self.select_one::<CampaignRow, _>(SyncEntity::Campaign, id)
                .await,
        )
    }

    async fn create_campaign(&self, campaign: &NewCampaign) -> Option<EmailCampaign> {
        let result = match CAMPAIGN_COLUMNS.to_columns(campaign) {
            Ok(body) => {
                self.insert_one::<_, CampaignRow, _>(SyncEntity::Campaign, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("create campaign", result)
    }

    async fn update_campaign(&self, id: &str, update: &CampaignUpdate) -> Option<EmailCampaign> {
        let result = match CAMPAIGN_COLUMNS.to_update_columns(update, &now_timestamp()) {
            Ok(body) => {
                self.update_one::<_, CampaignRow, _>(SyncEntity::Campaign, id, &body)
                    .await
            }
            Err(e) => Err(e),
        };
        soft("update campaign", result)
    }

    async fn delete_campaign(&self, id: &str) -> bool {
        soft(
            "delete campaign",
            self.delete_where(SyncEntity::Campaign, by_id(id)).await,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_documents(&self) -> Vec<GeneratedDocument> {
        soft(
            "fetch documents",
            self.select_documents(newest_first()).await,
        )
    }

    async fn list_documents_for_opportunity(&self, opportunity_id: &str) -> Vec<GeneratedDocument> {
        let query = newest_first().eq("opportunity_id", opportunity_id);
        soft(
            "fetch documents for opportunity",
            self.select_documents(query).await,
        )
    }

    async fn create_document(&self, document: &NewDocument) -> Option<GeneratedDocument> {
        let result: Result<_> = async {
            let body = DocumentInsert::from_new(document)?;
            let table = SyncEntity::Document.table_name();
            let rows: Vec<DocumentRow> = self.client()?.insert(table, &body).await?;
            Ok(decode_document(first_row(table, rows)?))
        }
        .await;
        soft("save document", result)
    }

    async fn update_document_content(
        &self,
        id: &str,
        content: &DocumentContent,
    ) -> Option<GeneratedDocument> {
        let result: Result<_> = async {
            let body = DocumentContentUpdate {
                content: content
                    .body()
                    .map_err(|e| RemoteStoreError::invalid_request(e.to_string()))?,
                updated_at: now_timestamp(),
            };
            let table = SyncEntity::Document.table_name();
            let rows: Vec<DocumentRow> = self.client()?.update(table, &by_id(id), &body).await?;
            Ok(decode_document(first_row(table, rows)?))
        }
        .await;
        soft("update document", result)
    }

    async fn delete_document(&self, id: &str) -> bool {
        soft(
            "delete document",
            self.delete_where(SyncEntity::Document, by_id(id)).await,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Opportunities & watchlist
    // ─────────────────────────────────────────────────────────────────────────

    async fn save_opportunities(&self, opportunities: &[Opportunity]) -> bool {
        if opportunities.is_empty() {
            return true;
        }
        let rows: Vec<OpportunityRow> = opportunities.iter().map(OpportunityRow::from).collect();
        let result: Result<_> = async {
            let _: Vec<Value> = self
                .client()?
                .upsert(SyncEntity::Opportunity.table_name(), &rows, "id")
                .await?;
            Ok(true)
        }
        .await;
        soft("save opportunities", result)
    }

    async fn list_opportunities(&self) -> Vec<Opportunity> {
        soft(
            "fetch opportunities",
            self.select_all::<OpportunityRow, _>(SyncEntity::Opportunity, newest_first())
                .await,
        )
    }

    async fn add_to_watchlist(&self, opportunity_id: &str) -> bool {
        let result: Result<_> = async {
            let _: Vec<Value> = self
                .client()?
                .upsert(
                    SyncEntity::WatchlistItem.table_name(),
                    &WatchlistInsert { opportunity_id },
                    "opportunity_id",
                )
                .await?;
            Ok(true)
        }
        .await;
        soft("add to watchlist", result)
    }

    async fn remove_from_watchlist(&self, opportunity_id: &str) -> bool {
        soft(
            "remove from watchlist",
            self.delete_where(
                SyncEntity::WatchlistItem,
                Query::new().eq("opportunity_id", opportunity_id),
            )
            .await,
        )
    }

    async fn list_watchlist(&self) -> Vec<Opportunity> {
        let query = Query::new()
            .select("opportunity_id,opportunities(*)")
            .order(CREATED_AT, Order::Desc);
        let result: Result<_> = async {
            let rows: Vec<WatchlistRow> = self
                .client()?
                .select(SyncEntity::WatchlistItem.table_name(), &query)
                .await?;
            Ok(rows
                .into_iter()
                .filter_map(|row| match row.opportunities {
                    Some(opportunity) => Some(Opportunity::from(opportunity)),
                    None => {
                        warn!("Watchlist entry {} has no opportunity", row.opportunity_id);
                        None
                    }
                })
                .collect())
        }
        .await;
        soft("fetch watchlist", result)
    }
}
