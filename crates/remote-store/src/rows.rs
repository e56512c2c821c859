//! Row shapes of the hosted tables and their mapping to domain models.
//!
//! Each synchronized table has a [`ColumnMap`]: attribute name, column name
//! and direction. Writes go through the map, so an attribute without a
//! writable column is refused instead of becoming a guessed column. Reads
//! use the typed `*Row` structs and tolerate nulls: missing text becomes
//! `""`, missing lists become empty and a missing probability becomes `0`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use qsleads_core::campaigns::{CampaignStatus, EmailCampaign, EmailStep};
use qsleads_core::crm::{
    clamp_probability, ActivityType, Company, Contact, CrmActivity, PipelineDeal, PipelineStage,
    StageColor,
};
use qsleads_core::documents::{DocumentContent, DocumentKind, GeneratedDocument, NewDocument};
use qsleads_core::opportunities::{ConstructionStage, Opportunity};
use qsleads_core::sync::SyncEntity;

use crate::error::{RemoteStoreError, Result};

/// Whether the client writes a column or only reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Filled in by the store (ids, creation time) or stamped by the gateway.
    Read,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub attribute: &'static str,
    pub column: &'static str,
    pub direction: Direction,
}

const fn rw(attribute: &'static str, column: &'static str) -> Column {
    Column {
        attribute,
        column,
        direction: Direction::ReadWrite,
    }
}

const fn ro(attribute: &'static str, column: &'static str) -> Column {
    Column {
        attribute,
        column,
        direction: Direction::Read,
    }
}

/// Attribute to column table of one entity.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    pub entity: SyncEntity,
    pub columns: &'static [Column],
}

impl ColumnMap {
    pub fn column(&self, attribute: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.attribute == attribute)
    }

    /// Column map of a camelCase request. Every serialized attribute must
    /// have a writable column.
    pub fn to_columns<T: Serialize>(&self, request: &T) -> Result<Map<String, Value>> {
        let fields = match serde_json::to_value(request)? {
            Value::Object(fields) => fields,
            other => {
                return Err(RemoteStoreError::invalid_request(format!(
                    "Expected an object, got {}",
                    other
                )))
            }
        };
        let mut columns = Map::with_capacity(fields.len());
        for (attribute, value) in fields {
            match self.column(&attribute) {
                Some(c) if c.direction == Direction::ReadWrite => {
                    columns.insert(c.column.to_string(), value);
                }
                _ => {
                    return Err(RemoteStoreError::invalid_request(format!(
                        "No writable column for '{}' in {}",
                        attribute,
                        self.entity.table_name()
                    )))
                }
            }
        }
        Ok(columns)
    }

    /// Like [`ColumnMap::to_columns`], stamping `updated_at` on tables that have it.
    pub fn to_update_columns<T: Serialize>(
        &self,
        request: &T,
        updated_at: &str,
    ) -> Result<Map<String, Value>> {
        let mut columns = self.to_columns(request)?;
        if let Some(stamp) = self.column("updatedAt") {
            columns.insert(
                stamp.column.to_string(),
                Value::String(updated_at.to_string()),
            );
        }
        Ok(columns)
    }
}

pub const COMPANY_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Company,
    columns: &[
        ro("id", "id"),
        rw("name", "name"),
        rw("industry", "industry"),
        rw("website", "website"),
        rw("address", "address"),
        rw("phone", "phone"),
        rw("notes", "notes"),
        ro("createdAt", "created_at"),
        ro("updatedAt", "updated_at"),
    ],
};

pub const CONTACT_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Contact,
    columns: &[
        ro("id", "id"),
        rw("firstName", "first_name"),
        rw("lastName", "last_name"),
        rw("email", "email"),
        rw("phone", "phone"),
        rw("companyId", "company_id"),
        rw("jobTitle", "job_title"),
        rw("tags", "tags"),
        rw("notes", "notes"),
        rw("linkedOpportunityIds", "linked_opportunity_ids"),
        ro("createdAt", "created_at"),
        ro("updatedAt", "updated_at"),
    ],
};

pub const STAGE_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Stage,
    columns: &[
        ro("id", "id"),
        rw("name", "name"),
        rw("color", "color"),
        rw("position", "position"),
        ro("createdAt", "created_at"),
    ],
};

pub const DEAL_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Deal,
    columns: &[
        ro("id", "id"),
        rw("title", "title"),
        rw("value", "value"),
        rw("contactId", "contact_id"),
        rw("companyId", "company_id"),
        rw("stageId", "stage_id"),
        rw("opportunityId", "opportunity_id"),
        rw("probability", "probability"),
        rw("expectedCloseDate", "expected_close_date"),
        rw("notes", "notes"),
        ro("createdAt", "created_at"),
        ro("updatedAt", "updated_at"),
    ],
};

pub const ACTIVITY_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Activity,
    columns: &[
        ro("id", "id"),
        rw("contactId", "contact_id"),
        rw("dealId", "deal_id"),
        rw("type", "type"),
        rw("title", "title"),
        rw("description", "description"),
        ro("createdAt", "created_at"),
    ],
};

pub const CAMPAIGN_COLUMNS: ColumnMap = ColumnMap {
    entity: SyncEntity::Campaign,
    columns: &[
        ro("id", "id"),
        rw("name", "name"),
        rw("status", "status"),
        rw("opportunityId", "opportunity_id"),
        rw("linkedContactIds", "linked_contact_ids"),
        rw("steps", "steps"),
        ro("createdAt", "created_at"),
        ro("updatedAt", "updated_at"),
    ],
};

// ─────────────────────────────────────────────────────────────────────────────
// CRM
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name.unwrap_or_default(),
            industry: row.industry.unwrap_or_default(),
            website: row.website.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRow {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub linked_opportunity_ids: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            company_id: row.company_id,
            job_title: row.job_title.unwrap_or_default(),
            tags: row.tags.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            linked_opportunity_ids: row.linked_opportunity_ids.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<StageRow> for PipelineStage {
    fn from(row: StageRow) -> Self {
        PipelineStage {
            id: row.id,
            name: row.name.unwrap_or_default(),
            color: row
                .color
                .as_deref()
                .map(StageColor::parse)
                .unwrap_or_default(),
            position: row.position.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DealRow {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub stage_id: Option<String>,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub probability: Option<i64>,
    #[serde(default)]
    pub expected_close_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<DealRow> for PipelineDeal {
    fn from(row: DealRow) -> Self {
        PipelineDeal {
            id: row.id,
            title: row.title.unwrap_or_default(),
            value: row.value.unwrap_or_default(),
            contact_id: row.contact_id.unwrap_or_default(),
            company_id: row.company_id,
            stage_id: row.stage_id.unwrap_or_default(),
            opportunity_id: row.opportunity_id,
            probability: clamp_probability(row.probability.unwrap_or(0)),
            expected_close_date: row.expected_close_date.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityRow {
    pub id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
    #[serde(default)]
    pub deal_id: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<ActivityRow> for CrmActivity {
    fn from(row: ActivityRow) -> Self {
        CrmActivity {
            id: row.id,
            contact_id: row.contact_id.unwrap_or_default(),
            deal_id: row.deal_id,
            activity_type: row
                .activity_type
                .as_deref()
                .map(ActivityType::parse)
                .unwrap_or(ActivityType::Note),
            title: row.title.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Campaigns
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub linked_contact_ids: Option<Vec<String>>,
    #[serde(default)]
    pub steps: Option<Vec<EmailStep>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl From<CampaignRow> for EmailCampaign {
    fn from(row: CampaignRow) -> Self {
        EmailCampaign {
            id: row.id,
            name: row.name.unwrap_or_default(),
            status: row
                .status
                .as_deref()
                .map(CampaignStatus::parse)
                .unwrap_or_default(),
            opportunity_id: row.opportunity_id,
            linked_contact_ids: row.linked_contact_ids.unwrap_or_default(),
            steps: row.steps.unwrap_or_default(),
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRow {
    pub id: String,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub opportunity_title: Option<String>,
    pub asset_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TryFrom<DocumentRow> for GeneratedDocument {
    type Error = RemoteStoreError;

    fn try_from(row: DocumentRow) -> Result<Self> {
        let kind = DocumentKind::parse(&row.asset_type).ok_or_else(|| {
            RemoteStoreError::invalid_request(format!("Unknown asset type '{}'", row.asset_type))
        })?;
        let content = DocumentContent::from_parts(kind, row.content)
            .map_err(|e| RemoteStoreError::invalid_request(e.to_string()))?;
        Ok(GeneratedDocument {
            id: row.id,
            opportunity_id: row.opportunity_id.unwrap_or_default(),
            opportunity_title: row.opportunity_title.unwrap_or_default(),
            content,
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at.unwrap_or_default(),
        })
    }
}

/// Insert body for `outreach_assets`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInsert {
    pub opportunity_id: String,
    pub opportunity_title: String,
    pub asset_type: &'static str,
    pub content: Value,
}

impl DocumentInsert {
    pub fn from_new(document: &NewDocument) -> Result<Self> {
        Ok(Self {
            opportunity_id: document.opportunity_id.clone(),
            opportunity_title: document.opportunity_title.clone(),
            asset_type: document.content.kind().as_str(),
            content: document
                .content
                .body()
                .map_err(|e| RemoteStoreError::invalid_request(e.to_string()))?,
        })
    }
}

/// Content-only update body for `outreach_assets`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentContentUpdate {
    pub content: Value,
    pub updated_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Opportunities
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub discovered_at: Option<String>,
}

impl From<&Opportunity> for OpportunityRow {
    fn from(opportunity: &Opportunity) -> Self {
        OpportunityRow {
            id: opportunity.id.clone(),
            title: Some(opportunity.title.clone()),
            location: Some(opportunity.location.clone()),
            description: Some(opportunity.description.clone()),
            estimated_value: opportunity.estimated_value.clone(),
            stage: Some(opportunity.stage.as_str().to_string()),
            source: Some(opportunity.source.clone()),
            url: opportunity.url.clone(),
            discovered_at: Some(opportunity.timestamp.clone()),
        }
    }
}

impl From<OpportunityRow> for Opportunity {
    fn from(row: OpportunityRow) -> Self {
        Opportunity {
            id: row.id,
            title: row.title.unwrap_or_default(),
            location: row.location.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            estimated_value: row.estimated_value,
            stage: row
                .stage
                .as_deref()
                .map(ConstructionStage::parse)
                .unwrap_or_default(),
            source: row.source.unwrap_or_default(),
            url: row.url,
            timestamp: row.discovered_at.unwrap_or_default(),
            coordinates: None,
        }
    }
}

/// `watchlist_items` row with its opportunity embedded.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistRow {
    pub opportunity_id: String,
    #[serde(default)]
    pub opportunities: Option<OpportunityRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistInsert<'a> {
    pub opportunity_id: &'a str,
}
