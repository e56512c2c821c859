//! CRM domain models: companies, contacts, pipeline stages, deals and activities.

use serde::{Deserialize, Serialize};

use crate::utils::present;

// ─────────────────────────────────────────────────────────────────────────────
// Companies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub industry: String,
    pub website: String,
    pub address: String,
    pub phone: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

/// Partial company edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Company {
    pub fn from_new(id: String, timestamp: String, new: NewCompany) -> Self {
        Self {
            id,
            name: new.name,
            industry: new.industry,
            website: new.website,
            address: new.address,
            phone: new.phone,
            notes: new.notes,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn apply(&mut self, update: &CompanyUpdate, updated_at: String) {
        if let Some(v) = &update.name {
            self.name = v.clone();
        }
        if let Some(v) = &update.industry {
            self.industry = v.clone();
        }
        if let Some(v) = &update.website {
            self.website = v.clone();
        }
        if let Some(v) = &update.address {
            self.address = v.clone();
        }
        if let Some(v) = &update.phone {
            self.phone = v.clone();
        }
        if let Some(v) = &update.notes {
            self.notes = v.clone();
        }
        self.updated_at = updated_at;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Contacts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company_id: Option<String>,
    pub job_title: String,
    pub tags: Vec<String>,
    pub notes: String,
    pub linked_opportunity_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn from_new(id: String, timestamp: String, new: NewContact) -> Self {
        Self {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            company_id: new.company_id,
            job_title: new.job_title,
            tags: new.tags,
            notes: new.notes,
            linked_opportunity_ids: new.linked_opportunity_ids,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn apply(&mut self, update: &ContactUpdate, updated_at: String) {
        if let Some(v) = &update.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &update.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &update.email {
            self.email = v.clone();
        }
        if let Some(v) = &update.phone {
            self.phone = v.clone();
        }
        if let Some(v) = &update.company_id {
            self.company_id = v.clone();
        }
        if let Some(v) = &update.job_title {
            self.job_title = v.clone();
        }
        if let Some(v) = &update.tags {
            self.tags = v.clone();
        }
        if let Some(v) = &update.notes {
            self.notes = v.clone();
        }
        if let Some(v) = &update.linked_opportunity_ids {
            self.linked_opportunity_ids = v.clone();
        }
        self.updated_at = updated_at;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub linked_opportunity_ids: Vec<String>,
}

/// Partial contact edit. `company_id: Some(None)` clears the company link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub company_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_opportunity_ids: Option<Vec<String>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline stages
// ─────────────────────────────────────────────────────────────────────────────

/// Display palette for pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageColor {
    #[default]
    Slate,
    Blue,
    Amber,
    Purple,
    Emerald,
    Red,
    Pink,
    Cyan,
    Orange,
    Indigo,
}

impl StageColor {
    pub const ALL: [StageColor; 10] = [
        StageColor::Slate,
        StageColor::Blue,
        StageColor::Amber,
        StageColor::Purple,
        StageColor::Emerald,
        StageColor::Red,
        StageColor::Pink,
        StageColor::Cyan,
        StageColor::Orange,
        StageColor::Indigo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageColor::Slate => "slate",
            StageColor::Blue => "blue",
            StageColor::Amber => "amber",
            StageColor::Purple => "purple",
            StageColor::Emerald => "emerald",
            StageColor::Red => "red",
            StageColor::Pink => "pink",
            StageColor::Cyan => "cyan",
            StageColor::Orange => "orange",
            StageColor::Indigo => "indigo",
        }
    }

    /// Lenient parse for stored values; unknown colors fall back to slate.
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
    pub color: StageColor,
    pub position: i32,
    pub created_at: String,
}

impl PipelineStage {
    pub fn from_new(id: String, timestamp: String, new: &NewStage) -> Self {
        Self {
            id,
            name: new.name.clone(),
            color: new.color,
            position: new.position,
            created_at: timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    pub name: String,
    #[serde(default)]
    pub color: StageColor,
    pub position: i32,
}

/// Full edit of an existing stage, as produced by the stage manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEdit {
    pub id: String,
    pub name: String,
    pub color: StageColor,
    pub position: i32,
}

impl StageEdit {
    pub fn patch(&self) -> StagePatch {
        StagePatch {
            name: Some(self.name.clone()),
            color: Some(self.color),
            position: Some(self.position),
        }
    }
}

/// Partial stage write sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<StageColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl StagePatch {
    pub fn position(position: i32) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagePosition {
    pub id: String,
    pub position: i32,
}

/// Batch of stage-manager edits. Applied as delete, then update, then create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageChanges {
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub updated: Vec<StageEdit>,
    #[serde(default)]
    pub created: Vec<NewStage>,
}

/// Template that seeds an empty pipeline.
pub fn default_pipeline_stages() -> Vec<NewStage> {
    [
        ("Lead", StageColor::Slate),
        ("Qualified", StageColor::Blue),
        ("Proposal Sent", StageColor::Amber),
        ("Negotiation", StageColor::Purple),
        ("Won", StageColor::Emerald),
        ("Lost", StageColor::Red),
    ]
    .into_iter()
    .enumerate()
    .map(|(position, (name, color))| NewStage {
        name: name.to_string(),
        color,
        position: position as i32,
    })
    .collect()
}

/// Stable sort by position.
pub fn sort_stages(stages: &mut [PipelineStage]) {
    stages.sort_by_key(|s| s.position);
}

// ─────────────────────────────────────────────────────────────────────────────
// Deals
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDeal {
    pub id: String,
    pub title: String,
    /// Display-formatted amount, e.g. "£250,000". Never used for arithmetic
    /// beyond the stage total view.
    pub value: String,
    pub contact_id: String,
    pub company_id: Option<String>,
    pub stage_id: String,
    pub opportunity_id: Option<String>,
    pub probability: u8,
    pub expected_close_date: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PipelineDeal {
    pub fn from_new(id: String, timestamp: String, new: NewDeal) -> Self {
        Self {
            id,
            title: new.title,
            value: new.value,
            contact_id: new.contact_id,
            company_id: new.company_id,
            stage_id: new.stage_id,
            opportunity_id: new.opportunity_id,
            probability: clamp_probability(i64::from(new.probability)),
            expected_close_date: new.expected_close_date,
            notes: new.notes,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn apply(&mut self, update: &DealUpdate, updated_at: String) {
        if let Some(v) = &update.title {
            self.title = v.clone();
        }
        if let Some(v) = &update.value {
            self.value = v.clone();
        }
        if let Some(v) = &update.contact_id {
            self.contact_id = v.clone();
        }
        if let Some(v) = &update.company_id {
            self.company_id = v.clone();
        }
        if let Some(v) = &update.stage_id {
            self.stage_id = v.clone();
        }
        if let Some(v) = &update.opportunity_id {
            self.opportunity_id = v.clone();
        }
        if let Some(v) = update.probability {
            self.probability = clamp_probability(i64::from(v));
        }
        if let Some(v) = &update.expected_close_date {
            self.expected_close_date = v.clone();
        }
        if let Some(v) = &update.notes {
            self.notes = v.clone();
        }
        self.updated_at = updated_at;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: String,
    #[serde(default)]
    pub value: String,
    pub contact_id: String,
    #[serde(default)]
    pub company_id: Option<String>,
    pub stage_id: String,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub expected_close_date: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub company_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub opportunity_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewDeal {
    /// Copy with `probability` clamped to 0-100, as both branches store it.
    pub fn normalized(&self) -> Self {
        Self {
            probability: clamp_probability(i64::from(self.probability)),
            ..self.clone()
        }
    }
}

impl DealUpdate {
    pub fn normalized(&self) -> Self {
        Self {
            probability: self
                .probability
                .map(|v| clamp_probability(i64::from(v))),
            ..self.clone()
        }
    }
}

pub fn clamp_probability(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

// ─────────────────────────────────────────────────────────────────────────────
// Activities
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Note,
    Call,
    Email,
    Meeting,
    Task,
    DealMoved,
    ContactCreated,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Note => "note",
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Meeting => "meeting",
            ActivityType::Task => "task",
            ActivityType::DealMoved => "deal_moved",
            ActivityType::ContactCreated => "contact_created",
        }
    }

    /// Parse a stored tag; unknown tags are read as notes.
    pub fn parse(value: &str) -> Self {
        match value {
            "call" => ActivityType::Call,
            "email" => ActivityType::Email,
            "meeting" => ActivityType::Meeting,
            "task" => ActivityType::Task,
            "deal_moved" => ActivityType::DealMoved,
            "contact_created" => ActivityType::ContactCreated,
            _ => ActivityType::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmActivity {
    pub id: String,
    pub contact_id: String,
    pub deal_id: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    pub created_at: String,
}

impl CrmActivity {
    pub fn from_new(id: String, timestamp: String, new: NewActivity) -> Self {
        Self {
            id,
            contact_id: new.contact_id,
            deal_id: new.deal_id,
            activity_type: new.activity_type,
            title: new.title,
            description: new.description,
            created_at: timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub contact_id: String,
    #[serde(default)]
    pub deal_id: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    #[serde(default)]
    pub description: String,
}
