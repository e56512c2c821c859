use serde::{Deserialize, Serialize};

use crate::utils::present;

/// Campaign lifecycle. The UI shows a progression, but any transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        }
    }

    /// Parse a stored status; unknown values are read as draft.
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => CampaignStatus::Active,
            "paused" => CampaignStatus::Paused,
            "completed" => CampaignStatus::Completed,
            _ => CampaignStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStep {
    pub subject: String,
    pub body: String,
    /// Free-form label such as "Day 3".
    pub send_delay: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCampaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub opportunity_id: Option<String>,
    pub linked_contact_ids: Vec<String>,
    pub steps: Vec<EmailStep>,
    pub created_at: String,
    pub updated_at: String,
}

impl EmailCampaign {
    pub fn from_new(id: String, timestamp: String, new: NewCampaign) -> Self {
        Self {
            id,
            name: new.name,
            status: new.status,
            opportunity_id: new.opportunity_id,
            linked_contact_ids: new.linked_contact_ids,
            steps: new.steps,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn apply(&mut self, update: &CampaignUpdate, updated_at: String) {
        if let Some(v) = &update.name {
            self.name = v.clone();
        }
        if let Some(v) = update.status {
            self.status = v;
        }
        if let Some(v) = &update.opportunity_id {
            self.opportunity_id = v.clone();
        }
        if let Some(v) = &update.linked_contact_ids {
            self.linked_contact_ids = v.clone();
        }
        if let Some(v) = &update.steps {
            self.steps = v.clone();
        }
        self.updated_at = updated_at;
    }

    /// Copy with fresh status; steps and links are cloned, identity is not.
    pub fn duplicate_request(&self) -> NewCampaign {
        NewCampaign {
            name: format!("{} (Copy)", self.name),
            status: CampaignStatus::Draft,
            opportunity_id: self.opportunity_id.clone(),
            linked_contact_ids: self.linked_contact_ids.clone(),
            steps: self.steps.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub opportunity_id: Option<String>,
    #[serde(default)]
    pub linked_contact_ids: Vec<String>,
    #[serde(default)]
    pub steps: Vec<EmailStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub opportunity_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_contact_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<EmailStep>>,
}

impl CampaignUpdate {
    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn steps(steps: Vec<EmailStep>) -> Self {
        Self {
            steps: Some(steps),
            ..Default::default()
        }
    }

    pub fn linked_contacts(ids: Vec<String>) -> Self {
        Self {
            linked_contact_ids: Some(ids),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_request_resets_status_and_renames() {
        let campaign = EmailCampaign {
            id: "c-1".to_string(),
            name: "Leeds hospital".to_string(),
            status: CampaignStatus::Active,
            opportunity_id: Some("opp-1".to_string()),
            linked_contact_ids: vec!["a".to_string(), "b".to_string()],
            steps: vec![EmailStep {
                subject: "Intro".to_string(),
                ..Default::default()
            }],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let copy = campaign.duplicate_request();
        assert_eq!(copy.name, "Leeds hospital (Copy)");
        assert_eq!(copy.status, CampaignStatus::Draft);
        assert_eq!(copy.linked_contact_ids, campaign.linked_contact_ids);
        assert_eq!(copy.steps, campaign.steps);
    }

    #[test]
    fn status_round_trips_through_store_tags() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
        ] {
            assert_eq!(CampaignStatus::parse(status.as_str()), status);
        }
    }
}
