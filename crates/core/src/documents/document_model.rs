use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::campaigns::EmailStep;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    EmailSequence,
    Proposal,
    OnePager,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::EmailSequence => "email_sequence",
            DocumentKind::Proposal => "proposal",
            DocumentKind::OnePager => "one_pager",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email_sequence" => Some(DocumentKind::EmailSequence),
            "proposal" => Some(DocumentKind::Proposal),
            "one_pager" => Some(DocumentKind::OnePager),
            _ => None,
        }
    }
}

/// Proposal sections, declared in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalSectionKey {
    CoverLetter,
    ExecutiveSummary,
    ScopeOfServices,
    Methodology,
    Timeline,
    FeeStructure,
    Qualifications,
    CaseStudies,
    TeamBios,
    TermsAndConditions,
}

impl ProposalSectionKey {
    pub const ALL: [ProposalSectionKey; 10] = [
        ProposalSectionKey::CoverLetter,
        ProposalSectionKey::ExecutiveSummary,
        ProposalSectionKey::ScopeOfServices,
        ProposalSectionKey::Methodology,
        ProposalSectionKey::Timeline,
        ProposalSectionKey::FeeStructure,
        ProposalSectionKey::Qualifications,
        ProposalSectionKey::CaseStudies,
        ProposalSectionKey::TeamBios,
        ProposalSectionKey::TermsAndConditions,
    ];

    /// Sections pre-selected for a custom proposal.
    pub const DEFAULTS: [ProposalSectionKey; 6] = [
        ProposalSectionKey::CoverLetter,
        ProposalSectionKey::ExecutiveSummary,
        ProposalSectionKey::ScopeOfServices,
        ProposalSectionKey::Methodology,
        ProposalSectionKey::Timeline,
        ProposalSectionKey::FeeStructure,
    ];

    /// Sections of the standard fee proposal.
    pub const STANDARD: [ProposalSectionKey; 6] = [
        ProposalSectionKey::ExecutiveSummary,
        ProposalSectionKey::ScopeOfServices,
        ProposalSectionKey::Methodology,
        ProposalSectionKey::Timeline,
        ProposalSectionKey::FeeStructure,
        ProposalSectionKey::Qualifications,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ProposalSectionKey::CoverLetter => "coverLetter",
            ProposalSectionKey::ExecutiveSummary => "executiveSummary",
            ProposalSectionKey::ScopeOfServices => "scopeOfServices",
            ProposalSectionKey::Methodology => "methodology",
            ProposalSectionKey::Timeline => "timeline",
            ProposalSectionKey::FeeStructure => "feeStructure",
            ProposalSectionKey::Qualifications => "qualifications",
            ProposalSectionKey::CaseStudies => "caseStudies",
            ProposalSectionKey::TeamBios => "teamBios",
            ProposalSectionKey::TermsAndConditions => "termsAndConditions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProposalSectionKey::CoverLetter => "Cover Letter",
            ProposalSectionKey::ExecutiveSummary => "Executive Summary",
            ProposalSectionKey::ScopeOfServices => "Scope of Services",
            ProposalSectionKey::Methodology => "Methodology",
            ProposalSectionKey::Timeline => "Timeline",
            ProposalSectionKey::FeeStructure => "Fee Structure",
            ProposalSectionKey::Qualifications => "Qualifications",
            ProposalSectionKey::CaseStudies => "Case Studies",
            ProposalSectionKey::TeamBios => "Team Bios",
            ProposalSectionKey::TermsAndConditions => "Terms & Conditions",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSequence {
    pub steps: Vec<EmailStep>,
    pub opportunity_id: String,
}

/// Proposal text keyed by section; iteration follows display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalContent(pub BTreeMap<ProposalSectionKey, String>);

impl ProposalContent {
    pub fn section(&self, key: ProposalSectionKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn sections(&self) -> impl Iterator<Item = ProposalSectionKey> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnePager {
    pub headline: String,
    pub services_list: String,
    pub differentiators: String,
    pub recent_projects: String,
    #[serde(rename = "contactCTA")]
    pub contact_cta: String,
}

/// Structured result of a generation call, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum DocumentContent {
    EmailSequence(EmailSequence),
    Proposal(ProposalContent),
    OnePager(OnePager),
}

impl DocumentContent {
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentContent::EmailSequence(_) => DocumentKind::EmailSequence,
            DocumentContent::Proposal(_) => DocumentKind::Proposal,
            DocumentContent::OnePager(_) => DocumentKind::OnePager,
        }
    }

    /// Untagged JSON body, as stored in the `content` column.
    pub fn body(&self) -> Result<serde_json::Value> {
        let value = match self {
            DocumentContent::EmailSequence(v) => serde_json::to_value(v)?,
            DocumentContent::Proposal(v) => serde_json::to_value(v)?,
            DocumentContent::OnePager(v) => serde_json::to_value(v)?,
        };
        Ok(value)
    }

    /// Rebuild from a stored kind tag and JSON body.
    pub fn from_parts(kind: DocumentKind, body: serde_json::Value) -> Result<Self> {
        let content = match kind {
            DocumentKind::EmailSequence => {
                DocumentContent::EmailSequence(serde_json::from_value(body)?)
            }
            DocumentKind::Proposal => DocumentContent::Proposal(serde_json::from_value(body)?),
            DocumentKind::OnePager => DocumentContent::OnePager(serde_json::from_value(body)?),
        };
        Ok(content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub id: String,
    pub opportunity_id: String,
    pub opportunity_title: String,
    #[serde(flatten)]
    pub content: DocumentContent,
    pub created_at: String,
    pub updated_at: String,
}

impl GeneratedDocument {
    pub fn from_new(id: String, timestamp: String, new: NewDocument) -> Self {
        Self {
            id,
            opportunity_id: new.opportunity_id,
            opportunity_title: new.opportunity_title,
            content: new.content,
            created_at: timestamp.clone(),
            updated_at: timestamp,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.content.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub opportunity_id: String,
    #[serde(default)]
    pub opportunity_title: String,
    #[serde(flatten)]
    pub content: DocumentContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_sections_iterate_in_display_order() {
        let mut sections = BTreeMap::new();
        sections.insert(ProposalSectionKey::FeeStructure, "fees".to_string());
        sections.insert(ProposalSectionKey::CoverLetter, "dear".to_string());
        sections.insert(ProposalSectionKey::Methodology, "NRM2".to_string());
        let content = ProposalContent(sections);
        let order: Vec<&str> = content.sections().map(|k| k.key()).collect();
        assert_eq!(order, vec!["coverLetter", "methodology", "feeStructure"]);
    }

    #[test]
    fn proposal_body_is_keyed_by_camel_case_section() {
        let mut sections = BTreeMap::new();
        sections.insert(ProposalSectionKey::TermsAndConditions, "JCT".to_string());
        let body = DocumentContent::Proposal(ProposalContent(sections))
            .body()
            .unwrap();
        assert_eq!(body, serde_json::json!({ "termsAndConditions": "JCT" }));
    }

    #[test]
    fn one_pager_rebuilds_from_stored_parts() {
        let body = serde_json::json!({
            "headline": "Cost certainty",
            "servicesList": "Cost plans",
            "differentiators": "Chartered",
            "recentProjects": "Leeds",
            "contactCTA": "Call us"
        });
        let content = DocumentContent::from_parts(DocumentKind::OnePager, body).unwrap();
        match content {
            DocumentContent::OnePager(page) => assert_eq!(page.contact_cta, "Call us"),
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn mismatched_body_is_rejected() {
        let body = serde_json::json!({ "steps": "not a list" });
        assert!(DocumentContent::from_parts(DocumentKind::EmailSequence, body).is_err());
    }
}
