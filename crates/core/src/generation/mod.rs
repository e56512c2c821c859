//! Contract of the LLM generation service.
//!
//! The synchronizers never call generation themselves; callers generate first
//! and hand the structured result to the document or campaign synchronizer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::campaigns::EmailStep;
use crate::documents::{EmailSequence, OnePager, ProposalContent, ProposalSectionKey};
use crate::errors::Result;
use crate::opportunities::Opportunity;

/// A web or map result the model grounded its answer on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSearchResult {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub feasibility: String,
    pub risk_assessment: String,
    pub competitor_insights: String,
    pub recommended_action: String,
}

/// Text returned when a search produced no narrative.
pub const NO_RESULTS_TEXT: &str = "No results found.";

/// Source label stamped on extracted opportunities.
pub const SEARCH_SOURCE: &str = "Gemini Search";

#[async_trait]
pub trait GenerationServiceTrait: Send + Sync {
    /// Grounded web search for live construction leads.
    async fn find_opportunities(&self, location: &str, sector: &str) -> Result<LeadSearchResult>;

    /// Extract structured opportunities from free search text.
    async fn parse_opportunities(&self, text: &str) -> Result<Vec<Opportunity>>;

    /// Contractors and architects near `location`, from map grounding.
    async fn find_local_firms(&self, location: &str) -> Result<Vec<GroundingSource>>;

    async fn analyze_lead(&self, opportunity: &Opportunity) -> Result<AnalysisResult>;

    async fn generate_email_sequence(&self, opportunity: &Opportunity) -> Result<EmailSequence>;

    /// Standard six-section fee proposal.
    async fn generate_proposal(&self, opportunity: &Opportunity) -> Result<ProposalContent>;

    /// Proposal limited to the chosen sections. An empty selection is rejected.
    async fn generate_custom_proposal(
        &self,
        opportunity: &Opportunity,
        sections: &[ProposalSectionKey],
    ) -> Result<ProposalContent>;

    async fn generate_one_pager(&self, opportunity: &Opportunity) -> Result<OnePager>;

    /// Campaign steps drafted for an opportunity.
    async fn generate_campaign_steps(&self, opportunity: &Opportunity) -> Result<Vec<EmailStep>> {
        Ok(self.generate_email_sequence(opportunity).await?.steps)
    }
}
