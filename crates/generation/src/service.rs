//! [`GenerationServiceTrait`] backed by the Gemini client.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use qsleads_core::campaigns::EmailStep;
use qsleads_core::documents::{EmailSequence, OnePager, ProposalContent, ProposalSectionKey};
use qsleads_core::generation::{
    AnalysisResult, GenerationServiceTrait, GroundingSource, LeadSearchResult, NO_RESULTS_TEXT,
    SEARCH_SOURCE,
};
use qsleads_core::ids::{format_timestamp, Clock, SystemClock};
use qsleads_core::opportunities::{ConstructionStage, Opportunity};
use qsleads_core::{Error, Result};

use crate::client::{GeminiClient, GenerateRequest, Grounding};
use crate::config::GenerationConfig;
use crate::errors::GenerationError;
use crate::prompts;

/// Opportunity as extracted by the model, before identity is assigned.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedOpportunity {
    title: String,
    location: String,
    description: String,
    #[serde(default)]
    stage: String,
    #[serde(default)]
    estimated_value: Option<String>,
}

pub struct GeminiGenerationService {
    client: GeminiClient,
    clock: Arc<dyn Clock>,
}

impl GeminiGenerationService {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GenerationConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(config)?,
            clock,
        })
    }

    /// `None` when no API key is set.
    pub fn from_env() -> Result<Option<Self>> {
        match GenerationConfig::from_env() {
            Some(config) => Ok(Some(Self::new(config)?)),
            None => {
                info!("Generation API key not set; generation routes are disabled");
                Ok(None)
            }
        }
    }

    /// Run a schema-constrained request and decode its JSON answer.
    async fn structured<T: DeserializeOwned>(
        &self,
        what: &'static str,
        request: GenerateRequest,
    ) -> std::result::Result<T, GenerationError> {
        let response = self.client.generate(request).await?;
        let text = response
            .text
            .ok_or_else(|| GenerationError::malformed(what, "empty answer"))?;
        serde_json::from_str(&text).map_err(|e| GenerationError::malformed(what, e.to_string()))
    }

    fn into_opportunities(&self, extracted: Vec<ExtractedOpportunity>) -> Vec<Opportunity> {
        let now = self.clock.now();
        let millis = now.timestamp_millis();
        let timestamp = format_timestamp(now);
        extracted
            .into_iter()
            .enumerate()
            .map(|(index, item)| Opportunity {
                id: format!("real-{}-{}", millis, index),
                title: item.title,
                location: item.location,
                description: item.description,
                estimated_value: item.estimated_value,
                stage: ConstructionStage::parse(&item.stage),
                source: SEARCH_SOURCE.to_string(),
                url: None,
                timestamp: timestamp.clone(),
                coordinates: None,
            })
            .collect()
    }

    async fn proposal_sections(
        &self,
        request: GenerateRequest,
        sections: &[ProposalSectionKey],
    ) -> Result<ProposalContent> {
        let mut answer: BTreeMap<String, serde_json::Value> =
            self.structured("proposal", request).await?;
        let mut content = BTreeMap::new();
        for key in sections {
            match answer.remove(key.key()) {
                Some(serde_json::Value::String(text)) => {
                    content.insert(*key, text);
                }
                _ => {
                    return Err(GenerationError::malformed(
                        "proposal",
                        format!("missing section {}", key.key()),
                    )
                    .into())
                }
            }
        }
        Ok(ProposalContent(content))
    }
}

impl std::fmt::Debug for GeminiGenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerationService")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerationServiceTrait for GeminiGenerationService {
    async fn find_opportunities(&self, location: &str, sector: &str) -> Result<LeadSearchResult> {
        debug!("Searching leads in {} ({})", location, sector);
        let request = GenerateRequest::new(
            prompts::SEARCH_MODEL,
            prompts::find_opportunities(location, sector),
        )
        .grounded(Grounding::Search);
        let response = self.client.generate(request).await?;
        Ok(LeadSearchResult {
            text: response
                .text
                .unwrap_or_else(|| NO_RESULTS_TEXT.to_string()),
            sources: response.sources,
        })
    }

    async fn parse_opportunities(&self, text: &str) -> Result<Vec<Opportunity>> {
        let request = GenerateRequest::new(prompts::FAST_MODEL, prompts::parse_opportunities(text))
            .with_schema(prompts::parse_opportunities_schema());
        let extracted: Vec<ExtractedOpportunity> =
            self.structured("opportunities", request).await?;
        Ok(self.into_opportunities(extracted))
    }

    async fn find_local_firms(&self, location: &str) -> Result<Vec<GroundingSource>> {
        let request = GenerateRequest::new(prompts::MAPS_MODEL, prompts::find_local_firms(location))
            .grounded(Grounding::Maps);
        Ok(self.client.generate(request).await?.sources)
    }

    async fn analyze_lead(&self, opportunity: &Opportunity) -> Result<AnalysisResult> {
        let request =
            GenerateRequest::new(prompts::REASONING_MODEL, prompts::analyze_lead(opportunity))
                .with_schema(prompts::analysis_schema());
        Ok(self.structured("analysis", request).await?)
    }

    async fn generate_email_sequence(&self, opportunity: &Opportunity) -> Result<EmailSequence> {
        let request = GenerateRequest::new(prompts::FAST_MODEL, prompts::email_sequence(opportunity))
            .with_schema(prompts::email_sequence_schema());
        let steps: Vec<EmailStep> = self.structured("email sequence", request).await?;
        Ok(EmailSequence {
            steps,
            opportunity_id: opportunity.id.clone(),
        })
    }

    async fn generate_proposal(&self, opportunity: &Opportunity) -> Result<ProposalContent> {
        let sections = ProposalSectionKey::STANDARD;
        let request = GenerateRequest::new(prompts::REASONING_MODEL, prompts::proposal(opportunity))
            .with_schema(prompts::proposal_schema(&sections));
        self.proposal_sections(request, &sections).await
    }

    async fn generate_custom_proposal(
        &self,
        opportunity: &Opportunity,
        sections: &[ProposalSectionKey],
    ) -> Result<ProposalContent> {
        if sections.is_empty() {
            return Err(Error::validation("Select at least one proposal section"));
        }
        let mut sections = sections.to_vec();
        sections.sort();
        sections.dedup();
        let request = GenerateRequest::new(
            prompts::REASONING_MODEL,
            prompts::custom_proposal(opportunity, &sections),
        )
        .with_schema(prompts::proposal_schema(&sections));
        self.proposal_sections(request, &sections).await
    }

    async fn generate_one_pager(&self, opportunity: &Opportunity) -> Result<OnePager> {
        let request = GenerateRequest::new(prompts::FAST_MODEL, prompts::one_pager(opportunity))
            .with_schema(prompts::one_pager_schema());
        Ok(self.structured("one-pager", request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsleads_core::test_support::{start_mock_server, MockResponse};
    use chrono::{TimeZone, Utc};
    use qsleads_core::ids::FixedClock;
    use serde_json::json;

    fn service_for(base_url: &str) -> GeminiGenerationService {
        let config = GenerationConfig::new("test-key", Some(base_url.to_string())).unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        GeminiGenerationService::with_clock(config, Arc::new(FixedClock(instant))).unwrap()
    }

    fn answer(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    fn opportunity() -> Opportunity {
        Opportunity {
            id: "real-1-0".to_string(),
            title: "Leeds depot".to_string(),
            location: "Leeds".to_string(),
            description: "Bus depot".to_string(),
            estimated_value: Some("£4M".to_string()),
            stage: ConstructionStage::Tender,
            source: SEARCH_SOURCE.to_string(),
            url: None,
            timestamp: "2026-03-01T09:30:00.000Z".to_string(),
            coordinates: None,
        }
    }

    #[tokio::test]
    async fn search_is_grounded_and_returns_sources() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Three tenders in Leeds." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://tenders.example/1", "title": "Leeds tender" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        })
        .to_string();
        let (base_url, captured, server) = start_mock_server(vec![MockResponse::ok(&body)]).await;
        let service = service_for(&base_url);

        let result = service.find_opportunities("Leeds", "Healthcare").await.unwrap();
        assert_eq!(result.text, "Three tenders in Leeds.");
        assert_eq!(
            result.sources,
            vec![GroundingSource {
                title: "Leeds tender".to_string(),
                uri: "https://tenders.example/1".to_string(),
            }]
        );

        let requests = captured.lock().await;
        assert_eq!(
            requests[0].path,
            "/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(requests[0].header("x-goog-api-key"), Some("test-key"));
        let sent = requests[0].json();
        assert_eq!(sent["tools"], json!([{ "googleSearch": {} }]));
        assert!(sent.get("generationConfig").is_none());
        server.abort();
    }

    #[tokio::test]
    async fn empty_search_answer_uses_placeholder_text() {
        let body = json!({ "candidates": [{ "content": { "parts": [] } }] }).to_string();
        let (base_url, _captured, server) = start_mock_server(vec![MockResponse::ok(&body)]).await;
        let service = service_for(&base_url);

        let result = service.find_opportunities("York", "Education").await.unwrap();
        assert_eq!(result.text, NO_RESULTS_TEXT);
        assert!(result.sources.is_empty());
        server.abort();
    }

    #[tokio::test]
    async fn extracted_opportunities_get_search_identity() {
        let items = json!([
            { "title": "Depot", "location": "Leeds", "description": "Bus depot",
              "stage": "Tender", "estimatedValue": "£4M" },
            { "title": "School", "location": "York", "description": "Primary school",
              "stage": "Demolition", "estimatedValue": "Unknown" }
        ])
        .to_string();
        let (base_url, captured, server) =
            start_mock_server(vec![MockResponse::ok(&answer(&items))]).await;
        let service = service_for(&base_url);

        let found = service.parse_opportunities("report text").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "real-1772357400000-0");
        assert_eq!(found[1].id, "real-1772357400000-1");
        assert_eq!(found[0].stage, ConstructionStage::Tender);
        assert_eq!(found[1].stage, ConstructionStage::Planning);
        assert!(found.iter().all(|o| o.source == SEARCH_SOURCE));
        assert_eq!(found[0].timestamp, "2026-03-01T09:30:00.000Z");

        let sent = captured.lock().await[0].json();
        assert_eq!(
            sent["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(sent["generationConfig"]["responseSchema"]["type"], json!("ARRAY"));
        server.abort();
    }

    #[tokio::test]
    async fn malformed_answer_is_a_generation_error() {
        let (base_url, _captured, server) =
            start_mock_server(vec![MockResponse::ok(&answer("not json at all"))]).await;
        let service = service_for(&base_url);

        let err = service.analyze_lead(&opportunity()).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("analysis"));
        server.abort();
    }

    #[tokio::test]
    async fn rejected_request_carries_the_api_message() {
        let body = json!({
            "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
        })
        .to_string();
        let (base_url, _captured, server) =
            start_mock_server(vec![MockResponse::new(400, &body)]).await;
        let service = service_for(&base_url);

        let err = service.generate_one_pager(&opportunity()).await.unwrap_err();
        assert!(err.to_string().contains("INVALID_ARGUMENT: API key not valid"));
        server.abort();
    }

    #[tokio::test]
    async fn email_sequence_is_tied_to_the_opportunity() {
        let steps = json!([
            { "subject": "Cost certainty for Leeds depot", "body": "Hello",
              "sendDelay": "Day 1", "callToAction": "Book a call" },
            { "subject": "Following up", "body": "Hi again",
              "sendDelay": "Day 4", "callToAction": "Reply" }
        ])
        .to_string();
        let (base_url, _captured, server) =
            start_mock_server(vec![MockResponse::ok(&answer(&steps))]).await;
        let service = service_for(&base_url);

        let sequence = service.generate_email_sequence(&opportunity()).await.unwrap();
        assert_eq!(sequence.opportunity_id, "real-1-0");
        assert_eq!(sequence.steps.len(), 2);
        assert_eq!(sequence.steps[1].send_delay, "Day 4");
        server.abort();
    }

    #[tokio::test]
    async fn custom_proposal_keeps_only_selected_sections() {
        let content = json!({
            "coverLetter": "Dear client",
            "feeStructure": "Lump sum",
            "teamBios": "not asked for"
        })
        .to_string();
        let (base_url, captured, server) =
            start_mock_server(vec![MockResponse::ok(&answer(&content))]).await;
        let service = service_for(&base_url);

        let proposal = service
            .generate_custom_proposal(
                &opportunity(),
                &[ProposalSectionKey::FeeStructure, ProposalSectionKey::CoverLetter],
            )
            .await
            .unwrap();
        let keys: Vec<&str> = proposal.sections().map(|k| k.key()).collect();
        assert_eq!(keys, vec!["coverLetter", "feeStructure"]);
        assert_eq!(proposal.section(ProposalSectionKey::FeeStructure), Some("Lump sum"));

        let requests = captured.lock().await;
        assert_eq!(
            requests[0].path,
            "/models/gemini-3-pro-preview:generateContent"
        );
        server.abort();
    }

    #[tokio::test]
    async fn empty_section_selection_is_rejected_before_any_request() {
        let (base_url, captured, server) = start_mock_server(Vec::new()).await;
        let service = service_for(&base_url);

        let err = service
            .generate_custom_proposal(&opportunity(), &[])
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(captured.lock().await.is_empty());
        server.abort();
    }

    #[tokio::test]
    async fn standard_proposal_requires_every_section() {
        let content = json!({ "executiveSummary": "Summary" }).to_string();
        let (base_url, _captured, server) =
            start_mock_server(vec![MockResponse::ok(&answer(&content))]).await;
        let service = service_for(&base_url);

        let err = service.generate_proposal(&opportunity()).await.unwrap_err();
        assert!(err.to_string().contains("missing section scopeOfServices"));
        server.abort();
    }

    #[tokio::test]
    async fn local_firms_come_from_map_grounding() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Nearby firms" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "maps": { "uri": "https://maps.example/a", "title": "Acme Build" } }
                    ]
                }
            }]
        })
        .to_string();
        let (base_url, captured, server) = start_mock_server(vec![MockResponse::ok(&body)]).await;
        let service = service_for(&base_url);

        let firms = service.find_local_firms("Leeds").await.unwrap();
        assert_eq!(firms.len(), 1);
        assert_eq!(firms[0].title, "Acme Build");
        let sent = captured.lock().await[0].json();
        assert_eq!(sent["tools"], json!([{ "googleMaps": {} }]));
        server.abort();
    }
}
