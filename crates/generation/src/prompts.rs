//! Prompt text and response schemas for each generation call.

use serde_json::{json, Map, Value};

use qsleads_core::documents::ProposalSectionKey;
use qsleads_core::opportunities::Opportunity;

pub const SEARCH_MODEL: &str = "gemini-3-flash-preview";
pub const FAST_MODEL: &str = "gemini-3-flash-preview";
pub const MAPS_MODEL: &str = "gemini-2.5-flash";
pub const REASONING_MODEL: &str = "gemini-3-pro-preview";

pub const STAGE_VALUES: [&str; 3] = ["Planning", "Tender", "Construction"];

fn string_object(keys: &[&str]) -> Value {
    let properties: Map<String, Value> = keys
        .iter()
        .map(|key| (key.to_string(), json!({ "type": "STRING" })))
        .collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": keys,
    })
}

/// Project block shared by the outreach prompts.
fn project_brief(opportunity: &Opportunity) -> String {
    format!(
        "Title: {}\nLocation: {}\nDescription: {}\nStage: {}\nEstimated Value: {}",
        opportunity.title,
        opportunity.location,
        opportunity.description,
        opportunity.stage.as_str(),
        opportunity.estimated_value_label()
    )
}

pub fn find_opportunities(location: &str, sector: &str) -> String {
    format!(
        "Search for currently active construction opportunities, tender notices, and planning \
         applications for Quantity Surveyors in {}, UK specifically for the {} sector. Focus on \
         projects looking for cost management, bill of quantities, or residential/commercial \
         development.",
        location, sector
    )
}

pub fn parse_opportunities(text: &str) -> String {
    format!(
        "From the following construction market report text, extract a list of at least 3-5 \
         specific project opportunities.\n\
         For each project, identify:\n\
         - title (short, professional)\n\
         - location (specific UK town/city)\n\
         - description (brief summary of what is being built)\n\
         - stage (must be one of: \"Planning\", \"Tender\", \"Construction\")\n\
         - estimatedValue (e.g. \"£2M\", \"Unknown\")\n\n\
         TEXT:\n{}",
        text
    )
}

pub fn parse_opportunities_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "location": { "type": "STRING" },
                "description": { "type": "STRING" },
                "stage": { "type": "STRING", "enum": STAGE_VALUES },
                "estimatedValue": { "type": "STRING" }
            },
            "required": ["title", "location", "description", "stage", "estimatedValue"]
        }
    })
}

pub fn find_local_firms(location: &str) -> String {
    format!(
        "Find main contractors and architecture firms near {}, UK that a quantity surveyor \
         might want to partner with.",
        location
    )
}

pub fn analyze_lead(opportunity: &Opportunity) -> String {
    format!(
        "As a senior quantity surveyor, analyze this project lead:\n\
         Title: {}\nLocation: {}\nDescription: {}\nStage: {}\n\n\
         Please provide a structured analysis in JSON format including:\n\
         1. Feasibility (high-level)\n\
         2. Risk Assessment (budget, complexity, local planning)\n\
         3. Competitor Insights\n\
         4. Recommended Action for a self-employed QS.",
        opportunity.title,
        opportunity.location,
        opportunity.description,
        opportunity.stage.as_str()
    )
}

pub fn analysis_schema() -> Value {
    string_object(&[
        "feasibility",
        "riskAssessment",
        "competitorInsights",
        "recommendedAction",
    ])
}

pub fn email_sequence(opportunity: &Opportunity) -> String {
    format!(
        "You are a business development expert for a UK-based quantity surveying consultancy. \
         Generate a 3-step cold email outreach sequence for this construction opportunity:\n\n\
         {}\n\n\
         Each email should be professional, concise, and tailored to winning QS work on this \
         project. Include compelling subject lines and clear calls to action.",
        project_brief(opportunity)
    )
}

pub fn email_sequence_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": string_object(&["subject", "body", "sendDelay", "callToAction"])
    })
}

pub fn proposal(opportunity: &Opportunity) -> String {
    format!(
        "You are a senior quantity surveyor preparing a professional fee proposal for:\n\n\
         {}\n\n\
         Generate a comprehensive proposal with all sections. Be specific to this project, \
         reference UK construction standards (NRM, JCT, NEC), and position the QS consultancy \
         as experienced and capable.",
        project_brief(opportunity)
    )
}

pub fn custom_proposal(opportunity: &Opportunity, sections: &[ProposalSectionKey]) -> String {
    let wanted = sections
        .iter()
        .map(|s| format!("- {} ({})", s.label(), s.key()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a senior quantity surveyor preparing a professional fee proposal for:\n\n\
         {}\n\n\
         Write only the following sections:\n{}\n\n\
         Be specific to this project, reference UK construction standards (NRM, JCT, NEC), and \
         position the QS consultancy as experienced and capable.",
        project_brief(opportunity),
        wanted
    )
}

pub fn proposal_schema(sections: &[ProposalSectionKey]) -> Value {
    let keys: Vec<&str> = sections.iter().map(|s| s.key()).collect();
    string_object(&keys)
}

pub fn one_pager(opportunity: &Opportunity) -> String {
    format!(
        "Create a punchy one-page marketing document for a quantity surveying consultancy \
         pitching for:\n\n\
         {}\n\n\
         The one-pager should be compelling, highlight key QS services relevant to this project, \
         and include differentiators that set this consultancy apart.",
        project_brief(opportunity)
    )
}

pub fn one_pager_schema() -> Value {
    string_object(&[
        "headline",
        "servicesList",
        "differentiators",
        "recentProjects",
        "contactCTA",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsleads_core::opportunities::ConstructionStage;

    fn opportunity() -> Opportunity {
        Opportunity {
            id: "real-1-0".to_string(),
            title: "Leeds depot".to_string(),
            location: "Leeds".to_string(),
            description: "Bus depot".to_string(),
            estimated_value: None,
            stage: ConstructionStage::Tender,
            source: "Gemini Search".to_string(),
            url: None,
            timestamp: "2026-03-01T09:30:00.000Z".to_string(),
            coordinates: None,
        }
    }

    #[test]
    fn brief_marks_missing_value_as_unknown() {
        let prompt = email_sequence(&opportunity());
        assert!(prompt.contains("Stage: Tender\nEstimated Value: Unknown"));
    }

    #[test]
    fn proposal_schema_requires_selected_sections_only() {
        let schema = proposal_schema(&[
            ProposalSectionKey::CoverLetter,
            ProposalSectionKey::TermsAndConditions,
        ]);
        assert_eq!(
            schema["required"],
            json!(["coverLetter", "termsAndConditions"])
        );
        assert_eq!(schema["properties"].as_object().unwrap().len(), 2);
    }
}
