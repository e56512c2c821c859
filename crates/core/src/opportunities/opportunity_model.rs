use serde::{Deserialize, Serialize};

/// Construction stage of a discovered project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConstructionStage {
    #[default]
    Planning,
    Tender,
    Construction,
}

impl ConstructionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructionStage::Planning => "Planning",
            ConstructionStage::Tender => "Tender",
            ConstructionStage::Construction => "Construction",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Tender" => ConstructionStage::Tender,
            "Construction" => ConstructionStage::Construction,
            _ => ConstructionStage::Planning,
        }
    }
}

/// A construction lead. Owned by the generation side; read-only for the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub title: String,
    pub location: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<String>,
    pub stage: ConstructionStage,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Discovery time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Opportunity {
    /// Estimated value for prompts and labels.
    pub fn estimated_value_label(&self) -> &str {
        self.estimated_value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("Unknown")
    }
}
