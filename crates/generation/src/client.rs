//! Client for the `generateContent` endpoint.
//!
//! One prompt per request. Structured calls declare a JSON response schema;
//! grounded calls attach a search or maps tool and read back the grounding
//! chunks.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use qsleads_core::generation::GroundingSource;

use crate::config::GenerationConfig;
use crate::errors::{GenerationError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Tool the model may consult while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grounding {
    Search,
    Maps,
}

impl Grounding {
    fn tool(&self) -> Value {
        match self {
            Grounding::Search => serde_json::json!({ "googleSearch": {} }),
            Grounding::Maps => serde_json::json!({ "googleMaps": {} }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: &'static str,
    pub prompt: String,
    pub grounding: Option<Grounding>,
    /// JSON schema the answer must follow.
    pub schema: Option<Value>,
}

impl GenerateRequest {
    pub fn new(model: &'static str, prompt: String) -> Self {
        Self {
            model,
            prompt,
            grounding: None,
            schema: None,
        }
    }

    pub fn grounded(mut self, grounding: Grounding) -> Self {
        self.grounding = Some(grounding);
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Text and grounding of the first candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub sources: Vec<GroundingSource>,
}

// Wire shapes

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationSettings>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<ChunkSource>,
    #[serde(default)]
    maps: Option<ChunkSource>,
}

#[derive(Debug, Deserialize)]
struct ChunkSource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GroundingChunk {
    fn into_source(self) -> Option<GroundingSource> {
        let source = self.web.or(self.maps)?;
        Some(GroundingSource {
            title: source.title.unwrap_or_default(),
            uri: source.uri.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GenerationConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let body = RequestBody {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![TextPart {
                    text: Some(request.prompt),
                }],
            }],
            tools: request.grounding.iter().map(Grounding::tool).collect(),
            generation_config: request.schema.map(|schema| GenerationSettings {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        };

        let url = self.endpoint(request.model);
        debug!("[Generation] POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            debug!("Model response error ({}): {}", status, text);
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{}: {}", code, envelope.error.message),
                    None => envelope.error.message,
                },
                Err(_) => format!("HTTP {}", status),
            };
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ResponseBody = serde_json::from_str(&text)
            .map_err(|e| GenerationError::malformed("model", e.to_string()))?;
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?;

        let text = candidate.content.map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        });
        let sources = candidate
            .grounding_metadata
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .filter_map(GroundingChunk::into_source)
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerateResponse {
            text: text.filter(|t| !t.is_empty()),
            sources,
        })
    }
}
