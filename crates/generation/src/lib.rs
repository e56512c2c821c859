//! LLM generation for QS Leads.
//!
//! [`GeminiGenerationService`] implements the core generation contract:
//! grounded lead search, lead extraction, lead analysis and the outreach
//! documents (email sequence, fee proposal, one-pager).

mod client;
mod config;
mod errors;
mod prompts;
mod service;

pub use client::{GeminiClient, GenerateRequest, GenerateResponse, Grounding};
pub use config::{GenerationConfig, API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL};
pub use errors::{GenerationError, Result};
pub use service::GeminiGenerationService;
