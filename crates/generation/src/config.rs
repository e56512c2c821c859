//! Settings for the model endpoint.

use std::env;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const API_URL_ENV: &str = "GEMINI_API_URL";

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    pub api_key: String,
    pub base_url: String,
}

impl GenerationConfig {
    /// `None` when the key is blank. A blank URL means the public endpoint.
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Option<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return None;
        }
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Some(Self { api_key, base_url })
    }

    pub fn from_env() -> Option<Self> {
        let api_key = env::var(API_KEY_ENV).unwrap_or_default();
        Self::new(api_key, env::var(API_URL_ENV).ok())
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_disables_generation() {
        assert!(GenerationConfig::new("  ", None).is_none());
    }

    #[test]
    fn url_defaults_to_public_endpoint() {
        let config = GenerationConfig::new("key", Some(String::new())).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        let local = GenerationConfig::new("key", Some("http://127.0.0.1:9000/".into())).unwrap();
        assert_eq!(local.base_url, "http://127.0.0.1:9000");
    }
}
