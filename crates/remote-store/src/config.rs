//! Connection settings for the hosted store.

use std::env;

pub const URL_ENV: &str = "SUPABASE_URL";
pub const ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// REST path appended to the project URL.
const REST_PATH: &str = "/rest/v1";

#[derive(Clone, PartialEq, Eq)]
pub struct RemoteStoreConfig {
    pub url: String,
    pub anon_key: String,
}

impl RemoteStoreConfig {
    /// Both values must be non-empty for the store to count as configured.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Option<Self> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let anon_key = anon_key.into().trim().to_string();
        if url.is_empty() || anon_key.is_empty() {
            return None;
        }
        Some(Self { url, anon_key })
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Option<Self> {
        let url = env::var(URL_ENV).unwrap_or_default();
        let anon_key = env::var(ANON_KEY_ENV).unwrap_or_default();
        Self::new(url, anon_key)
    }

    pub fn rest_url(&self) -> String {
        if self.url.ends_with(REST_PATH) {
            self.url.clone()
        } else {
            format!("{}{}", self.url, REST_PATH)
        }
    }
}

impl std::fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}
