//! REST client for the hosted store's PostgREST interface.
//!
//! Filters use the `column=eq.value` form, ordering `order=column.asc|desc`.
//! Writes ask the store to echo the affected rows.

use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::RemoteStoreConfig;
use crate::error::{RemoteStoreError, Result};

/// Default timeout for store requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";
const PREFER_MINIMAL: &str = "return=minimal";

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Query-string builder for table requests.
#[derive(Debug, Clone, Default)]
pub struct Query {
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
    on_conflict: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column list, including embedded resources such as `opportunities(*)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn on_conflict(mut self, column: &str) -> Self {
        self.on_conflict = Some(column.to_string());
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(select) = &self.select {
            parts.push(format!("select={}", urlencoding::encode(select)));
        }
        for (column, filter) in &self.filters {
            parts.push(format!("{}={}", column, urlencoding::encode(filter)));
        }
        if let Some((column, order)) = &self.order {
            parts.push(format!("order={}.{}", column, order.as_str()));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        if let Some(column) = &self.on_conflict {
            parts.push(format!("on_conflict={}", column));
        }
        parts.join("&")
    }
}

/// Client for the store's REST endpoint.
#[derive(Clone)]
pub struct PostgrestClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PostgrestClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("Store response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("Store response error ({}): {}", status, preview);
    }

    pub fn new(config: &RemoteStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.rest_url(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Headers sent with every request: `apikey` plus the bearer token.
    fn headers(&self, prefer: Option<&'static str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key = HeaderValue::from_str(&self.anon_key)
            .map_err(|_| RemoteStoreError::auth("Invalid anon key format"))?;
        headers.insert("apikey", key);

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|_| RemoteStoreError::auth("Invalid anon key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_static(prefer));
        }
        Ok(headers)
    }

    fn url(&self, table: &str, query: &Query) -> String {
        let query_string = query.to_query_string();
        if query_string.is_empty() {
            format!("{}/{}", self.base_url, table)
        } else {
            format!("{}/{}?{}", self.base_url, table, query_string)
        }
    }

    /// Parse a JSON response body.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize store response. Body: {}, Error: {}",
                body,
                e
            );
            RemoteStoreError::from(e)
        })
    }

    fn error_from_body(status: reqwest::StatusCode, body: &str) -> RemoteStoreError {
        match serde_json::from_str::<PostgrestErrorResponse>(body) {
            Ok(error) => match error.code {
                Some(code) => {
                    RemoteStoreError::api(status.as_u16(), format!("{}: {}", code, error.message))
                }
                None => RemoteStoreError::api(status.as_u16(), error.message),
            },
            Err(_) => RemoteStoreError::api(status.as_u16(), format!("Request failed: {}", body)),
        }
    }

    /// GET /{table}?select=...
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let url = self.url(table, query);
        debug!("[Store] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// POST /{table}, returning the inserted rows.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(table, &Query::new());
        debug!("[Store] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(Some(PREFER_REPRESENTATION))?)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// POST /{table}?on_conflict=column, merging duplicates.
    pub async fn upsert<B, T>(&self, table: &str, body: &B, on_conflict: &str) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(table, &Query::new().on_conflict(on_conflict));
        debug!("[Store] UPSERT {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(Some(PREFER_UPSERT))?)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// PATCH /{table}?filters, returning the updated rows.
    pub async fn update<B, T>(&self, table: &str, query: &Query, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !query.has_filters() {
            return Err(RemoteStoreError::invalid_request(format!(
                "Refusing unfiltered update of {}",
                table
            )));
        }
        let url = self.url(table, query);
        debug!("[Store] PATCH {}", url);

        let response = self
            .client
            .patch(&url)
            .headers(self.headers(Some(PREFER_REPRESENTATION))?)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// DELETE /{table}?filters
    pub async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        if !query.has_filters() {
            return Err(RemoteStoreError::invalid_request(format!(
                "Refusing unfiltered delete from {}",
                table
            )));
        }
        let url = self.url(table, query);
        debug!("[Store] DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers(Some(PREFER_MINIMAL))?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);
        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }
        Ok(())
    }
}
