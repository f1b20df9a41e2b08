//! # Web Search Provider
//!
//! The [`WebSearch`] port and an adapter for the Google Custom Search JSON API.

use crate::errors::ProviderError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

/// The public Custom Search endpoint.
pub const GOOGLE_SEARCH_API_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// One page request against the search capability.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Only results published within this many days.
    pub days_back: u32,
    /// 1-based index of the first result.
    pub start: usize,
    pub num: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub published_at: Option<String>,
}

#[async_trait]
pub trait WebSearch: Send + Sync + Debug + DynClone {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ProviderError>;
}

dyn_clone::clone_trait_object!(WebSearch);

#[derive(Deserialize, Debug)]
struct GoogleSearchResponse {
    #[serde(default)]
    items: Vec<GoogleSearchItem>,
}

#[derive(Deserialize, Debug)]
struct GoogleSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagemap: Option<Value>,
}

impl GoogleSearchItem {
    fn published_time(&self) -> Option<String> {
        self.pagemap
            .as_ref()?
            .get("metatags")?
            .get(0)?
            .get("article:published_time")?
            .as_str()
            .map(str::to_string)
    }
}

#[derive(Clone, Debug)]
pub struct GoogleSearchProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    engine_id: String,
}

impl GoogleSearchProvider {
    pub fn new(api_url: String, api_key: String, engine_id: String) -> Result<Self, ProviderError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(ProviderError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            api_key,
            engine_id,
        })
    }
}

#[async_trait]
impl WebSearch for GoogleSearchProvider {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ProviderError> {
        debug!(query = %request.query, start = request.start, "--> Sending request to search API");
        let date_restrict = format!("d{}", request.days_back);
        let start = request.start.to_string();
        let num = request.num.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", request.query.as_str()),
                ("dateRestrict", date_restrict.as_str()),
                ("start", start.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(ProviderError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let search_response: GoogleSearchResponse = response
            .json()
            .await
            .map_err(ProviderError::Deserialization)?;

        Ok(search_response
            .items
            .into_iter()
            .map(|item| {
                let published_at = item.published_time();
                SearchHit {
                    title: item.title,
                    link: item.link,
                    snippet: item.snippet,
                    published_at,
                }
            })
            .collect())
    }
}
