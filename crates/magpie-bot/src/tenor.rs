//! GIF search against the Tenor v1 API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use magpie_core::error::{BotError, Result};
use magpie_core::gateway::SearchProvider;

const ANONID_URL: &str = "https://api.tenor.com/v1/anonid";
const RANDOM_URL: &str = "https://api.tenor.com/v1/random";
/// Results fetched per search. The engine queues them and drains one
/// per send.
const PAGE_LIMIT: &str = "20";

pub struct TenorClient {
    http: reqwest::Client,
    key: String,
    anon_id: String,
}

#[derive(Deserialize)]
struct AnonId {
    anon_id: String,
}

#[derive(Deserialize)]
struct SearchResults {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    media: Vec<MediaVariants>,
}

#[derive(Deserialize)]
struct MediaVariants {
    #[serde(default)]
    gif: Option<MediaFile>,
}

#[derive(Deserialize)]
struct MediaFile {
    url: String,
}

impl TenorClient {
    /// Registers an anonymous id with Tenor. Every later search sends
    /// it back, which is what shuffles the result order per deployment.
    pub async fn connect(key: impl Into<String>) -> anyhow::Result<Self> {
        let key = key.into();
        let http = reqwest::Client::new();
        let response: AnonId = http
            .get(ANONID_URL)
            .query(&[("key", key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("registered Tenor anonymous id");
        Ok(Self {
            http,
            key,
            anon_id: response.anon_id,
        })
    }
}

/// Direct GIF URLs, in API order. Results without a gif variant are
/// skipped.
fn gif_urls(body: SearchResults) -> Vec<String> {
    body.results
        .into_iter()
        .filter_map(|result| {
            let first = result.media.into_iter().next()?;
            Some(first.gif?.url)
        })
        .collect()
}

#[async_trait]
impl SearchProvider for TenorClient {
    async fn search_gifs(&self, keyword: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(RANDOM_URL)
            .query(&[
                ("key", self.key.as_str()),
                ("anon_id", self.anon_id.as_str()),
                ("q", keyword),
                ("safesearch", "moderate"),
                ("limit", PAGE_LIMIT),
            ])
            .send()
            .await
            .map_err(search_err)?
            .error_for_status()
            .map_err(search_err)?;
        let body: SearchResults = response.json().await.map_err(search_err)?;
        Ok(gif_urls(body))
    }
}

fn search_err(err: reqwest::Error) -> BotError {
    BotError::Search(err.to_string())
}
