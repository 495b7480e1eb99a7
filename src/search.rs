use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult, Stage};
use crate::geocode::Coordinates;

/// Which upstream search endpoint serves the request. Proximity requires an
/// origin; free-text treats the origin as an optional bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Nearby,
    Text,
}

/// One row of the upstream search response, carried read-only through the
/// rest of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub price_level: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRef {
    pub photo_reference: String,
}

#[async_trait]
pub trait SearchPlaces: Send + Sync {
    async fn search(
        &self,
        mode: QueryMode,
        origin: Option<Coordinates>,
        radius: u32,
        keyword: &str,
        place_type: &str,
    ) -> AppResult<Vec<PlaceSummary>>;
}

#[derive(Clone)]
pub struct PlaceSearchClient {
    inner: Arc<dyn SearchPlaces>,
}

impl PlaceSearchClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = HttpSearchClient::new(config)?;
        Ok(Self {
            inner: Arc::new(client),
        })
    }

    #[cfg(test)]
    pub fn from_search(search: Arc<dyn SearchPlaces>) -> Self {
        Self { inner: search }
    }

    pub async fn search(
        &self,
        mode: QueryMode,
        origin: Option<Coordinates>,
        radius: u32,
        keyword: &str,
        place_type: &str,
    ) -> AppResult<Vec<PlaceSummary>> {
        self.inner
            .search(mode, origin, radius, keyword, place_type)
            .await
    }
}

struct HttpSearchClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
}

impl HttpSearchClient {
    fn new(config: &AppConfig) -> AppResult<Self> {
        let api_key = config
            .google_api_key
            .clone()
            .ok_or_else(|| AppError::Config("GOOGLE_API_KEY is not configured".into()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.places_api_base.clone(),
            api_key,
        })
    }

    fn endpoint(&self, mode: QueryMode) -> AppResult<Url> {
        let path = match mode {
            QueryMode::Nearby => "nearbysearch/json",
            QueryMode::Text => "textsearch/json",
        };
        Url::parse(&format!("{}/{path}", self.api_base))
            .map_err(|err| AppError::Config(format!("invalid places API base: {err}")))
    }
}

#[async_trait]
impl SearchPlaces for HttpSearchClient {
    async fn search(
        &self,
        mode: QueryMode,
        origin: Option<Coordinates>,
        radius: u32,
        keyword: &str,
        place_type: &str,
    ) -> AppResult<Vec<PlaceSummary>> {
        let mut url = self.endpoint(mode)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("key", self.api_key.expose_secret())
                .append_pair("radius", &radius.to_string())
                .append_pair("type", place_type);
            match mode {
                QueryMode::Nearby => {
                    let origin = origin.ok_or_else(|| {
                        AppError::Validation("proximity search requires an origin".into())
                    })?;
                    query
                        .append_pair("location", &format!("{},{}", origin.lat, origin.lng))
                        .append_pair("keyword", keyword);
                }
                QueryMode::Text => {
                    query.append_pair("query", keyword);
                    if let Some(origin) = origin {
                        query.append_pair("location", &format!("{},{}", origin.lat, origin.lng));
                    }
                }
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| AppError::upstream(Stage::Search, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                Stage::Search,
                format!("search returned HTTP {status}"),
            ));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|err| AppError::upstream(Stage::Search, err.to_string()))?;

        match payload.status.as_str() {
            "OK" | "ZERO_RESULTS" => {
                debug!(count = payload.results.len(), ?mode, "search settled");
                Ok(payload.results)
            }
            other => {
                let detail = payload
                    .error_message
                    .map(|message| format!("search status {other}: {message}"))
                    .unwrap_or_else(|| format!("search status {other}"));
                Err(AppError::upstream(Stage::Search, detail))
            }
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceSummary>,
    #[serde(default)]
    error_message: Option<String>,
}
