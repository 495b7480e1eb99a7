use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Geocoder output. The formatted address feeds the annotated response
/// envelope; the coordinates feed the search stage.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLocation {
    pub formatted_address: String,
    pub coordinates: Coordinates,
}

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, address: &str) -> AppResult<ResolvedLocation>;
}

#[derive(Clone)]
pub struct LocationResolver {
    inner: Arc<dyn Resolve>,
}

impl LocationResolver {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = GeocodeClient::new(config)?;
        Ok(Self {
            inner: Arc::new(client),
        })
    }

    #[cfg(test)]
    pub fn from_resolver(resolver: Arc<dyn Resolve>) -> Self {
        Self { inner: resolver }
    }

    pub async fn resolve(&self, address: &str) -> AppResult<ResolvedLocation> {
        self.inner.resolve(address).await
    }
}

struct GeocodeClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl GeocodeClient {
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
            endpoint: config.geocode_endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Resolve for GeocodeClient {
    async fn resolve(&self, address: &str) -> AppResult<ResolvedLocation> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| AppError::Config(format!("invalid geocode endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| AppError::upstream(Stage::Resolve, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(
                Stage::Resolve,
                format!("geocoder returned HTTP {status}"),
            ));
        }

        let payload: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| AppError::upstream(Stage::Resolve, err.to_string()))?;

        match payload.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => {
                return Err(AppError::NotFound(format!(
                    "no geocoding match for \"{address}\""
                )))
            }
            other => {
                return Err(AppError::upstream(
                    Stage::Resolve,
                    format!("geocoder status {other}"),
                ))
            }
        }

        let result = payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("no geocoding match for \"{address}\"")))?;

        let coordinates = Coordinates {
            lat: result.geometry.location.lat,
            lng: result.geometry.location.lng,
        };
        debug!(
            lat = coordinates.lat,
            lng = coordinates.lng,
            "resolved address to coordinates"
        );

        Ok(ResolvedLocation {
            formatted_address: result.formatted_address,
            coordinates,
        })
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: GeocodeGeometry,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    location: Coordinates,
}
