use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, DetailsGeneration};
use crate::errors::{AppError, AppResult};

const LEGACY_FIELDS: &str = "name,rating,formatted_address,photos,url,website,\
formatted_phone_number,price_level,opening_hours";

const CURRENT_FIELD_MASK: &str = "id,displayName,formattedAddress,nationalPhoneNumber,\
websiteUri,googleMapsUri,currentOpeningHours.openNow,photos.name";

/// Per-place enrichment payload. One shape regardless of which upstream
/// generation produced it; absence of any field is legal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaceDetails {
    pub formatted_address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub map_url: Option<String>,
    pub open_now: Option<bool>,
    pub photo_refs: Vec<String>,
}

impl PlaceDetails {
    fn is_empty(&self) -> bool {
        self.formatted_address.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.map_url.is_none()
            && self.open_now.is_none()
            && self.photo_refs.is_empty()
    }
}

#[async_trait]
pub trait DetailsFetch: Send + Sync {
    async fn fetch(&self, place_id: &str) -> AppResult<PlaceDetails>;
}

/// Fetches extended attributes for a single place. Every failure surfaces as
/// `DetailsUnavailable`, which the orchestrator contains to the one item.
#[derive(Clone)]
pub struct DetailsFetcher {
    inner: Arc<dyn DetailsFetch>,
}

impl DetailsFetcher {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let inner: Arc<dyn DetailsFetch> = match config.details_generation {
            DetailsGeneration::Legacy => Arc::new(LegacyDetailsClient::new(config)?),
            DetailsGeneration::Current => Arc::new(CurrentDetailsClient::new(config)?),
        };
        Ok(Self { inner })
    }

    #[cfg(test)]
    pub fn from_fetch(fetch: Arc<dyn DetailsFetch>) -> Self {
        Self { inner: fetch }
    }

    pub async fn fetch(&self, place_id: &str) -> AppResult<PlaceDetails> {
        if place_id.trim().is_empty() {
            return Err(AppError::Validation("place identifier is required".into()));
        }
        self.inner.fetch(place_id).await
    }
}

fn build_http(config: &AppConfig) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()
        .map_err(AppError::from)
}

fn require_key(config: &AppConfig) -> AppResult<SecretString> {
    config
        .google_api_key
        .clone()
        .ok_or_else(|| AppError::Config("GOOGLE_API_KEY is not configured".into()))
}

fn unavailable(place_id: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::DetailsUnavailable(format!("{place_id}: {detail}"))
}

/// Key/value generation: GET `{base}/details/json?place_id=..&fields=..`.
struct LegacyDetailsClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
}

impl LegacyDetailsClient {
    fn new(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            http: build_http(config)?,
            api_base: config.places_api_base.clone(),
            api_key: require_key(config)?,
        })
    }
}

#[async_trait]
impl DetailsFetch for LegacyDetailsClient {
    async fn fetch(&self, place_id: &str) -> AppResult<PlaceDetails> {
        let mut url = Url::parse(&format!("{}/details/json", self.api_base))
            .map_err(|err| AppError::Config(format!("invalid places API base: {err}")))?;
        url.query_pairs_mut()
            .append_pair("place_id", place_id)
            .append_pair("fields", LEGACY_FIELDS)
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| unavailable(place_id, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(place_id, format!("HTTP {status}")));
        }

        let payload: LegacyDetailsResponse = response
            .json()
            .await
            .map_err(|err| unavailable(place_id, err))?;

        if payload.status != "OK" {
            return Err(unavailable(
                place_id,
                format!("status {}", payload.status),
            ));
        }

        let result = payload
            .result
            .ok_or_else(|| unavailable(place_id, "empty result payload"))?;

        Ok(PlaceDetails {
            formatted_address: result.formatted_address,
            phone: result.formatted_phone_number,
            website: result.website,
            map_url: result.url,
            open_now: result.opening_hours.and_then(|hours| hours.open_now),
            photo_refs: result
                .photos
                .into_iter()
                .map(|photo| photo.photo_reference)
                .collect(),
        })
    }
}

#[derive(Deserialize)]
struct LegacyDetailsResponse {
    status: String,
    #[serde(default)]
    result: Option<LegacyDetailsPayload>,
}

#[derive(Deserialize)]
struct LegacyDetailsPayload {
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    formatted_phone_number: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    opening_hours: Option<LegacyOpeningHours>,
    #[serde(default)]
    photos: Vec<LegacyPhoto>,
}

#[derive(Deserialize)]
struct LegacyOpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
}

#[derive(Deserialize)]
struct LegacyPhoto {
    photo_reference: String,
}

/// Identifier-addressed generation: GET `{base}/places/{id}` with an API-key
/// header and a field-selection mask.
struct CurrentDetailsClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
}

impl CurrentDetailsClient {
    fn new(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            http: build_http(config)?,
            api_base: config.places_v1_base.clone(),
            api_key: require_key(config)?,
        })
    }
}

#[async_trait]
impl DetailsFetch for CurrentDetailsClient {
    async fn fetch(&self, place_id: &str) -> AppResult<PlaceDetails> {
        let url = format!("{}/places/{place_id}", self.api_base);

        let response = self
            .http
            .get(url)
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", CURRENT_FIELD_MASK)
            .send()
            .await
            .map_err(|err| unavailable(place_id, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(place_id, format!("HTTP {status}")));
        }

        let payload: CurrentDetailsPayload = response
            .json()
            .await
            .map_err(|err| unavailable(place_id, err))?;

        let details = PlaceDetails {
            formatted_address: payload.formatted_address,
            phone: payload.national_phone_number,
            website: payload.website_uri,
            map_url: payload.google_maps_uri,
            open_now: payload
                .current_opening_hours
                .and_then(|hours| hours.open_now),
            photo_refs: payload
                .photos
                .into_iter()
                .map(|photo| photo.name)
                .collect(),
        };

        if details.is_empty() {
            return Err(unavailable(place_id, "empty result payload"));
        }
        Ok(details)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentDetailsPayload {
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    national_phone_number: Option<String>,
    #[serde(default)]
    website_uri: Option<String>,
    #[serde(default)]
    google_maps_uri: Option<String>,
    #[serde(default)]
    current_opening_hours: Option<CurrentOpeningHours>,
    #[serde(default)]
    photos: Vec<CurrentPhoto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentOpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
}

#[derive(Deserialize)]
struct CurrentPhoto {
    name: String,
}
