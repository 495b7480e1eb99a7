use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const DEFAULT_PLACES_API_BASE: &str = "https://maps.googleapis.com/maps/api/place";
const DEFAULT_PLACES_V1_BASE: &str = "https://places.googleapis.com/v1";
const DEFAULT_DETAILS_CONCURRENCY: usize = 8;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Which generation of the place-details upstream backs the fetcher.
/// Chosen once here; call sites never branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailsGeneration {
    Legacy,
    Current,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_api_key: Option<SecretString>,
    pub geocode_endpoint: String,
    pub places_api_base: String,
    pub places_v1_base: String,
    pub details_generation: DetailsGeneration,
    pub details_concurrency: usize,
    pub upstream_timeout_secs: u64,
    pub search_defaults: SearchDefaults,
}

/// Per-deployment defaults for search criteria the caller leaves unset.
/// The original service hard-coded these per endpoint; here they are one
/// configurable set.
#[derive(Clone, Debug, Serialize)]
pub struct SearchDefaults {
    pub radius: u32,
    pub keyword: String,
    pub place_type: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub geocode_endpoint: String,
    pub places_api_base: String,
    pub places_v1_base: String,
    pub details_generation: DetailsGeneration,
    pub details_concurrency: usize,
    pub upstream_timeout_secs: u64,
    pub search_defaults: SearchDefaults,
    pub has_google_api_key: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            google_api_key: env::var("GOOGLE_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            geocode_endpoint: env::var("GEOCODE_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_GEOCODE_ENDPOINT.to_string()),
            places_api_base: env::var("PLACES_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_PLACES_API_BASE.to_string()),
            places_v1_base: env::var("PLACES_V1_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_PLACES_V1_BASE.to_string()),
            details_generation: parse_generation("DETAILS_API_GENERATION"),
            details_concurrency: parse_usize("DETAILS_CONCURRENCY", DEFAULT_DETAILS_CONCURRENCY)
                .max(1),
            upstream_timeout_secs: parse_u64(
                "UPSTREAM_TIMEOUT_SECS",
                DEFAULT_UPSTREAM_TIMEOUT_SECS,
            )
            .max(1),
            search_defaults: SearchDefaults {
                radius: parse_u32("SEARCH_DEFAULT_RADIUS", 5_000).max(1),
                keyword: env::var("SEARCH_DEFAULT_KEYWORD")
                    .unwrap_or_else(|_| "hotel".to_string()),
                place_type: env::var("SEARCH_DEFAULT_TYPE")
                    .unwrap_or_else(|_| "establishment".to_string()),
            },
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            geocode_endpoint: self.geocode_endpoint.clone(),
            places_api_base: self.places_api_base.clone(),
            places_v1_base: self.places_v1_base.clone(),
            details_generation: self.details_generation,
            details_concurrency: self.details_concurrency,
            upstream_timeout_secs: self.upstream_timeout_secs,
            search_defaults: self.search_defaults.clone(),
            has_google_api_key: self.google_api_key.is_some(),
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_generation(key: &str) -> DetailsGeneration {
    match env::var(key).as_deref().map(str::trim) {
        Ok("current") | Ok("v1") => DetailsGeneration::Current,
        _ => DetailsGeneration::Legacy,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
