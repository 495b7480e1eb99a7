use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::AppConfig;
use crate::details::PlaceDetails;
use crate::errors::{AppError, AppResult};
use crate::search::PlaceSummary;

const MAX_IMAGES: usize = 5;
const PHOTO_MAX_WIDTH: u32 = 800;
const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// Fixed vocabulary mapping upstream category tags to amenity labels.
/// Output order follows this table, not the order of the input tags.
const AMENITY_TABLE: [(&str, Amenity); 6] = [
    ("lodging", Amenity::Accommodation),
    ("spa", Amenity::SpaServices),
    ("restaurant", Amenity::Restaurant),
    ("bar", Amenity::Bar),
    ("gym", Amenity::FitnessCenter),
    ("parking", Amenity::ParkingAvailable),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Amenity {
    #[serde(rename = "Accommodation")]
    Accommodation,
    #[serde(rename = "Spa Services")]
    SpaServices,
    #[serde(rename = "Restaurant")]
    Restaurant,
    #[serde(rename = "Bar")]
    Bar,
    #[serde(rename = "Fitness Center")]
    FitnessCenter,
    #[serde(rename = "Parking Available")]
    ParkingAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BusinessStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Temporarily Closed")]
    TemporarilyClosed,
    #[serde(rename = "Permanently Closed")]
    PermanentlyClosed,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl BusinessStatus {
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("OPERATIONAL") => Self::Open,
            Some("CLOSED_TEMPORARILY") => Self::TemporarilyClosed,
            Some("CLOSED_PERMANENTLY") => Self::PermanentlyClosed,
            _ => Self::Unknown,
        }
    }
}

/// The canonical output record: one search row merged with its (possibly
/// absent) detail payload, detail values taking precedence.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPlace {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub map_url: String,
    pub images: Vec<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub business_status: BusinessStatus,
    pub price_level: u8,
    pub amenities: Vec<Amenity>,
    pub types: Vec<String>,
    pub search_keyword: String,
    pub open_now: Option<bool>,
}

/// Owns all derived-field logic. Holds only the photo endpoint and the
/// credential needed to build photo URLs; performs no I/O.
#[derive(Clone)]
pub struct Normalizer {
    photo_endpoint: Url,
    api_key: SecretString,
}

impl Normalizer {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let api_key = config
            .google_api_key
            .clone()
            .ok_or_else(|| AppError::Config("GOOGLE_API_KEY is not configured".into()))?;
        let photo_endpoint = Url::parse(&format!("{}/photo", config.places_api_base))
            .map_err(|err| AppError::Config(format!("invalid places API base: {err}")))?;
        Ok(Self {
            photo_endpoint,
            api_key,
        })
    }

    pub fn normalize(
        &self,
        summary: &PlaceSummary,
        details: Option<&PlaceDetails>,
        keyword: &str,
    ) -> NormalizedPlace {
        let address = details
            .and_then(|d| d.formatted_address.clone())
            .or_else(|| summary.vicinity.clone());

        let images = details
            .map(|d| self.build_images(&d.photo_refs))
            .unwrap_or_default();

        let map_url = details
            .and_then(|d| d.map_url.clone())
            .unwrap_or_else(|| build_map_url(&summary.name, &summary.place_id));

        NormalizedPlace {
            id: summary.place_id.clone(),
            name: summary.name.clone(),
            address,
            rating: summary.rating,
            user_ratings_total: summary.user_ratings_total,
            map_url,
            images,
            phone: details.and_then(|d| d.phone.clone()),
            website: details.and_then(|d| d.website.clone()),
            business_status: BusinessStatus::from_code(summary.business_status.as_deref()),
            price_level: summary.price_level.unwrap_or(0),
            amenities: amenities_for(&summary.types),
            types: summary.types.clone(),
            search_keyword: keyword.to_string(),
            open_now: details.and_then(|d| d.open_now),
        }
    }

    fn build_images(&self, photo_refs: &[String]) -> Vec<String> {
        photo_refs
            .iter()
            .take(MAX_IMAGES)
            .map(|reference| {
                let mut url = self.photo_endpoint.clone();
                url.query_pairs_mut()
                    .append_pair("maxwidth", &PHOTO_MAX_WIDTH.to_string())
                    .append_pair("photoreference", reference)
                    .append_pair("key", self.api_key.expose_secret());
                url.to_string()
            })
            .collect()
    }
}

fn amenities_for(types: &[String]) -> Vec<Amenity> {
    AMENITY_TABLE
        .iter()
        .filter(|(tag, _)| types.iter().any(|t| t == tag))
        .map(|(_, amenity)| *amenity)
        .collect()
}

fn build_map_url(name: &str, place_id: &str) -> String {
    let mut url = Url::parse(MAP_SEARCH_URL).expect("static map search URL");
    url.query_pairs_mut()
        .append_pair("api", "1")
        .append_pair("query", name)
        .append_pair("query_place_id", place_id);
    url.to_string()
}
