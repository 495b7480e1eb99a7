use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::details::DetailsFetcher;
use crate::errors::{AppError, AppResult};
use crate::geocode::{Coordinates, LocationResolver, ResolvedLocation};
use crate::normalize::{NormalizedPlace, Normalizer};
use crate::search::{PlaceSearchClient, PlaceSummary, QueryMode};

/// One enrichment request: an address or known coordinates plus search
/// criteria. Exactly one of `address`/`coordinates` must be set.
#[derive(Debug, Clone)]
pub struct LocationQuery {
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub radius: u32,
    pub keyword: String,
    pub place_type: String,
    pub mode: QueryMode,
}

impl LocationQuery {
    pub fn from_address(
        address: impl Into<String>,
        radius: u32,
        keyword: impl Into<String>,
        place_type: impl Into<String>,
    ) -> Self {
        Self {
            address: Some(address.into()),
            coordinates: None,
            radius,
            keyword: keyword.into(),
            place_type: place_type.into(),
            mode: QueryMode::Nearby,
        }
    }

    pub fn from_coordinates(
        coordinates: Coordinates,
        radius: u32,
        keyword: impl Into<String>,
        place_type: impl Into<String>,
    ) -> Self {
        Self {
            address: None,
            coordinates: Some(coordinates),
            radius,
            keyword: keyword.into(),
            place_type: place_type.into(),
            mode: QueryMode::Nearby,
        }
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    fn validate(&self) -> AppResult<()> {
        match (&self.address, &self.coordinates) {
            (None, None) => {
                return Err(AppError::Validation(
                    "either address or coordinates are required".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "address and coordinates are mutually exclusive".into(),
                ))
            }
            _ => {}
        }
        if let Some(address) = &self.address {
            if address.trim().is_empty() {
                return Err(AppError::Validation("address must not be empty".into()));
            }
        }
        if let Some(coordinates) = &self.coordinates {
            if !coordinates.in_range() {
                return Err(AppError::Validation(format!(
                    "coordinates out of range: {},{}",
                    coordinates.lat, coordinates.lng
                )));
            }
        }
        if self.radius == 0 {
            return Err(AppError::Validation("radius must be positive".into()));
        }
        Ok(())
    }
}

/// Per-item substitute emitted when the detail lookup for one place fails.
/// The batch itself still succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentFailure {
    pub id: String,
    pub name: String,
    pub error: &'static str,
}

impl EnrichmentFailure {
    fn for_summary(summary: &PlaceSummary) -> Self {
        Self {
            id: summary.place_id.clone(),
            name: summary.name.clone(),
            error: "details_unavailable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EnrichedEntry {
    Place(NormalizedPlace),
    Failed(EnrichmentFailure),
}

impl EnrichedEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of a settled enrichment run: where the search was centred and one
/// entry per upstream search result, in upstream order.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentOutcome {
    pub origin: ResolvedLocation,
    pub entries: Vec<EnrichedEntry>,
}

/// Drives resolve → search → detail fan-out → normalize → ordered assembly.
/// Stage failures abort the request; item failures are contained.
pub struct EnrichmentOrchestrator {
    resolver: LocationResolver,
    search: PlaceSearchClient,
    details: DetailsFetcher,
    normalizer: Normalizer,
    concurrency: usize,
}

impl EnrichmentOrchestrator {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            resolver: LocationResolver::new(config)?,
            search: PlaceSearchClient::new(config)?,
            details: DetailsFetcher::new(config)?,
            normalizer: Normalizer::new(config)?,
            concurrency: config.details_concurrency.max(1),
        })
    }

    #[cfg(test)]
    pub fn with_components(
        resolver: LocationResolver,
        search: PlaceSearchClient,
        details: DetailsFetcher,
        normalizer: Normalizer,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            search,
            details,
            normalizer,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn enrich(&self, query: &LocationQuery) -> AppResult<EnrichmentOutcome> {
        query.validate()?;

        let origin = match (&query.address, query.coordinates) {
            (Some(address), None) => self.resolver.resolve(address).await?,
            (None, Some(coordinates)) => ResolvedLocation {
                formatted_address: format!("{},{}", coordinates.lat, coordinates.lng),
                coordinates,
            },
            // validate() rules out the remaining combinations
            _ => unreachable!("query validation admits exactly one origin"),
        };

        let summaries = self
            .search
            .search(
                query.mode,
                Some(origin.coordinates),
                query.radius,
                &query.keyword,
                &query.place_type,
            )
            .await?;

        debug!(
            count = summaries.len(),
            keyword = %query.keyword,
            "fanning out detail lookups"
        );

        // buffered() keeps upstream order while capping in-flight lookups;
        // every future settles before the batch is assembled.
        let entries = stream::iter(summaries)
            .map(|summary| self.enrich_one(summary, &query.keyword))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(EnrichmentOutcome { origin, entries })
    }

    async fn enrich_one(&self, summary: PlaceSummary, keyword: &str) -> EnrichedEntry {
        match self.details.fetch(&summary.place_id).await {
            Ok(details) => {
                EnrichedEntry::Place(self.normalizer.normalize(&summary, Some(&details), keyword))
            }
            Err(err) => {
                warn!(place_id = %summary.place_id, %err, "detail lookup failed; emitting marker");
                EnrichedEntry::Failed(EnrichmentFailure::for_summary(&summary))
            }
        }
    }
}
