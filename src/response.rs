use serde::Serialize;

use crate::enrich::{EnrichedEntry, EnrichmentOutcome};
use crate::errors::AppError;
use crate::geocode::Coordinates;

/// Annotated response shape: the ordered list plus request metadata.
#[derive(Debug, Clone, Serialize)]
pub struct PlacesEnvelope {
    pub location: String,
    pub coordinates: Coordinates,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    pub places: Vec<EnrichedEntry>,
}

impl EnrichmentOutcome {
    /// The bare list shape: entries only, in search order.
    pub fn into_places(self) -> Vec<EnrichedEntry> {
        self.entries
    }

    pub fn into_envelope(self) -> PlacesEnvelope {
        PlacesEnvelope {
            location: self.origin.formatted_address,
            coordinates: self.origin.coordinates,
            total_results: self.entries.len(),
            places: self.entries,
        }
    }
}

/// Request-level error object surfaced to the caller. Upstream diagnostics
/// are summarized here, never forwarded verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Validation(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Upstream { .. } => "upstream_failure",
            AppError::DetailsUnavailable(_) => "details_unavailable",
            AppError::Config(_) => "configuration",
            AppError::Http(_) | AppError::Json(_) => "internal",
        };
        Self {
            error: code,
            message: err.to_string(),
        }
    }
}
