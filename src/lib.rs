mod config;
mod details;
mod enrich;
mod errors;
mod geocode;
mod normalize;
mod response;
mod search;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{AppConfig, DetailsGeneration, PublicAppConfig, SearchDefaults};
pub use details::{DetailsFetch, DetailsFetcher, PlaceDetails};
pub use enrich::{
    EnrichedEntry, EnrichmentFailure, EnrichmentOrchestrator, EnrichmentOutcome, LocationQuery,
};
pub use errors::{AppError, AppResult, Stage};
pub use geocode::{Coordinates, LocationResolver, Resolve, ResolvedLocation};
pub use normalize::{Amenity, BusinessStatus, NormalizedPlace, Normalizer};
pub use response::{ErrorBody, PlacesEnvelope};
pub use search::{PhotoRef, PlaceSearchClient, PlaceSummary, QueryMode, SearchPlaces};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,place_scout=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
