use httptest::matchers::{all_of, contains, key, request, url_decoded};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server};
use secrecy::SecretString;
use serde_json::json;

use place_scout::{
    AppConfig, AppError, Coordinates, DetailsGeneration, EnrichedEntry, EnrichmentOrchestrator,
    LocationQuery, QueryMode, SearchDefaults,
};

fn server_config(server: &Server, generation: DetailsGeneration) -> AppConfig {
    AppConfig {
        google_api_key: Some(SecretString::from("test-key".to_string())),
        geocode_endpoint: server.url("/geocode/json").to_string(),
        places_api_base: server.url("/place").to_string(),
        places_v1_base: server.url("/v1").to_string(),
        details_generation: generation,
        details_concurrency: 4,
        upstream_timeout_secs: 5,
        search_defaults: SearchDefaults {
            radius: 5_000,
            keyword: "hotel".into(),
            place_type: "establishment".into(),
        },
    }
}

fn geocode_ok(server: &Server) {
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/geocode/json"),
            request::query(url_decoded(contains((
                "address",
                "1600 Amphitheatre Parkway"
            ))))
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "results": [{
                "formatted_address": "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA",
                "geometry": { "location": { "lat": 37.42, "lng": -122.08 } }
            }]
        }))),
    );
}

fn summary_row(id: &str, name: &str) -> serde_json::Value {
    json!({
        "place_id": id,
        "name": name,
        "vicinity": "Nearby Street",
        "rating": 4.2,
        "user_ratings_total": 120,
        "types": ["lodging", "spa", "point_of_interest"],
        "business_status": "OPERATIONAL",
        "price_level": 3
    })
}

fn legacy_details_ok(server: &Server, id: &'static str, photo_count: usize) {
    let photos: Vec<_> = (0..photo_count)
        .map(|i| json!({ "photo_reference": format!("{id}-ref-{i}") }))
        .collect();
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/details/json"),
            request::query(url_decoded(contains(("place_id", id))))
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "result": {
                "formatted_address": format!("{id} Formatted Address"),
                "formatted_phone_number": "+1 650-253-0000",
                "website": format!("https://{id}.example.com"),
                "url": format!("https://maps.google.com/?cid={id}"),
                "opening_hours": { "open_now": true },
                "photos": photos
            }
        }))),
    );
}

#[tokio::test]
async fn nearby_pipeline_isolates_a_single_detail_failure() {
    let server = Server::run();
    geocode_ok(&server);

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/nearbysearch/json"),
            request::query(url_decoded(contains(("keyword", "hotel")))),
            request::query(url_decoded(contains(("location", "37.42,-122.08"))))
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "results": [
                summary_row("alpha", "Alpha Hotel"),
                summary_row("bravo", "Bravo Hotel"),
                summary_row("charlie", "Charlie Hotel")
            ]
        }))),
    );

    legacy_details_ok(&server, "alpha", 7);
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/details/json"),
            request::query(url_decoded(contains(("place_id", "bravo"))))
        ))
        .respond_with(json_encoded(json!({ "status": "NOT_FOUND" }))),
    );
    legacy_details_ok(&server, "charlie", 2);

    let config = server_config(&server, DetailsGeneration::Legacy);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query =
        LocationQuery::from_address("1600 Amphitheatre Parkway", 5_000, "hotel", "establishment");

    let outcome = orchestrator.enrich(&query).await.expect("enrichment");
    assert_eq!(outcome.entries.len(), 3);

    match &outcome.entries[0] {
        EnrichedEntry::Place(place) => {
            assert_eq!(place.id, "alpha");
            assert_eq!(place.address.as_deref(), Some("alpha Formatted Address"));
            assert_eq!(place.images.len(), 5);
            assert!(place.images[0].contains("photoreference=alpha-ref-0"));
            assert_eq!(place.phone.as_deref(), Some("+1 650-253-0000"));
            assert_eq!(place.open_now, Some(true));
            assert_eq!(place.price_level, 3);
            assert_eq!(place.search_keyword, "hotel");
            let json = serde_json::to_value(place).unwrap();
            assert_eq!(json["business_status"], "Open");
            assert_eq!(
                json["amenities"],
                json!(["Accommodation", "Spa Services"])
            );
        }
        EnrichedEntry::Failed(_) => panic!("first entry should be enriched"),
    }

    match &outcome.entries[1] {
        EnrichedEntry::Failed(failure) => {
            assert_eq!(failure.id, "bravo");
            assert_eq!(failure.name, "Bravo Hotel");
            assert_eq!(failure.error, "details_unavailable");
        }
        EnrichedEntry::Place(_) => panic!("second entry should carry a failure marker"),
    }

    match &outcome.entries[2] {
        EnrichedEntry::Place(place) => {
            assert_eq!(place.id, "charlie");
            assert_eq!(place.images.len(), 2);
        }
        EnrichedEntry::Failed(_) => panic!("third entry should be enriched"),
    }

    let envelope = outcome.into_envelope();
    assert_eq!(
        envelope.location,
        "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA"
    );
    assert_eq!(envelope.total_results, 3);
    assert!((envelope.coordinates.lat - 37.42).abs() < 1e-9);
}

#[tokio::test]
async fn current_generation_adapter_sends_a_field_mask() {
    let server = Server::run();

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/nearbysearch/json")
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "results": [summary_row("delta", "Delta Hotel")]
        }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/v1/places/delta"),
            request::headers(contains(key("x-goog-fieldmask"))),
            request::headers(contains(("x-goog-api-key", "test-key")))
        ))
        .respond_with(json_encoded(json!({
            "formattedAddress": "Delta Formatted Address",
            "nationalPhoneNumber": "2345 6789",
            "websiteUri": "https://delta.example.com",
            "googleMapsUri": "https://maps.google.com/?cid=delta",
            "currentOpeningHours": { "openNow": false },
            "photos": [
                { "name": "places/delta/photos/one" },
                { "name": "places/delta/photos/two" }
            ]
        }))),
    );

    let config = server_config(&server, DetailsGeneration::Current);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query = LocationQuery::from_coordinates(
        Coordinates {
            lat: 22.28,
            lng: 114.15,
        },
        3_000,
        "dining",
        "restaurant",
    );

    let outcome = orchestrator.enrich(&query).await.expect("enrichment");
    match &outcome.entries[0] {
        EnrichedEntry::Place(place) => {
            assert_eq!(place.address.as_deref(), Some("Delta Formatted Address"));
            assert_eq!(place.map_url, "https://maps.google.com/?cid=delta");
            assert_eq!(place.open_now, Some(false));
            assert_eq!(place.images.len(), 2);
            assert!(place.images[0].contains("places%2Fdelta%2Fphotos%2Fone"));
        }
        EnrichedEntry::Failed(_) => panic!("detail fetch should succeed"),
    }
}

#[tokio::test]
async fn unresolvable_address_surfaces_not_found() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/geocode/json")
        ))
        .respond_with(json_encoded(json!({ "status": "ZERO_RESULTS", "results": [] }))),
    );

    let config = server_config(&server, DetailsGeneration::Legacy);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query = LocationQuery::from_address("nowhere at all", 5_000, "hotel", "establishment");

    let err = orchestrator.enrich(&query).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn denied_search_aborts_with_a_summarized_upstream_error() {
    let server = Server::run();
    geocode_ok(&server);

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/nearbysearch/json")
        ))
        .respond_with(json_encoded(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }))),
    );

    let config = server_config(&server, DetailsGeneration::Legacy);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query =
        LocationQuery::from_address("1600 Amphitheatre Parkway", 5_000, "hotel", "establishment");

    let err = orchestrator.enrich(&query).await.unwrap_err();
    match err {
        AppError::Upstream { message, .. } => {
            assert!(message.contains("REQUEST_DENIED"));
        }
        other => panic!("expected an upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn text_mode_routes_to_the_text_search_endpoint() {
    let server = Server::run();

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/textsearch/json"),
            request::query(url_decoded(contains(("query", "rooftop bar"))))
        ))
        .respond_with(json_encoded(json!({
            "status": "ZERO_RESULTS",
            "results": []
        }))),
    );

    let config = server_config(&server, DetailsGeneration::Legacy);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query = LocationQuery::from_coordinates(
        Coordinates {
            lat: 1.29,
            lng: 103.85,
        },
        5_000,
        "rooftop bar",
        "bar",
    )
    .with_mode(QueryMode::Text);

    let outcome = orchestrator.enrich(&query).await.expect("enrichment");
    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.into_envelope().total_results, 0);
}

#[tokio::test]
async fn http_failure_on_details_is_contained_to_the_item() {
    let server = Server::run();

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/nearbysearch/json")
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "results": [summary_row("echo", "Echo Hotel")]
        }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/place/details/json")
        ))
        .respond_with(status_code(500)),
    );

    let config = server_config(&server, DetailsGeneration::Legacy);
    let orchestrator = EnrichmentOrchestrator::new(&config).expect("orchestrator");
    let query = LocationQuery::from_coordinates(
        Coordinates {
            lat: 48.85,
            lng: 2.35,
        },
        5_000,
        "hotel",
        "establishment",
    );

    let outcome = orchestrator.enrich(&query).await.expect("enrichment");
    assert_eq!(outcome.entries.len(), 1);
    assert!(outcome.entries[0].is_failure());
}
