//! Integration tests for IP geolocation and its fallback.

use forecast_core::{
    Coordinates, ForecastError,
    location::{DEFAULT_COORDINATES, IpLocator},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_locate_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "city": "Lisbon",
            "country": "Portugal",
            "lat": 38.72,
            "lon": -9.14
        })))
        .mount(&server)
        .await;

    let locator = IpLocator::new(format!("{}/json", server.uri()));
    let coords = locator.locate().await.unwrap();

    assert_eq!(coords, Coordinates { lat: 38.72, lon: -9.14 });
}

#[tokio::test]
async fn test_locate_failure_is_geolocation_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "private range"
        })))
        .mount(&server)
        .await;

    let locator = IpLocator::new(format!("{}/json", server.uri()));
    let err = locator.locate().await.unwrap_err();

    assert!(matches!(err, ForecastError::GeolocationUnavailable(ref m) if m == "private range"));
    assert_eq!(locator.locate_or_default().await, DEFAULT_COORDINATES);
}

#[tokio::test]
async fn test_server_error_falls_back_to_default() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let locator = IpLocator::new(format!("{}/json", server.uri()));
    assert_eq!(locator.locate_or_default().await, DEFAULT_COORDINATES);
}
