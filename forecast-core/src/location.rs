//! Approximate "where am I" via IP geolocation, with a fixed fallback.
//! Uses ip-api.com - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{error::ForecastError, model::Coordinates};

const IP_API_URL: &str = "http://ip-api.com/json";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// New York City.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 40.7128,
    lon: -74.0060,
};

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IpLocator {
    http: Client,
    url: String,
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new(IP_API_URL)
    }
}

impl IpLocator {
    pub fn new(url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
        }
    }

    pub async fn locate(&self) -> Result<Coordinates, ForecastError> {
        let unavailable = |msg: String| ForecastError::GeolocationUnavailable(msg);

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("lookup returned status {}", response.status())));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(unavailable(
                body.message.unwrap_or_else(|| "lookup failed".to_string()),
            )),
        }
    }

    /// Locate, falling back to [`DEFAULT_COORDINATES`] on any failure.
    pub async fn locate_or_default(&self) -> Coordinates {
        or_default_coordinates(self.locate().await)
    }
}

pub fn or_default_coordinates(result: Result<Coordinates, ForecastError>) -> Coordinates {
    match result {
        Ok(coords) => coords,
        Err(err) => {
            tracing::warn!(error = %err, "using default coordinates");
            DEFAULT_COORDINATES
        }
    }
}
