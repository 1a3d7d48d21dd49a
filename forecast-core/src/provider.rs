use crate::{
    Config,
    error::ProviderError,
    model::{Coordinates, Location, TemperatureUnit, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch current conditions and forecast for `coords`. Either lookup
    /// failing fails the whole snapshot.
    async fn fetch_snapshot(
        &self,
        coords: Coordinates,
        unit: TemperatureUnit,
    ) -> Result<WeatherSnapshot, ProviderError>;

    /// Search places by name. Never fails: errors are logged and yield an
    /// empty list.
    async fn search_locations(&self, query: &str) -> Vec<Location>;
}

/// Construct the provider from config. A missing API key is not an error
/// here; it surfaces when the provider is used.
pub fn provider_from_config(config: &Config) -> Box<dyn WeatherProvider> {
    Box::new(OpenWeatherProvider::new(config.api_key().map(str::to_owned)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn provider_without_key_refuses_snapshot() {
        let provider = provider_from_config(&Config::default());
        let err = provider
            .fetch_snapshot(Coordinates { lat: 1.0, lon: 2.0 }, TemperatureUnit::Celsius)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::MissingApiKey));
        assert!(err.to_string().contains("No API key configured"));
    }

    #[tokio::test]
    async fn provider_without_key_searches_nothing() {
        let provider = provider_from_config(&Config::default());
        assert!(provider.search_locations("London").await.is_empty());
    }
}
