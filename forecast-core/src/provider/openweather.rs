use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::ProviderError,
    extend::{DAILY_HORIZON, extend_forecast},
    model::{
        Condition, Coordinates, CurrentConditions, DailyPoint, HourlyPoint, Location,
        TemperatureUnit, WeatherSnapshot,
    },
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// 16 three-hour steps, i.e. the next 48 hours.
const HOURLY_LIMIT: usize = 16;
/// Free tier forecast covers five days.
const DAILY_LIMIT: usize = 5;
/// Local hours accepted as a day's representative (around noon).
const NOON_HOURS: std::ops::RangeInclusive<u32> = 11..=14;
const NIGHT_OFFSET: f64 = 10.0;
const SEARCH_LIMIT: &str = "5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the provider at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ProviderError::Request { what, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Request { what, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                what,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ProviderError::Parse { what, source })
    }

    async fn search(&self, query: &str) -> Result<Vec<Location>, ProviderError> {
        let api_key = self.api_key()?;
        let params = [
            ("q", query.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("appid", api_key.to_string()),
        ];

        let found: Vec<OwGeoEntry> = self.get_json("geocoding", "/geo/1.0/direct", &params).await?;

        Ok(found
            .into_iter()
            .map(|g| Location {
                name: g.name,
                country: g.country,
                lat: g.lat,
                lon: g.lon,
                state: g.state,
            })
            .collect())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_snapshot(
        &self,
        coords: Coordinates,
        unit: TemperatureUnit,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let api_key = self.api_key()?;
        let params = [
            ("lat", coords.lat.to_string()),
            ("lon", coords.lon.to_string()),
            ("appid", api_key.to_string()),
            ("units", unit.units().as_str().to_string()),
        ];

        let (current, forecast) = tokio::try_join!(
            self.get_json::<OwCurrentResponse>("current weather", "/data/2.5/weather", &params),
            self.get_json::<OwForecastResponse>("forecast", "/data/2.5/forecast", &params),
        )?;

        let snapshot = build_snapshot(current, forecast, unit);
        tracing::debug!(
            location = %snapshot.location.display_name(),
            hourly = snapshot.hourly.len(),
            daily = snapshot.daily.len(),
            "fetched weather snapshot"
        );
        Ok(snapshot)
    }

    async fn search_locations(&self, query: &str) -> Vec<Location> {
        match self.search(query).await {
            Ok(found) => found,
            Err(ProviderError::MissingApiKey) => {
                tracing::error!("API key is missing, location search disabled");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, query, "location search failed");
                Vec::new()
            }
        }
    }
}

fn build_snapshot(
    current: OwCurrentResponse,
    forecast: OwForecastResponse,
    unit: TemperatureUnit,
) -> WeatherSnapshot {
    let utc_shift = Duration::seconds(i64::from(forecast.city.timezone));

    let mut hourly: Vec<HourlyPoint> = forecast
        .list
        .iter()
        .take(HOURLY_LIMIT)
        .filter_map(|entry| {
            Some(HourlyPoint {
                timestamp: unix_to_utc(entry.dt)?,
                temp: entry.main.temp,
                feels_like: entry.main.feels_like,
                humidity: entry.main.humidity,
                wind_speed: entry.wind.speed,
                conditions: conditions(&entry.weather),
            })
        })
        .collect();
    hourly.sort_by_key(|p| p.timestamp);
    hourly.dedup_by_key(|p| p.timestamp);

    let mut daily: Vec<DailyPoint> = forecast
        .list
        .iter()
        .filter_map(|entry| Some((unix_to_utc(entry.dt)?, entry)))
        .filter(|(ts, _)| NOON_HOURS.contains(&(*ts + utc_shift).hour()))
        .take(DAILY_LIMIT)
        .map(|(timestamp, entry)| DailyPoint {
            timestamp,
            temp_min: entry.main.temp_min,
            temp_max: entry.main.temp_max,
            temp_day: entry.main.temp,
            temp_night: entry.main.temp - NIGHT_OFFSET,
            feels_like_day: entry.main.feels_like,
            feels_like_night: entry.main.feels_like - NIGHT_OFFSET,
            humidity: entry.main.humidity,
            wind_speed: entry.wind.speed,
            precip_probability: (entry.pop.unwrap_or(0.0) * 100.0).clamp(0.0, 100.0),
            conditions: conditions(&entry.weather),
        })
        .collect();
    daily.sort_by_key(|p| p.timestamp);
    daily.dedup_by_key(|p| p.timestamp);

    let daily = extend_forecast(daily, DAILY_HORIZON, &mut rand::thread_rng());

    WeatherSnapshot {
        location: Location {
            name: current.name,
            country: current.sys.country.unwrap_or_default(),
            lat: current.coord.lat,
            lon: current.coord.lon,
            state: None,
        },
        unit,
        current: CurrentConditions {
            temp: current.main.temp,
            feels_like: current.main.feels_like,
            humidity: current.main.humidity,
            pressure: current.main.pressure,
            wind_speed: current.wind.speed,
            conditions: conditions(&current.weather),
        },
        hourly,
        daily,
    }
}

fn conditions(weather: &[OwWeather]) -> Vec<Condition> {
    weather
        .iter()
        .map(|w| Condition {
            id: w.id,
            main: w.main.clone(),
            description: w.description.clone(),
            icon: w.icon.clone(),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    temp_min: f64,
    #[serde(default)]
    temp_max: f64,
    #[serde(default)]
    pressure: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    main: String,
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    /// Shift in seconds from UTC.
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    country: String,
    lat: f64,
    lon: f64,
    state: Option<String>,
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
