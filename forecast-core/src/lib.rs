//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the normalized snapshot model
//! - Forecast extension, time-range resolution and chart series generation
//! - Search sequencing, geolocation fallback and the usage notification
//!
//! Everything except the provider and notifier is synchronous and pure: state
//! lives with the caller and is passed in on every call.

pub mod config;
pub mod error;
pub mod extend;
pub mod location;
pub mod model;
pub mod notify;
pub mod provider;
pub mod range;
pub mod search;
pub mod series;

pub use config::{Config, MailConfig};
pub use error::{ForecastError, ProviderError};
pub use extend::{DAILY_HORIZON, extend_forecast};
pub use model::{
    Condition, Coordinates, CurrentConditions, DailyPoint, HourlyPoint, Location,
    TemperatureUnit, Units, WeatherSnapshot,
};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use range::{DateWindow, NamedRange, resolve_custom, resolve_predefined};
pub use search::{LocationSearch, SearchOutcome, SearchSequencer};
pub use series::{Granularity, SeriesPoint, generate_series};
