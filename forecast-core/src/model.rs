use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ForecastError;

/// Unit system understood by the provider's `units` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// Temperature unit preference chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    pub fn units(&self) -> Units {
        match self {
            TemperatureUnit::Celsius => Units::Metric,
            TemperatureUnit::Fahrenheit => Units::Imperial,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn wind_unit(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "kph",
            TemperatureUnit::Fahrenheit => "mph",
        }
    }

    /// Wind speed as displayed: metric data arrives in m/s and is shown in kph,
    /// imperial data is already mph.
    pub fn display_wind_speed(&self, speed: f64) -> i64 {
        match self {
            TemperatureUnit::Celsius => (speed * 3.6).round() as i64,
            TemperatureUnit::Fahrenheit => speed.round() as i64,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TemperatureUnit::Celsius => TemperatureUnit::Fahrenheit,
            TemperatureUnit::Fahrenheit => TemperatureUnit::Celsius,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureUnit {
    type Err = ForecastError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "celsius" | "c" | "metric" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" | "f" | "imperial" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(ForecastError::UnknownUnit(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A place produced by search or reverse lookup. Used as the key for re-fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// "Name, State, Country", omitting the state when absent.
    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ => format!("{}, {}", self.name, self.country),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub conditions: Vec<Condition>,
}

impl CurrentConditions {
    pub fn description(&self) -> &str {
        self.conditions
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub timestamp: DateTime<Utc>,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub timestamp: DateTime<Utc>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub temp_day: f64,
    pub temp_night: f64,
    pub feels_like_day: f64,
    pub feels_like_night: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    /// Percent, 0..=100.
    pub precip_probability: f64,
    pub conditions: Vec<Condition>,
}

/// Normalized current + forecast bundle for one location at one fetch moment.
///
/// `hourly` holds provider data only. `daily` has already been padded by
/// [`crate::extend::extend_forecast`]. Both are strictly increasing in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub unit: TemperatureUnit,
    pub current: CurrentConditions,
    pub hourly: Vec<HourlyPoint>,
    pub daily: Vec<DailyPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_to_celsius_switches_to_metric_units() {
        let unit = TemperatureUnit::Fahrenheit.toggled();

        assert_eq!(unit, TemperatureUnit::Celsius);
        assert_eq!(unit.units().as_str(), "metric");
        assert_eq!(unit.toggled(), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn celsius_wind_speed_is_shown_in_kph() {
        assert_eq!(TemperatureUnit::Celsius.display_wind_speed(5.0), 18);
        assert_eq!(TemperatureUnit::Celsius.display_wind_speed(3.3), 12);
        assert_eq!(TemperatureUnit::Celsius.wind_unit(), "kph");
    }

    #[test]
    fn fahrenheit_wind_speed_is_already_mph() {
        assert_eq!(TemperatureUnit::Fahrenheit.display_wind_speed(7.6), 8);
        assert_eq!(TemperatureUnit::Fahrenheit.wind_unit(), "mph");
    }

    #[test]
    fn parse_temperature_unit() {
        assert_eq!("Celsius".parse::<TemperatureUnit>().ok(), Some(TemperatureUnit::Celsius));
        assert_eq!("imperial".parse::<TemperatureUnit>().ok(), Some(TemperatureUnit::Fahrenheit));

        let err = "kelvin".parse::<TemperatureUnit>().unwrap_err();
        assert!(err.to_string().contains("Unknown temperature unit"));
    }

    #[test]
    fn display_name_includes_state_when_present() {
        let mut loc = Location {
            name: "Portland".into(),
            country: "US".into(),
            lat: 45.5,
            lon: -122.7,
            state: Some("Oregon".into()),
        };
        assert_eq!(loc.display_name(), "Portland, Oregon, US");

        loc.state = None;
        assert_eq!(loc.display_name(), "Portland, US");
    }
}
