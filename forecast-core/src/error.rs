use chrono::NaiveDate;
use thiserror::Error;

/// Failures while talking to the upstream weather provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(
        "No API key configured for the weather provider.\n\
         Hint: run `forecast configure` or set WEATHER_API_KEY."
    )]
    MissingApiKey,

    #[error("Failed to send {what} request to OpenWeather")]
    Request {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenWeather {what} request failed with status {status}: {body}")]
    Status {
        what: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse OpenWeather {what} JSON")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Remediation shown next to a failed snapshot fetch.
    pub fn remediation(&self) -> &'static str {
        match self {
            ProviderError::MissingApiKey | ProviderError::Status { status: 401, .. } => {
                "Get a free API key at https://openweathermap.org/api, then run \
                 `forecast configure` or export WEATHER_API_KEY=<your key>."
            }
            _ => "Check your network connection and try again.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Start date {start} must not be after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(
        "Unknown time range '{0}'. Supported ranges: today, yesterday, tomorrow, \
         this-week, last-week, next-week, this-month, last-month, next-month."
    )]
    UnknownRange(String),

    #[error("Unknown temperature unit '{0}'. Supported units: celsius, fahrenheit.")]
    UnknownUnit(String),

    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    #[error("Failed to send usage notification: {0}")]
    Notification(String),
}
