use std::{io::IsTerminal, sync::Arc};

use anyhow::anyhow;
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use forecast_core::{
    Config, Coordinates, DateWindow, Granularity, LocationSearch, NamedRange, SearchOutcome,
    TemperatureUnit, WeatherProvider, WeatherSnapshot, generate_series,
    location::IpLocator,
    notify::{HeaderMap, ReportLocation, SmtpNotifier, UsageReport, handle_usage_report},
    provider_from_config, resolve_custom, resolve_predefined,
};
use inquire::{Confirm, Password, Select, Text};

use crate::render::{self, GraphStyle};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecasts and temperature graphs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where to fetch weather for. With nothing given, the place is derived from
/// the public IP address.
#[derive(Debug, Args)]
pub struct PlaceArgs {
    /// Place name to search for, e.g. "Lisbon".
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    place: Option<String>,

    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Override the saved temperature unit for this run.
    #[arg(long)]
    unit: Option<TemperatureUnit>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the API key, unit and notification mail.
    Configure,

    /// Search places by name.
    Search {
        query: String,
    },

    /// Show current conditions, today's hours and the daily forecast.
    Show {
        #[command(flatten)]
        place: PlaceArgs,
    },

    /// Chart temperatures over a named or custom date range.
    Graph {
        #[command(flatten)]
        place: PlaceArgs,

        /// Named range, e.g. "today", "last-week", "next-month".
        #[arg(long, conflicts_with = "from")]
        range: Option<NamedRange>,

        /// Custom range start, YYYY-MM-DD.
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Custom range end (inclusive), YYYY-MM-DD.
        #[arg(long, requires = "from")]
        to: Option<String>,

        #[arg(long, value_enum, default_value_t = GraphStyle::Line)]
        style: GraphStyle,
    },

    /// Show or change the saved temperature unit.
    Unit {
        /// "celsius", "fahrenheit" or "toggle".
        value: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { query } => search(&Config::load()?, &query).await,
            Command::Show { place } => show(&Config::load()?, place).await,
            Command::Graph {
                place,
                range,
                from,
                to,
                style,
            } => {
                let window = match (from, to) {
                    (Some(from), Some(to)) => resolve_custom(&from, &to, &Local)?,
                    _ => resolve_predefined(range.unwrap_or(NamedRange::Today), &Local::now()),
                };
                graph(&Config::load()?, place, window, style).await
            }
            Command::Unit { value } => unit(value),
        }
    }
}

/// The on-disk config only, so environment overrides are never written back.
fn stored_config() -> anyhow::Result<Config> {
    Config::load_from(&Config::config_file_path()?)
}

fn configure() -> anyhow::Result<()> {
    let mut config = stored_config()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let units = vec![TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius];
    let start = units
        .iter()
        .position(|u| *u == config.temperature_unit())
        .unwrap_or(0);
    let unit = Select::new("Temperature unit:", units)
        .with_starting_cursor(start)
        .prompt()?;
    config.set_temperature_unit(unit);

    if Confirm::new("Send a mail notification each time weather is shown?")
        .with_default(config.mail.is_complete())
        .prompt()?
    {
        config.mail.user = Some(Text::new("Sender address:").prompt()?);
        config.mail.app_password = Some(
            Password::new("Sender app password:")
                .without_confirmation()
                .prompt()?,
        );
        config.mail.recipient = Some(Text::new("Recipient address:").prompt()?);
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn unit(value: Option<String>) -> anyhow::Result<()> {
    let mut config = stored_config()?;
    let current = config.temperature_unit();

    let next = match value.as_deref().map(str::trim) {
        None => {
            println!("{current} ({})", current.units().as_str());
            return Ok(());
        }
        Some(v) if v.eq_ignore_ascii_case("toggle") => current.toggled(),
        Some(v) => v.parse::<TemperatureUnit>()?,
    };

    config.set_temperature_unit(next);
    config.save()?;
    println!("Temperature unit set to {next} ({})", next.units().as_str());
    Ok(())
}

async fn search(config: &Config, query: &str) -> anyhow::Result<()> {
    let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(config));

    match LocationSearch::new(provider).search(query).await {
        SearchOutcome::Results(found) if found.is_empty() => {
            println!("No places found for \"{query}\"");
        }
        SearchOutcome::Results(found) => {
            for location in found {
                println!(
                    "{}  ({:.4}, {:.4})",
                    location.display_name(),
                    location.lat,
                    location.lon
                );
            }
        }
        SearchOutcome::Superseded => {}
    }
    Ok(())
}

/// Explicit coordinates, then a place search, then IP geolocation.
async fn resolve_coordinates(
    provider: Arc<dyn WeatherProvider>,
    args: &PlaceArgs,
) -> anyhow::Result<Coordinates> {
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        return Ok(Coordinates { lat, lon });
    }

    let Some(place) = &args.place else {
        return Ok(IpLocator::default().locate_or_default().await);
    };

    let mut found = match LocationSearch::new(provider).search(place).await {
        SearchOutcome::Results(found) => found,
        SearchOutcome::Superseded => Vec::new(),
    };

    if found.len() > 1 && std::io::stdin().is_terminal() {
        let names: Vec<String> = found.iter().map(|l| l.display_name()).collect();
        let picked = Select::new("Which place?", names).raw_prompt()?;
        return Ok(found.swap_remove(picked.index).coordinates());
    }

    found
        .first()
        .map(|l| l.coordinates())
        .ok_or_else(|| anyhow!("No places found for \"{place}\""))
}

async fn fetch(config: &Config, args: &PlaceArgs) -> anyhow::Result<WeatherSnapshot> {
    let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(config));
    let unit = args.unit.unwrap_or_else(|| config.temperature_unit());
    let coords = resolve_coordinates(provider.clone(), args).await?;

    match provider.fetch_snapshot(coords, unit).await {
        Ok(snapshot) => Ok(snapshot),
        Err(err) => {
            let hint = err.remediation();
            Err(anyhow::Error::new(err).context(format!("Failed to load weather data. {hint}")))
        }
    }
}

async fn show(config: &Config, args: PlaceArgs) -> anyhow::Result<()> {
    let snapshot = fetch(config, &args).await?;
    let now = Local::now();

    println!("{}", render::current(&snapshot));
    println!("{}", render::hourly_today(&snapshot, &now));
    print!("{}", render::daily(&snapshot, &now));

    if let Some(notifier) = SmtpNotifier::from_config(&config.mail) {
        let report = UsageReport {
            location: ReportLocation {
                name: snapshot.location.name.clone(),
                country: snapshot.location.country.clone(),
            },
            temperature: snapshot.current.temp.round() as i64,
            unit: snapshot.unit,
        };
        handle_usage_report(&notifier, &report, &HeaderMap::new(), Utc::now()).await;
    }
    Ok(())
}

async fn graph(
    config: &Config,
    args: PlaceArgs,
    window: DateWindow,
    style: GraphStyle,
) -> anyhow::Result<()> {
    let snapshot = fetch(config, &args).await?;
    let now = Local::now();

    let series = generate_series(&snapshot, &window, &now, &mut rand::thread_rng());
    tracing::debug!(points = series.len(), window = %window.label, "series generated");

    println!("{}", snapshot.location.display_name());
    println!("{}\n", window.describe(&Local));
    print!(
        "{}",
        render::chart(&series, Granularity::for_window(&window), style, snapshot.unit)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_accepts_named_range() {
        let cli = Cli::try_parse_from(["forecast", "graph", "--range", "last-week", "--style", "bar"])
            .expect("parse");
        match cli.command {
            Command::Graph { range, style, .. } => {
                assert_eq!(range, Some(NamedRange::LastWeek));
                assert_eq!(style, GraphStyle::Bar);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn graph_custom_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["forecast", "graph", "--from", "2024-03-01"]).is_err());
        assert!(
            Cli::try_parse_from(["forecast", "graph", "--from", "2024-03-01", "--to", "2024-03-10"])
                .is_ok()
        );
    }

    #[test]
    fn place_and_coordinates_conflict() {
        assert!(
            Cli::try_parse_from(["forecast", "show", "--place", "Paris", "--lat", "1", "--lon", "2"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["forecast", "show", "--lat", "-33.9", "--lon", "151.2"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Command::Show { place: PlaceArgs { lat: Some(_), lon: Some(_), .. } }
        ));
    }

    #[test]
    fn unknown_unit_flag_is_rejected() {
        assert!(Cli::try_parse_from(["forecast", "show", "--unit", "kelvin"]).is_err());
    }
}
