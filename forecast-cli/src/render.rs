//! Text rendering for the terminal: current card, forecast lists and charts.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use clap::ValueEnum;
use forecast_core::{Granularity, SeriesPoint, TemperatureUnit, WeatherSnapshot};
use std::fmt::{self, Write};

const CHART_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GraphStyle {
    #[default]
    Line,
    Bar,
}

fn temp(value: f64, unit: TemperatureUnit) -> String {
    format!("{}{}", value.round() as i64, unit.symbol())
}

/// Current conditions card.
pub fn current(snapshot: &WeatherSnapshot) -> String {
    let unit = snapshot.unit;
    let now = &snapshot.current;

    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.location.display_name());
    let _ = writeln!(out, "  {}  {}", temp(now.temp, unit), now.description());
    let _ = writeln!(out, "  Feels like  {}", temp(now.feels_like, unit));
    let _ = writeln!(out, "  Humidity    {}%", now.humidity.round() as i64);
    let _ = writeln!(
        out,
        "  Wind        {} {}",
        unit.display_wind_speed(now.wind_speed),
        unit.wind_unit()
    );
    let _ = writeln!(out, "  Pressure    {} hPa", now.pressure.round() as i64);
    out
}

/// Provider hourly entries falling on `now`'s local calendar day.
pub fn hourly_today<Tz>(snapshot: &WeatherSnapshot, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let tz = now.timezone();
    let today = now.date_naive();
    let unit = snapshot.unit;

    let mut out = String::from("Today\n");
    let mut any = false;
    for point in &snapshot.hourly {
        let local = point.timestamp.with_timezone(&tz);
        if local.date_naive() != today {
            continue;
        }
        any = true;
        let description = point
            .conditions
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("");
        let _ = writeln!(
            out,
            "  {:>5}  {:>5}  {:>3}%  {:>3} {}  {}",
            local.format("%-I %p"),
            temp(point.temp, unit),
            point.humidity.round() as i64,
            unit.display_wind_speed(point.wind_speed),
            unit.wind_unit(),
            description
        );
    }
    if !any {
        out.push_str("  no more forecast entries today\n");
    }
    out
}

fn day_name(day: NaiveDate, today: NaiveDate) -> String {
    match (day - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => day.weekday().to_string(),
    }
}

/// Daily forecast list, one line per day, dated in `now`'s zone.
pub fn daily<Tz>(snapshot: &WeatherSnapshot, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let tz = now.timezone();
    let today = now.date_naive();
    let unit = snapshot.unit;

    let mut out = format!("{}-day forecast\n", snapshot.daily.len());
    for day in &snapshot.daily {
        let date = day.timestamp.with_timezone(&tz).date_naive();
        let description = day
            .conditions
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("");
        let _ = writeln!(
            out,
            "  {:<8} {:<6}  {:>5} / {:<5}  {:>3}% precip  {}",
            day_name(date, today),
            date.format("%b %-d"),
            temp(day.temp_max, unit),
            temp(day.temp_min, unit),
            day.precip_probability.round() as i64,
            description
        );
    }
    out
}

/// Renders the series as a horizontal text chart, one row per point.
pub fn chart(
    points: &[SeriesPoint],
    granularity: Granularity,
    style: GraphStyle,
    unit: TemperatureUnit,
) -> String {
    let Some(min) = points.iter().map(|p| p.low).min() else {
        return "No data for this range.\n".to_string();
    };
    let max = points.iter().map(|p| p.high).max().unwrap_or(min);
    let span = f64::from((max - min).max(1));
    let column = |value: i32| {
        let scaled = f64::from(value - min) / span * (CHART_WIDTH - 1) as f64;
        (scaled.round() as usize).min(CHART_WIDTH - 1)
    };

    let label_width = points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    let mut out = String::new();

    for point in points {
        let mut row = vec![' '; CHART_WIDTH];
        let at = column(point.temperature);

        match (style, granularity) {
            (GraphStyle::Line, Granularity::Hourly) => row[at] = '●',
            (GraphStyle::Line, Granularity::Daily) => {
                row[column(point.low)..=column(point.high)].fill('─');
                row[at] = '●';
            }
            (GraphStyle::Bar, Granularity::Hourly) => row[..=at].fill('█'),
            (GraphStyle::Bar, Granularity::Daily) => {
                let low = column(point.low);
                row[..low].fill('░');
                row[low..=column(point.high)].fill('█');
            }
        }

        let bar: String = row.into_iter().collect();
        let value = match granularity {
            Granularity::Hourly => format!("{}{}", point.temperature, unit.symbol()),
            Granularity::Daily => format!(
                "{}{}  (H {}° L {}°)",
                point.temperature,
                unit.symbol(),
                point.high,
                point.low
            ),
        };
        let _ = writeln!(out, "{:<label_width$} │{bar}│ {value}", point.label);
    }

    let _ = writeln!(
        out,
        "{:<label_width$}  {:<half$}{:>half$}",
        "",
        format!("{min}°"),
        format!("{max}°"),
        half = CHART_WIDTH / 2
    );
    out
}
