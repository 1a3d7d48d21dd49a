//! Pads a short daily forecast with synthetic days.
//!
//! The free provider tier only covers a few days. Missing days are derived
//! from the last real day plus a 30-day sinusoid and bounded jitter. The result
//! is demo data, not a forecast.

use chrono::Duration;
use rand::Rng;
use std::f64::consts::TAU;

use crate::model::DailyPoint;

/// Number of daily entries a snapshot is padded to.
pub const DAILY_HORIZON: usize = 5;

const SEASON_DAYS: f64 = 30.0;
const SEASON_AMPLITUDE: f64 = 10.0;

/// Appends synthetic days until `daily` holds `target` entries.
///
/// Synthetic day `i` (position counted from the start of the real data) is
/// stamped `first + i days` and derives every value from the last real entry,
/// so only the seasonal term varies between synthetic days. Humidity is not
/// clamped and can leave `0..=100`; precipitation probability is clamped.
pub fn extend_forecast<R: Rng + ?Sized>(
    mut daily: Vec<DailyPoint>,
    target: usize,
    rng: &mut R,
) -> Vec<DailyPoint> {
    if daily.len() >= target {
        return daily;
    }

    let (Some(first), Some(last)) = (daily.first(), daily.last()) else {
        // Nothing to extrapolate from.
        return daily;
    };
    let first_ts = first.timestamp;
    let last = last.clone();

    for i in daily.len()..target {
        let variation = ((i as f64 / SEASON_DAYS) * TAU).sin() * SEASON_AMPLITUDE;

        daily.push(DailyPoint {
            timestamp: first_ts + Duration::days(i as i64),
            temp_min: last.temp_min + variation - 5.0,
            temp_max: last.temp_max + variation + 5.0,
            temp_day: last.temp_day + variation,
            temp_night: last.temp_night + variation - 5.0,
            feels_like_day: last.feels_like_day + variation,
            feels_like_night: last.feels_like_night + variation - 5.0,
            humidity: last.humidity + rng.gen_range(-10.0..10.0),
            wind_speed: last.wind_speed + rng.gen_range(-2.5..2.5),
            precip_probability: (last.precip_probability + rng.gen_range(-10.0..10.0))
                .clamp(0.0, 100.0),
            conditions: last.conditions.clone(),
        });
    }

    daily
}
