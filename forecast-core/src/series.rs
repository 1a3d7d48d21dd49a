//! Chart series generation.
//!
//! Turns a snapshot's sparse real samples into a gap-filled series covering an
//! arbitrary [`DateWindow`]. Windows of one day or less produce hourly points;
//! longer windows produce one high/low/average point per local calendar day.
//! Hours and days the provider does not cover are filled with synthetic values.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    f64::consts::TAU,
    fmt,
};

use crate::{
    model::WeatherSnapshot,
    range::{DateWindow, ceil_div, local_midnight},
};

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Baseline used when there is no real sample at all.
pub const FALLBACK_TEMP: f64 = 20.0;

/// One chart-ready point. For hourly points `high == low == temperature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub temperature: i32,
    pub high: i32,
    pub low: i32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn for_window(window: &DateWindow) -> Self {
        if window.days_spanned() > 1 {
            Granularity::Daily
        } else {
            Granularity::Hourly
        }
    }
}

/// Builds the series for `window`. `now` decides the past/future split, the
/// "hours ago" labels and the local calendar used for day buckets.
///
/// Output is sorted by `time` with no duplicate times. Real samples always win
/// over synthetic ones for the same hour or day.
pub fn generate_series<Tz, R>(
    snapshot: &WeatherSnapshot,
    window: &DateWindow,
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Vec<SeriesPoint>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    R: Rng + ?Sized,
{
    let mut points = match Granularity::for_window(window) {
        Granularity::Hourly => hourly_series(snapshot, window, now, rng),
        Granularity::Daily => daily_series(snapshot, window, now, rng),
    };
    points.sort_by_key(|p| p.time);
    points
}

fn hourly_series<Tz, R>(
    snapshot: &WeatherSnapshot,
    window: &DateWindow,
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Vec<SeriesPoint>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    R: Rng + ?Sized,
{
    let now_utc = now.with_timezone(&Utc);

    let mut points: Vec<SeriesPoint> = snapshot
        .hourly
        .iter()
        .filter(|p| window.contains(p.timestamp))
        .map(|p| flat_point(p.timestamp, round_temp(p.temp), now))
        .collect();

    if window.start < now_utc {
        let covered: HashSet<i64> = points.iter().map(|p| hour_slot(p.time)).collect();
        let base = points
            .first()
            .map(|p| f64::from(p.temperature))
            .unwrap_or(FALLBACK_TEMP);
        let gap_hours = ceil_div(now_utc - window.start, HOUR_MS);

        for hours_ago in (1..=gap_hours).rev() {
            let time = now_utc - Duration::hours(hours_ago);
            if !window.contains(time) || covered.contains(&hour_slot(time)) {
                continue;
            }

            let variation = ((hours_ago as f64 / 24.0) * TAU).sin() * 5.0;
            let temp = base + variation + rng.gen_range(-2.0..2.0);
            points.push(flat_point(time, round_temp(temp), now));
        }
    }

    points
}

/// Temperatures collected for one local calendar day.
#[derive(Debug)]
struct DayBucket {
    /// Time reported for the day: the first real sample, or the synthetic anchor.
    time: DateTime<Utc>,
    samples: Vec<f64>,
}

impl DayBucket {
    fn real(time: DateTime<Utc>, temp: f64) -> Self {
        Self {
            time,
            samples: vec![temp],
        }
    }

    /// 24 pseudo-hourly samples around `day_temp`.
    fn synthetic(time: DateTime<Utc>, day_temp: f64) -> Self {
        let samples = (0..24u32)
            .map(|hour| day_temp + ((f64::from(hour) / 24.0) * TAU).sin() * 3.0)
            .collect();
        Self { time, samples }
    }

    fn push(&mut self, temp: f64) {
        self.samples.push(temp);
    }

    fn mean(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    fn high(&self) -> f64 {
        self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn low(&self) -> f64 {
        self.samples.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

fn daily_series<Tz, R>(
    snapshot: &WeatherSnapshot,
    window: &DateWindow,
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Vec<SeriesPoint>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
    R: Rng + ?Sized,
{
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let local_day = |t: DateTime<Utc>| -> NaiveDate { t.with_timezone(&tz).date_naive() };

    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for point in snapshot.hourly.iter().filter(|p| window.contains(p.timestamp)) {
        buckets
            .entry(local_day(point.timestamp))
            .and_modify(|b| b.push(point.temp))
            .or_insert_with(|| DayBucket::real(point.timestamp, point.temp));
    }

    let base = buckets
        .values()
        .next()
        .and_then(|b| b.samples.first().copied())
        .or_else(|| snapshot.hourly.first().map(|p| p.temp))
        .unwrap_or(FALLBACK_TEMP);

    let today = now.date_naive();
    let first_day = local_day(window.start);

    // Past: every missing local day before today, anchored at now's wall-clock time.
    if window.start < now_utc {
        for day in first_day.iter_days().take_while(|d| *d < today) {
            let time = local_at(&tz, day, now.time());
            if !window.contains(time) || buckets.contains_key(&day) {
                continue;
            }

            let days_ago = (today - day).num_days();
            let seasonal = ((days_ago as f64 / 7.0) * TAU).sin() * 8.0;
            let day_temp = base + seasonal + rng.gen_range(-3.0..3.0);
            buckets.insert(day, DayBucket::synthetic(time, day_temp));
        }
    }

    // Future: every missing local day from today on, anchored at local midnight.
    if window.end > now_utc {
        let last_known = buckets
            .values()
            .max_by_key(|b| b.time)
            .map(DayBucket::mean)
            .or_else(|| snapshot.hourly.last().map(|p| p.temp))
            .unwrap_or(base);

        let days = first_day
            .max(today)
            .iter_days()
            .take_while(|d| local_midnight(&tz, *d) < window.end);

        for day in days {
            let midnight = local_midnight(&tz, day);
            if !window.contains(midnight) || buckets.contains_key(&day) {
                continue;
            }

            let days_from_now = (day - today).num_days();
            let seasonal = ((days_from_now as f64 / 30.0) * TAU).sin() * 8.0;
            let day_temp = last_known + seasonal + rng.gen_range(-3.0..3.0);
            buckets.insert(day, DayBucket::synthetic(midnight, day_temp));
        }
    }

    buckets
        .into_values()
        .map(|bucket| {
            let high = bucket.high();
            let low = bucket.low();
            SeriesPoint {
                time: bucket.time,
                temperature: round_temp((high + low) / 2.0),
                high: round_temp(high),
                low: round_temp(low),
                label: bucket.time.with_timezone(&tz).format("%b %-d").to_string(),
            }
        })
        .collect()
}

fn flat_point<Tz>(time: DateTime<Utc>, temp: i32, now: &DateTime<Tz>) -> SeriesPoint
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    SeriesPoint {
        time,
        temperature: temp,
        high: temp,
        low: temp,
        label: hourly_label(time, now),
    }
}

/// "Now", "{n}h ago" for the last day, else "Mar 5, 3 PM".
fn hourly_label<Tz>(time: DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let age_hours = (now.with_timezone(&Utc) - time)
        .num_milliseconds()
        .div_euclid(HOUR_MS);

    match age_hours {
        0 => "Now".to_string(),
        1..=23 => format!("{age_hours}h ago"),
        _ => time
            .with_timezone(&now.timezone())
            .format("%b %-d, %-I %p")
            .to_string(),
    }
}

/// `time` on local `day`, or local midnight when a DST gap skips it.
fn local_at<Tz: TimeZone>(tz: &Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| local_midnight(tz, day))
}

fn hour_slot(time: DateTime<Utc>) -> i64 {
    time.timestamp().div_euclid(3600)
}

fn round_temp(temp: f64) -> i32 {
    temp.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{CurrentConditions, HourlyPoint, Location, TemperatureUnit},
        range::{NamedRange, resolve_custom, resolve_predefined},
    };
    use chrono_tz::America::New_York;
    use rand::{SeedableRng, rngs::StdRng};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn hourly(time: DateTime<Utc>, temp: f64) -> HourlyPoint {
        HourlyPoint {
            timestamp: time,
            temp,
            feels_like: temp,
            humidity: 60.0,
            wind_speed: 3.0,
            conditions: Vec::new(),
        }
    }

    fn snapshot(hourly: Vec<HourlyPoint>) -> WeatherSnapshot {
        WeatherSnapshot {
            location: Location {
                name: "Testville".into(),
                country: "TV".into(),
                lat: 0.0,
                lon: 0.0,
                state: None,
            },
            unit: TemperatureUnit::Celsius,
            current: CurrentConditions {
                temp: 15.0,
                feels_like: 14.0,
                humidity: 60.0,
                pressure: 1013.0,
                wind_speed: 3.0,
                conditions: Vec::new(),
            },
            hourly,
            daily: Vec::new(),
        }
    }

    fn assert_sorted_unique(points: &[SeriesPoint]) {
        for pair in points.windows(2) {
            assert!(pair[0].time < pair[1].time, "{:?} !< {:?}", pair[0].time, pair[1].time);
        }
    }

    #[test]
    fn today_with_real_points_only_uses_them() {
        let now = utc(2024, 3, 13, 0);
        let window = resolve_predefined(NamedRange::Today, &now);
        let snap = snapshot(vec![
            hourly(utc(2024, 3, 13, 0), 10.4),
            hourly(utc(2024, 3, 13, 3), 11.6),
            hourly(utc(2024, 3, 13, 6), 13.5),
            hourly(utc(2024, 3, 13, 9), 15.0),
        ]);

        let mut rng = StdRng::seed_from_u64(7);
        let points = generate_series(&snap, &window, &now, &mut rng);

        let temps: Vec<i32> = points.iter().map(|p| p.temperature).collect();
        assert_eq!(temps, vec![10, 12, 14, 15]);
        assert!(points.iter().all(|p| p.high == p.temperature && p.low == p.temperature));
        assert_eq!(points[0].label, "Now");
        assert_sorted_unique(&points);
    }

    #[test]
    fn hourly_points_outside_window_are_dropped() {
        let now = utc(2024, 3, 13, 0);
        let window = resolve_predefined(NamedRange::Today, &now);
        let snap = snapshot(vec![
            hourly(utc(2024, 3, 13, 21), 9.0),
            hourly(utc(2024, 3, 14, 0), 8.0),
            hourly(utc(2024, 3, 14, 3), 7.0),
        ]);

        let mut rng = StdRng::seed_from_u64(8);
        let points = generate_series(&snap, &window, &now, &mut rng);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, utc(2024, 3, 13, 21));
    }

    #[test]
    fn yesterday_is_synthesized_hour_by_hour() {
        let now = utc(2024, 3, 13, 10);
        let window = resolve_predefined(NamedRange::Yesterday, &now);

        let mut rng = StdRng::seed_from_u64(9);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(points.len(), 24);
        assert_sorted_unique(&points);
        for p in &points {
            assert!(window.contains(p.time));
            assert_eq!(p.high, p.temperature);
            assert_eq!(p.low, p.temperature);
            // Fallback baseline 20, seasonal ±5, jitter ±2.
            assert!((13..=27).contains(&p.temperature), "{}", p.temperature);
        }
    }

    #[test]
    fn synthetic_hours_do_not_overwrite_real_ones() {
        let now = utc(2024, 3, 13, 12);
        let window = resolve_predefined(NamedRange::Today, &now);
        let real = utc(2024, 3, 13, 6);
        let snap = snapshot(vec![hourly(real, 30.0), hourly(utc(2024, 3, 13, 15), 32.0)]);

        let mut rng = StdRng::seed_from_u64(10);
        let points = generate_series(&snap, &window, &now, &mut rng);

        assert_sorted_unique(&points);
        let at_six: Vec<_> = points.iter().filter(|p| hour_slot(p.time) == hour_slot(real)).collect();
        assert_eq!(at_six.len(), 1);
        assert_eq!(at_six[0].temperature, 30);
        // 12 past hours (one of them real) plus the future real point.
        assert_eq!(points.len(), 13);
    }

    #[test]
    fn hourly_labels_count_hours_back() {
        let now = utc(2024, 3, 13, 12);
        assert_eq!(hourly_label(now, &now), "Now");
        assert_eq!(hourly_label(now - Duration::hours(1), &now), "1h ago");
        assert_eq!(hourly_label(now - Duration::hours(23), &now), "23h ago");
        assert_eq!(hourly_label(now - Duration::hours(24), &now), "Mar 12, 12 PM");
        assert_eq!(hourly_label(now + Duration::hours(3), &now), "Mar 13, 3 PM");
    }

    #[test]
    fn ten_past_days_without_data() {
        let now = utc(2024, 3, 13, 15);
        let window = DateWindow {
            label: "Last 10 days".into(),
            start: now - Duration::days(10),
            end: now,
        };

        let mut rng = StdRng::seed_from_u64(11);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(points.len(), 10);
        assert_sorted_unique(&points);
        for p in &points {
            assert!(p.low <= p.temperature && p.temperature <= p.high);
            // Baseline 20, weekly ±8, jitter ±3, hourly ±3.
            assert!(p.low >= 6 && p.high <= 34, "{p:?}");
        }
        assert_eq!(points[0].label, "Mar 3");
    }

    #[test]
    fn next_week_is_fully_synthetic() {
        let now = utc(2024, 3, 13, 15);
        let window = resolve_predefined(NamedRange::NextWeek, &now);

        let mut rng = StdRng::seed_from_u64(12);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(points.len(), 7);
        assert_sorted_unique(&points);
        assert_eq!(points[0].time, utc(2024, 3, 18, 0));
        assert_eq!(points[6].time, utc(2024, 3, 24, 0));
        assert!(points.iter().all(|p| p.low <= p.temperature && p.temperature <= p.high));
    }

    #[test]
    fn this_week_mixes_real_and_synthetic_days() {
        let now = utc(2024, 3, 13, 15);
        let window = resolve_predefined(NamedRange::ThisWeek, &now);
        let snap = snapshot(vec![
            hourly(utc(2024, 3, 13, 18), 10.0),
            hourly(utc(2024, 3, 13, 21), 4.0),
            hourly(utc(2024, 3, 14, 0), 2.0),
            hourly(utc(2024, 3, 14, 12), 12.0),
        ]);

        let mut rng = StdRng::seed_from_u64(13);
        let points = generate_series(&snap, &window, &now, &mut rng);

        // Mon..Sun, one point per day.
        assert_eq!(points.len(), 7);
        assert_sorted_unique(&points);

        let wednesday = points.iter().find(|p| p.label == "Mar 13").unwrap();
        assert_eq!(wednesday.time, utc(2024, 3, 13, 18));
        assert_eq!((wednesday.low, wednesday.high, wednesday.temperature), (4, 10, 7));

        let thursday = points.iter().find(|p| p.label == "Mar 14").unwrap();
        assert_eq!((thursday.low, thursday.high, thursday.temperature), (2, 12, 7));

        assert!(points.iter().all(|p| p.low <= p.temperature && p.temperature <= p.high));
    }

    #[test]
    fn custom_month_in_the_past_gets_one_point_per_day() {
        let now = utc(2024, 3, 13, 15);
        let window = resolve_custom("2024-02-01", "2024-02-29", &Utc).unwrap();

        let mut rng = StdRng::seed_from_u64(14);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(points.len(), 29);
        assert_sorted_unique(&points);
        assert!(points.iter().all(|p| window.contains(p.time)));
    }

    #[test]
    fn granularity_switches_after_one_day() {
        let now = utc(2024, 3, 13, 15);
        let today = resolve_predefined(NamedRange::Today, &now);
        let week = resolve_predefined(NamedRange::ThisWeek, &now);

        assert_eq!(Granularity::for_window(&today), Granularity::Hourly);
        assert_eq!(Granularity::for_window(&week), Granularity::Daily);
    }

    #[test]
    fn fall_back_today_stays_hourly() {
        // 2024-11-03 lasts 25 hours in New York.
        let now = New_York.with_ymd_and_hms(2024, 11, 3, 12, 0, 0).unwrap();
        let window = resolve_predefined(NamedRange::Today, &now);

        let mut rng = StdRng::seed_from_u64(16);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(Granularity::for_window(&window), Granularity::Hourly);
        // Local midnight (EDT) to noon (EST) is 13 elapsed hours.
        assert_eq!(points.len(), 13);
        assert_sorted_unique(&points);
        assert!(points.iter().all(|p| window.contains(p.time)));
    }

    #[test]
    fn spring_forward_month_fills_every_day() {
        // Just after local midnight, with Mar 10 (23 hours) behind us.
        let now = New_York.with_ymd_and_hms(2024, 3, 20, 0, 30, 0).unwrap();
        let window = resolve_predefined(NamedRange::ThisMonth, &now);

        let mut rng = StdRng::seed_from_u64(17);
        let points = generate_series(&snapshot(Vec::new()), &window, &now, &mut rng);

        assert_eq!(points.len(), 31);
        assert_sorted_unique(&points);
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(&labels[8..11], ["Mar 9", "Mar 10", "Mar 11"]);
        assert_eq!(labels[30], "Mar 31");
    }

    #[test]
    fn late_evening_keeps_today_when_forecast_starts_tomorrow() {
        let now = utc(2024, 3, 13, 22);
        let window = resolve_predefined(NamedRange::ThisWeek, &now);
        let snap = snapshot(vec![
            hourly(utc(2024, 3, 14, 0), 6.0),
            hourly(utc(2024, 3, 14, 3), 5.0),
        ]);

        let mut rng = StdRng::seed_from_u64(18);
        let points = generate_series(&snap, &window, &now, &mut rng);

        assert_eq!(points.len(), 7);
        assert_sorted_unique(&points);
        let wednesday = points.iter().find(|p| p.label == "Mar 13").unwrap();
        assert_eq!(wednesday.time, utc(2024, 3, 13, 0));
        let thursday = points.iter().find(|p| p.label == "Mar 14").unwrap();
        assert_eq!((thursday.low, thursday.high), (5, 6));
    }

    #[test]
    fn empty_window_yields_nothing() {
        let now = utc(2024, 3, 13, 15);
        let window = DateWindow {
            label: "Empty".into(),
            start: now,
            end: now,
        };

        let mut rng = StdRng::seed_from_u64(15);
        assert!(generate_series(&snapshot(Vec::new()), &window, &now, &mut rng).is_empty());
    }
}
