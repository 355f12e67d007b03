//! Synthetic multi-country daily call volumes.
//!
//! Each country gets its own base level and growth rate; every day's expected
//! volume is
//!
//! ```text
//! level(d) = base * (1 + growth * d / 365) * weekly(weekday) * yearly(day_of_year) * incident
//! ```
//!
//! and the written count is a Poisson draw around it. Incident days are rare
//! volume spikes (outages, campaigns) that the model should treat as noise.

use std::f64::consts::PI;
use std::io::Write;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Poisson};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;

/// Country codes assigned in order; further countries get numbered codes.
const COUNTRY_CODES: [&str; 10] = ["US", "GB", "DE", "FR", "ES", "IT", "NL", "SE", "PL", "IE"];

/// Weekday multipliers, Monday first. Contact centres are quiet at weekends.
const WEEKDAY_PROFILE: [f64; 7] = [1.25, 1.10, 1.05, 1.00, 0.95, 0.55, 0.40];

/// Amplitude of the yearly cycle (peak in early January).
const YEARLY_AMPLITUDE: f64 = 0.15;

/// Probability that a day is an incident day, and its volume multiplier.
const INCIDENT_PROB: f64 = 0.01;
const INCIDENT_MULTIPLIER: f64 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleSettings {
    pub days: u32,
    pub seed: u64,
    pub countries: usize,
    pub start: NaiveDate,
}

/// One line of the sample CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub date: NaiveDate,
    pub country: String,
    pub total_inbound_calls: u64,
}

#[derive(Debug, Clone)]
struct CountryProfile {
    code: String,
    base: f64,
    growth: f64,
}

pub fn generate_sample(settings: &SampleSettings) -> Result<Vec<SampleRow>, AppError> {
    if settings.days == 0 {
        return Err(AppError::Config("Sample days must be > 0.".to_string()));
    }
    if settings.countries == 0 {
        return Err(AppError::Config("Sample country count must be > 0.".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let base_noise =
        Normal::new(0.0, 0.35).map_err(|e| AppError::Config(format!("Noise distribution error: {e}")))?;
    let growth_noise =
        Normal::new(0.05, 0.04).map_err(|e| AppError::Config(format!("Noise distribution error: {e}")))?;

    let profiles: Vec<CountryProfile> = (0..settings.countries)
        .map(|i| CountryProfile {
            code: country_code(i),
            base: 800.0 * f64::exp(base_noise.sample(&mut rng)),
            growth: growth_noise.sample(&mut rng),
        })
        .collect();

    let mut rows = Vec::with_capacity(settings.days as usize * profiles.len());
    for offset in 0..i64::from(settings.days) {
        let date = settings.start + Duration::days(offset);
        let seasonal = weekday_factor(date) * yearly_factor(date);
        let incident = if rng.gen_bool(INCIDENT_PROB) { INCIDENT_MULTIPLIER } else { 1.0 };

        for country in &profiles {
            let trend = (1.0 + country.growth * offset as f64 / 365.0).max(0.05);
            let lambda = country.base * trend * seasonal * incident;
            rows.push(SampleRow {
                date,
                country: country.code.clone(),
                total_inbound_calls: poisson_count(&mut rng, lambda)?,
            });
        }
    }

    debug!(rows = rows.len(), countries = profiles.len(), "generated sample");
    Ok(rows)
}

/// Serialize sample rows (with header) to `writer`.
pub fn write_sample_csv<W: Write>(writer: W, rows: &[SampleRow]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()
        .map_err(|e| AppError::io("Failed to flush sample CSV", e))?;
    Ok(())
}

fn country_code(i: usize) -> String {
    COUNTRY_CODES
        .get(i)
        .map(|c| (*c).to_string())
        .unwrap_or_else(|| format!("C{:02}", i + 1))
}

fn weekday_factor(date: NaiveDate) -> f64 {
    WEEKDAY_PROFILE[date.weekday().num_days_from_monday() as usize]
}

fn yearly_factor(date: NaiveDate) -> f64 {
    let phase = 2.0 * PI * f64::from(date.ordinal0()) / 365.25;
    1.0 + YEARLY_AMPLITUDE * phase.cos()
}

fn poisson_count(rng: &mut StdRng, lambda: f64) -> Result<u64, AppError> {
    if lambda <= 0.0 {
        return Ok(0);
    }
    let dist =
        Poisson::new(lambda).map_err(|e| AppError::Config(format!("Invalid Poisson rate {lambda}: {e}")))?;
    let draw: f64 = dist.sample(rng);
    Ok(draw as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(days: u32, countries: usize) -> SampleSettings {
        SampleSettings {
            days,
            seed: 7,
            countries,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        }
    }

    #[test]
    fn one_row_per_day_and_country() {
        let rows = generate_sample(&settings(30, 3)).unwrap();
        assert_eq!(rows.len(), 90);
        assert_eq!(rows[0].country, "US");
        assert_eq!(rows[2].country, "DE");
        assert_eq!(rows.last().unwrap().date, NaiveDate::from_ymd_opt(2023, 1, 30).unwrap());
    }

    #[test]
    fn same_seed_same_sample() {
        let a = generate_sample(&settings(60, 2)).unwrap();
        let b = generate_sample(&settings(60, 2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn weekends_are_quieter() {
        let rows = generate_sample(&settings(364, 1)).unwrap();
        let mean = |weekend: bool| {
            let v: Vec<f64> = rows
                .iter()
                .filter(|r| (r.date.weekday().num_days_from_monday() >= 5) == weekend)
                .map(|r| r.total_inbound_calls as f64)
                .collect();
            v.iter().sum::<f64>() / v.len() as f64
        };
        assert!(mean(true) < mean(false));
    }

    #[test]
    fn many_countries_get_numbered_codes() {
        assert_eq!(country_code(0), "US");
        assert_eq!(country_code(11), "C12");
    }

    #[test]
    fn zero_days_is_rejected() {
        assert!(matches!(generate_sample(&settings(0, 1)), Err(AppError::Config(_))));
    }

    #[test]
    fn csv_uses_expected_header() {
        let rows = generate_sample(&settings(2, 1)).unwrap();
        let mut buf = Vec::new();
        write_sample_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("date,country,total_inbound_calls\n2023-01-01,US,"));
        assert_eq!(text.lines().count(), 3);
    }
}
