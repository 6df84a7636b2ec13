//! Statistical primitives shared by every higher-level computation.

use chrono::NaiveDate;

use super::EngineError;
use crate::models::{PriceBucket, PriceDistribution};

/// Arithmetic mean. Empty input is an error, not zero.
pub fn mean(values: &[f64]) -> Result<f64, EngineError> {
    if values.is_empty() {
        return Err(EngineError::EmptyInput("mean"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Result<f64, EngineError> {
    if values.is_empty() {
        return Err(EngineError::EmptyInput("median"));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Count prices per fixed band. Every price lands in exactly one band.
pub fn bucket_prices(prices: &[u64]) -> PriceDistribution {
    let mut distribution = PriceDistribution::default();
    for &price in prices {
        distribution.increment(PriceBucket::for_price(price));
    }
    distribution
}

/// Count dates in `(reference - window_days, reference]`.
///
/// Dates after the reference are not released yet and never counted.
pub fn count_within_window<I>(dates: I, reference: NaiveDate, window_days: i64) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates
        .into_iter()
        .filter(|date| {
            let age = (reference - *date).num_days();
            (0..window_days).contains(&age)
        })
        .count() as u32
}

/// Mean age in days of the known, already-released dates.
///
/// Unknown dates are skipped rather than counted as age zero.
pub fn average_age_days<I>(release_dates: I, reference: NaiveDate) -> Result<f64, EngineError>
where
    I: IntoIterator<Item = Option<NaiveDate>>,
{
    let ages: Vec<f64> = release_dates
        .into_iter()
        .flatten()
        .filter(|date| *date <= reference)
        .map(|date| (reference - date).num_days() as f64)
        .collect();
    mean(&ages).map_err(|_| EngineError::EmptyInput("average_age_days"))
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole` as a whole percentage in [0, 100]; None when `whole` is zero.
pub fn percentage(part: u32, whole: u32) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}
