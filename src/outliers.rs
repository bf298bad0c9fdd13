use crate::error::{Result, StatementError};
use crate::schema::MonthlyBalancePoint;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Below this many points a series is returned as-is.
pub const MIN_FILTER_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutlierBounds {
    #[schemars(description = "Lower quantile in [0, 1]; balances below it are dropped")]
    pub lower: f64,

    #[schemars(description = "Upper quantile in [0, 1]; balances above it are dropped")]
    pub upper: f64,
}

impl Default for OutlierBounds {
    fn default() -> Self {
        Self {
            lower: 0.01,
            upper: 0.99,
        }
    }
}

impl OutlierBounds {
    pub fn validate(&self) -> Result<()> {
        let in_range = |q: f64| (0.0..=1.0).contains(&q);
        if !in_range(self.lower) || !in_range(self.upper) || self.lower > self.upper {
            return Err(StatementError::InvalidQuantiles {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}

/// Order-statistic thresholds, rounded outward so they are always observed
/// values: `sorted[floor(lo * (n-1))]` and `sorted[ceil(hi * (n-1))]`.
/// Bounds must already be validated.
fn quantile_thresholds(values: &[f64], bounds: &OutlierBounds) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let max_idx = sorted.len() - 1;
    let last = max_idx as f64;
    let lower_idx = ((bounds.lower * last).floor() as usize).min(max_idx);
    let upper_idx = ((bounds.upper * last).ceil() as usize).min(max_idx);

    Some((sorted[lower_idx], sorted[upper_idx]))
}

/// Keeps the points whose balance lies within the quantile thresholds
/// (inclusive). Chronological order is preserved.
///
/// Nothing is removed while `floor(lower * (n-1)) == 0` and
/// `ceil(upper * (n-1)) == n-1`, because the thresholds are then the series
/// minimum and maximum. Only in that range is a second pass guaranteed to
/// return the same series: up to 100 points with the default 1%/99% bounds,
/// up to 20 points with 5%/95%. Longer series lose their extremes again on
/// every pass.
pub fn remove_outliers(
    series: &[MonthlyBalancePoint],
    bounds: &OutlierBounds,
) -> Result<Vec<MonthlyBalancePoint>> {
    bounds.validate()?;

    if series.len() < MIN_FILTER_POINTS {
        debug!(
            "Outlier filter skipped: {} points is below the minimum of {}",
            series.len(),
            MIN_FILTER_POINTS
        );
        return Ok(series.to_vec());
    }

    let balances: Vec<f64> = series.iter().map(|p| p.balance).collect();
    let Some((lower, upper)) = quantile_thresholds(&balances, bounds) else {
        return Ok(series.to_vec());
    };

    let filtered: Vec<MonthlyBalancePoint> = series
        .iter()
        .filter(|p| p.balance >= lower && p.balance <= upper)
        .copied()
        .collect();

    debug!(
        "Outlier filter kept {} of {} months (bounds {:.2}..={:.2})",
        filtered.len(),
        series.len(),
        lower,
        upper
    );

    Ok(filtered)
}
