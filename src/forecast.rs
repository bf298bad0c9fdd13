//! Adapter between the monthly balance series and an external forecaster.
//!
//! The forecasting model itself lives outside this crate. Callers plug one in
//! through the [`Forecaster`] trait; this module shapes its input, checks its
//! output and floors the predictions at zero.

use crate::data_quality::{Anomaly, AnomalyReport};
use crate::error::{Result, StatementError};
use crate::schema::{ForecastPoint, MonthlyBalancePoint, YearMonth};
use crate::utils::{add_months, format_indian_currency, months_between};
use chrono::NaiveDate;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Model settings forwarded verbatim to the forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForecasterSettings {
    #[schemars(description = "Fit a yearly seasonal component")]
    pub yearly_seasonality: bool,

    #[schemars(description = "Fit a weekly seasonal component")]
    pub weekly_seasonality: bool,

    #[schemars(description = "Fit a daily seasonal component")]
    pub daily_seasonality: bool,

    #[schemars(description = "How seasonal components combine with the trend")]
    pub seasonality_mode: SeasonalityMode,

    #[schemars(description = "Flexibility of the trend; larger values allow sharper changes")]
    pub changepoint_prior_scale: f64,
}

impl Default for ForecasterSettings {
    fn default() -> Self {
        Self {
            yearly_seasonality: true,
            weekly_seasonality: false,
            daily_seasonality: false,
            seasonality_mode: SeasonalityMode::Additive,
            changepoint_prior_scale: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// First day of the observed month
    pub timestamp: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    /// Strictly increasing by month
    pub observations: Vec<Observation>,
    pub anomalies: AnomalyReport,
}

/// Reshapes a monthly series into forecaster observations. Repeated months
/// keep the later value and are reported as anomalies.
pub fn prepare_forecast_input(series: &[MonthlyBalancePoint]) -> ForecastInput {
    let mut anomalies = AnomalyReport::new();
    let mut by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();

    for point in series {
        if by_month.insert(point.month, point.balance).is_some() {
            anomalies.record(Anomaly::DuplicateMonth { month: point.month });
        }
    }

    let months: Vec<YearMonth> = by_month.keys().copied().collect();
    let gaps = months
        .windows(2)
        .filter(|pair| months_between(pair[0], pair[1]) > 1)
        .count();
    if gaps > 0 {
        debug!("Forecast input has {} gaps between observed months", gaps);
    }

    let observations = by_month
        .into_iter()
        .map(|(month, value)| Observation {
            timestamp: month.first_day(),
            value,
        })
        .collect();

    ForecastInput {
        observations,
        anomalies,
    }
}

pub struct ForecastRequest<'a> {
    pub history: &'a [Observation],
    pub settings: &'a ForecasterSettings,
    pub horizon_months: u32,
}

impl ForecastRequest<'_> {
    /// The months after the last observation the forecaster must cover.
    pub fn future_months(&self) -> Vec<YearMonth> {
        let Some(last) = self.history.last() else {
            return Vec::new();
        };
        let last = YearMonth::from_date(last.timestamp);
        (1..=self.horizon_months)
            .filter_map(|offset| add_months(last, offset))
            .collect()
    }
}

/// One row of forecaster output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub timestamp: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

/// An external forecasting model.
///
/// Implementations return one row per historical month followed by one row
/// per month of the horizon, in chronological order.
pub trait Forecaster {
    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Vec<ForecastRow>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDisplayRow {
    pub month: String,
    pub predicted: String,
    pub lower: String,
    pub upper: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    points: Vec<ForecastPoint>,
    horizon: u32,
    pub anomalies: AnomalyReport,
}

impl ForecastOutcome {
    /// Every returned row, history included, floored at zero.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// The last `horizon` rows.
    pub fn future(&self) -> &[ForecastPoint] {
        let start = self.points.len().saturating_sub(self.horizon as usize);
        &self.points[start..]
    }

    pub fn latest_predicted(&self) -> Option<f64> {
        self.points.last().map(|p| p.predicted)
    }

    pub fn display_rows(&self) -> Vec<ForecastDisplayRow> {
        self.future()
            .iter()
            .map(|p| ForecastDisplayRow {
                month: p.month.to_string(),
                predicted: format_indian_currency(p.predicted),
                lower: format_indian_currency(p.lower_bound),
                upper: format_indian_currency(p.upper_bound),
            })
            .collect()
    }
}

fn floor_row(row: &ForecastRow) -> ForecastPoint {
    ForecastPoint {
        month: YearMonth::from_date(row.timestamp),
        predicted: row.predicted.max(0.0),
        lower_bound: row.lower.max(0.0),
        upper_bound: row.upper.max(0.0),
    }
}

/// Runs the forecaster over a monthly series and floors its output.
pub fn run_forecast(
    series: &[MonthlyBalancePoint],
    settings: &ForecasterSettings,
    horizon_months: u32,
    forecaster: &dyn Forecaster,
) -> Result<ForecastOutcome> {
    let input = prepare_forecast_input(series);
    if input.observations.is_empty() {
        return Err(StatementError::InsufficientHistory {
            found: 0,
            required: 1,
        });
    }

    let request = ForecastRequest {
        history: &input.observations,
        settings,
        horizon_months,
    };
    debug!(
        "Requesting {}-month forecast from {} observations",
        horizon_months,
        input.observations.len()
    );

    let rows = forecaster.forecast(&request)?;
    if rows.is_empty() || rows.len() < horizon_months as usize {
        return Err(StatementError::ShortForecast {
            found: rows.len(),
            horizon: horizon_months,
        });
    }

    let points: Vec<ForecastPoint> = rows.iter().map(floor_row).collect();
    let floored = rows
        .iter()
        .filter(|r| r.predicted < 0.0 || r.lower < 0.0 || r.upper < 0.0)
        .count();
    if floored > 0 {
        debug!("Floored {} forecast rows with negative values at zero", floored);
    }

    info!(
        "Forecast received: {} rows ({} future months)",
        points.len(),
        horizon_months
    );

    Ok(ForecastOutcome {
        points,
        horizon: horizon_months,
        anomalies: input.anomalies,
    })
}
