//! # Statement Ledger Builder
//!
//! A library for recovering a categorized transaction ledger from a
//! human-formatted bank statement sheet, and for turning that ledger into the
//! monthly balance series, forecast input and investment plan built on top of it.
//!
//! ## Core Concepts
//!
//! - **Raw Sheet**: An untyped grid of cells, as read from a spreadsheet or CSV
//! - **Transaction Table**: The rows between the `Date`/`Narration` title row and the `Statement Summary` marker
//! - **Ledger**: Typed transactions with a derived amount, kind and spending category
//! - **Monthly Series**: One closing balance per calendar month, trimmed of outliers
//! - **Forecaster**: An external model plugged in through the [`Forecaster`] trait
//! - **Anomalies**: Recoverable data-quality findings, reported as a summary rather than failing the run
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_ledger_builder::*;
//!
//! let file = std::fs::File::open("statement.csv")?;
//! let sheet = RawSheet::from_csv_reader(file)?;
//! let config = PipelineConfig::default();
//!
//! let report = process_statement(&sheet, &config)?;
//! println!("{} transactions for {:?}", report.ledger.len(), report.header.name);
//!
//! let outcome = StatementProcessor::forecast(&report.ledger, &config, &my_forecaster)?;
//! let plan = StatementProcessor::plan_investment(&report.ledger, &outcome, 35, &config)?;
//! let recommendation = recommend(plan, &StaticFundCatalog::default())?;
//! ```

pub mod aggregation;
pub mod classifier;
pub mod data_quality;
pub mod error;
pub mod export;
pub mod forecast;
pub mod funds;
pub mod header;
pub mod ingestion;
pub mod investment;
pub mod outliers;
pub mod schema;
pub mod table;
pub mod utils;

pub use aggregation::{
    category_spend, daily_spend, monthly_balance, monthly_spend, monthly_withdrawal_totals,
    summarize, LedgerSummary, MonthlyBalanceSeries, SpendMode,
};
pub use classifier::{classify_ledger, clean_narration, enrich, CategoryRule, Taxonomy};
pub use data_quality::{Anomaly, AnomalyKind, AnomalyReport, AnomalySummary};
pub use error::{Result, StatementError};
pub use export::{ledger_to_sheet, write_forecast_csv, write_ledger_csv, write_sheet_csv};
pub use forecast::{
    prepare_forecast_input, run_forecast, ForecastDisplayRow, ForecastInput, ForecastOutcome,
    ForecastRequest, ForecastRow, Forecaster, ForecasterSettings, Observation, SeasonalityMode,
};
pub use funds::{
    recommend, FundCatalog, FundPerformance, InvestmentRecommendation, RiskTier,
    StaticFundCatalog,
};
pub use header::{extract_header_info, HeaderExtractor};
pub use ingestion::{
    coerce_amount, normalize_ledger, DateParser, DateStrategy, LedgerNormalizer, Movement,
    NormalizedRow, NormalizedRows, COLUMN_TITLES, STATEMENT_COLUMNS,
};
pub use investment::{
    average_monthly_expense, investable_amount, AgeBand, AgeBandTable, Allocation,
    AllocationTable, InvestmentRuleEngine, SAFETY_BUFFER,
};
pub use outliers::{remove_outliers, OutlierBounds, MIN_FILTER_POINTS};
pub use schema::*;
pub use table::{locate_transaction_table, TableRegion};
pub use utils::*;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Everything recovered from one statement sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementReport {
    pub header: HeaderInfo,
    pub region: TableRegion,
    pub ledger: Ledger,
    pub anomalies: AnomalyReport,
}

impl StatementReport {
    pub fn summary(&self, config: &PipelineConfig) -> LedgerSummary {
        summarize(
            &self.ledger,
            config.taxonomy.fallback(),
            config.top_expenses,
        )
    }
}

pub struct StatementProcessor;

impl StatementProcessor {
    /// Extracts header metadata and the classified ledger from a sheet.
    pub fn process(sheet: &RawSheet, config: &PipelineConfig) -> Result<StatementReport> {
        config.validate()?;

        info!("Processing statement sheet with {} rows", sheet.len());

        let header = extract_header_info(sheet, config.header_scan_rows)?;
        let region = locate_transaction_table(sheet)?;
        let normalized = normalize_ledger(sheet, &region)?;
        let ledger = classify_ledger(normalized.rows, &config.taxonomy);

        debug!(
            "Ledger contains {} withdrawals and {} deposits",
            ledger
                .iter()
                .filter(|t| t.kind == TransactionKind::Withdrawal)
                .count(),
            ledger
                .iter()
                .filter(|t| t.kind == TransactionKind::Deposit)
                .count()
        );

        normalized.anomalies.log_summary("normalization");

        Ok(StatementReport {
            header,
            region,
            ledger,
            anomalies: normalized.anomalies,
        })
    }

    /// Monthly closing balances with outliers removed. The skipped-row counts
    /// describe the ledger before filtering.
    pub fn monthly_series(
        ledger: &[Transaction],
        config: &PipelineConfig,
    ) -> Result<MonthlyBalanceSeries> {
        let series = monthly_balance(ledger, config.balance_mode);
        if series.undated_rows > 0 || series.missing_balance_rows > 0 {
            warn!(
                "Monthly series skipped {} undated rows and {} rows without a closing balance",
                series.undated_rows, series.missing_balance_rows
            );
        }

        let points = remove_outliers(&series.points, &config.outlier_bounds)?;
        Ok(MonthlyBalanceSeries { points, ..series })
    }

    pub fn forecast(
        ledger: &[Transaction],
        config: &PipelineConfig,
        forecaster: &dyn Forecaster,
    ) -> Result<ForecastOutcome> {
        let series = Self::monthly_series(ledger, config)?;
        let outcome = run_forecast(
            &series.points,
            &config.forecaster,
            config.horizon_months,
            forecaster,
        )?;
        outcome.anomalies.log_summary("forecast input");
        Ok(outcome)
    }

    /// Builds an investment plan from the latest predicted balance and the
    /// ledger's average monthly expense.
    pub fn plan_investment(
        ledger: &[Transaction],
        outcome: &ForecastOutcome,
        age: u32,
        config: &PipelineConfig,
    ) -> Result<InvestmentPlan> {
        let current_balance = outcome.latest_predicted().unwrap_or(0.0);
        let average_expense = average_monthly_expense(ledger);
        let investable = investable_amount(current_balance, average_expense);

        info!(
            "Investable amount {} (balance {}, average monthly expense {})",
            format_indian_currency(investable),
            format_indian_currency(current_balance),
            format_indian_currency(average_expense)
        );

        InvestmentRuleEngine::new(&config.age_bands, &config.allocations).plan(age, investable)
    }
}

pub fn process_statement(sheet: &RawSheet, config: &PipelineConfig) -> Result<StatementReport> {
    StatementProcessor::process(sheet, config)
}
