use crate::classifier::Taxonomy;
use crate::error::Result;
use crate::forecast::ForecasterSettings;
use crate::investment::{AgeBandTable, AllocationTable};
use crate::outliers::OutlierBounds;
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;

/// A single spreadsheet cell as delivered by whatever codec read the statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Builds a text cell, mapping blank strings to `Cell::Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Date(_) => false,
        }
    }

    /// Renders the cell as display text. Whole numbers render without a
    /// fractional part, so an account number stored as a number stays intact.
    pub fn to_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Joins the non-empty cells of a row with single spaces.
pub fn line_text(row: &[Cell]) -> String {
    row.iter()
        .filter_map(Cell::to_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Untyped grid of statement rows. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_text(&self, index: usize) -> String {
        self.rows
            .get(index)
            .map(|row| line_text(row))
            .unwrap_or_default()
    }

    /// Reads a CSV grid into a sheet. Every non-blank field becomes a text
    /// cell; typing happens later in the normalizer.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Cell::text).collect());
        }

        Ok(Self { rows })
    }
}

/// A calendar month, stored as its first day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub from: String,
    pub to: String,
}

/// Labeled metadata found in the statement preamble. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub statement_period: Option<StatementPeriod>,
    pub account_number: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Withdrawal,
    Deposit,
    Unknown,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A normalized, classified statement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// 0-based index of the row in the raw sheet
    pub source_row: usize,
    pub date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub narration: String,
    pub reference: String,
    pub withdrawal_amount: f64,
    pub deposit_amount: f64,
    pub closing_balance: Option<f64>,
    pub amount: f64,
    pub kind: TransactionKind,
    pub narration_clean: String,
    pub category: String,
}

pub type Ledger = Vec<Transaction>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalancePoint {
    pub month: YearMonth,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: YearMonth,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RiskTolerance {
    High,
    #[serde(rename = "Moderate-High")]
    ModerateHigh,
    Moderate,
    #[serde(rename = "Low-Moderate")]
    LowModerate,
    Low,
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTolerance::High => "High",
            RiskTolerance::ModerateHigh => "Moderate-High",
            RiskTolerance::Moderate => "Moderate",
            RiskTolerance::LowModerate => "Low-Moderate",
            RiskTolerance::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentPlan {
    pub age: u32,
    pub risk_tolerance: RiskTolerance,
    pub investment_fraction: f64,
    /// Balance left after reserving expenses plus the safety buffer
    pub investable_amount: f64,
    /// `investment_fraction` applied to `investable_amount`
    pub total_investable: f64,
    pub equity_ratio: f64,
    pub debt_ratio: f64,
    pub equity_amount: f64,
    pub debt_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum BalanceMode {
    #[default]
    #[schemars(description = "Closing balance of the chronologically last transaction in the month")]
    Last,

    #[schemars(description = "Mean closing balance across all transactions in the month")]
    Average,
}

/// Everything a statement run can be tuned with. Every field has a default,
/// so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(description = "How many leading rows are scanned for header metadata")]
    pub header_scan_rows: usize,

    #[schemars(
        description = "Ordered category taxonomy. The first category with a keyword contained in the cleaned narration wins."
    )]
    pub taxonomy: Taxonomy,

    #[schemars(description = "How a month's closing balances collapse into one value")]
    pub balance_mode: BalanceMode,

    #[schemars(description = "Quantile bounds for trimming monthly balance outliers")]
    pub outlier_bounds: OutlierBounds,

    #[schemars(description = "Settings forwarded to the external forecaster")]
    pub forecaster: ForecasterSettings,

    #[schemars(description = "Number of future months to forecast")]
    pub horizon_months: u32,

    #[schemars(description = "How many of the largest withdrawals the summary keeps")]
    pub top_expenses: usize,

    #[schemars(description = "Age bands mapping an investor's age to a risk tolerance and investment fraction")]
    pub age_bands: AgeBandTable,

    #[schemars(description = "Equity/debt split per risk tolerance")]
    pub allocations: AllocationTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: 15,
            taxonomy: Taxonomy::default(),
            balance_mode: BalanceMode::Last,
            outlier_bounds: OutlierBounds::default(),
            forecaster: ForecasterSettings::default(),
            horizon_months: 36,
            top_expenses: 10,
            age_bands: AgeBandTable::default(),
            allocations: AllocationTable::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.taxonomy.validate()?;
        self.outlier_bounds.validate()?;
        self.age_bands.validate()?;
        self.allocations.validate()?;
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
