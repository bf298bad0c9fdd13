use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Transaction table not found: expected a header row with both 'Date' and 'Narration' cells")]
    TableNotFound,

    #[error("Row {row} has {found} populated columns, expected at most {expected} (date, value date, narration, reference, withdrawal, deposit, closing balance)")]
    RowArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("Invalid age band table: {0}")]
    InvalidAgeBands(String),

    #[error("Invalid allocation for {risk}: equities ({equities}) + debt ({debt}) must equal 1.0")]
    InvalidAllocation {
        risk: String,
        equities: f64,
        debt: f64,
    },

    #[error("Invalid quantile bounds ({lower}, {upper}): both must lie in [0, 1] with lower <= upper")]
    InvalidQuantiles { lower: f64, upper: f64 },

    #[error("Insufficient history for forecasting: got {found} monthly points, need at least {required}")]
    InsufficientHistory { found: usize, required: usize },

    #[error("Forecaster failed: {0}")]
    ForecasterFailed(String),

    #[error("Forecaster returned {found} rows, expected at least the {horizon}-month horizon")]
    ShortForecast { found: usize, horizon: u32 },

    #[error("No allocation configured for risk tolerance {0}")]
    MissingAllocation(String),

    #[error("Unknown risk category '{0}': expected High, Medium or Low")]
    UnknownRiskCategory(String),

    #[error("Fund catalog unavailable: {0}")]
    FundCatalogUnavailable(String),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
