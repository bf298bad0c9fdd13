use crate::data_quality::{Anomaly, AnomalyReport};
use crate::error::{Result, StatementError};
use crate::schema::{Cell, RawSheet, TransactionKind};
use crate::table::TableRegion;
use crate::utils::spreadsheet_serial_to_date;
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Fixed statement layout: date, value date, narration, reference,
/// withdrawal, deposit, closing balance.
pub const STATEMENT_COLUMNS: usize = 7;

pub const COLUMN_TITLES: [&str; STATEMENT_COLUMNS] = [
    "Date",
    "Value Dt",
    "Narration",
    "Chq./Ref.No.",
    "Withdrawal Amt.",
    "Deposit Amt.",
    "Closing Balance",
];

const COL_DATE: usize = 0;
const COL_VALUE_DATE: usize = 1;
const COL_NARRATION: usize = 2;
const COL_REFERENCE: usize = 3;
const COL_WITHDRAWAL: usize = 4;
const COL_DEPOSIT: usize = 5;
const COL_BALANCE: usize = 6;

/// Direction of money for one statement row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Movement {
    Withdrawal(f64),
    Deposit(f64),
    Unknown,
}

impl Movement {
    /// Withdrawal takes priority when both amounts are positive.
    pub fn derive(withdrawal: f64, deposit: f64) -> Self {
        if withdrawal > 0.0 {
            Movement::Withdrawal(withdrawal)
        } else if deposit > 0.0 {
            Movement::Deposit(deposit)
        } else {
            Movement::Unknown
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Movement::Withdrawal(amount) | Movement::Deposit(amount) => *amount,
            Movement::Unknown => 0.0,
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Movement::Withdrawal(_) => TransactionKind::Withdrawal,
            Movement::Deposit(_) => TransactionKind::Deposit,
            Movement::Unknown => TransactionKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// Cells a spreadsheet codec already typed as dates
    NativeDate,
    /// A chrono format string applied to text cells
    Format(&'static str),
    /// Numeric cells read as spreadsheet serial day numbers
    SpreadsheetSerial,
}

impl DateStrategy {
    fn apply(&self, cell: &Cell) -> Option<NaiveDate> {
        match (self, cell) {
            (DateStrategy::NativeDate, Cell::Date(date)) => Some(*date),
            (DateStrategy::Format(fmt), Cell::Text(text)) => {
                NaiveDate::parse_from_str(text.trim(), fmt).ok()
            }
            (DateStrategy::SpreadsheetSerial, Cell::Number(serial)) => {
                spreadsheet_serial_to_date(*serial)
            }
            _ => None,
        }
    }
}

/// Ordered list of date strategies; the first one that succeeds wins.
///
/// The default order is day-first. Two-digit-year formats come before their
/// four-digit counterparts, and ISO dates after the day-first dash formats,
/// because `%Y` also accepts `23` (as 23 AD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    strategies: Vec<DateStrategy>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(vec![
            DateStrategy::NativeDate,
            DateStrategy::Format("%d/%m/%y"),
            DateStrategy::Format("%d/%m/%Y"),
            DateStrategy::Format("%d-%m-%y"),
            DateStrategy::Format("%d-%m-%Y"),
            DateStrategy::Format("%Y-%m-%d"),
            DateStrategy::Format("%d.%m.%y"),
            DateStrategy::Format("%d.%m.%Y"),
            DateStrategy::Format("%d %b %y"),
            DateStrategy::Format("%d %b %Y"),
            DateStrategy::Format("%d-%b-%y"),
            DateStrategy::Format("%d-%b-%Y"),
            DateStrategy::SpreadsheetSerial,
        ])
    }
}

impl DateParser {
    pub fn new(strategies: Vec<DateStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[DateStrategy] {
        &self.strategies
    }

    pub fn parse(&self, cell: &Cell) -> Option<NaiveDate> {
        self.strategies.iter().find_map(|s| s.apply(cell))
    }
}

/// Reads a numeric cell. Text may carry thousands separators. Anything that
/// is not a finite number yields `None`.
pub fn coerce_amount(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        Cell::Empty | Cell::Date(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// A typed statement row, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub source_row: usize,
    pub date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub narration: String,
    pub reference: String,
    pub withdrawal_amount: f64,
    pub deposit_amount: f64,
    pub closing_balance: Option<f64>,
    pub movement: Movement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRows {
    pub rows: Vec<NormalizedRow>,
    pub anomalies: AnomalyReport,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerNormalizer {
    date_parser: DateParser,
}

impl LedgerNormalizer {
    pub fn new(date_parser: DateParser) -> Self {
        Self { date_parser }
    }

    /// Types every row in the region. Arity violations abort; everything
    /// else is tolerated and recorded as an anomaly.
    pub fn normalize(&self, sheet: &RawSheet, region: &TableRegion) -> Result<NormalizedRows> {
        let mut anomalies = AnomalyReport::new();
        let mut rows = Vec::with_capacity(region.len());

        for idx in region.rows() {
            let cells = sheet.rows().get(idx).map(Vec::as_slice).unwrap_or(&[]);
            rows.push(self.normalize_row(idx, cells, &mut anomalies)?);
        }

        info!(
            "Normalized {} statement rows ({} anomalies)",
            rows.len(),
            anomalies.len()
        );
        Ok(NormalizedRows { rows, anomalies })
    }

    fn normalize_row(
        &self,
        row: usize,
        cells: &[Cell],
        anomalies: &mut AnomalyReport,
    ) -> Result<NormalizedRow> {
        let populated = cells
            .iter()
            .rposition(|c| !c.is_empty())
            .map_or(0, |last| last + 1);
        if populated > STATEMENT_COLUMNS {
            return Err(StatementError::RowArityMismatch {
                row,
                expected: STATEMENT_COLUMNS,
                found: populated,
            });
        }

        let empty = Cell::Empty;
        let cell = |col: usize| cells.get(col).unwrap_or(&empty);
        let text = |col: usize| cell(col).to_text().unwrap_or_default();

        let date = self.date_parser.parse(cell(COL_DATE));
        if date.is_none() {
            anomalies.record(Anomaly::UnparsableDate {
                row,
                raw: text(COL_DATE),
            });
        }

        let withdrawal_amount =
            self.non_negative(row, COL_WITHDRAWAL, cell(COL_WITHDRAWAL), anomalies);
        let deposit_amount = self.non_negative(row, COL_DEPOSIT, cell(COL_DEPOSIT), anomalies);
        if withdrawal_amount > 0.0 && deposit_amount > 0.0 {
            anomalies.record(Anomaly::ConflictingAmounts {
                row,
                withdrawal: withdrawal_amount,
                deposit: deposit_amount,
            });
        }

        let closing_balance = coerce_amount(cell(COL_BALANCE));
        if let Some(balance) = closing_balance.filter(|b| *b < 0.0) {
            anomalies.record(Anomaly::NegativeClosingBalance { row, balance });
        }

        Ok(NormalizedRow {
            source_row: row,
            date,
            value_date: self.date_parser.parse(cell(COL_VALUE_DATE)),
            narration: text(COL_NARRATION),
            reference: text(COL_REFERENCE),
            withdrawal_amount,
            deposit_amount,
            closing_balance,
            movement: Movement::derive(withdrawal_amount, deposit_amount),
        })
    }

    fn non_negative(
        &self,
        row: usize,
        column: usize,
        cell: &Cell,
        anomalies: &mut AnomalyReport,
    ) -> f64 {
        match coerce_amount(cell) {
            Some(value) if value < 0.0 => {
                debug!("Row {}: negative {} cell coerced to 0", row, COLUMN_TITLES[column]);
                anomalies.record(Anomaly::NegativeAmount {
                    row,
                    column: COLUMN_TITLES[column].to_string(),
                    value,
                });
                0.0
            }
            Some(value) => value,
            None => 0.0,
        }
    }
}

pub fn normalize_ledger(sheet: &RawSheet, region: &TableRegion) -> Result<NormalizedRows> {
    LedgerNormalizer::default().normalize(sheet, region)
}
