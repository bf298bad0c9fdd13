//! Flat-table exports of the ledger and forecast.
//!
//! Writers take any `std::io::Write`; callers own file handling.

use crate::error::Result;
use crate::forecast::ForecastOutcome;
use crate::ingestion::COLUMN_TITLES;
use crate::schema::{Cell, RawSheet, Transaction};
use chrono::NaiveDate;
use std::io::Write;

pub const LEDGER_CSV_COLUMNS: [&str; 11] = [
    "date",
    "value_date",
    "narration",
    "reference",
    "withdrawal_amt",
    "deposit_amt",
    "closing_balance",
    "amount",
    "transaction_type",
    "narration_clean",
    "category",
];

pub const FORECAST_CSV_COLUMNS: [&str; 4] = [
    "Date",
    "Predicted_Closing_Balance",
    "Lower_Confidence_Interval",
    "Upper_Confidence_Interval",
];

const SUMMARY_MARKER: &str = "STATEMENT SUMMARY :-";

fn iso_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// One CSV row per transaction. Missing dates and balances are empty fields.
pub fn write_ledger_csv<W: Write>(ledger: &[Transaction], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(LEDGER_CSV_COLUMNS)?;

    for t in ledger {
        wtr.write_record([
            iso_date(t.date),
            iso_date(t.value_date),
            t.narration.clone(),
            t.reference.clone(),
            t.withdrawal_amount.to_string(),
            t.deposit_amount.to_string(),
            t.closing_balance.map(|b| b.to_string()).unwrap_or_default(),
            t.amount.to_string(),
            t.kind.to_string(),
            t.narration_clean.clone(),
            t.category.clone(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the future months of a forecast with raw numeric values.
pub fn write_forecast_csv<W: Write>(outcome: &ForecastOutcome, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(FORECAST_CSV_COLUMNS)?;

    for point in outcome.future() {
        wtr.write_record([
            point.month.to_string(),
            point.predicted.to_string(),
            point.lower_bound.to_string(),
            point.upper_bound.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn amount_cell(value: f64) -> Cell {
    if value == 0.0 {
        Cell::Empty
    } else {
        Cell::Number(value)
    }
}

/// Renders a ledger in the statement layout: title row, one seven-column row
/// per transaction with day-first dates, then the summary marker. The result
/// reads back through the same table locator and normalizer.
pub fn ledger_to_sheet(ledger: &[Transaction]) -> RawSheet {
    let day_first = |date: Option<NaiveDate>| {
        date.map(|d| Cell::Text(d.format("%d/%m/%Y").to_string()))
            .unwrap_or(Cell::Empty)
    };

    let mut rows = Vec::with_capacity(ledger.len() + 2);
    rows.push(COLUMN_TITLES.iter().map(|title| Cell::text(*title)).collect());

    for t in ledger {
        rows.push(vec![
            day_first(t.date),
            day_first(t.value_date),
            Cell::text(t.narration.as_str()),
            Cell::text(t.reference.as_str()),
            amount_cell(t.withdrawal_amount),
            amount_cell(t.deposit_amount),
            t.closing_balance.map(Cell::Number).unwrap_or(Cell::Empty),
        ]);
    }

    rows.push(vec![Cell::text(SUMMARY_MARKER)]);
    RawSheet::new(rows)
}

/// Writes a sheet as ragged CSV; empty cells become empty fields.
pub fn write_sheet_csv<W: Write>(sheet: &RawSheet, writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    for row in sheet.rows() {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| cell.to_text().unwrap_or_default())
            .collect();
        wtr.write_record(&fields)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify_ledger, Taxonomy};
    use crate::forecast::{
        run_forecast, ForecastRequest, ForecastRow, Forecaster, ForecasterSettings,
    };
    use crate::ingestion::normalize_ledger;
    use crate::schema::{MonthlyBalancePoint, TransactionKind, YearMonth};
    use crate::table::locate_transaction_table;

    fn statement() -> RawSheet {
        let row = |cells: [&str; 7]| cells.iter().map(|c| Cell::text(*c)).collect::<Vec<_>>();
        RawSheet::new(vec![
            vec![Cell::text("MR JANE ROE")],
            row(COLUMN_TITLES),
            row(["01/04/23", "01/04/23", "SALARY APRIL", "", "", "85,000.00", "95,000.00"]),
            row(["03/04/23", "03/04/23", "UPI/SWIGGY/991", "REF1", "420.00", "", "94,580.00"]),
            row(["??", "", "POS HPCL PETROL", "", "1,200.00", "", "93,380.00"]),
            row(["12/05/23", "12/05/23", "NETFLIX.COM", "", "649.00", "", ""]),
            vec![Cell::text("STATEMENT SUMMARY :-")],
        ])
    }

    fn ledger() -> Vec<Transaction> {
        let sheet = statement();
        let region = locate_transaction_table(&sheet).unwrap();
        let rows = normalize_ledger(&sheet, &region).unwrap().rows;
        classify_ledger(rows, &Taxonomy::default())
    }

    fn key(t: &Transaction) -> (Option<NaiveDate>, f64, TransactionKind, String) {
        (t.date, t.amount, t.kind, t.category.clone())
    }

    #[test]
    fn test_ledger_csv_columns() {
        let mut buffer = Vec::new();
        write_ledger_csv(&ledger(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], LEDGER_CSV_COLUMNS.join(","));
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("2023-04-01,2023-04-01,SALARY APRIL,"));
        assert!(lines[1].ends_with(",deposit,salary april,salary"));
        // Undated row and missing balance become empty fields
        assert!(lines[3].starts_with(",,POS HPCL PETROL"));
        assert!(lines[4].contains(",649,0,,649,withdrawal,"));
    }

    #[test]
    fn test_round_trip_through_sheet() {
        let original = ledger();
        let sheet = ledger_to_sheet(&original);

        let region = locate_transaction_table(&sheet).unwrap();
        let rows = normalize_ledger(&sheet, &region).unwrap().rows;
        let reimported = classify_ledger(rows, &Taxonomy::default());

        assert_eq!(
            original.iter().map(key).collect::<Vec<_>>(),
            reimported.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_round_trip_through_csv() {
        let original = ledger();
        let mut buffer = Vec::new();
        write_sheet_csv(&ledger_to_sheet(&original), &mut buffer).unwrap();

        let sheet = RawSheet::from_csv_reader(buffer.as_slice()).unwrap();
        let region = locate_transaction_table(&sheet).unwrap();
        let rows = normalize_ledger(&sheet, &region).unwrap().rows;
        let reimported = classify_ledger(rows, &Taxonomy::default());

        assert_eq!(
            original.iter().map(key).collect::<Vec<_>>(),
            reimported.iter().map(key).collect::<Vec<_>>()
        );
        assert_eq!(reimported[1].closing_balance, Some(94_580.0));
    }

    struct FlatForecaster;

    impl Forecaster for FlatForecaster {
        fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Vec<ForecastRow>> {
            let months = request
                .history
                .iter()
                .map(|o| o.timestamp)
                .chain(request.future_months().into_iter().map(|m| m.first_day()));
            Ok(months
                .map(|timestamp| ForecastRow {
                    timestamp,
                    predicted: 1_500.5,
                    lower: -10.0,
                    upper: 2_000.0,
                })
                .collect())
        }
    }

    #[test]
    fn test_forecast_csv_writes_future_only() {
        let series = vec![
            MonthlyBalancePoint {
                month: YearMonth::new(2023, 1).unwrap(),
                balance: 1_000.0,
            },
            MonthlyBalancePoint {
                month: YearMonth::new(2023, 2).unwrap(),
                balance: 1_200.0,
            },
        ];
        let outcome =
            run_forecast(&series, &ForecasterSettings::default(), 2, &FlatForecaster).unwrap();

        let mut buffer = Vec::new();
        write_forecast_csv(&outcome, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "Date,Predicted_Closing_Balance,Lower_Confidence_Interval,Upper_Confidence_Interval\n\
             2023-03,1500.5,0,2000\n\
             2023-04,1500.5,0,2000\n"
        );
    }
}
