use crate::schema::YearMonth;
use chrono::{Days, Months, NaiveDate};

/// Spreadsheet serial days are counted from this date (the 1900 leap-year bug
/// is absorbed by starting on Dec 30 rather than Jan 1).
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial a spreadsheet can represent (9999-12-31).
const MAX_SPREADSHEET_SERIAL: f64 = 2_958_465.0;

pub fn add_months(month: YearMonth, count: u32) -> Option<YearMonth> {
    month
        .first_day()
        .checked_add_months(Months::new(count))
        .map(YearMonth::from_date)
}

pub fn months_between(start: YearMonth, end: YearMonth) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Converts a spreadsheet serial day number into a calendar date.
/// Fractional parts (time of day) are dropped.
pub fn spreadsheet_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SPREADSHEET_SERIAL {
        return None;
    }
    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Formats an amount with Indian numbering units (K, L for lakh, Cr for crore).
pub fn format_indian_currency(amount: f64) -> String {
    if amount >= 1e7 {
        format!("{:.2}Cr", amount / 1e7)
    } else if amount >= 1e5 {
        format!("{:.2}L", amount / 1e5)
    } else if amount >= 1e3 {
        format!("{:.2}K", amount / 1e3)
    } else {
        format!("₹{:.2}", amount)
    }
}
