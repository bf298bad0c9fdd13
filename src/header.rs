use crate::error::Result;
use crate::schema::{line_text, HeaderInfo, RawSheet, StatementPeriod};
use log::debug;
use regex::Regex;

/// Pattern matcher for the labeled metadata in a statement preamble.
pub struct HeaderExtractor {
    period: Regex,
    account_number: Regex,
    email: Regex,
    name: Regex,
    customer_id: Regex,
}

impl HeaderExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            period: Regex::new(r"Statement\s+From\s*:\s*(.*?)\s*To\s*:\s*(.*)")?,
            account_number: Regex::new(r"Account\s+No\s*\.?\s*:\s*(\d+)")?,
            email: Regex::new(r"Email\s*:\s*(\S+)")?,
            name: Regex::new(r"\b(MRS|MR|MS)\b\.?\s*(.+)")?,
            customer_id: Regex::new(r"Cust\s+ID\s*:\s*(\d+)")?,
        })
    }

    /// Scans the first `scan_rows` rows. Every label is tested on every line
    /// and the first match per label wins.
    pub fn extract(&self, sheet: &RawSheet, scan_rows: usize) -> HeaderInfo {
        let mut info = HeaderInfo::default();

        for row in sheet.rows().iter().take(scan_rows) {
            let line = line_text(row);
            if line.is_empty() {
                continue;
            }
            self.apply_line(&line, &mut info);
        }

        debug!("Header fields found: {:?}", info);
        info
    }

    fn apply_line(&self, line: &str, info: &mut HeaderInfo) {
        if info.statement_period.is_none() {
            if let Some(caps) = self.period.captures(line) {
                info.statement_period = Some(StatementPeriod {
                    from: caps[1].trim().to_string(),
                    to: caps[2].trim().to_string(),
                });
            }
        }

        if info.account_number.is_none() {
            info.account_number = first_group(&self.account_number, line, 1);
        }

        if info.email.is_none() {
            info.email = first_group(&self.email, line, 1);
        }

        if info.name.is_none() {
            info.name = first_group(&self.name, line, 2);
        }

        if info.customer_id.is_none() {
            info.customer_id = first_group(&self.customer_id, line, 1);
        }
    }
}

fn first_group(re: &Regex, line: &str, group: usize) -> Option<String> {
    re.captures(line)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_header_info(sheet: &RawSheet, scan_rows: usize) -> Result<HeaderInfo> {
    Ok(HeaderExtractor::new()?.extract(sheet, scan_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cell;

    fn sheet(lines: &[&[&str]]) -> RawSheet {
        RawSheet::new(
            lines
                .iter()
                .map(|row| row.iter().map(|c| Cell::text(*c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_extracts_all_labels() {
        let sheet = sheet(&[
            &["HDFC BANK Ltd.", "", "Page No .: 1"],
            &["MR JOHN DOE"],
            &["Account Branch : MG ROAD"],
            &["Email : john.doe@example.com"],
            &["Cust ID : 12345678", "", "Account No : 50100123456789"],
            &["Statement From : 01/04/2023", "To : 30/06/2023"],
        ]);

        let info = extract_header_info(&sheet, 15).unwrap();
        assert_eq!(info.name.as_deref(), Some("JOHN DOE"));
        assert_eq!(info.email.as_deref(), Some("john.doe@example.com"));
        assert_eq!(info.customer_id.as_deref(), Some("12345678"));
        assert_eq!(info.account_number.as_deref(), Some("50100123456789"));
        assert_eq!(
            info.statement_period,
            Some(StatementPeriod {
                from: "01/04/2023".to_string(),
                to: "30/06/2023".to_string(),
            })
        );
    }

    #[test]
    fn test_first_match_wins() {
        let sheet = sheet(&[&["Email : first@example.com"], &["Email : second@example.com"]]);
        let info = extract_header_info(&sheet, 15).unwrap();
        assert_eq!(info.email.as_deref(), Some("first@example.com"));
    }

    #[test]
    fn test_salutation_variants() {
        let info = extract_header_info(&sheet(&[&["MRS JANE DOE"]]), 15).unwrap();
        assert_eq!(info.name.as_deref(), Some("JANE DOE"));

        let info = extract_header_info(&sheet(&[&["MS. ASHA RAO"]]), 15).unwrap();
        assert_eq!(info.name.as_deref(), Some("ASHA RAO"));

        // Salutations embedded in words do not count
        let info = extract_header_info(&sheet(&[&["TERMS AND CONDITIONS"]]), 15).unwrap();
        assert_eq!(info.name, None);
    }

    #[test]
    fn test_numeric_account_cell() {
        let sheet = RawSheet::new(vec![vec![
            Cell::text("Account No :"),
            Cell::Number(50100123456.0),
        ]]);
        let info = extract_header_info(&sheet, 15).unwrap();
        assert_eq!(info.account_number.as_deref(), Some("50100123456"));
    }

    #[test]
    fn test_scan_limit_and_absent_fields() {
        let sheet = sheet(&[&["nothing here"], &["Cust ID : 999"]]);
        let info = extract_header_info(&sheet, 1).unwrap();
        assert_eq!(info, HeaderInfo::default());
    }
}
