//! Recoverable data-quality findings.
//!
//! Single bad rows never abort a statement run. Each stage records what it
//! had to tolerate here, and the report is summarized once at the end rather
//! than logged row by row.

use crate::schema::YearMonth;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of affected locations listed per anomaly kind in a summary.
const SUMMARY_EXAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    UnparsableDate {
        row: usize,
        raw: String,
    },
    ConflictingAmounts {
        row: usize,
        withdrawal: f64,
        deposit: f64,
    },
    NegativeAmount {
        row: usize,
        column: String,
        value: f64,
    },
    NegativeClosingBalance {
        row: usize,
        balance: f64,
    },
    DuplicateMonth {
        month: YearMonth,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    UnparsableDate,
    ConflictingAmounts,
    NegativeAmount,
    NegativeClosingBalance,
    DuplicateMonth,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnomalyKind::UnparsableDate => "unparsable date",
            AnomalyKind::ConflictingAmounts => "both withdrawal and deposit set",
            AnomalyKind::NegativeAmount => "negative amount cell",
            AnomalyKind::NegativeClosingBalance => "negative closing balance",
            AnomalyKind::DuplicateMonth => "duplicate month",
        };
        f.write_str(label)
    }
}

impl Anomaly {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Anomaly::UnparsableDate { .. } => AnomalyKind::UnparsableDate,
            Anomaly::ConflictingAmounts { .. } => AnomalyKind::ConflictingAmounts,
            Anomaly::NegativeAmount { .. } => AnomalyKind::NegativeAmount,
            Anomaly::NegativeClosingBalance { .. } => AnomalyKind::NegativeClosingBalance,
            Anomaly::DuplicateMonth { .. } => AnomalyKind::DuplicateMonth,
        }
    }

    /// Where the anomaly was found, for summaries.
    pub fn location(&self) -> String {
        match self {
            Anomaly::UnparsableDate { row, raw } if raw.is_empty() => format!("row {}", row),
            Anomaly::UnparsableDate { row, raw } => format!("row {} ('{}')", row, raw),
            Anomaly::ConflictingAmounts { row, .. } => format!("row {}", row),
            Anomaly::NegativeAmount { row, column, .. } => format!("row {} ({})", row, column),
            Anomaly::NegativeClosingBalance { row, balance } => {
                format!("row {} ({:.2})", row, balance)
            }
            Anomaly::DuplicateMonth { month } => month.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub kind: AnomalyKind,
    pub count: usize,
    /// The first few affected locations
    pub examples: Vec<String>,
}

impl fmt::Display for AnomalySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({}", self.kind, self.count, self.examples.join(", "))?;
        if self.count > self.examples.len() {
            write!(f, ", ...")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    entries: Vec<Anomaly>,
}

impl AnomalyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, anomaly: Anomaly) {
        self.entries.push(anomaly);
    }

    pub fn extend(&mut self, other: AnomalyReport) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Anomaly] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.entries.iter().filter(|a| a.kind() == kind).count()
    }

    /// One line per anomaly kind, in a stable order.
    pub fn summary(&self) -> Vec<AnomalySummary> {
        let mut grouped: BTreeMap<AnomalyKind, AnomalySummary> = BTreeMap::new();

        for anomaly in &self.entries {
            let entry = grouped
                .entry(anomaly.kind())
                .or_insert_with(|| AnomalySummary {
                    kind: anomaly.kind(),
                    count: 0,
                    examples: Vec::new(),
                });
            entry.count += 1;
            if entry.examples.len() < SUMMARY_EXAMPLES {
                entry.examples.push(anomaly.location());
            }
        }

        grouped.into_values().collect()
    }

    pub fn log_summary(&self, stage: &str) {
        for line in self.summary() {
            warn!("{}: {}", stage, line);
        }
    }
}
