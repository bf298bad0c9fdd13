//! Age-based investment rules: how much of the balance is investable, which
//! risk tolerance applies, and how the investment splits into equity and debt.

use crate::aggregation::monthly_withdrawal_totals;
use crate::error::{Result, StatementError};
use crate::schema::{InvestmentPlan, RiskTolerance, Transaction};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Share of the average monthly expense reserved on top of the expense itself.
pub const SAFETY_BUFFER: f64 = 0.10;

const RATIO_TOLERANCE: f64 = 1e-9;

/// Mean of the per-month withdrawal totals; 0 when the ledger has no dated rows.
pub fn average_monthly_expense(ledger: &[Transaction]) -> f64 {
    let totals = monthly_withdrawal_totals(ledger);
    if totals.is_empty() {
        return 0.0;
    }
    totals.values().sum::<f64>() / totals.len() as f64
}

/// Balance left after one month of expenses plus the safety buffer, never
/// negative.
pub fn investable_amount(current_balance: f64, average_expense: f64) -> f64 {
    (current_balance - average_expense * (1.0 + SAFETY_BUFFER)).max(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgeBand {
    #[schemars(description = "Inclusive lower age")]
    pub min_age: u32,

    #[schemars(description = "Exclusive upper age")]
    pub max_age: u32,

    pub risk_tolerance: RiskTolerance,

    #[schemars(description = "Share of the investable amount to invest, in [0, 1]")]
    pub investment_fraction: f64,
}

impl AgeBand {
    fn contains(&self, age: u32) -> bool {
        (self.min_age..self.max_age).contains(&age)
    }
}

/// Half-open age ranges; ages outside every band use the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgeBandTable {
    pub bands: Vec<AgeBand>,
    pub fallback_risk: RiskTolerance,
    pub fallback_fraction: f64,
}

impl Default for AgeBandTable {
    fn default() -> Self {
        let band = |min_age, max_age, risk_tolerance, investment_fraction| AgeBand {
            min_age,
            max_age,
            risk_tolerance,
            investment_fraction,
        };
        Self {
            bands: vec![
                band(20, 30, RiskTolerance::High, 0.10),
                band(30, 40, RiskTolerance::ModerateHigh, 0.175),
                band(40, 50, RiskTolerance::Moderate, 0.225),
                band(50, 60, RiskTolerance::LowModerate, 0.275),
            ],
            fallback_risk: RiskTolerance::Low,
            fallback_fraction: 0.225,
        }
    }
}

fn valid_fraction(fraction: f64) -> bool {
    (0.0..=1.0).contains(&fraction)
}

impl AgeBandTable {
    pub fn validate(&self) -> Result<()> {
        if !valid_fraction(self.fallback_fraction) {
            return Err(StatementError::InvalidAgeBands(format!(
                "fallback fraction {} is outside [0, 1]",
                self.fallback_fraction
            )));
        }

        for (i, band) in self.bands.iter().enumerate() {
            if band.min_age >= band.max_age {
                return Err(StatementError::InvalidAgeBands(format!(
                    "band [{}, {}) is empty",
                    band.min_age, band.max_age
                )));
            }
            if !valid_fraction(band.investment_fraction) {
                return Err(StatementError::InvalidAgeBands(format!(
                    "band [{}, {}) has fraction {} outside [0, 1]",
                    band.min_age, band.max_age, band.investment_fraction
                )));
            }
            if let Some(other) = self.bands[i + 1..]
                .iter()
                .find(|o| band.min_age < o.max_age && o.min_age < band.max_age)
            {
                return Err(StatementError::InvalidAgeBands(format!(
                    "bands [{}, {}) and [{}, {}) overlap",
                    band.min_age, band.max_age, other.min_age, other.max_age
                )));
            }
        }

        Ok(())
    }

    pub fn lookup(&self, age: u32) -> (RiskTolerance, f64) {
        self.bands
            .iter()
            .find(|band| band.contains(age))
            .map(|band| (band.risk_tolerance, band.investment_fraction))
            .unwrap_or((self.fallback_risk, self.fallback_fraction))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Allocation {
    pub risk_tolerance: RiskTolerance,
    pub equities: f64,
    pub debt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationTable {
    pub allocations: Vec<Allocation>,
}

impl Default for AllocationTable {
    fn default() -> Self {
        let split = |risk_tolerance, equities, debt| Allocation {
            risk_tolerance,
            equities,
            debt,
        };
        Self {
            allocations: vec![
                split(RiskTolerance::High, 0.75, 0.25),
                split(RiskTolerance::ModerateHigh, 0.65, 0.35),
                split(RiskTolerance::Moderate, 0.55, 0.45),
                split(RiskTolerance::LowModerate, 0.40, 0.60),
                split(RiskTolerance::Low, 0.20, 0.80),
            ],
        }
    }
}

impl AllocationTable {
    /// Each split must be non-negative and sum to 1. Gaps in coverage are
    /// caught when a plan needs the missing tolerance.
    pub fn validate(&self) -> Result<()> {
        for allocation in &self.allocations {
            let sum = allocation.equities + allocation.debt;
            if allocation.equities < 0.0
                || allocation.debt < 0.0
                || (sum - 1.0).abs() > RATIO_TOLERANCE
            {
                return Err(StatementError::InvalidAllocation {
                    risk: allocation.risk_tolerance.to_string(),
                    equities: allocation.equities,
                    debt: allocation.debt,
                });
            }
        }
        Ok(())
    }

    /// `(equities, debt)` for a risk tolerance.
    pub fn ratios(&self, risk: RiskTolerance) -> Option<(f64, f64)> {
        self.allocations
            .iter()
            .find(|a| a.risk_tolerance == risk)
            .map(|a| (a.equities, a.debt))
    }
}

pub struct InvestmentRuleEngine<'a> {
    age_bands: &'a AgeBandTable,
    allocations: &'a AllocationTable,
}

impl<'a> InvestmentRuleEngine<'a> {
    pub fn new(age_bands: &'a AgeBandTable, allocations: &'a AllocationTable) -> Self {
        Self {
            age_bands,
            allocations,
        }
    }

    pub fn plan(&self, age: u32, investable: f64) -> Result<InvestmentPlan> {
        let (risk_tolerance, investment_fraction) = self.age_bands.lookup(age);
        let (equity_ratio, debt_ratio) = self
            .allocations
            .ratios(risk_tolerance)
            .ok_or_else(|| StatementError::MissingAllocation(risk_tolerance.to_string()))?;

        let total_investable = investment_fraction * investable;
        debug!(
            "Age {} -> {} ({:.1}% of {:.2})",
            age,
            risk_tolerance,
            investment_fraction * 100.0,
            investable
        );

        Ok(InvestmentPlan {
            age,
            risk_tolerance,
            investment_fraction,
            investable_amount: investable,
            total_investable,
            equity_ratio,
            debt_ratio,
            equity_amount: total_investable * equity_ratio,
            debt_amount: total_investable * debt_ratio,
        })
    }
}
