//! Mutual fund suggestions per risk tier.

use crate::error::{Result, StatementError};
use crate::schema::InvestmentPlan;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskTier::High => "High",
            RiskTier::Medium => "Medium",
            RiskTier::Low => "Low",
        };
        f.write_str(label)
    }
}

impl FromStr for RiskTier {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(RiskTier::High),
            "medium" => Ok(RiskTier::Medium),
            "low" => Ok(RiskTier::Low),
            _ => Err(StatementError::UnknownRiskCategory(s.to_string())),
        }
    }
}

/// Historical returns in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPerformance {
    pub name: String,
    pub one_year_return: f64,
    /// Annualized
    pub three_year_return: f64,
    /// Annualized
    pub five_year_return: f64,
    pub max_since_inception: f64,
}

pub trait FundCatalog {
    fn funds_for(&self, tier: RiskTier) -> Result<Vec<FundPerformance>>;
}

/// A fixed fund list per tier. A tier that is empty, or absent from a loaded
/// catalog, counts as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFundCatalog {
    #[serde(default)]
    pub high: Vec<FundPerformance>,
    #[serde(default)]
    pub medium: Vec<FundPerformance>,
    #[serde(default)]
    pub low: Vec<FundPerformance>,
}

fn fund_table(category: &str, returns: [(f64, f64, f64, f64); 5]) -> Vec<FundPerformance> {
    ["A", "B", "C", "D", "E"]
        .iter()
        .zip(returns)
        .map(|(letter, (one, three, five, max))| FundPerformance {
            name: format!("Fund {} ({} Risk Category)", letter, category),
            one_year_return: one,
            three_year_return: three,
            five_year_return: five,
            max_since_inception: max,
        })
        .collect()
}

impl Default for StaticFundCatalog {
    fn default() -> Self {
        Self {
            high: fund_table(
                "High",
                [
                    (12.3, 8.5, 10.7, 15.2),
                    (15.6, 10.3, 12.8, 17.5),
                    (18.2, 12.1, 14.5, 19.3),
                    (20.1, 15.0, 16.2, 21.4),
                    (22.0, 17.2, 18.3, 23.6),
                ],
            ),
            medium: fund_table(
                "Medium",
                [
                    (8.5, 6.3, 7.2, 10.0),
                    (10.2, 8.0, 9.0, 12.3),
                    (12.1, 9.5, 10.3, 14.2),
                    (14.0, 11.2, 12.4, 16.0),
                    (15.8, 13.0, 14.5, 18.0),
                ],
            ),
            low: fund_table(
                "Low",
                [
                    (5.3, 4.0, 5.2, 6.5),
                    (6.1, 5.3, 6.1, 7.5),
                    (7.0, 6.2, 7.0, 8.3),
                    (7.8, 7.0, 7.8, 9.5),
                    (8.5, 7.8, 8.6, 10.5),
                ],
            ),
        }
    }
}

impl StaticFundCatalog {
    /// Loads a catalog shaped like `{"high": [...], "medium": [...], "low": [...]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FundCatalog for StaticFundCatalog {
    fn funds_for(&self, tier: RiskTier) -> Result<Vec<FundPerformance>> {
        let funds = match tier {
            RiskTier::High => &self.high,
            RiskTier::Medium => &self.medium,
            RiskTier::Low => &self.low,
        };
        if funds.is_empty() {
            return Err(StatementError::FundCatalogUnavailable(format!(
                "no funds listed for the {} risk tier",
                tier
            )));
        }
        Ok(funds.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecommendation {
    pub plan: InvestmentPlan,
    /// Candidates for the equity leg, drawn from the High tier
    pub equity_funds: Vec<FundPerformance>,
    /// Candidates for the debt leg, drawn from the Low tier
    pub debt_funds: Vec<FundPerformance>,
}

pub fn recommend(
    plan: InvestmentPlan,
    catalog: &dyn FundCatalog,
) -> Result<InvestmentRecommendation> {
    let equity_funds = catalog.funds_for(RiskTier::High)?;
    let debt_funds = catalog.funds_for(RiskTier::Low)?;
    debug!(
        "Recommending {} equity and {} debt funds",
        equity_funds.len(),
        debt_funds.len()
    );
    Ok(InvestmentRecommendation {
        plan,
        equity_funds,
        debt_funds,
    })
}
