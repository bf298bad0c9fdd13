use crate::error::{Result, StatementError};
use crate::ingestion::NormalizedRow;
use crate::schema::{Ledger, Transaction};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryRule {
    #[schemars(description = "Category label assigned on a match (e.g. 'food')")]
    pub name: String,

    #[schemars(
        description = "Keywords in cleaned form (lowercase letters, digits and single spaces). A keyword matches when it is a substring of the cleaned narration."
    )]
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, narration_clean: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| narration_clean.contains(keyword.as_str()))
    }
}

/// Ordered keyword taxonomy. Declaration order is the precedence order:
/// overlapping keywords across categories resolve to the earlier category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Taxonomy {
    categories: Vec<CategoryRule>,
    #[schemars(description = "Category for narrations no keyword matches")]
    fallback: String,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryRule::new(
                    "transfer",
                    &["upi", "imps", "neft", "rtgs", "ib billpay", "billpay"],
                ),
                CategoryRule::new("salary", &["salary", "payroll", "credit"]),
                CategoryRule::new(
                    "shopping",
                    &["amazon", "flipkart", "myntra", "shopping", "ecommerce", "paytm"],
                ),
                CategoryRule::new(
                    "food",
                    &[
                        "swiggy",
                        "zomato",
                        "food",
                        "restaurant",
                        "cafe",
                        "luluinternationalsho",
                        "bakery",
                        "gpay",
                    ],
                ),
                CategoryRule::new(
                    "entertainment",
                    &["netflix", "youtube", "spotify", "entertainment"],
                ),
                CategoryRule::new(
                    "utilities",
                    &["electricity", "water", "gas", "bill", "recharge"],
                ),
                CategoryRule::new("fuel", &["petrol", "diesel", "fuel", "hpcl", "bpcl"]),
            ],
            fallback: "others".to_string(),
        }
    }
}

impl Taxonomy {
    pub fn new(categories: Vec<CategoryRule>, fallback: impl Into<String>) -> Result<Self> {
        let taxonomy = Self {
            categories,
            fallback: fallback.into(),
        };
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let taxonomy: Taxonomy = serde_json::from_str(json)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback.trim().is_empty() {
            return Err(StatementError::InvalidTaxonomy(
                "fallback category name is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.categories {
            if rule.name.trim().is_empty() {
                return Err(StatementError::InvalidTaxonomy(
                    "category name is empty".to_string(),
                ));
            }
            if !seen.insert(rule.name.as_str()) {
                return Err(StatementError::InvalidTaxonomy(format!(
                    "category '{}' is declared twice",
                    rule.name
                )));
            }
            for keyword in &rule.keywords {
                if keyword.is_empty() || clean_narration(keyword) != *keyword {
                    return Err(StatementError::InvalidTaxonomy(format!(
                        "keyword '{}' in category '{}' must be non-empty cleaned text (lowercase letters, digits, single spaces)",
                        keyword, rule.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Returns the first category with a keyword contained in the cleaned
    /// narration, or the fallback.
    pub fn classify(&self, narration_clean: &str) -> &str {
        self.categories
            .iter()
            .find(|rule| rule.matches(narration_clean))
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.fallback)
    }
}

/// Lowercases, turns every non-alphanumeric character into a space and
/// collapses whitespace.
pub fn clean_narration(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turns a normalized row into a finished transaction.
pub fn enrich(row: NormalizedRow, taxonomy: &Taxonomy) -> Transaction {
    let narration_clean = clean_narration(&row.narration);
    let category = taxonomy.classify(&narration_clean).to_string();

    Transaction {
        source_row: row.source_row,
        date: row.date,
        value_date: row.value_date,
        narration: row.narration,
        reference: row.reference,
        withdrawal_amount: row.withdrawal_amount,
        deposit_amount: row.deposit_amount,
        closing_balance: row.closing_balance,
        amount: row.movement.amount(),
        kind: row.movement.kind(),
        narration_clean,
        category,
    }
}

pub fn classify_ledger(rows: Vec<NormalizedRow>, taxonomy: &Taxonomy) -> Ledger {
    let ledger: Ledger = rows.into_iter().map(|row| enrich(row, taxonomy)).collect();

    let uncategorized = ledger
        .iter()
        .filter(|t| t.category == taxonomy.fallback())
        .count();
    debug!(
        "Classified {} transactions, {} fell through to '{}'",
        ledger.len(),
        uncategorized,
        taxonomy.fallback()
    );

    ledger
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_narration() {
        assert_eq!(clean_narration("UPI/AMAZON PAY/123"), "upi amazon pay 123");
        assert_eq!(clean_narration("  NEFT--CR   HDFC0001  "), "neft cr hdfc0001");
        assert_eq!(clean_narration("Café ₹50"), "caf 50");
        assert_eq!(clean_narration(""), "");
    }

    #[test]
    fn test_transfer_precedes_shopping() {
        let taxonomy = Taxonomy::default();
        let clean = clean_narration("UPI/AMAZON PAY/123");
        assert_eq!(taxonomy.classify(&clean), "transfer");
    }

    #[test]
    fn test_default_categories() {
        let taxonomy = Taxonomy::default();
        assert_eq!(taxonomy.classify("pos swiggy bangalore"), "food");
        assert_eq!(taxonomy.classify("netflix com"), "entertainment");
        assert_eq!(taxonomy.classify("hpcl fuel station"), "fuel");
        assert_eq!(taxonomy.classify("acme payroll march"), "salary");
        assert_eq!(taxonomy.classify("atw cash withdrawal"), "others");
    }

    #[test]
    fn test_first_declared_category_wins() {
        // "credit card bill" matches salary ("credit") and utilities ("bill")
        let narration = "credit card bill";
        let salary_first = Taxonomy::new(
            vec![
                CategoryRule::new("salary", &["credit"]),
                CategoryRule::new("utilities", &["bill"]),
            ],
            "others",
        )
        .unwrap();
        assert_eq!(salary_first.classify(narration), "salary");

        let utilities_first = Taxonomy::new(
            vec![
                CategoryRule::new("utilities", &["bill"]),
                CategoryRule::new("salary", &["credit"]),
            ],
            "others",
        )
        .unwrap();
        assert_eq!(utilities_first.classify(narration), "utilities");
    }

    #[test]
    fn test_keyword_order_within_category_is_irrelevant() {
        let narration = "neft imps transfer";
        let a = Taxonomy::new(vec![CategoryRule::new("transfer", &["neft", "imps"])], "x").unwrap();
        let b = Taxonomy::new(vec![CategoryRule::new("transfer", &["imps", "neft"])], "x").unwrap();
        assert_eq!(a.classify(narration), b.classify(narration));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let taxonomy = Taxonomy::default();
        let clean = clean_narration("POS 4321 ZOMATO ONLINE ORDER");
        let first = taxonomy.classify(&clean).to_string();
        for _ in 0..10 {
            assert_eq!(taxonomy.classify(&clean), first);
        }
    }

    #[test]
    fn test_taxonomy_validation() {
        let duplicate = Taxonomy::new(
            vec![CategoryRule::new("a", &["x"]), CategoryRule::new("a", &["y"])],
            "others",
        );
        assert!(matches!(duplicate, Err(StatementError::InvalidTaxonomy(_))));

        let unclean = Taxonomy::new(vec![CategoryRule::new("a", &["Amazon"])], "others");
        assert!(unclean.is_err());

        let empty_keyword = Taxonomy::new(vec![CategoryRule::new("a", &[""])], "others");
        assert!(empty_keyword.is_err());

        let empty_fallback = Taxonomy::new(vec![], " ");
        assert!(empty_fallback.is_err());

        assert!(Taxonomy::default().validate().is_ok());
    }

    #[test]
    fn test_taxonomy_from_json() {
        let json = r#"{
            "categories": [
                { "name": "groceries", "keywords": ["bigbasket", "dmart"] },
                { "name": "transfer", "keywords": ["upi"] }
            ],
            "fallback": "misc"
        }"#;
        let taxonomy = Taxonomy::from_json(json).unwrap();
        assert_eq!(taxonomy.classify("upi dmart 55"), "groceries");
        assert_eq!(taxonomy.classify("atm"), "misc");
    }
}
