//! # Ledger Rollup
//!
//! A library for turning raw transaction tables (CSV exports, spreadsheet rows)
//! into categorized income statements and a balance sheet snapshot.
//!
//! ## Core Concepts
//!
//! - **Normalization**: Heterogeneous tables are reduced to `date, description, amount,
//!   account, category`. Rows without a usable date or amount are quarantined, never raised
//! - **Categorization**: An ordered list of keyword rules assigns a category; the first
//!   matching rule wins. An account mapping turns categories into revenue / cogs / expense
//! - **Period Aggregation**: Transactions are bucketed by calendar month, quarter or year
//!   and summed per category type
//! - **Balance Sheet**: Opening balances are copied, moved by account-tagged transactions,
//!   and retained earnings absorb the net income of the window
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_rollup::*;
//! use chrono::NaiveDate;
//!
//! let config = RollupConfig::load("config.json")?;
//! let batch = load_csv_glob("data/transactions/*.csv")?;
//!
//! let report = LedgerRollup::new(&config).run(
//!     batch,
//!     &RollupOptions::new(Granularity::Monthly, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()),
//! )?;
//!
//! for row in &report.income_statement {
//!     println!("{}: {}", row.period, row.net_income);
//! }
//! ```

pub mod balancer;
pub mod categorizer;
pub mod error;
pub mod ingestion;
pub mod report;
pub mod schedule;
pub mod schema;
pub mod statements;
pub mod utils;

pub use balancer::{verify_balance_sheet, AccountingBalancer, VerificationResult};
pub use categorizer::{Categorizer, UNCATEGORIZED};
pub use error::{LedgerRollupError, Result};
pub use ingestion::*;
pub use report::*;
pub use schedule::{due_reports, is_last_day_of_quarter, is_last_day_of_year, previous_period_window};
pub use schema::*;
pub use statements::*;
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RollupOptions {
    pub granularity: Granularity,
    /// Inclusive lower bound applied before aggregation.
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound applied before aggregation.
    pub end: Option<NaiveDate>,
    pub as_of: NaiveDate,
    /// Largest `Assets - (Liabilities + Equity)` still reported as balanced.
    pub tolerance: Decimal,
}

impl RollupOptions {
    pub fn new(granularity: Granularity, as_of: NaiveDate) -> Self {
        Self {
            granularity,
            start: None,
            end: None,
            as_of,
            tolerance: Decimal::new(1, 2),
        }
    }

    pub fn with_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupReport {
    pub company: CompanyInfo,
    pub granularity: Granularity,
    pub income_statement: Vec<StatementRow>,
    pub balance_sheet: BalanceSnapshot,
    pub verification: VerificationResult,
    pub transactions_used: usize,
    pub rows_rejected: usize,
}

/// Runs normalize -> categorize -> aggregate for one configuration.
pub struct LedgerRollup<'a> {
    config: &'a RollupConfig,
    categorizer: Categorizer,
}

impl<'a> LedgerRollup<'a> {
    pub fn new(config: &'a RollupConfig) -> Self {
        Self {
            config,
            categorizer: Categorizer::from_config(config),
        }
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    /// Fails with [`LedgerRollupError::NoTransactions`] only when the batch holds
    /// no usable row at all. A date window that filters everything out still
    /// produces an empty statement.
    ///
    /// `start` and `end` only narrow the income statement. The balance sheet
    /// folds every transaction dated on or before `as_of`, so reports of any
    /// granularity closing on the same day agree on it.
    pub fn run(&self, batch: NormalizedBatch, options: &RollupOptions) -> Result<RollupReport> {
        if batch.is_empty() {
            return Err(LedgerRollupError::NoTransactions(format!(
                "{} rows were read and all were rejected",
                batch.rejected.len()
            )));
        }

        info!(
            "Rolling up {} transactions for {} ({} granularity)",
            batch.len(),
            self.config.company.name,
            options.granularity
        );

        let rows_rejected = batch.rejected.len();
        let categorized = self.categorizer.categorize(batch.transactions);
        let windowed = filter_date_range(categorized.clone(), options.start, options.end)?;
        debug!("{} transactions inside the reporting window", windowed.len());

        let income_statement = income_statement(&windowed, options.granularity);
        let balance_sheet = balance_sheet(
            &self.config.opening_balances,
            &categorized,
            options.as_of,
        );
        let verification = AccountingBalancer::new(options.tolerance).report(&balance_sheet);

        Ok(RollupReport {
            company: self.config.company.clone(),
            granularity: options.granularity,
            income_statement,
            balance_sheet,
            verification,
            transactions_used: windowed.len(),
            rows_rejected,
        })
    }
}

pub fn rollup(
    config: &RollupConfig,
    batch: NormalizedBatch,
    options: &RollupOptions,
) -> Result<RollupReport> {
    LedgerRollup::new(config).run(batch, options)
}

pub(crate) fn validate_config_integrity(config: &RollupConfig) -> Result<()> {
    for (index, rule) in config.rules.iter().enumerate() {
        if rule.category.trim().is_empty() {
            return Err(LedgerRollupError::InvalidRule {
                index,
                reason: "category must not be empty".to_string(),
            });
        }

        if rule.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(LedgerRollupError::InvalidRule {
                index,
                reason: format!("rule for '{}' has no keywords", rule.category),
            });
        }
    }

    let mut seen: HashMap<&str, CategoryType> = HashMap::new();
    for category_type in CategoryType::ALL {
        for category in config.account_mapping.categories(category_type) {
            if let Some(first) = seen.insert(category.as_str(), category_type) {
                if first != category_type {
                    return Err(LedgerRollupError::DuplicateCategoryMapping {
                        category: category.clone(),
                        first: first.to_string(),
                        second: category_type.to_string(),
                    });
                }
            }
        }
    }

    if config.company.currency.trim().is_empty() {
        return Err(LedgerRollupError::ValidationError {
            section: "company".to_string(),
            details: "currency must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> RollupConfig {
        RollupConfig::from_json_str(
            r#"{
                "company": {"name": "Test Company", "currency": "USD"},
                "rules": [
                    {"keywords": ["invoice"], "category": "Sales"},
                    {"keywords": ["supplier"], "category": "Materials"},
                    {"keywords": ["rent"], "category": "Rent"}
                ],
                "account_mapping": {
                    "revenue": ["Sales"],
                    "cogs": ["Materials"],
                    "expense": ["Rent"]
                },
                "opening_balances": {
                    "assets": {"Cash": 1000},
                    "equity": {"Capital": 1000}
                }
            }"#,
        )
        .unwrap()
    }

    fn batch() -> NormalizedBatch {
        let csv = "date,description,amount,account\n\
                   2025-01-10,Invoice 1,500,Cash\n\
                   2025-01-15,Supplier parts,-200,Cash\n\
                   2025-02-01,Office rent,-100,Cash\n\
                   2025-04-01,Invoice 2,300,Cash\n\
                   oops,Invoice 3,300,Cash\n";
        normalize_csv(csv.as_bytes(), "inline").unwrap()
    }

    #[test]
    fn test_end_to_end_processing() {
        let config = config();
        let options = RollupOptions::new(Granularity::Monthly, ymd(2025, 3, 31))
            .with_range(None, Some(ymd(2025, 3, 31)));

        let report = rollup(&config, batch(), &options).unwrap();

        assert_eq!(report.rows_rejected, 1);
        assert_eq!(report.transactions_used, 3);
        assert_eq!(report.income_statement.len(), 2);

        let jan = &report.income_statement[0];
        assert_eq!(jan.revenue, Decimal::from(500));
        assert_eq!(jan.cogs, Decimal::from(-200));
        assert_eq!(jan.gross_profit, Decimal::from(300));
        assert_eq!(report.income_statement[1].net_income, Decimal::from(-100));

        let bs = &report.balance_sheet;
        assert_eq!(bs.assets["Cash"], Decimal::from(1200));
        assert_eq!(bs.equity[RETAINED_EARNINGS], Decimal::from(200));
        assert_eq!(bs.net_income_ytd, Decimal::from(200));
        assert!(report.verification.balanced);
    }

    #[test]
    fn test_all_rows_rejected_is_terminal() {
        let batch = normalize_csv("date,amount\nx,y\n".as_bytes(), "bad").unwrap();
        let result = rollup(
            &config(),
            batch,
            &RollupOptions::new(Granularity::Monthly, ymd(2025, 1, 1)),
        );
        assert!(matches!(result, Err(LedgerRollupError::NoTransactions(_))));
    }

    #[test]
    fn test_empty_window_still_carries_history_into_balance_sheet() {
        let config = config();
        let options = RollupOptions::new(Granularity::Annual, ymd(2030, 1, 1))
            .with_range(Some(ymd(2030, 1, 1)), None);

        let report = rollup(&config, batch(), &options).unwrap();
        assert!(report.income_statement.is_empty());
        assert_eq!(report.transactions_used, 0);
        assert_eq!(report.balance_sheet.assets["Cash"], Decimal::from(1500));
        assert_eq!(report.balance_sheet.equity[RETAINED_EARNINGS], Decimal::from(500));
        assert!(report.verification.balanced);

        let before_history = RollupOptions::new(Granularity::Annual, ymd(2024, 12, 31))
            .with_range(Some(ymd(2030, 1, 1)), None);
        let report = rollup(&config, batch(), &before_history).unwrap();
        assert_eq!(report.balance_sheet.assets, config.opening_balances.assets);
        assert_eq!(report.balance_sheet.equity, config.opening_balances.equity);
        assert_eq!(report.balance_sheet.net_income_ytd, Decimal::ZERO);
    }

    #[test]
    fn test_balance_sheet_ignores_window_start() {
        let config = config();
        let march = RollupOptions::new(Granularity::Monthly, ymd(2025, 3, 31))
            .with_range(Some(ymd(2025, 3, 1)), Some(ymd(2025, 3, 31)));
        let quarter = RollupOptions::new(Granularity::Quarterly, ymd(2025, 3, 31))
            .with_range(Some(ymd(2025, 1, 1)), Some(ymd(2025, 3, 31)));

        let monthly = rollup(&config, batch(), &march).unwrap();
        let quarterly = rollup(&config, batch(), &quarter).unwrap();

        assert!(monthly.income_statement.is_empty());
        assert_eq!(monthly.balance_sheet, quarterly.balance_sheet);
        assert_eq!(monthly.balance_sheet.assets["Cash"], Decimal::from(1200));
        assert_eq!(monthly.balance_sheet.equity[RETAINED_EARNINGS], Decimal::from(200));
    }

    #[test]
    fn test_oversized_amounts_do_not_abort_rollup() {
        let csv = "date,description,amount,account\n\
                   2025-01-10,Invoice 1,79228162514264337593543950335,Cash\n\
                   2025-01-11,Invoice 2,79228162514264337593543950335,Cash\n\
                   2025-01-12,Invoice 3,250,Cash\n";
        let batch = normalize_csv(csv.as_bytes(), "inline").unwrap();
        assert_eq!(batch.rejected.len(), 2);

        let options = RollupOptions::new(Granularity::Monthly, ymd(2025, 1, 31));
        let report = rollup(&config(), batch, &options).unwrap();
        assert_eq!(report.income_statement[0].revenue, Decimal::from(250));
        assert_eq!(report.balance_sheet.assets["Cash"], Decimal::from(1250));
    }

    #[test]
    fn test_rule_validation() {
        let missing_keywords = r#"{"rules": [{"keywords": [" "], "category": "Travel"}]}"#;
        assert!(matches!(
            RollupConfig::from_json_str(missing_keywords),
            Err(LedgerRollupError::InvalidRule { index: 0, .. })
        ));

        let blank_category = r#"{"rules": [{"keywords": ["uber"], "category": ""}]}"#;
        assert!(RollupConfig::from_json_str(blank_category).is_err());
    }

    #[test]
    fn test_duplicate_category_mapping_rejected() {
        let json = r#"{"account_mapping": {"revenue": ["Refunds"], "expense": ["Refunds"]}}"#;
        match RollupConfig::from_json_str(json) {
            Err(LedgerRollupError::DuplicateCategoryMapping { category, first, second }) => {
                assert_eq!(category, "Refunds");
                assert_eq!(first, "revenue");
                assert_eq!(second, "expense");
            }
            other => panic!("expected duplicate mapping error, got {:?}", other),
        }
    }
}
