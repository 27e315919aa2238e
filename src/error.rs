use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerRollupError {
    #[error("Invalid categorization rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("Category '{category}' is mapped to both {first} and {second}")]
    DuplicateCategoryMapping {
        category: String,
        first: String,
        second: String,
    },

    #[error("Validation error in {section}: {details}")]
    ValidationError { section: String, details: String },

    #[error("No usable transactions found: {0}")]
    NoTransactions(String),

    #[error("Accounting equation violation as of {as_of}: Assets ({assets}) != Liabilities + Equity ({liabilities_and_equity}), difference {difference}")]
    AccountingEquationViolation {
        as_of: NaiveDate,
        assets: Decimal,
        liabilities_and_equity: Decimal,
        difference: Decimal,
    },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerRollupError>;
