//! Transaction normalization.
//!
//! Raw tables arrive with arbitrary column casing and a loose notion of types.
//! Everything here reduces them to [`Transaction`] values restricted to the five
//! canonical columns. Rows without a usable `date` or `amount` are quarantined
//! in [`NormalizedBatch::rejected`] and never raised as errors.

use crate::error::Result;
use crate::schema::Transaction;
use crate::utils::{parse_amount_lenient, parse_date_lenient, MAX_ABS_AMOUNT};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const CANONICAL_COLUMNS: [&str; 5] = ["date", "description", "amount", "account", "category"];

/// An untyped table as handed over by a file reader or spreadsheet collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RejectionReason {
    MissingDate,
    UnparseableDate(String),
    MissingAmount,
    UnparseableAmount(String),
    AmountOutOfRange(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDate => f.write_str("missing date"),
            Self::UnparseableDate(raw) => write!(f, "unparseable date '{}'", raw),
            Self::MissingAmount => f.write_str("missing amount"),
            Self::UnparseableAmount(raw) => write!(f, "unparseable amount '{}'", raw),
            Self::AmountOutOfRange(raw) => {
                write!(f, "amount '{}' exceeds {} in magnitude", raw, MAX_ABS_AMOUNT)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// File name or collaborator label the row came from.
    pub source: String,
    /// 1-based data row number, not counting the header.
    pub row: usize,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRow>,
}

impl NormalizedBatch {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn extend(&mut self, other: NormalizedBatch) {
        self.transactions.extend(other.transactions);
        self.rejected.extend(other.rejected);
    }
}

#[derive(Debug, Default)]
struct ColumnIndex {
    date: Option<usize>,
    description: Option<usize>,
    amount: Option<usize>,
    account: Option<usize>,
    category: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &[String]) -> Self {
        let mut index = Self::default();

        for (position, header) in headers.iter().enumerate() {
            let slot = match header.trim().to_lowercase().as_str() {
                "date" => &mut index.date,
                "description" => &mut index.description,
                "amount" => &mut index.amount,
                "account" => &mut index.account,
                "category" => &mut index.category,
                _ => continue,
            };
            // First matching column wins when casing variants repeat.
            if slot.is_none() {
                *slot = Some(position);
            }
        }

        index
    }
}

/// A single row viewed through its canonical fields.
struct RawRow<'a> {
    date: Option<&'a str>,
    description: Option<&'a str>,
    amount: Option<&'a str>,
    account: Option<&'a str>,
    category: Option<&'a str>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_row(raw: RawRow<'_>) -> std::result::Result<Transaction, RejectionReason> {
    let date = match raw.date.map(str::trim).filter(|v| !v.is_empty()) {
        None => return Err(RejectionReason::MissingDate),
        Some(text) => {
            parse_date_lenient(text).ok_or_else(|| RejectionReason::UnparseableDate(text.to_string()))?
        }
    };

    let amount = match raw.amount.map(str::trim).filter(|v| !v.is_empty()) {
        None => return Err(RejectionReason::MissingAmount),
        Some(text) => {
            let amount = parse_amount_lenient(text)
                .ok_or_else(|| RejectionReason::UnparseableAmount(text.to_string()))?;
            if amount.abs() > MAX_ABS_AMOUNT {
                return Err(RejectionReason::AmountOutOfRange(text.to_string()));
            }
            amount
        }
    };

    Ok(Transaction {
        date,
        description: raw.description.map(str::trim).unwrap_or_default().to_string(),
        amount,
        account: non_blank(raw.account),
        category: non_blank(raw.category),
    })
}

fn push_row(batch: &mut NormalizedBatch, source: &str, row: usize, raw: RawRow<'_>) {
    match normalize_row(raw) {
        Ok(transaction) => batch.transactions.push(transaction),
        Err(reason) => {
            debug!("Dropping row {} of {}: {}", row, source, reason);
            batch.rejected.push(RejectedRow {
                source: source.to_string(),
                row,
                reason,
            });
        }
    }
}

pub fn normalize_table(table: &RawTable, source: &str) -> NormalizedBatch {
    let columns = ColumnIndex::from_headers(&table.headers);
    let mut batch = NormalizedBatch::default();

    for (offset, cells) in table.rows.iter().enumerate() {
        let cell = |position: Option<usize>| {
            position.and_then(|p| cells.get(p)).map(String::as_str)
        };

        push_row(
            &mut batch,
            source,
            offset + 1,
            RawRow {
                date: cell(columns.date),
                description: cell(columns.description),
                amount: cell(columns.amount),
                account: cell(columns.account),
                category: cell(columns.category),
            },
        );
    }

    info!(
        "Normalized {} rows from {} ({} dropped)",
        batch.transactions.len(),
        source,
        batch.rejected.len()
    );

    batch
}

/// Reads one delimited table with a header row. Ragged rows are tolerated and
/// invalid UTF-8 is replaced rather than rejected.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    Ok(RawTable { headers, rows })
}

pub fn normalize_csv<R: Read>(reader: R, source: &str) -> Result<NormalizedBatch> {
    let table = read_csv(reader)?;
    Ok(normalize_table(&table, source))
}

/// Loads and concatenates the given files in order.
pub fn load_csv_files<P: AsRef<Path>>(paths: &[P]) -> Result<NormalizedBatch> {
    let mut batch = NormalizedBatch::default();

    for path in paths {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        batch.extend(normalize_csv(file, &path.display().to_string())?);
    }

    Ok(batch)
}

/// Loads every file matching `pattern`, sorted by path. No match is an empty batch.
pub fn load_csv_glob(pattern: &str) -> Result<NormalizedBatch> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Skipping unreadable glob entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    info!("Pattern {} matched {} files", pattern, paths.len());

    load_csv_files(&paths)
}

fn record_field<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    record
        .iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Normalizes row-records handed over by a spreadsheet or workbook reader.
/// Cell values may be strings or numbers.
pub fn normalize_records(records: &[Map<String, Value>], source: &str) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for (offset, record) in records.iter().enumerate() {
        let [date, description, amount, account, category] =
            CANONICAL_COLUMNS.map(|column| value_text(record_field(record, column)));

        push_row(
            &mut batch,
            source,
            offset + 1,
            RawRow {
                date: date.as_deref(),
                description: description.as_deref(),
                amount: amount.as_deref(),
                account: account.as_deref(),
                category: category.as_deref(),
            },
        );
    }

    info!(
        "Normalized {} records from {} ({} dropped)",
        batch.transactions.len(),
        source,
        batch.rejected.len()
    );

    batch
}
