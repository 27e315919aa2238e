//! Period aggregation: income statements per calendar period and a balance
//! sheet snapshot folded from opening balances.

use crate::error::{LedgerRollupError, Result};
use crate::schema::{CategorizedTransaction, CategoryType, Dated, Granularity, OpeningBalances, Transaction};
use crate::utils::{
    first_day_of_month, first_month_of_quarter, last_day_of_month, quarter_of_month, round_money,
};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const RETAINED_EARNINGS: &str = "RetainedEarnings";

/// Calendar-aligned bucket key. Keys of one granularity order chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

impl PeriodKey {
    pub fn for_date(date: NaiveDate, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Monthly => Self::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Quarterly => Self::Quarter {
                year: date.year(),
                quarter: quarter_of_month(date.month()),
            },
            Granularity::Annual => Self::Year { year: date.year() },
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Month { .. } => Granularity::Monthly,
            Self::Quarter { .. } => Granularity::Quarterly,
            Self::Year { .. } => Granularity::Annual,
        }
    }

    pub fn start_date(&self) -> Result<NaiveDate> {
        match *self {
            Self::Month { year, month } => first_day_of_month(year, month),
            Self::Quarter { year, quarter } => {
                first_day_of_month(year, first_month_of_quarter(quarter))
            }
            Self::Year { year } => first_day_of_month(year, 1),
        }
    }

    pub fn end_date(&self) -> Result<NaiveDate> {
        match *self {
            Self::Month { year, month } => last_day_of_month(year, month),
            Self::Quarter { year, quarter } => {
                last_day_of_month(year, first_month_of_quarter(quarter) + 2)
            }
            Self::Year { year } => last_day_of_month(year, 12),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::for_date(date, self.granularity()) == *self
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Self::Quarter { year, quarter } => write!(f, "{:04}Q{}", year, quarter),
            Self::Year { year } => write!(f, "{:04}", year),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRow {
    pub period: PeriodKey,
    #[serde(rename = "Revenue")]
    pub revenue: Decimal,
    #[serde(rename = "COGS")]
    pub cogs: Decimal,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: Decimal,
    #[serde(rename = "Operating Expenses")]
    pub operating_expenses: Decimal,
    #[serde(rename = "Net Income")]
    pub net_income: Decimal,
}

/// Row of the sign-based statement: inflows against outflows, no category types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedStatementRow {
    pub period: PeriodKey,
    #[serde(rename = "Revenue")]
    pub revenue: Decimal,
    #[serde(rename = "Expenses")]
    pub expenses: Decimal,
    #[serde(rename = "Net Income")]
    pub net_income: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceTotals {
    #[serde(rename = "Assets")]
    pub assets: Decimal,
    #[serde(rename = "Liabilities + Equity")]
    pub liabilities_and_equity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub as_of: NaiveDate,
    pub assets: BTreeMap<String, Decimal>,
    pub liabilities: BTreeMap<String, Decimal>,
    pub equity: BTreeMap<String, Decimal>,
    pub totals: BalanceTotals,
    pub net_income_ytd: Decimal,
}

impl BalanceSnapshot {
    /// `Assets - (Liabilities + Equity)`. Zero when the books balance.
    pub fn imbalance(&self) -> Decimal {
        self.totals.assets - self.totals.liabilities_and_equity
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TypeTotals {
    revenue: Decimal,
    cogs: Decimal,
    expense: Decimal,
}

impl TypeTotals {
    fn add(&mut self, category_type: CategoryType, amount: Decimal) {
        match category_type {
            CategoryType::Revenue => self.revenue += amount,
            CategoryType::Cogs => self.cogs += amount,
            CategoryType::Expense => self.expense += amount,
        }
    }

    fn net(&self) -> Decimal {
        self.revenue + self.cogs + self.expense
    }
}

/// Keeps items dated within `[start, end]`; either bound may be open.
pub fn filter_date_range<T: Dated>(
    items: Vec<T>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<T>> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(LedgerRollupError::InvalidDateRange { start, end });
        }
    }

    Ok(items
        .into_iter()
        .filter(|item| {
            let date = item.date();
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
        .collect())
}

/// Grouped income statement. One row per non-empty period, oldest first.
///
/// COGS and expenses are expected as negative magnitudes, so
/// `Gross Profit = Revenue + COGS` and `Net Income = Gross Profit + Operating Expenses`.
/// The derived figures are computed from the rounded components, which keeps
/// both identities exact on the rounded output.
pub fn income_statement(
    transactions: &[CategorizedTransaction],
    granularity: Granularity,
) -> Vec<StatementRow> {
    let mut buckets: BTreeMap<PeriodKey, TypeTotals> = BTreeMap::new();

    for txn in transactions {
        buckets
            .entry(PeriodKey::for_date(txn.transaction.date, granularity))
            .or_default()
            .add(txn.category_type, txn.transaction.amount);
    }

    debug!(
        "Grouped {} transactions into {} {} periods",
        transactions.len(),
        buckets.len(),
        granularity
    );

    buckets
        .into_iter()
        .map(|(period, totals)| {
            let revenue = round_money(totals.revenue);
            let cogs = round_money(totals.cogs);
            let operating_expenses = round_money(totals.expense);
            let gross_profit = revenue + cogs;

            StatementRow {
                period,
                revenue,
                cogs,
                gross_profit,
                operating_expenses,
                net_income: gross_profit + operating_expenses,
            }
        })
        .collect()
}

/// Sign-based statement: positive amounts are revenue, negative amounts are
/// expenses reported as a positive magnitude. Zero amounts are ignored.
pub fn income_statement_by_sign(
    transactions: &[Transaction],
    granularity: Granularity,
) -> Vec<SignedStatementRow> {
    let mut buckets: BTreeMap<PeriodKey, (Decimal, Decimal)> = BTreeMap::new();

    for txn in transactions.iter().filter(|t| !t.amount.is_zero()) {
        let (inflow, outflow) = buckets
            .entry(PeriodKey::for_date(txn.date, granularity))
            .or_default();
        if txn.amount > Decimal::ZERO {
            *inflow += txn.amount;
        } else {
            *outflow += txn.amount.abs();
        }
    }

    buckets
        .into_iter()
        .map(|(period, (inflow, outflow))| {
            let revenue = round_money(inflow);
            let expenses = round_money(outflow);
            SignedStatementRow {
                period,
                revenue,
                expenses,
                net_income: revenue - expenses,
            }
        })
        .collect()
}

/// Balance sheet as of `as_of`, folded from a copy of `opening`.
///
/// Transactions dated after `as_of` are ignored. A transaction whose account
/// names an existing asset (checked first) or liability adds its amount to
/// that balance; equity is only moved through `RetainedEarnings`, which
/// receives the net income of the window. With no transactions in the window
/// the opening balances come back unchanged.
pub fn balance_sheet(
    opening: &OpeningBalances,
    transactions: &[CategorizedTransaction],
    as_of: NaiveDate,
) -> BalanceSnapshot {
    let mut assets = opening.assets.clone();
    let mut liabilities = opening.liabilities.clone();
    let mut equity = opening.equity.clone();
    let mut totals = TypeTotals::default();
    let mut applied = 0usize;

    let in_window = transactions.iter().filter(|t| t.transaction.date <= as_of);
    for txn in in_window {
        applied += 1;
        totals.add(txn.category_type, txn.transaction.amount);

        let Some(account) = txn.transaction.account.as_deref() else {
            continue;
        };
        let amount = txn.transaction.amount;
        if let Some(balance) = assets.get_mut(account) {
            *balance = round_money(*balance + amount);
        } else if let Some(balance) = liabilities.get_mut(account) {
            *balance = round_money(*balance + amount);
        }
    }

    let net_income_ytd = round_money(totals.net());
    if applied > 0 || equity.contains_key(RETAINED_EARNINGS) {
        let retained = equity.entry(RETAINED_EARNINGS.to_string()).or_default();
        *retained = round_money(*retained + net_income_ytd);
    }

    let total_assets = round_money(assets.values().copied().sum());
    let total_liabilities = round_money(liabilities.values().copied().sum());
    let total_equity = round_money(equity.values().copied().sum());

    info!(
        "Balance sheet as of {} folded {} transactions (net income {})",
        as_of, applied, net_income_ytd
    );

    BalanceSnapshot {
        as_of,
        assets,
        liabilities,
        equity,
        totals: BalanceTotals {
            assets: total_assets,
            liabilities_and_equity: round_money(total_liabilities + total_equity),
        },
        net_income_ytd,
    }
}
