use crate::error::{LedgerRollupError, Result};
use crate::statements::BalanceSnapshot;
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of checking `Assets = Liabilities + Equity` on a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub as_of: NaiveDate,
    pub assets: Decimal,
    pub liabilities_and_equity: Decimal,
    pub difference: Decimal,
    pub balanced: bool,
}

/// Checks snapshots against the accounting equation. The snapshot itself is
/// never adjusted: imbalance is reported, not plugged.
pub struct AccountingBalancer {
    tolerance: Decimal,
}

impl AccountingBalancer {
    pub fn new(tolerance: Decimal) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn check(&self, snapshot: &BalanceSnapshot) -> VerificationResult {
        let difference = snapshot.imbalance();

        VerificationResult {
            as_of: snapshot.as_of,
            assets: snapshot.totals.assets,
            liabilities_and_equity: snapshot.totals.liabilities_and_equity,
            difference,
            balanced: difference.abs() <= self.tolerance,
        }
    }

    /// Same as [`check`](Self::check), logging a warning when out of balance.
    pub fn report(&self, snapshot: &BalanceSnapshot) -> VerificationResult {
        let result = self.check(snapshot);
        if !result.balanced {
            warn!(
                "Balance sheet as of {} does not balance: Assets {} vs Liabilities + Equity {} (difference {})",
                result.as_of, result.assets, result.liabilities_and_equity, result.difference
            );
        }
        result
    }

    pub fn verify(&self, snapshot: &BalanceSnapshot) -> Result<()> {
        let result = self.check(snapshot);
        if result.balanced {
            return Ok(());
        }

        Err(LedgerRollupError::AccountingEquationViolation {
            as_of: result.as_of,
            assets: result.assets,
            liabilities_and_equity: result.liabilities_and_equity,
            difference: result.difference,
        })
    }
}

pub fn verify_balance_sheet(snapshot: &BalanceSnapshot, tolerance: Decimal) -> Result<()> {
    AccountingBalancer::new(tolerance).verify(snapshot)
}
