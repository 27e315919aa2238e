use crate::error::Result;
use crate::schema::{CompanyInfo, Granularity};
use crate::statements::{BalanceSnapshot, StatementRow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Write;

pub const INCOME_STATEMENT_HEADER: [&str; 6] = [
    "period",
    "Revenue",
    "COGS",
    "Gross Profit",
    "Operating Expenses",
    "Net Income",
];

pub const BALANCE_SHEET_HEADER: [&str; 3] = ["section", "account", "balance"];

fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// `Income_Statement_<period>_<start>_<end>.csv`, open bounds spelled `start` / `end`.
pub fn income_statement_file_name(
    granularity: Granularity,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> String {
    let bound = |date: Option<NaiveDate>, open: &str| {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| open.to_string())
    };
    format!(
        "Income_Statement_{}_{}_{}.csv",
        granularity,
        bound(start, "start"),
        bound(end, "end")
    )
}

pub fn balance_sheet_file_name(snapshot: &BalanceSnapshot) -> String {
    format!("Balance_Sheet_{}.csv", snapshot.as_of.format("%Y-%m-%d"))
}

pub fn write_income_statement_csv<W: Write>(writer: W, rows: &[StatementRow]) -> Result<()> {
    let mut wrt = csv::Writer::from_writer(writer);
    wrt.write_record(INCOME_STATEMENT_HEADER)?;

    for row in rows {
        wrt.write_record([
            row.period.to_string(),
            money(row.revenue),
            money(row.cogs),
            money(row.gross_profit),
            money(row.operating_expenses),
            money(row.net_income),
        ])?;
    }

    wrt.flush()?;
    Ok(())
}

pub fn write_balance_sheet_csv<W: Write>(writer: W, snapshot: &BalanceSnapshot) -> Result<()> {
    let mut wrt = csv::Writer::from_writer(writer);
    wrt.write_record(BALANCE_SHEET_HEADER)?;

    let sections: [(&str, &BTreeMap<String, Decimal>); 3] = [
        ("Assets", &snapshot.assets),
        ("Liabilities", &snapshot.liabilities),
        ("Equity", &snapshot.equity),
    ];
    for (section, accounts) in sections {
        for (name, balance) in accounts {
            wrt.write_record([section, name.as_str(), money(*balance).as_str()])?;
        }
    }

    wrt.write_record(["Totals", "Assets", money(snapshot.totals.assets).as_str()])?;
    wrt.write_record([
        "Totals",
        "Liabilities + Equity",
        money(snapshot.totals.liabilities_and_equity).as_str(),
    ])?;
    wrt.write_record(["Totals", "Net Income YTD", money(snapshot.net_income_ytd).as_str()])?;

    wrt.flush()?;
    Ok(())
}

pub fn income_statement_markdown(
    company: &CompanyInfo,
    period_label: &str,
    rows: &[StatementRow],
) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# {} - Income Statement ({})\n\n",
        company.name, period_label
    ));
    output.push_str(&format!("**Currency:** {}\n\n", company.currency));

    if rows.is_empty() {
        output.push_str("_No transactions in this window._\n");
        return output;
    }

    output.push_str("| Period | Revenue | COGS | Gross Profit | OpEx | Net Income |\n");
    output.push_str("|---|---:|---:|---:|---:|---:|\n");
    for row in rows {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            row.period,
            money(row.revenue),
            money(row.cogs),
            money(row.gross_profit),
            money(row.operating_expenses),
            money(row.net_income)
        ));
    }

    output
}

fn push_section(output: &mut String, title: &str, accounts: &BTreeMap<String, Decimal>) {
    output.push_str(&format!("### {}\n\n", title));
    if accounts.is_empty() {
        output.push_str("- _none_\n");
    }
    for (name, balance) in accounts {
        output.push_str(&format!("- {}: {}\n", name, money(*balance)));
    }
    output.push('\n');
}

pub fn balance_sheet_markdown(company: &CompanyInfo, snapshot: &BalanceSnapshot) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# {} - Balance Sheet (As of {})\n\n",
        company.name,
        snapshot.as_of.format("%Y-%m-%d")
    ));
    output.push_str(&format!("**Currency:** {}\n\n", company.currency));

    push_section(&mut output, "Assets", &snapshot.assets);
    push_section(&mut output, "Liabilities", &snapshot.liabilities);
    push_section(&mut output, "Equity", &snapshot.equity);

    output.push_str("## Totals\n\n");
    output.push_str(&format!("- Assets: {}\n", money(snapshot.totals.assets)));
    output.push_str(&format!(
        "- Liabilities + Equity: {}\n",
        money(snapshot.totals.liabilities_and_equity)
    ));
    output.push_str(&format!(
        "- Net Income YTD: {}\n",
        money(snapshot.net_income_ytd)
    ));

    let difference = snapshot.imbalance();
    if !difference.is_zero() {
        output.push_str(&format!("\n**Out of balance by {}**\n", money(difference)));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CategorizedTransaction, CategoryType, OpeningBalances, Transaction};
    use crate::statements::{balance_sheet, income_statement};

    fn fixture() -> (Vec<StatementRow>, BalanceSnapshot) {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let txns = vec![CategorizedTransaction {
            transaction: Transaction {
                date,
                description: "Invoice".to_string(),
                amount: Decimal::new(125050, 2),
                account: Some("Cash".to_string()),
                category: None,
            },
            category: "Sales".to_string(),
            category_type: CategoryType::Revenue,
        }];

        let mut opening = OpeningBalances::default();
        opening.assets.insert("Cash".to_string(), Decimal::from(1000));
        opening
            .equity
            .insert("Capital".to_string(), Decimal::from(1000));

        (
            income_statement(&txns, Granularity::Monthly),
            balance_sheet(&opening, &txns, date),
        )
    }

    #[test]
    fn test_income_statement_csv() {
        let (rows, _) = fixture();
        let mut buffer = Vec::new();
        write_income_statement_csv(&mut buffer, &rows).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("period,Revenue,COGS,Gross Profit,Operating Expenses,Net Income")
        );
        assert_eq!(lines.next(), Some("2025-03,1250.50,0.00,1250.50,0.00,1250.50"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_balance_sheet_csv() {
        let (_, snapshot) = fixture();
        let mut buffer = Vec::new();
        write_balance_sheet_csv(&mut buffer, &snapshot).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("section,account,balance\n"));
        assert!(text.contains("Assets,Cash,2250.50\n"));
        assert!(text.contains("Equity,Capital,1000.00\n"));
        assert!(text.contains("Equity,RetainedEarnings,1250.50\n"));
        assert!(text.contains("Totals,Liabilities + Equity,2250.50\n"));
        assert_eq!(balance_sheet_file_name(&snapshot), "Balance_Sheet_2025-03-15.csv");
        assert_eq!(
            income_statement_file_name(Granularity::Quarterly, None, Some(snapshot.as_of)),
            "Income_Statement_quarterly_start_2025-03-15.csv"
        );
    }

    #[test]
    fn test_markdown_rendering() {
        let (rows, snapshot) = fixture();
        let company = CompanyInfo {
            name: "Acme".to_string(),
            currency: "EUR".to_string(),
        };

        let income = income_statement_markdown(&company, "monthly", &rows);
        assert!(income.contains("# Acme - Income Statement (monthly)"));
        assert!(income.contains("**Currency:** EUR"));
        assert!(income.contains("| 2025-03 | 1250.50 |"));

        let balance = balance_sheet_markdown(&company, &snapshot);
        assert!(balance.contains("# Acme - Balance Sheet (As of 2025-03-15)"));
        assert!(balance.contains("- Cash: 2250.50"));
        assert!(!balance.contains("Out of balance"));
    }

    #[test]
    fn test_empty_statement_markdown() {
        let text = income_statement_markdown(&CompanyInfo::default(), "annual", &[]);
        assert!(text.contains("No transactions"));
    }
}
