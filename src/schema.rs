use crate::error::{LedgerRollupError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Coarse statement classification of a categorized transaction.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    #[schemars(description = "Sales and other inflows (Income Statement, positive amounts)")]
    Revenue,

    #[schemars(
        description = "Direct costs of goods sold, stored as negative amounts so that Gross Profit = Revenue + COGS"
    )]
    Cogs,

    #[schemars(
        description = "Operating expenses, stored as negative amounts so that Net Income = Gross Profit + Expenses"
    )]
    Expense,
}

impl CategoryType {
    /// Lookup order used when resolving a category through the account mapping.
    pub const ALL: [CategoryType; 3] = [Self::Revenue, Self::Cogs, Self::Expense];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Cogs => "cogs",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar granularity used to bucket transactions into reporting periods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Quarterly,
    Annual,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = LedgerRollupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" => Ok(Self::Annual),
            other => Err(LedgerRollupError::ValidationError {
                section: "period".to_string(),
                details: format!("'{}' must be monthly|quarterly|annual", other),
            }),
        }
    }
}

/// A validated ledger row. Only the normalizer constructs these from raw input,
/// so `date` and `amount` are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    /// Ledger account label, matched exactly against opening balance account names.
    pub account: Option<String>,
    /// Category label carried by the source row, used as the categorizer fallback.
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(rename = "resolved_category")]
    pub category: String,
    pub category_type: CategoryType,
}

/// Anything that sits on a calendar date and can be windowed by it.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Transaction {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for CategorizedTransaction {
    fn date(&self) -> NaiveDate {
        self.transaction.date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategoryRule {
    #[schemars(
        description = "Keywords matched case-insensitively as substrings of the transaction description. Any keyword matching selects this rule."
    )]
    pub keywords: Vec<String>,

    #[schemars(description = "Category assigned when this rule is the first to match")]
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct AccountMapping {
    #[serde(default)]
    #[schemars(description = "Categories reported as Revenue")]
    pub revenue: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Categories reported as Cost of Goods Sold")]
    pub cogs: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Categories reported as Operating Expenses")]
    pub expense: Vec<String>,
}

impl AccountMapping {
    pub fn categories(&self, category_type: CategoryType) -> &[String] {
        match category_type {
            CategoryType::Revenue => &self.revenue,
            CategoryType::Cogs => &self.cogs,
            CategoryType::Expense => &self.expense,
        }
    }

    /// Returns the configured type for `category`, checking revenue, cogs, then expense.
    pub fn type_for(&self, category: &str) -> Option<CategoryType> {
        CategoryType::ALL
            .into_iter()
            .find(|t| self.categories(*t).iter().any(|c| c == category))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct OpeningBalances {
    #[serde(default)]
    pub assets: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub liabilities: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub equity: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CompanyInfo {
    #[serde(default = "default_company_name")]
    pub name: String,
    #[serde(default = "default_currency")]
    #[schemars(description = "ISO currency code shown on rendered reports")]
    pub currency: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            currency: default_currency(),
        }
    }
}

fn default_company_name() -> String {
    "Company".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DataSourceConfig {
    #[serde(default)]
    #[schemars(description = "Glob pattern of delimited transaction files, e.g. data/transactions/*.csv")]
    pub csv_glob: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RollupConfig {
    #[serde(default)]
    pub company: CompanyInfo,

    #[serde(default)]
    pub datasource: DataSourceConfig,

    #[serde(default)]
    #[schemars(
        description = "Ordered categorization rules. The first rule with a matching keyword wins, so order is significant."
    )]
    pub rules: Vec<CategoryRule>,

    #[serde(default)]
    pub account_mapping: AccountMapping,

    #[serde(default)]
    pub opening_balances: OpeningBalances,
}

impl RollupConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        crate::validate_config_integrity(&config)?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RollupConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
