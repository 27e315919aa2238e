use crate::schema::{
    AccountMapping, CategorizedTransaction, CategoryRule, CategoryType, RollupConfig, Transaction,
};
use log::debug;
use rust_decimal::Decimal;

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone)]
struct CompiledRule {
    keywords: Vec<String>,
    category: String,
}

/// Ordered keyword categorizer.
///
/// Rules are evaluated in the order they were configured and the first rule
/// with a keyword contained in the description wins. That ordering is the only
/// tie-break, so callers must hand rules over in their configured order.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CompiledRule>,
    mapping: AccountMapping,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule], mapping: &AccountMapping) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                category: rule.category.clone(),
            })
            .collect();

        Self {
            rules,
            mapping: mapping.clone(),
        }
    }

    pub fn from_config(config: &RollupConfig) -> Self {
        Self::new(&config.rules, &config.account_mapping)
    }

    /// Resolves the category for `description`, falling back to `fallback` and
    /// then to [`UNCATEGORIZED`]. Blank fallbacks count as absent.
    pub fn classify(&self, description: &str, fallback: Option<&str>) -> String {
        let text = description.to_lowercase();

        for rule in &self.rules {
            if rule.keywords.iter().any(|k| text.contains(k.as_str())) {
                return rule.category.clone();
            }
        }

        fallback
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }

    /// Mapped type of `category`, or a sign-based default when unmapped:
    /// negative amounts are expenses, everything else revenue.
    pub fn category_type(&self, category: &str, amount: Decimal) -> CategoryType {
        self.mapping.type_for(category).unwrap_or(if amount < Decimal::ZERO {
            CategoryType::Expense
        } else {
            CategoryType::Revenue
        })
    }

    pub fn categorize_one(&self, transaction: Transaction) -> CategorizedTransaction {
        let category = self.classify(&transaction.description, transaction.category.as_deref());
        let category_type = self.category_type(&category, transaction.amount);

        CategorizedTransaction {
            transaction,
            category,
            category_type,
        }
    }

    /// Categorizes every transaction, preserving input order.
    pub fn categorize(&self, transactions: Vec<Transaction>) -> Vec<CategorizedTransaction> {
        let categorized: Vec<CategorizedTransaction> = transactions
            .into_iter()
            .map(|t| self.categorize_one(t))
            .collect();

        debug!(
            "Categorized {} transactions with {} rules ({} uncategorized)",
            categorized.len(),
            self.rules.len(),
            categorized
                .iter()
                .filter(|t| t.category == UNCATEGORIZED)
                .count()
        );

        categorized
    }
}
