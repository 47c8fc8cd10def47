//! Default category seeding.

use crate::catalog::resolve_or_create;
use crate::models::Kind;
use crate::store::FinanceStore;
use crate::Result;
use tracing::info;

const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare & Medical",
    "Education",
    "Travel",
    "Miscellaneous",
];

const DEFAULT_INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Freelance",
    "Business Income",
    "Investments",
    "Gifts",
    "Other Income",
];

/// Create whichever default categories are missing. Idempotent; returns
/// how many new rows were created.
pub async fn seed_default_categories(store: &dyn FinanceStore) -> Result<usize> {
    let before = store.all_categories().await?.len();

    for name in DEFAULT_EXPENSE_CATEGORIES {
        resolve_or_create(store, name, Kind::Expense).await?;
    }
    for name in DEFAULT_INCOME_CATEGORIES {
        resolve_or_create(store, name, Kind::Income).await?;
    }

    let created = store.all_categories().await?.len() - before;
    info!(created, "Category seeding complete");

    Ok(created)
}
