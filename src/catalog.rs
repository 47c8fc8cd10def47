//! Category catalog and resolver.
//!
//! The catalog is a read-only grouping of category names used for
//! prompt construction. The resolver is the live get-or-create lookup
//! used when recording transactions and filtering summaries.

use crate::error::AssistantError;
use crate::models::{Category, Kind};
use crate::store::FinanceStore;
use crate::Result;
use tracing::{debug, info};

/// Fallback category the classifier uses for expenses it cannot place.
pub const DEFAULT_EXPENSE_CATEGORY: &str = "Miscellaneous";
/// Fallback category for income without a better match.
pub const DEFAULT_INCOME_CATEGORY: &str = "Other Income";

/// Category names grouped by kind.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    expense: Vec<String>,
    income: Vec<String>,
}

impl CategoryCatalog {
    pub fn names(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Expense => &self.expense,
            Kind::Income => &self.income,
        }
    }

    pub fn add(&mut self, kind: Kind, name: impl Into<String>) {
        let names = match kind {
            Kind::Expense => &mut self.expense,
            Kind::Income => &mut self.income,
        };
        names.push(name.into());
    }
}

/// Read every category row and group the names by kind. No side
/// effects; used only to seed the classifier prompt.
pub async fn load_catalog(store: &dyn FinanceStore) -> Result<CategoryCatalog> {
    let mut catalog = CategoryCatalog::default();

    for category in store.all_categories().await? {
        catalog.add(category.kind, category.name);
    }

    debug!(
        expense = catalog.names(Kind::Expense).len(),
        income = catalog.names(Kind::Income).len(),
        "Loaded category catalog"
    );

    Ok(catalog)
}

/// Case-insensitive get-or-create scoped by kind.
///
/// Concurrent creates of the same (name, kind) are resolved by the
/// storage unique index: the loser re-reads and returns the winner's
/// row.
pub async fn resolve_or_create(
    store: &dyn FinanceStore,
    name: &str,
    kind: Kind,
) -> Result<Category> {
    if let Some(existing) = store.find_category(name, kind).await? {
        return Ok(existing);
    }

    match store.insert_category(name, kind).await {
        Ok(created) => {
            info!(category = %created.name, kind = %created.kind, "Created category");
            Ok(created)
        }
        Err(AssistantError::CategoryConflict(_)) => {
            debug!(category = name, "Lost category insert race, re-reading");
            store.find_category(name, kind).await?.ok_or_else(|| {
                AssistantError::DatabaseError(format!(
                    "Category {} missing after insert conflict",
                    name
                ))
            })
        }
        Err(e) => Err(e),
    }
}
