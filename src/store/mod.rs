//! Persistence layer for categories and transactions.
//!
//! `FinanceStore` is the seam the pipeline talks to. `InMemoryStore`
//! backs tests and demo runs without a database; `PgStore` is the
//! Postgres implementation.

use crate::error::AssistantError;
use crate::models::{Category, Kind, NewTransaction, SummaryRow, Transaction};
use crate::Result;
use chrono::NaiveDate;
use tokio::sync::RwLock;

pub mod postgres;

pub use postgres::PgStore;

/// Filter for windowed transaction reads. The dispatcher applies the
/// precedence rules before calling, so `category_id` and `kind` are
/// never both set.
#[derive(Debug, Clone, Copy)]
pub struct TransactionFilter {
    pub user_id: i64,
    /// Earliest date (inclusive) in the window.
    pub cutoff: NaiveDate,
    pub category_id: Option<i64>,
    pub kind: Option<Kind>,
}

/// Trait for category and transaction persistence
#[async_trait::async_trait]
pub trait FinanceStore: Send + Sync {
    /// Every category row, for catalog construction.
    async fn all_categories(&self) -> Result<Vec<Category>>;

    /// Case-insensitive name lookup scoped by kind.
    async fn find_category(&self, name: &str, kind: Kind) -> Result<Option<Category>>;

    /// Insert a category. Fails with `CategoryConflict` when a row with
    /// the same (name, kind) already exists under any letter-casing.
    async fn insert_category(&self, name: &str, kind: Kind) -> Result<Category>;

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction>;

    /// One user's transactions with `occurred_on >= cutoff`, joined with
    /// their category names, in storage order.
    async fn transactions_since(&self, filter: TransactionFilter) -> Result<Vec<SummaryRow>>;
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    next_category_id: i64,
    next_transaction_id: i64,
}

/// In-memory store for development and tests
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FinanceStore for InMemoryStore {
    async fn all_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.clone())
    }

    async fn find_category(&self, name: &str, kind: Kind) -> Result<Option<Category>> {
        let needle = name.to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables
            .categories
            .iter()
            .find(|c| c.kind == kind && c.name.to_lowercase() == needle)
            .cloned())
    }

    async fn insert_category(&self, name: &str, kind: Kind) -> Result<Category> {
        let needle = name.to_lowercase();
        let mut tables = self.tables.write().await;

        if tables
            .categories
            .iter()
            .any(|c| c.kind == kind && c.name.to_lowercase() == needle)
        {
            return Err(AssistantError::CategoryConflict(name.to_string()));
        }

        tables.next_category_id += 1;
        let category = Category {
            id: tables.next_category_id,
            name: name.to_string(),
            kind,
        };
        tables.categories.push(category.clone());

        Ok(category)
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        let mut tables = self.tables.write().await;

        if !tables.categories.iter().any(|c| c.id == tx.category_id) {
            return Err(AssistantError::DatabaseError(format!(
                "Unknown category id: {}",
                tx.category_id
            )));
        }

        tables.next_transaction_id += 1;
        let transaction = Transaction {
            id: tables.next_transaction_id,
            user_id: tx.user_id,
            category_id: tx.category_id,
            amount: tx.amount,
            kind: tx.kind,
            comment: tx.comment,
            occurred_on: tx.occurred_on,
        };
        tables.transactions.push(transaction.clone());

        Ok(transaction)
    }

    async fn transactions_since(&self, filter: TransactionFilter) -> Result<Vec<SummaryRow>> {
        let tables = self.tables.read().await;
        let mut rows = Vec::new();

        for tx in &tables.transactions {
            if tx.user_id != filter.user_id || tx.occurred_on < filter.cutoff {
                continue;
            }
            if let Some(category_id) = filter.category_id {
                if tx.category_id != category_id {
                    continue;
                }
            }
            if let Some(kind) = filter.kind {
                if tx.kind != kind {
                    continue;
                }
            }

            let category_name = tables
                .categories
                .iter()
                .find(|c| c.id == tx.category_id)
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    AssistantError::DatabaseError(format!(
                        "Dangling category id: {}",
                        tx.category_id
                    ))
                })?;

            rows.push(SummaryRow {
                occurred_on: tx.occurred_on,
                amount: tx.amount,
                kind: tx.kind,
                comment: tx.comment.clone(),
                category_name,
            });
        }

        Ok(rows)
    }
}
