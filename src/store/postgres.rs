//! Postgres-backed finance store.
//!
//! Uses a lazily-connected pool and bootstraps its own schema on first
//! use. Category uniqueness is enforced by a unique index on
//! (lower(name), kind), so get-or-create races are resolved by the
//! database rather than application-level locking.

use crate::error::AssistantError;
use crate::models::{Category, Kind, NewTransaction, SummaryRow, Transaction};
use crate::store::{FinanceStore, TransactionFilter};
use crate::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tokio::sync::OnceCell;
use tracing::info;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PgStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                AssistantError::DatabaseError(format!("Failed to create connection pool: {}", e))
            })?;

        info!("Finance store backend: postgres");

        Ok(Self {
            pool,
            schema_ready: OnceCell::new(),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS category (
                      id BIGSERIAL PRIMARY KEY,
                      name TEXT NOT NULL,
                      kind TEXT NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE UNIQUE INDEX IF NOT EXISTS idx_category_name_kind
                    ON category (lower(name), kind);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS transactions (
                      id BIGSERIAL PRIMARY KEY,
                      user_id BIGINT NOT NULL,
                      category_id BIGINT NOT NULL REFERENCES category(id) ON DELETE CASCADE,
                      amount NUMERIC(10, 2) NOT NULL,
                      kind TEXT NOT NULL,
                      comment TEXT,
                      occurred_on DATE NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_transactions_user_date
                    ON transactions (user_id, occurred_on);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AssistantError::DatabaseError(format!(
                    "Failed to initialize finance schema: {}",
                    e
                ))
            })?;

        Ok(())
    }
}

fn db_err(context: &str, error: impl std::fmt::Display) -> AssistantError {
    AssistantError::DatabaseError(format!("{}: {}", context, error))
}

fn kind_from_db(value: &str) -> Result<Kind> {
    Kind::parse(value)
        .ok_or_else(|| AssistantError::DatabaseError(format!("Unknown kind value: {}", value)))
}

fn category_from_row(row: &PgRow) -> Result<Category> {
    let kind: String = row
        .try_get("kind")
        .map_err(|e| db_err("Failed to read category kind", e))?;

    Ok(Category {
        id: row
            .try_get("id")
            .map_err(|e| db_err("Failed to read category id", e))?,
        name: row
            .try_get("name")
            .map_err(|e| db_err("Failed to read category name", e))?,
        kind: kind_from_db(&kind)?,
    })
}

fn summary_row_from_row(row: &PgRow) -> Result<SummaryRow> {
    let kind: String = row
        .try_get("kind")
        .map_err(|e| db_err("Failed to read transaction kind", e))?;
    let amount: Decimal = row
        .try_get("amount")
        .map_err(|e| db_err("Failed to read transaction amount", e))?;
    let occurred_on: NaiveDate = row
        .try_get("occurred_on")
        .map_err(|e| db_err("Failed to read transaction date", e))?;

    Ok(SummaryRow {
        occurred_on,
        amount,
        kind: kind_from_db(&kind)?,
        comment: row
            .try_get("comment")
            .map_err(|e| db_err("Failed to read transaction comment", e))?,
        category_name: row
            .try_get("category_name")
            .map_err(|e| db_err("Failed to read category name", e))?,
    })
}

#[async_trait::async_trait]
impl FinanceStore for PgStore {
    async fn all_categories(&self) -> Result<Vec<Category>> {
        self.ensure_schema().await?;

        let rows = sqlx::query("SELECT id, name, kind FROM category ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("Failed to load categories", e))?;

        rows.iter().map(category_from_row).collect()
    }

    async fn find_category(&self, name: &str, kind: Kind) -> Result<Option<Category>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT id, name, kind FROM category
            WHERE lower(name) = lower($1) AND kind = $2
            "#,
        )
        .bind(name)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to look up category", e))?;

        row.as_ref().map(category_from_row).transpose()
    }

    async fn insert_category(&self, name: &str, kind: Kind) -> Result<Category> {
        self.ensure_schema().await?;

        let result = sqlx::query("INSERT INTO category (name, kind) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(Category {
                id: row
                    .try_get("id")
                    .map_err(|e| db_err("Failed to read inserted category id", e))?,
                name: name.to_string(),
                kind,
            }),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AssistantError::CategoryConflict(name.to_string()))
            }
            Err(e) => Err(db_err("Failed to insert category", e)),
        }
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, category_id, amount, kind, comment, occurred_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.category_id)
        .bind(tx.amount)
        .bind(tx.kind.as_str())
        .bind(tx.comment.clone())
        .bind(tx.occurred_on)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("Failed to insert transaction", e))?;

        Ok(Transaction {
            id: row
                .try_get("id")
                .map_err(|e| db_err("Failed to read inserted transaction id", e))?,
            user_id: tx.user_id,
            category_id: tx.category_id,
            amount: tx.amount,
            kind: tx.kind,
            comment: tx.comment,
            occurred_on: tx.occurred_on,
        })
    }

    async fn transactions_since(&self, filter: TransactionFilter) -> Result<Vec<SummaryRow>> {
        self.ensure_schema().await?;

        let base = r#"
            SELECT t.occurred_on, t.amount, t.kind, t.comment, c.name AS category_name
            FROM transactions t
            JOIN category c ON c.id = t.category_id
            WHERE t.user_id = $1 AND t.occurred_on >= $2
        "#;

        let result = match (filter.category_id, filter.kind) {
            (Some(category_id), _) => {
                sqlx::query(&format!("{} AND t.category_id = $3 ORDER BY t.id", base))
                    .bind(filter.user_id)
                    .bind(filter.cutoff)
                    .bind(category_id)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, Some(kind)) => {
                sqlx::query(&format!("{} AND t.kind = $3 ORDER BY t.id", base))
                    .bind(filter.user_id)
                    .bind(filter.cutoff)
                    .bind(kind.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            (None, None) => {
                sqlx::query(&format!("{} ORDER BY t.id", base))
                    .bind(filter.user_id)
                    .bind(filter.cutoff)
                    .fetch_all(&self.pool)
                    .await
            }
        };

        let rows = result.map_err(|e| db_err("Failed to load transactions", e))?;

        rows.iter().map(summary_row_from_row).collect()
    }
}
