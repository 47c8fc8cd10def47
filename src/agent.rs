//! Cached classification agent.
//!
//! The system prompt is rendered from the category catalog once and
//! reused across requests. `AgentCache` serializes first construction
//! so concurrent first requests build at most one agent, and exposes an
//! explicit `invalidate` hook for catalog changes.

use crate::catalog::{self, CategoryCatalog, DEFAULT_EXPENSE_CATEGORY, DEFAULT_INCOME_CATEGORY};
use crate::classifier::{parse_intent, IntentModel};
use crate::models::{ClassifiedIntent, Kind};
use crate::store::FinanceStore;
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A classifier agent bound to the system prompt it was built with.
pub struct FinancialAgent {
    system_prompt: String,
    model: Arc<dyn IntentModel>,
}

impl FinancialAgent {
    pub fn new(system_prompt: String, model: Arc<dyn IntentModel>) -> Self {
        Self {
            system_prompt,
            model,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Classify one user message. The model call is the pipeline's only
    /// suspension point.
    pub async fn classify(&self, message: &str, user_id: i64) -> Result<ClassifiedIntent> {
        debug!(user_id, "Classifying message");
        let raw = self.model.classify(&self.system_prompt, message).await?;
        parse_intent(&raw)
    }
}

/// Render the classifier system prompt from the catalog. The fallback
/// categories are forced into the lists so the model always has a legal
/// answer for an unplaceable transaction.
pub fn render_system_prompt(catalog: &CategoryCatalog) -> String {
    let mut expense: Vec<String> = catalog.names(Kind::Expense).to_vec();
    let mut income: Vec<String> = catalog.names(Kind::Income).to_vec();

    if !expense
        .iter()
        .any(|n| n.eq_ignore_ascii_case(DEFAULT_EXPENSE_CATEGORY))
    {
        expense.push(DEFAULT_EXPENSE_CATEGORY.to_string());
    }
    if !income
        .iter()
        .any(|n| n.eq_ignore_ascii_case(DEFAULT_INCOME_CATEGORY))
    {
        income.push(DEFAULT_INCOME_CATEGORY.to_string());
    }

    expense.sort();
    income.sort();

    format!(
        r#"You are a helpful financial assistant for a personal finance app.
Your job is to understand the user's message and answer with exactly one JSON object.

First, determine the user's intent.

1. If the user is logging a transaction (spending or receiving money), answer with:
   {{ "intent": "transaction", "amount": <number>, "category": "<category name>", "description": "<brief description>", "kind": "Income" or "Expense", "date": "YYYY-MM-DD" }}
   - Infer the kind from the message.
   - Include "date" only when the message mentions one; otherwise omit the field.
   - You MUST select the most appropriate category from the lists below.
   - Available Expense Categories: {expense_list}
   - Available Income Categories: {income_list}
   - CRITICAL RULE: do NOT invent a new category. If no existing category is a good fit, use '{default_expense}' for an Expense and '{default_income}' for an Income.

2. If the user is asking for a summary or report, answer with:
   {{ "intent": "summary", "period_days": <number>, "category_filter": "<category name>" or null, "kind_filter": "Income" or "Expense" or null }}
   - Infer period_days from the message: "today" is 1, "this week" is 7, "this month" is 30, "this year" is 365. Default to 30.

3. For any other general financial question or greeting, answer with:
   {{ "intent": "conversational", "response": "<a friendly, conversational response>" }}

Rules:
- Return ONLY valid JSON
- No explanation text
"#,
        expense_list = expense.join(", "),
        income_list = income.join(", "),
        default_expense = DEFAULT_EXPENSE_CATEGORY,
        default_income = DEFAULT_INCOME_CATEGORY,
    )
}

/// Process-wide cache of the classifier agent.
///
/// First construction runs under the write lock with a re-check, so N
/// concurrent first requests perform exactly one catalog load and all
/// observe the same instance. A failed build leaves the slot empty and
/// the next call retries.
pub struct AgentCache {
    slot: RwLock<Option<Arc<FinancialAgent>>>,
}

impl AgentCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub async fn get_or_build(
        &self,
        store: &dyn FinanceStore,
        model: Arc<dyn IntentModel>,
    ) -> Result<Arc<FinancialAgent>> {
        if let Some(agent) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(agent));
        }

        let mut slot = self.slot.write().await;
        if let Some(agent) = slot.as_ref() {
            return Ok(Arc::clone(agent));
        }

        info!("Building and caching classifier system prompt");
        let catalog = catalog::load_catalog(store).await?;
        let agent = Arc::new(FinancialAgent::new(render_system_prompt(&catalog), model));
        *slot = Some(Arc::clone(&agent));

        Ok(agent)
    }

    /// Drop the cached agent so the next call re-reads the catalog.
    /// Call after creating or renaming categories outside the pipeline.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
        info!("Classifier agent cache invalidated");
    }
}

impl Default for AgentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::models::{Category, NewTransaction, SummaryRow, Transaction};
    use crate::store::{InMemoryStore, TransactionFilter};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopModel;

    #[async_trait::async_trait]
    impl IntentModel for NoopModel {
        async fn classify(&self, _system_prompt: &str, _message: &str) -> Result<String> {
            Err(AssistantError::ClassifierError("not wired".to_string()))
        }
    }

    /// Counts catalog reads so the build-once property is observable.
    struct CountingStore {
        inner: InMemoryStore,
        catalog_loads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: InMemoryStore::new(),
                catalog_loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl FinanceStore for CountingStore {
        async fn all_categories(&self) -> Result<Vec<Category>> {
            self.catalog_loads.fetch_add(1, Ordering::SeqCst);
            self.inner.all_categories().await
        }

        async fn find_category(&self, name: &str, kind: Kind) -> Result<Option<Category>> {
            self.inner.find_category(name, kind).await
        }

        async fn insert_category(&self, name: &str, kind: Kind) -> Result<Category> {
            self.inner.insert_category(name, kind).await
        }

        async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
            self.inner.insert_transaction(tx).await
        }

        async fn transactions_since(&self, filter: TransactionFilter) -> Result<Vec<SummaryRow>> {
            self.inner.transactions_since(filter).await
        }
    }

    #[test]
    fn test_prompt_includes_defaults_and_sorted_names() {
        let mut catalog = CategoryCatalog::default();
        catalog.add(Kind::Expense, "Travel");
        catalog.add(Kind::Expense, "Food & Dining");
        catalog.add(Kind::Income, "Salary");

        let prompt = render_system_prompt(&catalog);

        assert!(prompt.contains("Food & Dining, Miscellaneous, Travel"));
        assert!(prompt.contains("Other Income, Salary"));
    }

    #[test]
    fn test_prompt_does_not_duplicate_existing_defaults() {
        let mut catalog = CategoryCatalog::default();
        catalog.add(Kind::Expense, "miscellaneous");

        let prompt = render_system_prompt(&catalog);
        let line = prompt
            .lines()
            .find(|l| l.contains("Available Expense Categories:"))
            .unwrap();

        assert!(line.contains("miscellaneous"));
        assert!(!line.contains("Miscellaneous"));
    }

    #[tokio::test]
    async fn test_concurrent_first_use_builds_once() {
        let store = CountingStore::new();
        let cache = AgentCache::new();
        let model: Arc<dyn IntentModel> = Arc::new(NoopModel);

        let (a, b, c, d) = tokio::join!(
            cache.get_or_build(&store, Arc::clone(&model)),
            cache.get_or_build(&store, Arc::clone(&model)),
            cache.get_or_build(&store, Arc::clone(&model)),
            cache.get_or_build(&store, Arc::clone(&model)),
        );

        let a = a.unwrap();
        for other in [b.unwrap(), c.unwrap(), d.unwrap()] {
            assert!(Arc::ptr_eq(&a, &other));
        }
        assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_picks_up_new_categories() {
        let store = CountingStore::new();
        let cache = AgentCache::new();
        let model: Arc<dyn IntentModel> = Arc::new(NoopModel);

        let stale = cache.get_or_build(&store, Arc::clone(&model)).await.unwrap();
        assert!(!stale.system_prompt().contains("Pet Care"));

        store.insert_category("Pet Care", Kind::Expense).await.unwrap();

        // Still cached: the catalog is not re-read until invalidation.
        let cached = cache.get_or_build(&store, Arc::clone(&model)).await.unwrap();
        assert!(Arc::ptr_eq(&stale, &cached));

        cache.invalidate().await;

        let fresh = cache.get_or_build(&store, model).await.unwrap();
        assert!(fresh.system_prompt().contains("Pet Care"));
        assert_eq!(store.catalog_loads.load(Ordering::SeqCst), 2);
    }
}
