//! Conversational transaction pipeline.
//!
//! One free-text message goes in; the cached agent classifies it; the
//! dispatcher records a transaction, builds a summary, or passes a
//! conversational reply through; a human-readable string always comes
//! out. No error crosses this boundary.

use crate::agent::AgentCache;
use crate::catalog::resolve_or_create;
use crate::classifier::IntentModel;
use crate::models::{format_amount, ClassifiedIntent, NewTransaction, TransactionIntent};
use crate::store::FinanceStore;
use crate::summary::{build_summary, describe_rows, narrate};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fixed reply for any pipeline failure. Diagnostic detail stays in the
/// logs; the user only ever sees this sentence.
pub const APOLOGY_REPLY: &str =
    "I'm sorry, I wasn't able to process that. Could you please try rephrasing it?";

pub struct ChatService {
    store: Arc<dyn FinanceStore>,
    model: Arc<dyn IntentModel>,
    agents: AgentCache,
}

impl ChatService {
    pub fn new(store: Arc<dyn FinanceStore>, model: Arc<dyn IntentModel>) -> Self {
        Self {
            store,
            model,
            agents: AgentCache::new(),
        }
    }

    /// Drop the cached classifier prompt after out-of-band catalog
    /// changes so the next message sees the new categories.
    pub async fn refresh_agent(&self) {
        self.agents.invalidate().await;
    }

    /// Process one user message. Never fails: every error is logged and
    /// converted to the fixed apology reply.
    pub async fn process_message(&self, message: &str, user_id: i64) -> String {
        let request_id = Uuid::new_v4();
        info!(%request_id, user_id, "Processing chat message");

        match self.try_process(message, user_id).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%request_id, %error, "Chat pipeline failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }

    async fn try_process(&self, message: &str, user_id: i64) -> Result<String> {
        let agent = self
            .agents
            .get_or_build(self.store.as_ref(), Arc::clone(&self.model))
            .await?;

        let intent = agent.classify(message, user_id).await?;
        self.dispatch(intent, user_id).await
    }

    async fn dispatch(&self, intent: ClassifiedIntent, user_id: i64) -> Result<String> {
        match intent {
            ClassifiedIntent::Transaction(tx) => self.record_transaction(tx, user_id).await,
            ClassifiedIntent::Summary(request) => {
                let rows = build_summary(self.store.as_ref(), user_id, &request).await?;
                debug!(user_id, records = %describe_rows(&rows), "Summary window built");
                Ok(narrate(&rows, request.period_days))
            }
            ClassifiedIntent::Conversational(reply) => Ok(reply.response),
        }
    }

    async fn record_transaction(
        &self,
        intent: TransactionIntent,
        user_id: i64,
    ) -> Result<String> {
        let category =
            resolve_or_create(self.store.as_ref(), &intent.category, intent.kind).await?;

        let amount = intent.amount.round_dp(2);
        let occurred_on = intent
            .date
            .unwrap_or_else(|| Utc::now().date_naive());

        let created = self
            .store
            .insert_transaction(NewTransaction {
                user_id,
                category_id: category.id,
                amount,
                kind: intent.kind,
                comment: Some(intent.description.clone()),
                occurred_on,
            })
            .await?;

        info!(
            transaction_id = created.id,
            user_id,
            category = %category.name,
            "Recorded transaction"
        );

        Ok(format!(
            "✅ Added {} of ₹{} in {} for '{}'.",
            intent.kind,
            format_amount(amount),
            category.name,
            intent.description,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::models::Kind;
    use crate::store::{InMemoryStore, TransactionFilter};
    use chrono::Duration;

    /// Model that always answers with the same raw text.
    struct StaticModel {
        raw: String,
    }

    impl StaticModel {
        fn new(raw: &str) -> Arc<Self> {
            Arc::new(Self {
                raw: raw.to_string(),
            })
        }
    }

    #[async_trait::async_trait]
    impl IntentModel for StaticModel {
        async fn classify(&self, _system_prompt: &str, _message: &str) -> Result<String> {
            Ok(self.raw.clone())
        }
    }

    struct FailingModel;

    #[async_trait::async_trait]
    impl IntentModel for FailingModel {
        async fn classify(&self, _system_prompt: &str, _message: &str) -> Result<String> {
            Err(AssistantError::ClassifierError("model offline".to_string()))
        }
    }

    fn service(store: Arc<InMemoryStore>, model: Arc<dyn IntentModel>) -> ChatService {
        ChatService::new(store, model)
    }

    #[tokio::test]
    async fn test_transaction_intent_records_and_confirms() {
        let store = Arc::new(InMemoryStore::new());
        let model = StaticModel::new(
            r#"{
                "intent": "transaction",
                "amount": 1500.00,
                "category": "groceries",
                "description": "weekly shop",
                "kind": "Expense"
            }"#,
        );
        let service = service(Arc::clone(&store), model);

        let reply = service.process_message("bought the weekly shop", 7).await;

        for fragment in ["Expense", "1,500.00", "groceries", "weekly shop"] {
            assert!(reply.contains(fragment), "missing {:?} in {:?}", fragment, reply);
        }

        let category = store
            .find_category("GROCERIES", Kind::Expense)
            .await
            .unwrap()
            .expect("category should have been created");
        assert_eq!(category.name, "groceries");

        let rows = store
            .transactions_since(TransactionFilter {
                user_id: 7,
                cutoff: Utc::now().date_naive(),
                category_id: None,
                kind: None,
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].occurred_on, Utc::now().date_naive());
        assert_eq!(rows[0].comment.as_deref(), Some("weekly shop"));
    }

    #[tokio::test]
    async fn test_transaction_reuses_existing_category() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_category("Groceries", Kind::Expense)
            .await
            .unwrap();

        let model = StaticModel::new(
            r#"{
                "intent": "transaction",
                "amount": 300,
                "category": "groceries",
                "description": "fruit",
                "kind": "Expense"
            }"#,
        );
        let service = service(Arc::clone(&store), model);

        service.process_message("fruit run", 1).await;

        assert_eq!(store.all_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_intent_narrates_window() {
        let store = Arc::new(InMemoryStore::new());
        let salary = store.insert_category("Salary", Kind::Income).await.unwrap();
        store
            .insert_transaction(NewTransaction {
                user_id: 1,
                category_id: salary.id,
                amount: rust_decimal::Decimal::from_str_exact("42000").unwrap(),
                kind: Kind::Income,
                comment: Some("payday".to_string()),
                occurred_on: Utc::now().date_naive() - Duration::days(2),
            })
            .await
            .unwrap();

        let model = StaticModel::new(r#"{ "intent": "summary", "period_days": 7 }"#);
        let service = service(Arc::clone(&store), model);

        let reply = service.process_message("how did this week go?", 1).await;

        assert!(reply.contains("last 7 days"));
        assert!(reply.contains("1 transaction(s)"));
        assert!(reply.contains("42,000.00"));
    }

    #[tokio::test]
    async fn test_conversational_intent_is_verbatim_with_no_side_effects() {
        let store = Arc::new(InMemoryStore::new());
        let model =
            StaticModel::new(r#"{ "intent": "conversational", "response": "Hi there!" }"#);
        let service = service(Arc::clone(&store), model);

        let reply = service.process_message("hello!", 1).await;

        assert_eq!(reply, "Hi there!");
        assert!(store.all_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_failure_yields_apology() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store, Arc::new(FailingModel));

        let reply = service.process_message("anything", 1).await;

        assert_eq!(reply, APOLOGY_REPLY);
    }

    #[tokio::test]
    async fn test_malformed_output_yields_apology_without_side_effects() {
        let store = Arc::new(InMemoryStore::new());
        let model = StaticModel::new("sure, I logged that for you!");
        let service = service(Arc::clone(&store), model);

        let reply = service.process_message("log 250 for lunch", 1).await;

        assert_eq!(reply, APOLOGY_REPLY);
        assert!(store.all_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_agent_rebuilds_prompt() {
        let store = Arc::new(InMemoryStore::new());
        let model =
            StaticModel::new(r#"{ "intent": "conversational", "response": "ok" }"#);
        let service = service(Arc::clone(&store), model);

        service.process_message("hi", 1).await;

        store.insert_category("Pet Care", Kind::Expense).await.unwrap();
        service.refresh_agent().await;

        let agent = service
            .agents
            .get_or_build(service.store.as_ref(), Arc::clone(&service.model))
            .await
            .unwrap();
        assert!(agent.system_prompt().contains("Pet Care"));
    }
}
