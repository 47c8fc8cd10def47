use finance_chat_agent::{
    chat::ChatService,
    config::Config,
    gemini::GeminiClient,
    seed,
    store::{FinanceStore, InMemoryStore, PgStore},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env();

    info!("Finance Chat Agent starting");

    let store: Arc<dyn FinanceStore> = match &config.database_url {
        Some(url) => match PgStore::connect(url) {
            Ok(store) => Arc::new(store),
            Err(error) => {
                warn!(
                    "Failed to initialize postgres store, falling back to in-memory: {}",
                    error
                );
                Arc::new(InMemoryStore::new())
            }
        },
        None => {
            info!("Finance store backend: in-memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let created = seed::seed_default_categories(store.as_ref()).await?;
    info!(created, "Default categories ready");

    let model = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));
    let service = ChatService::new(store, model);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let message = if args.is_empty() {
        "I spent 250 on groceries yesterday".to_string()
    } else {
        args.join(" ")
    };

    let user_id: i64 = std::env::var("CHAT_USER_ID")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1);

    info!(user_id, message = %message, "Sending message through the pipeline");

    let reply = service.process_message(&message, user_id).await;

    println!("\n=== ASSISTANT REPLY ===");
    println!("{}", reply);

    Ok(())
}
