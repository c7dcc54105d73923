use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shop_assist::catalog::{Catalog, Database};
use shop_assist::config::{LlmConfig, Persona, SearchConfig};
use shop_assist::engine::ResponseEngine;
use shop_assist::llm::create_provider;
use shop_assist::search::duckduckgo::DuckDuckGoSearch;
use shop_assist::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let persona = Persona::from_env();
    let llm_config = LlmConfig::from_env().context("Invalid LLM configuration")?;
    let search_config = SearchConfig::default();

    let db_path = std::env::var("SHOP_ASSIST_DB_PATH")
        .unwrap_or_else(|_| "./data/shop-assist.db".to_string());
    let database = Arc::new(Database::open(&db_path).context("Failed to open database")?);
    let catalog = Arc::new(Catalog::new(Arc::clone(&database)));
    catalog.seed_defaults().context("Failed to seed catalog")?;

    let llm = create_provider(&llm_config).context("Failed to create LLM provider")?;
    if llm.is_none() {
        warn!("No LLM backend configured, answering from canned replies");
    }

    let search = Arc::new(
        DuckDuckGoSearch::new(search_config.timeout).context("Failed to build search client")?,
    );
    let engine = Arc::new(ResponseEngine::new(
        persona,
        llm_config.options.clone(),
        llm,
        search,
        &search_config,
    ));

    let state = AppState { catalog, engine };
    let app = server::routes(state);

    let port: u16 = std::env::var("SHOP_ASSIST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Shop Assist listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
