//! Integration tests for the chat + catalog REST API.
//!
//! Each test spins up an Axum server on a random port with an in-memory
//! database and exercises the real HTTP contract with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use shop_assist::catalog::{Catalog, Database};
use shop_assist::config::{CompletionOptions, Persona, SearchConfig};
use shop_assist::engine::ResponseEngine;
use shop_assist::error::{LlmError, SearchError};
use shop_assist::llm::{CompletionRequest, LlmProvider};
use shop_assist::search::{SearchHit, WebSearch};
use shop_assist::server::{AppState, routes};

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let last = request.messages.last().unwrap();
        Ok(format!("resposta para: {}", last.content))
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

struct NoSearch;

#[async_trait]
impl WebSearch for NoSearch {
    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        Err(SearchError::NoResults(query.to_string()))
    }
}

/// Start a server on a random port. Returns the base URL.
async fn start_server(llm: Option<Arc<dyn LlmProvider>>) -> String {
    let database = Arc::new(Database::open_in_memory().unwrap());
    let catalog = Arc::new(Catalog::new(database));
    catalog.seed_defaults().unwrap();

    let engine = Arc::new(ResponseEngine::new(
        Persona::default(),
        CompletionOptions::default(),
        llm,
        Arc::new(NoSearch),
        &SearchConfig::default(),
    ));

    let app = routes(AppState { catalog, engine });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn chat_round_trip_with_model() {
    let base = start_server(Some(Arc::new(StubLlm))).await;
    let client = client();

    let resp: Value = client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "text": "oi, tudo bem?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["success"], true);
    assert_eq!(resp["handoff"], false);
    assert_eq!(resp["reply"], "resposta para: oi, tudo bem?");

    // The exchange lands in the message log.
    let history: Value = client
        .get(format!("{base}/api/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["text"], "oi, tudo bem?");
    assert_eq!(rows[0]["origin"], "web");
    assert_eq!(rows[0]["user_id"], "user");
    assert_eq!(rows[0]["escalated"], false);
}

#[tokio::test]
async fn order_request_returns_handoff_text() {
    let base = start_server(Some(Arc::new(StubLlm))).await;
    let client = client();

    let resp: Value = client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "text": "quero encomendar um iphone 17", "user_id": "u1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["handoff"], true);
    let reply = resp["reply"].as_str().unwrap();
    assert!(reply.contains("atendente humano"));

    // The visible hand-off text is what gets logged, flagged as escalated.
    let history: Value = client
        .get(format!("{base}/api/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rows = history.as_array().unwrap();
    assert_eq!(rows[0]["escalated"], true);
    assert_eq!(rows[0]["response"], reply);
}

#[tokio::test]
async fn canned_replies_without_a_model() {
    let base = start_server(None).await;
    let client = client();

    let resp: Value = client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "text": "Oi!" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resp["success"], true);
    assert_eq!(resp["reply"], "E aí! Sou o Alex. Procurando algum celular?");
}

#[tokio::test]
async fn clear_history_endpoint_responds() {
    let base = start_server(Some(Arc::new(StubLlm))).await;
    let client = client();

    client
        .post(format!("{base}/api/messages"))
        .json(&json!({ "text": "oi", "user_id": "u1" }))
        .send()
        .await
        .unwrap();

    let resp: Value = client
        .delete(format!("{base}/api/history/u1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["cleared"], "u1");
}

#[tokio::test]
async fn catalog_crud_flow() {
    let base = start_server(None).await;
    let client = client();

    // Seeded reference data is present.
    let categories: Value = client
        .get(format!("{base}/api/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(categories.as_array().unwrap().len(), 5);

    let brands: Value = client
        .get(format!("{base}/api/brands"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(brands.as_array().unwrap().len(), 7);

    let category_id = brands_or_categories_id(&categories);
    let brand_id = brands_or_categories_id(&brands);

    // Create a product against the seeded references.
    let created = client
        .post(format!("{base}/api/products"))
        .json(&json!({
            "name": "iPhone 12",
            "category_id": category_id,
            "brand_id": brand_id,
            "price": "3499.90",
            "stock": 2
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.unwrap();
    let product_id = created["id"].as_str().unwrap().to_string();

    let product: Value = client
        .get(format!("{base}/api/products/{product_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(product["name"], "iPhone 12");
    assert_eq!(product["price"], "3499.90");
    assert_eq!(product["active"], true);

    // Referenced category cannot be deleted.
    let blocked = client
        .delete(format!("{base}/api/categories/{category_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 409);

    // Delete is a soft deactivate: gone from the active list, still
    // fetchable by id.
    let deleted = client
        .delete(format!("{base}/api/products/{product_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let listed: Value = client
        .get(format!("{base}/api/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.as_array().unwrap().is_empty());

    let product: Value = client
        .get(format!("{base}/api/products/{product_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(product["active"], false);
}

#[tokio::test]
async fn duplicate_category_conflicts() {
    let base = start_server(None).await;
    let client = client();

    // "Tablets" is part of the seed data.
    let resp = client
        .post(format!("{base}/api/categories"))
        .json(&json!({ "name": "Tablets" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn missing_product_is_404_with_json_body() {
    let base = start_server(None).await;
    let client = client();

    let resp = client
        .get(format!("{base}/api/products/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

fn brands_or_categories_id(list: &Value) -> String {
    list.as_array().unwrap()[0]["id"].as_str().unwrap().to_string()
}
