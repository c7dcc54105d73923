//! REST endpoints for chat and catalog management.
//!
//! The chat endpoint never returns a 5xx for a processing failure: any
//! catalog or engine problem degrades to `{ success: false }` with a
//! generic failure text.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, ProductDraft};
use crate::engine::ResponseEngine;
use crate::engine::responder::HANDOFF;
use crate::error::CatalogError;

/// Generic failure text for the chat endpoint.
const PROCESSING_FAILURE: &str = "Ops! Tive um problema técnico. Pode tentar novamente?";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub engine: Arc<ResponseEngine>,
}

/// Build the Axum router with chat and catalog routes.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/messages", post(post_message))
        .route("/api/history", get(list_history))
        .route("/api/history/{user_id}", delete(clear_history))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/{id}", delete(delete_category))
        .route("/api/brands", get(list_brands).post(create_brand))
        .route("/api/brands/{id}", delete(delete_brand))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

// ── Status ──────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "shop-assist",
        "status": "ok"
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Chat ────────────────────────────────────────────────────────────────

fn default_origin() -> String {
    "web".to_string()
}

fn default_user_id() -> String {
    "user".to_string()
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub reply: String,
    pub handoff: bool,
}

async fn post_message(
    State(state): State<AppState>,
    Json(message): Json<IncomingMessage>,
) -> Json<MessageResponse> {
    let products = match state.catalog.list_active_products() {
        Ok(products) => products,
        Err(e) => {
            error!(error = %e, "Failed to load catalog for chat");
            return Json(MessageResponse {
                success: false,
                reply: PROCESSING_FAILURE.to_string(),
                handoff: false,
            });
        }
    };

    let reply = state
        .engine
        .handle(&message.text, &message.user_id, &products)
        .await;

    // The customer sees the hand-off text; the model's answer is kept in
    // the server log for the human taking over.
    let visible = if reply.escalate {
        warn!(
            user_id = %message.user_id,
            text = %message.text,
            model_reply = %reply.text,
            "Order request detected, handing off to a human"
        );
        HANDOFF.to_string()
    } else {
        reply.text
    };

    if let Err(e) = state.catalog.record_exchange(
        &message.text,
        &message.origin,
        &message.user_id,
        &visible,
        reply.escalate,
    ) {
        // The reply is already generated; losing one log row is not worth
        // failing the exchange.
        warn!(error = %e, "Failed to record exchange");
    }

    Json(MessageResponse {
        success: true,
        reply: visible,
        handoff: reply.escalate,
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.catalog.recent_exchanges(params.limit)?;
    Ok(Json(rows))
}

async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    state.engine.history().clear(&user_id);
    info!(user_id = %user_id, "Conversation history cleared");
    Json(serde_json::json!({ "cleared": user_id }))
}

// ── Categories ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NamedEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.list_categories()?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(entry): Json<NamedEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .catalog
        .create_category(&entry.name, entry.description.as_deref())?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.catalog.delete_category(&id)? {
        Ok(Json(serde_json::json!({ "deleted": id })))
    } else {
        Err(ApiError::not_found("category", &id))
    }
}

// ── Brands ──────────────────────────────────────────────────────────────

async fn list_brands(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.list_brands()?))
}

async fn create_brand(
    State(state): State<AppState>,
    Json(entry): Json<NamedEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state
        .catalog
        .create_brand(&entry.name, entry.description.as_deref())?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn delete_brand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.catalog.delete_brand(&id)? {
        Ok(Json(serde_json::json!({ "deleted": id })))
    } else {
        Err(ApiError::not_found("brand", &id))
    }
}

// ── Products ────────────────────────────────────────────────────────────

async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.list_active_products()?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.catalog.get_product(&id)? {
        Some(product) => Ok(Json(product)),
        None => Err(ApiError::not_found("product", &id)),
    }
}

async fn create_product(
    State(state): State<AppState>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.catalog.create_product(&draft)?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    if state.catalog.update_product(&id, &draft)? {
        Ok(Json(serde_json::json!({ "updated": id })))
    } else {
        Err(ApiError::not_found("product", &id))
    }
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.catalog.deactivate_product(&id)? {
        Ok(Json(serde_json::json!({ "deactivated": id })))
    } else {
        Err(ApiError::not_found("product", &id))
    }
}

// ── Error mapping ───────────────────────────────────────────────────────

/// Catalog errors mapped onto HTTP statuses for the management routes.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(entity: &str, id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{entity} {id} not found"),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        let status = match &e {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Constraint(_) => StatusCode::CONFLICT,
            CatalogError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_message_defaults() {
        let msg: IncomingMessage = serde_json::from_str(r#"{"text":"oi"}"#).unwrap();
        assert_eq!(msg.origin, "web");
        assert_eq!(msg.user_id, "user");

        let msg: IncomingMessage =
            serde_json::from_str(r#"{"text":"oi","origin":"whatsapp","user_id":"u9"}"#).unwrap();
        assert_eq!(msg.origin, "whatsapp");
        assert_eq!(msg.user_id, "u9");
    }

    #[test]
    fn constraint_maps_to_conflict() {
        let err: ApiError = CatalogError::Constraint("dup".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = CatalogError::Query("boom".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
