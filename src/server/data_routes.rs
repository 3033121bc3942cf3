//! Data HTTP Routes
//!
//! Thin JSON CRUD over the document store. Mutations here are what
//! open streams observe.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::routes::ErrorResponse;
use crate::stream::{MemoryStore, StreamError};

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub success: bool,
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub success: bool,
    pub data: Vec<Value>,
    pub total: usize,
}

/// Create data routes
pub fn data_routes(store: Arc<MemoryStore>) -> Router {
    Router::new()
        .route(
            "/:collection",
            get(list_documents_handler).post(create_document_handler),
        )
        .route(
            "/:collection/:id",
            axum::routing::put(update_document_handler).delete(delete_document_handler),
        )
        .with_state(store)
}

fn error_response(err: StreamError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        StreamError::CollectionNotFound(_) | StreamError::DocumentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        StreamError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

/// List all documents in a collection
async fn list_documents_handler(
    State(store): State<Arc<MemoryStore>>,
    Path(collection): Path<String>,
) -> Json<DocumentListResponse> {
    let data = store.snapshot(&collection);
    let total = data.len();
    Json(DocumentListResponse {
        success: true,
        data,
        total,
    })
}

/// Insert a document
async fn create_document_handler(
    State(store): State<Arc<MemoryStore>>,
    Path(collection): Path<String>,
    Json(document): Json<Value>,
) -> impl IntoResponse {
    match store.insert(&collection, document) {
        Ok(data) => (
            StatusCode::CREATED,
            Json(DocumentResponse {
                success: true,
                data,
            }),
        )
            .into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// Replace a document by id
async fn update_document_handler(
    State(store): State<Arc<MemoryStore>>,
    Path((collection, id)): Path<(String, String)>,
    Json(document): Json<Value>,
) -> impl IntoResponse {
    match store.update(&collection, &id, document) {
        Ok(data) => Json(DocumentResponse {
            success: true,
            data,
        })
        .into_response(),
        Err(err) => error_response(err).into_response(),
    }
}

/// Delete a document by id
async fn delete_document_handler(
    State(store): State<Arc<MemoryStore>>,
    Path((collection, id)): Path<(String, String)>,
) -> impl IntoResponse {
    match store.delete(&collection, &id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err).into_response(),
    }
}
