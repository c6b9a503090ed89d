//! REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use vitrine_core::gltf_import::{self, LoadError};
use vitrine_core::{CatalogError, ModelReport, NormalizeOptions, ProductDraft, ProductQuery};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Failures a handler reports to the client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(_) => Self::NotFound("Product not found".to_string()),
            CatalogError::Invalid(_) | CatalogError::InvalidImport { .. } => Self::BadRequest(e.to_string()),
            CatalogError::IoError(_) | CatalogError::JsonError(_) | CatalogError::InvalidDocument { .. } => {
                error!(error = %e, "Catalog persistence failed");
                Self::Internal(format!("Failed to save catalog: {}", e))
            }
        }
    }
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound(_) => Self::NotFound(format!("Model file not found: {}", e)),
            LoadError::Format(_) | LoadError::Empty => Self::Unprocessable(e.to_string()),
            LoadError::Io(_) => Self::Internal(e.to_string()),
        }
    }
}

/// List products matching the query string
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> impl IntoResponse {
    debug!(?query, "Listing products");
    Json(state.products(&query).await)
}

/// Get a specific product by ID
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .get_product(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

/// Create a product from a draft
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.create_product(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's editable fields
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.update_product(&id, draft).await?))
}

/// Remove a product from the catalog
pub async fn remove_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!(product = %id, "Remove product requested");
    let product = state.remove_product(&id).await?;
    Ok(Json(serde_json::json!({
        "status": "removed",
        "id": product.id
    })))
}

/// Product counts per category
pub async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.categories().await)
}

/// Import a product's model and report normalization, complexity and clips
pub async fn get_model_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ModelReport>, ApiError> {
    let product = state
        .get_product(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    let url = product
        .model_ref()
        .ok_or_else(|| ApiError::NotFound("Product has no 3D model".to_string()))?
        .to_string();
    let path = state
        .model_path(&url)
        .ok_or_else(|| ApiError::BadRequest(format!("Model path is outside the models directory: {}", url)))?;
    let options = NormalizeOptions::new(state.config.viewer.target_size, 1.0)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    debug!(product = %id, path = %path.display(), "Building model report");

    let meta = product.animations.clone();
    let report = tokio::task::spawn_blocking(move || {
        gltf_import::load_path(&path).map(|model| ModelReport::analyze(url, &model, &meta, &options))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Model import task failed: {}", e)))??;

    info!(
        product = %id,
        tier = report.complexity.tier.label(),
        animations = report.animations.len(),
        "Model report built"
    );
    Ok(Json(report))
}

/// Get current configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}
