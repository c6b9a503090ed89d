//! Application state management

use anyhow::Result;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use vitrine_core::{
    Catalog, CatalogError, CategoryCount, Product, ProductDraft, ProductId, ProductQuery,
};

use crate::config::Config;

/// Catalog change forwarded to WebSocket clients
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    Created(Product),
    Updated(Product),
    Removed(ProductId),
}

/// Shared application state
pub struct AppState {
    /// Product document store
    pub catalog: Arc<RwLock<Catalog>>,
    /// Configuration
    pub config: Config,
    /// Event broadcast for WebSocket clients
    pub events: broadcast::Sender<CatalogEvent>,
}

impl AppState {
    /// Create new application state, loading the catalog from disk
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let catalog = Catalog::load_or_create(&config.catalog.path)?;
        info!(
            path = %config.catalog.path,
            products = catalog.len(),
            "Catalog loaded"
        );
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: Config, catalog: Catalog) -> Arc<Self> {
        let (events, _) = broadcast::channel(100);
        Arc::new(Self {
            catalog: Arc::new(RwLock::new(catalog)),
            config,
            events,
        })
    }

    pub async fn products(&self, query: &ProductQuery) -> Vec<Product> {
        self.catalog.read().await.query(query)
    }

    pub async fn get_product(&self, id: &str) -> Option<Product> {
        self.catalog.read().await.get(&ProductId::from(id)).cloned()
    }

    pub async fn categories(&self) -> Vec<CategoryCount> {
        self.catalog.read().await.category_counts()
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = self.catalog.write().await.insert(draft)?;
        let _ = self.events.send(CatalogEvent::Created(product.clone()));
        Ok(product)
    }

    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = self.catalog.write().await.update(&ProductId::from(id), draft)?;
        let _ = self.events.send(CatalogEvent::Updated(product.clone()));
        Ok(product)
    }

    pub async fn remove_product(&self, id: &str) -> Result<Product, CatalogError> {
        let product = self.catalog.write().await.remove(&ProductId::from(id))?;
        let _ = self.events.send(CatalogEvent::Removed(product.id.clone()));
        Ok(product)
    }

    /// Subscribe to catalog events
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    /// Map a product's model reference onto the models directory
    pub fn model_path(&self, model_ref: &str) -> Option<PathBuf> {
        resolve_model_path(Path::new(&self.config.assets.models), model_ref)
    }
}

/// Resolve a catalog model reference to a file below `models_dir`.
///
/// Accepts bare relative paths and `/models/...` URLs as served by the
/// daemon. Remote URLs and anything that climbs out of the directory
/// resolve to `None`.
pub fn resolve_model_path(models_dir: &Path, model_ref: &str) -> Option<PathBuf> {
    if model_ref.contains("://") {
        return None;
    }
    let relative = model_ref
        .strip_prefix("/models/")
        .or_else(|| model_ref.strip_prefix("models/"))
        .unwrap_or(model_ref);

    let relative = Path::new(relative);
    if relative.as_os_str().is_empty()
        || !relative.components().all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(models_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_path() {
        let base = Path::new("/srv/models");
        assert_eq!(
            resolve_model_path(base, "chair.glb"),
            Some(PathBuf::from("/srv/models/chair.glb"))
        );
        assert_eq!(
            resolve_model_path(base, "/models/sub/chair.glb"),
            Some(PathBuf::from("/srv/models/sub/chair.glb"))
        );
        assert_eq!(resolve_model_path(base, "../secret.glb"), None);
        assert_eq!(resolve_model_path(base, "/etc/passwd"), None);
        assert_eq!(resolve_model_path(base, "https://cdn.example.com/a.glb"), None);
        assert_eq!(resolve_model_path(base, "/models/"), None);
    }

    #[tokio::test]
    async fn test_mutations_broadcast_events() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::with_catalog(
            Config::default(),
            Catalog::new(dir.path().join("products.json")),
        );
        let mut rx = state.subscribe();

        let draft: ProductDraft = serde_json::from_value(serde_json::json!({
            "name": "Lamp",
            "price": 20.0,
            "category": "home",
            "model3d": "lamp.glb"
        }))
        .unwrap();
        let product = state.create_product(draft).await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), CatalogEvent::Created(p) if p.id == product.id));

        state.remove_product(product.id.as_str()).await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), CatalogEvent::Removed(id) if id == product.id));
    }
}
