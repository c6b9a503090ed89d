//! Network client for daemon communication

use bevy::prelude::*;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use vitrine_core::{CategoryCount, Product};

use crate::app::{GalleryState, SelectedProduct};

pub struct NetworkPlugin;

/// Resource storing the daemon connection configuration
#[derive(Resource, Clone, Default)]
pub struct DaemonConfig {
    /// HTTP(S) base URL for REST API (e.g., "http://192.168.1.100:8080")
    pub http_url: String,
    /// WebSocket URL (e.g., "ws://192.168.1.100:8080/ws")
    pub ws_url: String,
    /// Whether the daemon is the origin that served the page
    pub same_origin: bool,
}

impl DaemonConfig {
    /// Create config from URL query parameters or same-origin fallback
    #[cfg(target_arch = "wasm32")]
    pub fn from_browser() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let location = window.location();

        if let Some(daemon) = query_param(&location, "daemon") {
            tracing::info!("Using daemon from URL parameter: {}", daemon);
            return Self::from_daemon_address(&daemon);
        }

        // Fall back to same-origin
        let host = location.host().unwrap_or_else(|_| "localhost:8080".to_string());
        let is_https = location.protocol().unwrap_or_default() == "https:";

        Self {
            http_url: format!("{}://{}", if is_https { "https" } else { "http" }, host),
            ws_url: format!("{}://{}/ws", if is_https { "wss" } else { "ws" }, host),
            same_origin: true,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_browser() -> Self {
        Self::default()
    }

    /// Create config from a daemon address (host:port or full URL)
    pub fn from_daemon_address(addr: &str) -> Self {
        let addr = addr.trim_end_matches('/');
        let (http_url, ws_url) = if addr.starts_with("https://") || addr.starts_with("http://") {
            let ws = addr.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1);
            (addr.to_string(), format!("{}/ws", ws))
        } else {
            (format!("http://{}", addr), format!("ws://{}/ws", addr))
        };

        Self {
            http_url,
            ws_url,
            same_origin: false,
        }
    }

    /// Asset path the asset server should load for a catalog model reference
    pub fn model_asset_path(&self, model_ref: &str) -> String {
        if model_ref.starts_with("http://") || model_ref.starts_with("https://") {
            return model_ref.to_string();
        }

        let path = model_ref.trim_start_matches('/');
        let path = if path.starts_with("models/") {
            path.to_string()
        } else {
            format!("models/{}", path)
        };

        if self.same_origin || self.http_url.is_empty() {
            path
        } else {
            format!("{}/{}", self.http_url, path)
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn query_param(location: &web_sys::Location, name: &str) -> Option<String> {
    let search = location.search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    params.get(name).filter(|v| !v.is_empty())
}

/// Product id requested through `?product=` when the page loaded
#[derive(Resource, Default)]
pub struct InitialProduct(pub Option<String>);

impl InitialProduct {
    #[cfg(target_arch = "wasm32")]
    fn from_browser() -> Self {
        Self(web_sys::window().and_then(|w| query_param(&w.location(), "product")))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn from_browser() -> Self {
        Self(None)
    }
}

/// Product list from the most recent gallery fetch.
///
/// Each request takes a generation from [`PendingProducts::begin`]; a
/// response is kept only if no newer request was issued after it.
#[derive(Resource, Default, Clone)]
pub struct PendingProducts(Arc<Mutex<ProductSlot>>);

#[derive(Default)]
struct ProductSlot {
    issued: u64,
    result: Option<Vec<Product>>,
}

impl PendingProducts {
    /// Register a new request, discarding any undelivered older result
    pub fn begin(&self) -> u64 {
        match self.0.lock() {
            Ok(mut slot) => {
                slot.issued += 1;
                slot.result = None;
                slot.issued
            }
            Err(_) => 0,
        }
    }

    /// Store a response; returns false if a newer request superseded it
    pub fn deliver(&self, generation: u64, products: Vec<Product>) -> bool {
        let Ok(mut slot) = self.0.lock() else {
            return false;
        };
        if slot.issued != generation {
            tracing::debug!(generation, latest = slot.issued, "Dropping stale product list");
            return false;
        }
        slot.result = Some(products);
        true
    }

    pub fn take(&self) -> Option<Vec<Product>> {
        self.0.lock().ok().and_then(|mut slot| slot.result.take())
    }
}

/// Pending category counts from async fetch
#[derive(Resource, Default)]
pub struct PendingCategories(pub Arc<Mutex<Option<Vec<CategoryCount>>>>);

/// Pending product to open in the viewer
#[derive(Resource, Default)]
pub struct PendingSelection(pub Arc<Mutex<Option<Product>>>);

/// Shared message queue between WebSocket callback and Bevy
#[derive(Resource, Default, Clone)]
pub struct PendingMessages(pub Arc<Mutex<Vec<WsMessage>>>);

/// WebSocket connection state
#[derive(Resource, Default)]
pub struct WebSocketConnection {
    pub connected: bool,
}

/// Messages from the server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "product_created")]
    ProductCreated(Product),
    #[serde(rename = "product_updated")]
    ProductUpdated(Product),
    #[serde(rename = "product_removed")]
    ProductRemoved { id: String },
    #[serde(rename = "pong")]
    Pong,
}

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        // Initialize daemon config from browser URL
        let daemon_config = DaemonConfig::from_browser();

        app.insert_resource(daemon_config)
            .insert_resource(InitialProduct::from_browser())
            .init_resource::<WebSocketConnection>()
            .init_resource::<PendingMessages>()
            .init_resource::<PendingProducts>()
            .init_resource::<PendingCategories>()
            .init_resource::<PendingSelection>()
            .add_systems(Startup, (connect_websocket, fetch_initial_data))
            .add_systems(Update, (process_messages, refresh_gallery, process_gallery_data).chain());
    }
}

fn connect_websocket(
    mut connection: ResMut<WebSocketConnection>,
    pending: Res<PendingMessages>,
    daemon_config: Res<DaemonConfig>,
) {
    // In WASM, we use web_sys WebSocket
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::prelude::*;
        use web_sys::{MessageEvent, WebSocket};

        let ws_url = daemon_config.ws_url.clone();
        tracing::info!("Connecting to WebSocket: {}", ws_url);

        match WebSocket::new(&ws_url) {
            Ok(ws) => {
                ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

                let onopen = Closure::wrap(Box::new(move |_| {
                    tracing::info!("WebSocket connected");
                }) as Box<dyn FnMut(JsValue)>);
                ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
                onopen.forget();

                let pending_clone = pending.0.clone();
                let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
                    if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
                        let text: String = text.into();
                        tracing::debug!("WS message: {}", text);
                        if let Ok(msg) = serde_json::from_str::<WsMessage>(&text) {
                            if let Ok(mut queue) = pending_clone.lock() {
                                queue.push(msg);
                            }
                        }
                    }
                }) as Box<dyn FnMut(MessageEvent)>);
                ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
                onmessage.forget();

                connection.connected = true;
            }
            Err(e) => {
                tracing::error!("Failed to create WebSocket: {:?}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (&mut connection, &pending, &daemon_config);
        tracing::info!("WebSocket not available in native mode");
    }
}

/// Fetch the gallery, category counts and any preselected product on startup
fn fetch_initial_data(
    daemon_config: Res<DaemonConfig>,
    initial: Res<InitialProduct>,
    mut gallery: ResMut<GalleryState>,
    products: Res<PendingProducts>,
    categories: Res<PendingCategories>,
    selection: Res<PendingSelection>,
) {
    gallery.loading = true;
    fetch_products(&daemon_config, gallery.query_pairs(), &products);
    fetch_categories(&daemon_config, &categories);
    if let Some(id) = &initial.0 {
        fetch_product(&daemon_config, id, &selection);
    }
}

/// Refetch the gallery after a debounced search edit or an explicit request
fn refresh_gallery(
    time: Res<Time>,
    daemon_config: Res<DaemonConfig>,
    mut gallery: ResMut<GalleryState>,
    products: Res<PendingProducts>,
    categories: Res<PendingCategories>,
) {
    let now = time.elapsed_secs_f64();
    let search_due = gallery.debounce.poll(now);
    if !search_due && !gallery.refresh_requested {
        return;
    }

    if gallery.refresh_requested {
        fetch_categories(&daemon_config, &categories);
    }
    gallery.refresh_requested = false;
    gallery.loading = true;
    fetch_products(&daemon_config, gallery.query_pairs(), &products);
}

/// Apply async fetch results to the gallery and selection
fn process_gallery_data(
    connection: Res<WebSocketConnection>,
    products: Res<PendingProducts>,
    categories: Res<PendingCategories>,
    selection: Res<PendingSelection>,
    mut gallery: ResMut<GalleryState>,
    mut selected: ResMut<SelectedProduct>,
) {
    if let Some(list) = products.take() {
        gallery.products = list;
        gallery.loading = false;
    }
    if let Some(counts) = categories.0.lock().ok().and_then(|mut data| data.take()) {
        gallery.categories = counts;
    }
    if let Some(product) = selection.0.lock().ok().and_then(|mut data| data.take()) {
        tracing::info!("Opening product {}", product.id);
        selected.0 = Some(product);
    }

    if gallery.connected != connection.connected {
        gallery.connected = connection.connected;
    }
}

fn process_messages(
    pending: Res<PendingMessages>,
    mut gallery: ResMut<GalleryState>,
    mut selected: ResMut<SelectedProduct>,
) {
    // Process queued messages from the shared queue
    let messages = {
        if let Ok(mut queue) = pending.0.lock() {
            std::mem::take(&mut *queue)
        } else {
            Vec::new()
        }
    };

    for msg in messages {
        match msg {
            WsMessage::ProductCreated(product) => {
                tracing::info!("Product created: {}", product.id);
                gallery.refresh_requested = true;
            }
            WsMessage::ProductUpdated(product) => {
                gallery.refresh_requested = true;
                if selected.0.as_ref().is_some_and(|p| p.id == product.id) {
                    selected.0 = Some(product);
                }
            }
            WsMessage::ProductRemoved { id } => {
                gallery.refresh_requested = true;
                if selected.0.as_ref().is_some_and(|p| p.id.as_str() == id) {
                    selected.0 = None;
                }
            }
            WsMessage::Pong => {}
        }
    }
}

/// Request `/api/products` with the given filters
pub fn fetch_products(
    daemon_config: &DaemonConfig,
    pairs: Vec<(&'static str, String)>,
    pending: &PendingProducts,
) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let generation = pending.begin();
        let pending = pending.clone();
        let url = match web_sys::UrlSearchParams::new() {
            Ok(params) => {
                for (key, value) in &pairs {
                    params.append(key, value);
                }
                let query: String = params.to_string().into();
                if query.is_empty() {
                    format!("{}/api/products", daemon_config.http_url)
                } else {
                    format!("{}/api/products?{}", daemon_config.http_url, query)
                }
            }
            Err(_) => format!("{}/api/products", daemon_config.http_url),
        };

        spawn_local(async move {
            tracing::info!("Fetching products from: {}", url);

            match gloo_net::http::Request::get(&url).send().await {
                Ok(response) => {
                    if let Ok(text) = response.text().await {
                        match serde_json::from_str::<Vec<Product>>(&text) {
                            Ok(products) => {
                                pending.deliver(generation, products);
                            }
                            Err(e) => tracing::error!("Invalid product list: {}", e),
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to fetch products: {:?}", e);
                }
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (daemon_config, pairs, pending);
    }
}

/// Request `/api/categories`
pub fn fetch_categories(daemon_config: &DaemonConfig, pending: &PendingCategories) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = format!("{}/api/categories", daemon_config.http_url);

        spawn_local(async move {
            match gloo_net::http::Request::get(&url).send().await {
                Ok(response) => {
                    if let Ok(text) = response.text().await {
                        if let Ok(counts) = serde_json::from_str::<Vec<CategoryCount>>(&text) {
                            if let Ok(mut data) = pending_clone.lock() {
                                *data = Some(counts);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to fetch categories: {:?}", e);
                }
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (daemon_config, pending);
    }
}

/// Request a single product to open in the viewer
pub fn fetch_product(daemon_config: &DaemonConfig, id: &str, pending: &PendingSelection) {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen_futures::spawn_local;

        let pending_clone = pending.0.clone();
        let url = format!(
            "{}/api/products/{}",
            daemon_config.http_url,
            String::from(js_sys::encode_uri_component(id))
        );

        spawn_local(async move {
            match gloo_net::http::Request::get(&url).send().await {
                Ok(response) if response.ok() => {
                    if let Ok(text) = response.text().await {
                        if let Ok(product) = serde_json::from_str::<Product>(&text) {
                            if let Ok(mut data) = pending_clone.lock() {
                                *data = Some(product);
                            }
                        }
                    }
                }
                Ok(response) => {
                    tracing::warn!("Product {} unavailable: HTTP {}", url, response.status());
                }
                Err(e) => {
                    tracing::error!("Failed to fetch product: {:?}", e);
                }
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = (daemon_config, id, pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_product_list_is_dropped() {
        let pending = PendingProducts::default();
        let older = pending.begin();
        let newer = pending.begin();

        assert!(pending.deliver(newer, Vec::new()));
        assert!(!pending.deliver(older, Vec::new()));
        assert!(pending.take().is_some());
        assert!(pending.take().is_none());

        // A response arriving after a newer request started is ignored too
        let first = pending.begin();
        pending.begin();
        assert!(!pending.deliver(first, Vec::new()));
        assert!(pending.take().is_none());
    }

    #[test]
    fn test_daemon_address_forms() {
        let plain = DaemonConfig::from_daemon_address("192.168.1.10:8080");
        assert_eq!(plain.http_url, "http://192.168.1.10:8080");
        assert_eq!(plain.ws_url, "ws://192.168.1.10:8080/ws");

        let tls = DaemonConfig::from_daemon_address("https://shop.example.com/");
        assert_eq!(tls.http_url, "https://shop.example.com");
        assert_eq!(tls.ws_url, "wss://shop.example.com/ws");
    }

    #[test]
    fn test_model_asset_path() {
        let same = DaemonConfig {
            same_origin: true,
            ..DaemonConfig::from_daemon_address("localhost:8080")
        };
        assert_eq!(same.model_asset_path("chair.glb"), "models/chair.glb");
        assert_eq!(same.model_asset_path("/models/chair.glb"), "models/chair.glb");

        let remote = DaemonConfig::from_daemon_address("10.0.0.2:8080");
        assert_eq!(
            remote.model_asset_path("chair.glb"),
            "http://10.0.0.2:8080/models/chair.glb"
        );
        assert_eq!(
            remote.model_asset_path("https://cdn.example.com/a.glb"),
            "https://cdn.example.com/a.glb"
        );
    }

    #[test]
    fn test_ws_message_parsing() {
        let msg: WsMessage =
            serde_json::from_str(r#"{"type": "product_removed", "data": {"id": "abc"}}"#).unwrap();
        assert!(matches!(msg, WsMessage::ProductRemoved { id } if id == "abc"));

        let pong: WsMessage = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert!(matches!(pong, WsMessage::Pong));
    }
}
