//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use vitrine_core::{Category, CategoryCount, Product, SettingsStore, ViewerSettings};

use crate::models::ModelsPlugin;
use crate::network::NetworkPlugin;
use crate::scene::ScenePlugin;
use crate::storage;
use crate::ui::UiPlugin;

/// Quiet period after the last keystroke before the search is sent
pub const SEARCH_DEBOUNCE_SECS: f64 = 0.3;

/// Delays a search until typing has paused
#[derive(Debug, Clone, Default)]
pub struct SearchDebounce {
    pending_since: Option<f64>,
}

impl SearchDebounce {
    /// Record an edit at time `now` (seconds)
    pub fn touch(&mut self, now: f64) {
        self.pending_since = Some(now);
    }

    /// True exactly once, when the quiet period has elapsed
    pub fn poll(&mut self, now: f64) -> bool {
        match self.pending_since {
            Some(since) if now - since >= SEARCH_DEBOUNCE_SECS => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }
}

/// Product list shown in the gallery panel
#[derive(Debug, Clone, Resource, Default)]
pub struct GalleryState {
    pub products: Vec<Product>,
    pub categories: Vec<CategoryCount>,
    pub search: String,
    pub category: Option<Category>,
    pub debounce: SearchDebounce,
    /// Refetch on the next frame, bypassing the debounce
    pub refresh_requested: bool,
    pub loading: bool,
    pub connected: bool,
}

impl GalleryState {
    /// Query string pairs for `/api/products`
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push(("search", search.to_string()));
        }
        if let Some(category) = self.category {
            pairs.push(("category", category.as_str().to_string()));
        }
        pairs
    }
}

/// Product open in the viewer
#[derive(Debug, Clone, Resource, Default)]
pub struct SelectedProduct(pub Option<Product>);

/// Viewer settings plus the store they are written back to
#[derive(Resource)]
pub struct ViewerPreferences {
    pub settings: ViewerSettings,
    store: Box<dyn SettingsStore + Send + Sync>,
}

impl ViewerPreferences {
    pub fn load(store: Box<dyn SettingsStore + Send + Sync>) -> Self {
        Self {
            settings: store.load(),
            store,
        }
    }

    /// Replace the settings and persist them
    pub fn apply(&mut self, settings: ViewerSettings) {
        self.settings = settings.sanitized();
        if let Err(e) = self.store.save(&self.settings) {
            tracing::warn!(error = %e, "Failed to save viewer settings");
        }
    }
}

/// Orbit camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 6.0,
            target_distance: 6.0,
            azimuth: 0.8,
            elevation: 0.35,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
            min_distance: 1.5,
            max_distance: 20.0,
        }
    }
}

/// UI layout settings for responsive design
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    pub show_gallery: bool,
    pub show_details: bool,
    pub screen_width: f32,
    pub screen_height: f32,
    pub is_mobile: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            show_gallery: true,
            show_details: true,
            screen_width: 1920.0,
            screen_height: 1080.0,
            is_mobile: false,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);
    }

    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.85).min(350.0)
        } else {
            280.0
        }
    }
}

/// Run the Bevy application
pub fn run() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Vitrine - Product Viewer".to_string(),
                    canvas: Some("#vitrine-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Load assets from root (daemon serves /models directly)
                file_path: "".to_string(),
                // Don't look for .meta files - server doesn't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking plugins must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ViewerPreferences::load(storage::default_store()))
        .init_resource::<GalleryState>()
        .init_resource::<SelectedProduct>()
        .init_resource::<CameraSettings>()
        .init_resource::<UiLayout>()
        .add_plugins(NetworkPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(ModelsPlugin)
        .add_plugins(UiPlugin)
        .run();
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{EnvironmentPreset, MemoryStore};

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let mut debounce = SearchDebounce::default();
        assert!(!debounce.poll(0.0));

        debounce.touch(1.0);
        assert!(!debounce.poll(1.1));
        debounce.touch(1.2);
        assert!(!debounce.poll(1.4));
        assert!(debounce.poll(1.6));
        assert!(!debounce.poll(2.0));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_query_pairs() {
        let mut gallery = GalleryState::default();
        assert!(gallery.query_pairs().is_empty());

        gallery.search = "  lamp ".to_string();
        gallery.category = Some(Category::Home);
        assert_eq!(
            gallery.query_pairs(),
            vec![("search", "lamp".to_string()), ("category", "home".to_string())]
        );
    }

    #[test]
    fn test_preferences_persist_through_store() {
        let mut prefs = ViewerPreferences::load(Box::new(MemoryStore::default()));
        let mut settings = prefs.settings.clone();
        settings.environment = EnvironmentPreset::Sunset;
        settings.scale_multiplier = 12.0;
        prefs.apply(settings);

        assert_eq!(prefs.settings.scale_multiplier, 5.0);
        assert_eq!(prefs.store.load().environment, EnvironmentPreset::Sunset);
    }
}
