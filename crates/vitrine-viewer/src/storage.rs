//! Settings persistence backends for the viewer

use vitrine_core::SettingsStore;

/// Store used by the running application
pub fn default_store() -> Box<dyn SettingsStore + Send + Sync> {
    #[cfg(target_arch = "wasm32")]
    {
        if browser::LocalStorage::available() {
            return Box::new(browser::LocalStorage);
        }
        tracing::warn!("Local storage unavailable, settings will not persist");
        Box::new(vitrine_core::MemoryStore::default())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(vitrine_core::JsonFileStore::new("vitrine-viewer.json"))
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use vitrine_core::settings::SETTINGS_STORAGE_KEY;
    use vitrine_core::{SettingsError, SettingsStore};

    /// Settings kept in the browser's `localStorage`
    pub struct LocalStorage;

    impl LocalStorage {
        fn storage() -> Result<web_sys::Storage, SettingsError> {
            web_sys::window()
                .ok_or_else(|| SettingsError::Unavailable("no window".to_string()))?
                .local_storage()
                .map_err(|e| SettingsError::Unavailable(format!("{:?}", e)))?
                .ok_or_else(|| SettingsError::Unavailable("localStorage disabled".to_string()))
        }

        pub fn available() -> bool {
            Self::storage().is_ok()
        }
    }

    impl SettingsStore for LocalStorage {
        fn load_raw(&self) -> Result<Option<String>, SettingsError> {
            Self::storage()?
                .get_item(SETTINGS_STORAGE_KEY)
                .map_err(|e| SettingsError::Unavailable(format!("{:?}", e)))
        }

        fn save_raw(&mut self, json: &str) -> Result<(), SettingsError> {
            Self::storage()?
                .set_item(SETTINGS_STORAGE_KEY, json)
                .map_err(|e| SettingsError::Unavailable(format!("{:?}", e)))
        }
    }
}
