//! Viewer settings and their persistence
//!
//! Settings are an explicit value handed to the viewer when it mounts and
//! written back through a [`SettingsStore`] after every change. Stores only
//! move JSON text around; parsing, defaults and clamping live here so every
//! backend behaves the same.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Key used by browser local storage
pub const SETTINGS_STORAGE_KEY: &str = "vitrine.viewerSettings";

pub const MIN_SCALE_MULTIPLIER: f32 = 0.1;
pub const MAX_SCALE_MULTIPLIER: f32 = 5.0;
pub const MAX_ROTATE_SPEED: f32 = 10.0;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Lighting environment preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Studio,
    Sunset,
    Dawn,
    Night,
    Warehouse,
    Forest,
    Apartment,
    City,
    Park,
    Lobby,
}

impl EnvironmentPreset {
    pub const ALL: [EnvironmentPreset; 10] = [
        EnvironmentPreset::Studio,
        EnvironmentPreset::Sunset,
        EnvironmentPreset::Dawn,
        EnvironmentPreset::Night,
        EnvironmentPreset::Warehouse,
        EnvironmentPreset::Forest,
        EnvironmentPreset::Apartment,
        EnvironmentPreset::City,
        EnvironmentPreset::Park,
        EnvironmentPreset::Lobby,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Studio => "Studio",
            Self::Sunset => "Sunset",
            Self::Dawn => "Dawn",
            Self::Night => "Night",
            Self::Warehouse => "Warehouse",
            Self::Forest => "Forest",
            Self::Apartment => "Apartment",
            Self::City => "City",
            Self::Park => "Park",
            Self::Lobby => "Lobby",
        }
    }
}

/// Render quality tier chosen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderQuality {
    Low,
    Medium,
    High,
}

impl RenderQuality {
    pub const ALL: [RenderQuality; 3] = [RenderQuality::Low, RenderQuality::Medium, RenderQuality::High];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// User-adjustable viewer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerSettings {
    /// Draw mesh edges instead of shaded surfaces (default: false)
    pub wireframe: bool,
    /// Spin the model about the vertical axis (default: true)
    pub auto_rotate: bool,
    /// Radians per second (default: 0.5)
    pub auto_rotate_speed: f32,
    /// Multiplier on top of the fit-to-view scale (default: 1.0)
    pub scale_multiplier: f32,
    /// Lighting environment (default: studio)
    pub environment: EnvironmentPreset,
    /// Render quality (default: high)
    pub quality: RenderQuality,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            wireframe: false,
            auto_rotate: true,
            auto_rotate_speed: 0.5,
            scale_multiplier: 1.0,
            environment: EnvironmentPreset::Studio,
            quality: RenderQuality::High,
        }
    }
}

impl ViewerSettings {
    /// Parse stored JSON; unknown keys are ignored and missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: ViewerSettings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Clamp numeric fields into their supported ranges
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.scale_multiplier = if self.scale_multiplier.is_finite() {
            self.scale_multiplier.clamp(MIN_SCALE_MULTIPLIER, MAX_SCALE_MULTIPLIER)
        } else {
            defaults.scale_multiplier
        };
        self.auto_rotate_speed = if self.auto_rotate_speed.is_finite() {
            self.auto_rotate_speed.clamp(0.0, MAX_ROTATE_SPEED)
        } else {
            defaults.auto_rotate_speed
        };
        self
    }
}

/// Backend that keeps the serialized settings between sessions
pub trait SettingsStore {
    /// Stored JSON, `None` when nothing has been saved yet
    fn load_raw(&self) -> Result<Option<String>, SettingsError>;

    fn save_raw(&mut self, json: &str) -> Result<(), SettingsError>;

    /// Load settings, falling back to defaults on any failure
    fn load(&self) -> ViewerSettings {
        match self.load_raw() {
            Ok(Some(json)) => ViewerSettings::from_json(&json).unwrap_or_else(|e| {
                warn!(error = %e, "Stored viewer settings are invalid, using defaults");
                ViewerSettings::default()
            }),
            Ok(None) => ViewerSettings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read viewer settings, using defaults");
                ViewerSettings::default()
            }
        }
    }

    fn save(&mut self, settings: &ViewerSettings) -> Result<(), SettingsError> {
        let json = settings.to_json()?;
        self.save_raw(&json)
    }
}

/// Settings kept in a JSON file (native builds)
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load_raw(&self) -> Result<Option<String>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn save_raw(&mut self, json: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Settings kept in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Option<String>,
}

impl SettingsStore for MemoryStore {
    fn load_raw(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.value.clone())
    }

    fn save_raw(&mut self, json: &str) -> Result<(), SettingsError> {
        self.value = Some(json.to_string());
        Ok(())
    }
}
