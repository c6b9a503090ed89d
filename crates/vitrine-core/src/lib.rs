//! Vitrine Core - Catalog types, model normalization and animation selection
//!
//! This crate provides the foundational types for the Vitrine system:
//! - Product records and the JSON document store behind the catalog API
//! - A renderer-independent scene graph with bounding box computation
//! - Model normalization (fit-to-view), default animation selection and
//!   rendering complexity analysis
//! - Viewer settings with pluggable persistence
//! - Load sessions that discard superseded asset loads
//! - glTF import into the scene graph

pub mod animation;
pub mod bounds;
pub mod catalog;
pub mod complexity;
pub mod gltf_import;
pub mod normalize;
pub mod product;
pub mod scene;
pub mod session;
pub mod settings;

pub use animation::{cycle_animation, select_default_animation, AnimationState, CycleDirection};
pub use bounds::BoundingBox;
pub use catalog::{Catalog, CatalogError, CategoryCount, ProductQuery, SortOrder};
pub use complexity::{analyze_complexity, ComplexityReport, ComplexityTier, MeshStats};
pub use gltf_import::LoadError;
pub use normalize::{normalize, normalize_bounds, NormalizationResult, NormalizeError, NormalizeOptions};
pub use product::{AnimationMeta, Category, Product, ProductDraft, ProductError, ProductId, Specifications};
pub use scene::{AnimationClipInfo, LoadedModel, MeshGeometry, SceneGraph, SceneNode};
pub use session::{LoadTicket, ModelReport, ModelSession, SessionState};
pub use settings::{EnvironmentPreset, JsonFileStore, MemoryStore, RenderQuality, SettingsError, SettingsStore, ViewerSettings};

pub use glam;
