//! Per-viewer model load session
//!
//! A viewer displays one model at a time. Every load request gets a fresh
//! [`LoadTicket`]; completions carrying any other ticket are stale and are
//! dropped without touching the state. Analysis (normalization, complexity,
//! default animation) runs once per successful completion.

use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, info, warn};

use crate::animation::{AnimationState, CycleDirection};
use crate::bounds::BoundingBox;
use crate::complexity::{analyze_complexity, ComplexityReport};
use crate::gltf_import::LoadError;
use crate::normalize::{normalize_bounds, NormalizationResult, NormalizeError, NormalizeOptions};
use crate::product::{AnimationMeta, Product};
use crate::scene::{AnimationClipInfo, LoadedModel};

/// Identifies one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LoadTicket(u64);

/// Everything derived from a successfully loaded model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReport {
    pub url: String,
    pub bounds: BoundingBox,
    pub normalization: NormalizationResult,
    pub complexity: ComplexityReport,
    pub animations: Vec<AnimationClipInfo>,
    /// Clip chosen by the default selection policy
    pub default_animation: Option<String>,
    /// Declared by the catalog but absent from the asset
    pub missing_animations: Vec<String>,
    #[serde(skip)]
    pub animation: AnimationState,
}

impl ModelReport {
    pub fn analyze(
        url: impl Into<String>,
        model: &LoadedModel,
        meta: &AnimationMeta,
        options: &NormalizeOptions,
    ) -> Self {
        let bounds = BoundingBox::from_scene(&model.scene);
        let animation = AnimationState::from_clips(model.clip_names(), meta);
        Self {
            url: url.into(),
            bounds,
            normalization: normalize_bounds(&bounds, options),
            complexity: analyze_complexity(&model.scene),
            animations: model.animations.clone(),
            default_animation: animation.selected().map(str::to_string),
            missing_animations: model.missing_declared(meta),
            animation,
        }
    }
}

/// Where the viewer is in the load lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing requested yet
    Idle,
    /// The product has no usable asset reference
    NoModel,
    Loading { url: String, ticket: LoadTicket },
    Ready(ModelReport),
    Failed { url: String, error: String },
}

/// Load lifecycle and derived model state for one viewer
#[derive(Debug, Clone)]
pub struct ModelSession {
    next_ticket: u64,
    state: SessionState,
    meta: AnimationMeta,
    options: NormalizeOptions,
}

impl Default for ModelSession {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

impl ModelSession {
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            next_ticket: 0,
            state: SessionState::Idle,
            meta: AnimationMeta::default(),
            options,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn report(&self) -> Option<&ModelReport> {
        match &self.state {
            SessionState::Ready(report) => Some(report),
            _ => None,
        }
    }

    /// Ticket of the in-flight load, if any
    pub fn pending(&self) -> Option<LoadTicket> {
        match &self.state {
            SessionState::Loading { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending() == Some(ticket)
    }

    /// Start displaying a product. Returns the ticket and URL to load, or
    /// `None` when the product carries no asset reference.
    pub fn begin(&mut self, product: &Product) -> Option<(LoadTicket, String)> {
        self.meta = product.animations.clone();
        match product.model_ref() {
            Some(url) => {
                let url = url.to_string();
                let ticket = self.issue(url.clone());
                Some((ticket, url))
            }
            None => {
                info!(product = %product.id, "Product has no 3D model");
                self.state = SessionState::NoModel;
                None
            }
        }
    }

    /// Reissue the current or failed load. Never called automatically.
    pub fn retry(&mut self) -> Option<(LoadTicket, String)> {
        let url = match &self.state {
            SessionState::Failed { url, .. } | SessionState::Loading { url, .. } => url.clone(),
            SessionState::Ready(report) => report.url.clone(),
            SessionState::Idle | SessionState::NoModel => return None,
        };
        let ticket = self.issue(url.clone());
        Some((ticket, url))
    }

    fn issue(&mut self, url: String) -> LoadTicket {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);
        debug!(url = %url, ticket = ticket.0, "Model load started");
        self.state = SessionState::Loading { url, ticket };
        ticket
    }

    /// Apply a loader result. Returns false if the ticket is stale.
    pub fn complete(&mut self, ticket: LoadTicket, result: Result<LoadedModel, LoadError>) -> bool {
        match result {
            Ok(model) => self.succeed(ticket, &model),
            Err(e) => self.fail(ticket, e),
        }
    }

    /// Record a successful load and derive the model report
    pub fn succeed(&mut self, ticket: LoadTicket, model: &LoadedModel) -> bool {
        let Some(url) = self.current_url(ticket) else {
            return false;
        };
        if model.is_empty() {
            return self.fail(ticket, LoadError::Empty);
        }

        let report = ModelReport::analyze(url, model, &self.meta, &self.options);
        if !report.missing_animations.is_empty() {
            warn!(
                url = %report.url,
                missing = ?report.missing_animations,
                "Model lacks declared animations"
            );
        }
        info!(
            url = %report.url,
            scale = report.normalization.scale,
            triangles = report.complexity.triangle_count,
            tier = report.complexity.tier.label(),
            "Model ready"
        );
        self.state = SessionState::Ready(report);
        true
    }

    /// Record a failed load
    pub fn fail(&mut self, ticket: LoadTicket, error: impl Display) -> bool {
        let Some(url) = self.current_url(ticket) else {
            return false;
        };
        let error = error.to_string();
        warn!(url = %url, error = %error, "Model load failed");
        self.state = SessionState::Failed { url, error };
        true
    }

    fn current_url(&self, ticket: LoadTicket) -> Option<String> {
        match &self.state {
            SessionState::Loading { url, ticket: current } if *current == ticket => Some(url.clone()),
            _ => {
                debug!(ticket = ticket.0, "Discarding stale load result");
                None
            }
        }
    }

    /// Change the scale multiplier, recomputing from the retained bounds
    pub fn rescale(&mut self, scale_multiplier: f32) -> Result<(), NormalizeError> {
        self.options = self.options.with_multiplier(scale_multiplier)?;
        if let SessionState::Ready(report) = &mut self.state {
            report.normalization = normalize_bounds(&report.bounds, &self.options);
        }
        Ok(())
    }

    fn animation_mut(&mut self) -> Option<&mut AnimationState> {
        match &mut self.state {
            SessionState::Ready(report) => Some(&mut report.animation),
            _ => None,
        }
    }

    pub fn animation(&self) -> Option<&AnimationState> {
        self.report().map(|r| &r.animation)
    }

    /// Play a clip by name; unknown names clear the selection
    pub fn play(&mut self, name: &str) -> bool {
        self.animation_mut().is_some_and(|a| a.play(name))
    }

    pub fn cycle(&mut self, direction: CycleDirection) {
        if let Some(a) = self.animation_mut() {
            a.cycle(direction);
        }
    }

    pub fn stop(&mut self) {
        if let Some(a) = self.animation_mut() {
            a.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Category, ProductId, Specifications};
    use crate::scene::{MeshGeometry, SceneGraph, SceneNode};
    use chrono::Utc;
    use glam::Vec3;

    fn product(model3d: &str) -> Product {
        Product {
            id: ProductId::from("p1"),
            name: "Robot".into(),
            description: String::new(),
            price: 10.0,
            category: Category::Toys,
            images: Vec::new(),
            model3d: model3d.into(),
            animations: AnimationMeta {
                available: vec!["wave".into(), "idle".into()],
                default_animation: Some("idle".into()),
                auto_play: true,
            },
            specifications: Specifications::default(),
            in_stock: true,
            created_at: Utc::now(),
        }
    }

    fn model(size: f32, clips: &[&str]) -> LoadedModel {
        let mut scene = SceneGraph::new();
        scene.add_root(SceneNode::mesh(
            "body",
            MeshGeometry::new(vec![Vec3::ZERO, Vec3::splat(size), Vec3::X], None),
        ));
        let animations = clips
            .iter()
            .map(|n| AnimationClipInfo { name: n.to_string(), duration: 1.0 })
            .collect();
        LoadedModel::new(scene, animations)
    }

    #[test]
    fn test_successful_load_derives_report() {
        let mut session = ModelSession::default();
        let (ticket, url) = session.begin(&product("robot.glb")).unwrap();
        assert_eq!(url, "robot.glb");

        assert!(session.complete(ticket, Ok(model(2.0, &["wave", "idle"]))));
        let report = session.report().unwrap();
        assert_eq!(report.normalization.scale, 1.5);
        assert_eq!(report.default_animation.as_deref(), Some("idle"));
        assert_eq!(report.complexity.triangle_count, 1);
        assert!(report.missing_animations.is_empty());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut session = ModelSession::default();
        let (first, _) = session.begin(&product("old.glb")).unwrap();
        let (second, _) = session.begin(&product("new.glb")).unwrap();

        assert!(!session.complete(first, Ok(model(1.0, &[]))));
        assert!(matches!(session.state(), SessionState::Loading { url, .. } if url == "new.glb"));

        assert!(session.complete(second, Ok(model(1.0, &[]))));
        assert_eq!(session.report().unwrap().url, "new.glb");

        // Late failure for the superseded request changes nothing
        assert!(!session.fail(first, "timeout"));
        assert!(session.report().is_some());
    }

    #[test]
    fn test_missing_model_reference() {
        let mut session = ModelSession::default();
        let (ticket, _) = session.begin(&product("a.glb")).unwrap();
        assert!(session.begin(&product("  ")).is_none());
        assert_eq!(session.state(), &SessionState::NoModel);
        assert!(!session.complete(ticket, Ok(model(1.0, &[]))));
    }

    #[test]
    fn test_failure_and_manual_retry() {
        let mut session = ModelSession::default();
        let (ticket, _) = session.begin(&product("robot.glb")).unwrap();
        assert!(session.complete(ticket, Err(LoadError::NotFound("robot.glb".into()))));
        assert!(matches!(session.state(), SessionState::Failed { url, .. } if url == "robot.glb"));

        let (retry, url) = session.retry().unwrap();
        assert_ne!(retry, ticket);
        assert_eq!(url, "robot.glb");
        assert!(session.is_current(retry));
    }

    #[test]
    fn test_empty_model_fails() {
        let mut session = ModelSession::default();
        let (ticket, _) = session.begin(&product("robot.glb")).unwrap();
        assert!(session.succeed(ticket, &LoadedModel::default()));
        assert!(matches!(session.state(), SessionState::Failed { .. }));
    }

    #[test]
    fn test_rescale_uses_retained_bounds() {
        let mut session = ModelSession::default();
        let (ticket, _) = session.begin(&product("robot.glb")).unwrap();
        session.complete(ticket, Ok(model(2.0, &[])));

        session.rescale(2.0).unwrap();
        assert_eq!(session.report().unwrap().normalization.scale, 3.0);
        assert!(session.rescale(0.0).is_err());
        assert_eq!(session.options().scale_multiplier(), 2.0);
    }

    #[test]
    fn test_animation_controls() {
        let mut session = ModelSession::default();
        let (ticket, _) = session.begin(&product("robot.glb")).unwrap();
        session.complete(ticket, Ok(model(1.0, &["wave", "idle", "jump"])));
        assert_eq!(session.animation().unwrap().active(), Some("idle"));

        session.cycle(CycleDirection::Next);
        assert_eq!(session.animation().unwrap().active(), Some("jump"));

        assert!(!session.play("dance"));
        assert_eq!(session.animation().unwrap().selected(), None);

        assert!(session.play("wave"));
        session.stop();
        assert_eq!(session.animation().unwrap().active(), None);
    }
}
