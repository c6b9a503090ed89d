//! Model normalization: center a model at the origin and fit it to a target size
//!
//! The computation is pure. It never touches materials or shadow flags;
//! renderers apply those in a separate preparation step.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::BoundingBox;
use crate::scene::SceneGraph;

/// Default largest-dimension size, in world units
pub const DEFAULT_TARGET_SIZE: f32 = 3.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("target size must be a positive finite number, got {0}")]
    InvalidTargetSize(f32),
    #[error("scale multiplier must be a positive finite number, got {0}")]
    InvalidMultiplier(f32),
}

/// Inputs to the normalizer besides the model itself
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeOptions {
    target_size: f32,
    scale_multiplier: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            scale_multiplier: 1.0,
        }
    }
}

impl NormalizeOptions {
    pub fn new(target_size: f32, scale_multiplier: f32) -> Result<Self, NormalizeError> {
        if !target_size.is_finite() || target_size <= 0.0 {
            return Err(NormalizeError::InvalidTargetSize(target_size));
        }
        if !scale_multiplier.is_finite() || scale_multiplier <= 0.0 {
            return Err(NormalizeError::InvalidMultiplier(scale_multiplier));
        }
        Ok(Self {
            target_size,
            scale_multiplier,
        })
    }

    pub fn target_size(&self) -> f32 {
        self.target_size
    }

    pub fn scale_multiplier(&self) -> f32 {
        self.scale_multiplier
    }

    /// Same target size with a different multiplier
    pub fn with_multiplier(self, scale_multiplier: f32) -> Result<Self, NormalizeError> {
        Self::new(self.target_size, scale_multiplier)
    }
}

/// Scale and translation that fit a model to the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    /// Uniform scale factor
    pub scale: f32,
    /// Translation applied after scaling
    pub translation: Vec3,
    /// Unscaled bounding box extents
    pub original_size: Vec3,
}

/// Normalize a loaded scene graph
pub fn normalize(scene: &SceneGraph, options: &NormalizeOptions) -> NormalizationResult {
    normalize_bounds(&BoundingBox::from_scene(scene), options)
}

/// Normalize from a precomputed bounding box.
///
/// A zero-size box leaves the model unscaled apart from the multiplier and
/// keeps it at the origin.
pub fn normalize_bounds(bounds: &BoundingBox, options: &NormalizeOptions) -> NormalizationResult {
    let size = bounds.size();
    let max_dim = size.max_element();

    if max_dim <= 0.0 || !max_dim.is_finite() {
        return NormalizationResult {
            scale: options.scale_multiplier,
            translation: Vec3::ZERO,
            original_size: size,
        };
    }

    let scale = (options.target_size / max_dim) * options.scale_multiplier;
    NormalizationResult {
        scale,
        translation: -bounds.center() * scale,
        original_size: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshGeometry, SceneNode};

    fn boxed(min: Vec3, max: Vec3) -> SceneGraph {
        let mut scene = SceneGraph::new();
        scene.add_root(SceneNode::mesh("box", MeshGeometry::new(vec![min, max], None)));
        scene
    }

    #[test]
    fn test_scale_and_translation() {
        let scene = boxed(Vec3::new(0.0, 0.0, 0.0), Vec3::new(6.0, 2.0, 1.0));
        let opts = NormalizeOptions::new(3.0, 2.0).unwrap();
        let r = normalize(&scene, &opts);

        assert_eq!(r.scale, (3.0 / 6.0) * 2.0);
        assert_eq!(r.translation, -Vec3::new(3.0, 1.0, 0.5) * r.scale);
        assert_eq!(r.original_size, Vec3::new(6.0, 2.0, 1.0));
    }

    #[test]
    fn test_center_lands_at_origin() {
        let scene = boxed(Vec3::new(10.0, 20.0, 30.0), Vec3::new(12.0, 21.0, 30.5));
        let bounds = BoundingBox::from_scene(&scene);
        let r = normalize(&scene, &NormalizeOptions::default());

        let moved = bounds.center() * r.scale + r.translation;
        assert!(moved.abs().max_element() < 1e-4);
        assert!((bounds.max_dimension() * r.scale - DEFAULT_TARGET_SIZE).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_geometry_uses_multiplier() {
        let opts = NormalizeOptions::new(3.5, 1.25).unwrap();

        let empty = normalize(&SceneGraph::new(), &opts);
        assert_eq!(empty.scale, 1.25);
        assert_eq!(empty.translation, Vec3::ZERO);

        let point = normalize(&boxed(Vec3::splat(4.0), Vec3::splat(4.0)), &opts);
        assert_eq!(point.scale, 1.25);
        assert_eq!(point.translation, Vec3::ZERO);
        assert_eq!(point.original_size, Vec3::ZERO);
    }

    #[test]
    fn test_idempotent() {
        let scene = boxed(Vec3::new(-0.3, 0.1, 2.0), Vec3::new(0.7, 5.3, 2.2));
        let opts = NormalizeOptions::new(3.0, 0.8).unwrap();
        let a = normalize(&scene, &opts);
        let b = normalize(&scene, &opts);
        assert_eq!(a.scale.to_bits(), b.scale.to_bits());
        assert_eq!(a.translation.to_array().map(f32::to_bits), b.translation.to_array().map(f32::to_bits));
    }

    #[test]
    fn test_options_reject_non_positive() {
        assert_eq!(NormalizeOptions::new(0.0, 1.0), Err(NormalizeError::InvalidTargetSize(0.0)));
        assert_eq!(NormalizeOptions::new(3.0, -1.0), Err(NormalizeError::InvalidMultiplier(-1.0)));
        assert!(NormalizeOptions::new(f32::INFINITY, 1.0).is_err());
    }
}
