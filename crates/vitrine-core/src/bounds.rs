//! Axis-aligned bounding boxes

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::scene::SceneGraph;

/// Minimal axis-aligned box containing a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::point(Vec3::ZERO)
    }
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Degenerate box at a single point
    pub fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Box around a set of points, `None` when the iterator is empty or
    /// yields only non-finite points
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        points
            .into_iter()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    Some(b) => b.expanded_to(p),
                    None => Self::point(p),
                })
            })
    }

    /// World-space box over all geometry in the scene.
    ///
    /// A scene without geometry degenerates to a point at the origin.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let mut bounds: Option<Self> = None;
        scene.visit_meshes(|_, mesh, world| {
            let b = Self::from_points(mesh.positions.iter().map(|p| world.transform_point3(*p)));
            bounds = match (bounds, b) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            };
        });
        bounds.unwrap_or_default()
    }

    pub fn expanded_to(&self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Extents per axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Largest of the three extents
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    pub fn is_degenerate(&self) -> bool {
        self.max_dimension() <= 0.0
    }
}
