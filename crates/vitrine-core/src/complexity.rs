//! Rendering cost classification for display

use serde::{Deserialize, Serialize};

use crate::scene::SceneGraph;

const HIGH_TRIANGLES: u64 = 50_000;
const HIGH_MESHES: usize = 50;
const MEDIUM_TRIANGLES: u64 = 10_000;
const MEDIUM_MESHES: usize = 20;

/// Coarse rendering cost of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
}

impl ComplexityTier {
    pub fn classify(triangle_count: u64, mesh_count: usize) -> Self {
        if triangle_count > HIGH_TRIANGLES || mesh_count > HIGH_MESHES {
            Self::High
        } else if triangle_count > MEDIUM_TRIANGLES || mesh_count > MEDIUM_MESHES {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Buffer sizes of one drawable mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub index_count: Option<usize>,
}

impl MeshStats {
    /// Triangles drawn as an independent triangle list, floored
    pub fn triangle_count(&self) -> u64 {
        (self.index_count.unwrap_or(self.vertex_count) / 3) as u64
    }
}

/// Mesh and triangle totals with their tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub mesh_count: usize,
    pub triangle_count: u64,
    pub tier: ComplexityTier,
}

impl ComplexityReport {
    pub fn from_meshes<I>(meshes: I) -> Self
    where
        I: IntoIterator<Item = MeshStats>,
    {
        let (mesh_count, triangle_count) = meshes
            .into_iter()
            .fold((0usize, 0u64), |(m, t), mesh| (m + 1, t + mesh.triangle_count()));

        Self {
            mesh_count,
            triangle_count,
            tier: ComplexityTier::classify(triangle_count, mesh_count),
        }
    }
}

/// Count geometry-bearing nodes and their triangles
pub fn analyze_complexity(scene: &SceneGraph) -> ComplexityReport {
    let mut stats = Vec::new();
    scene.visit_meshes(|_, mesh, _| {
        stats.push(MeshStats {
            vertex_count: mesh.vertex_count(),
            index_count: mesh.index_count(),
        });
    });
    ComplexityReport::from_meshes(stats)
}
