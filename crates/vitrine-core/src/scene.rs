//! Renderer-independent scene graph produced by asset loading
//!
//! Nodes live in a flat arena and refer to each other by index, the same
//! layout glTF uses. A node carries a local transform and optionally one
//! triangle-list geometry.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::product::AnimationMeta;

/// Triangle geometry attached to a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// Vertex positions in node-local space
    pub positions: Vec<Vec3>,
    /// Index buffer, absent for non-indexed geometry
    pub indices: Option<Vec<u32>>,
}

impl MeshGeometry {
    pub fn new(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        Self { positions, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> Option<usize> {
        self.indices.as_ref().map(Vec::len)
    }
}

/// A node in the scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    /// Transform relative to the parent node
    pub transform: Mat4,
    pub mesh: Option<MeshGeometry>,
    pub children: Vec<usize>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: Mat4::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    /// Group node with a local transform and no geometry
    pub fn group(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: Some(name.into()),
            transform,
            ..Default::default()
        }
    }

    /// Geometry node with an identity transform
    pub fn mesh(name: impl Into<String>, mesh: MeshGeometry) -> Self {
        Self {
            name: Some(name.into()),
            mesh: Some(mesh),
            ..Default::default()
        }
    }
}

/// Hierarchical set of nodes loaded from a 3D asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node, returning its index
    pub fn add_root(&mut self, node: SceneNode) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.roots.push(idx);
        idx
    }

    /// Add a node under `parent`, returning its index
    pub fn add_child(&mut self, parent: usize, node: SceneNode) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(idx);
        idx
    }

    /// True when the graph has no top-level nodes
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Visit every geometry-bearing node with its world transform.
    ///
    /// Child indices that do not exist are skipped, and each node is
    /// visited at most once even if the arena contains cycles.
    pub fn visit_meshes<F>(&self, mut f: F)
    where
        F: FnMut(&SceneNode, &MeshGeometry, &Mat4),
    {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|&r| (r, Mat4::IDENTITY))
            .collect();

        while let Some((idx, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(idx) else { continue };
            if std::mem::replace(&mut visited[idx], true) {
                continue;
            }
            let world = parent * node.transform;
            if let Some(mesh) = &node.mesh {
                f(node, mesh, &world);
            }
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }
}

/// A named animation clip contained in an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClipInfo {
    pub name: String,
    /// Clip length in seconds
    pub duration: f32,
}

/// Result of loading a 3D asset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedModel {
    pub scene: SceneGraph,
    /// Clips in the order the loader returned them
    pub animations: Vec<AnimationClipInfo>,
}

impl LoadedModel {
    pub fn new(scene: SceneGraph, animations: Vec<AnimationClipInfo>) -> Self {
        Self { scene, animations }
    }

    /// A model with no top-level nodes is invalid
    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }

    /// Clip names in loader order
    pub fn clip_names(&self) -> Vec<String> {
        self.animations.iter().map(|c| c.name.clone()).collect()
    }

    /// Catalog-declared clip names the asset does not contain
    pub fn missing_declared(&self, meta: &AnimationMeta) -> Vec<String> {
        meta.available
            .iter()
            .filter(|name| !self.animations.iter().any(|c| &c.name == *name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_meshes_accumulates_transforms() {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::group("root", Mat4::from_translation(Vec3::X)));
        let mid = scene.add_child(root, SceneNode::group("mid", Mat4::from_scale(Vec3::splat(2.0))));
        scene.add_child(
            mid,
            SceneNode::mesh("leaf", MeshGeometry::new(vec![Vec3::ONE], None)),
        );

        let mut seen = Vec::new();
        scene.visit_meshes(|node, mesh, world| {
            seen.push((node.name.clone(), world.transform_point3(mesh.positions[0])));
        });

        assert_eq!(seen, vec![(Some("leaf".to_string()), Vec3::new(3.0, 2.0, 2.0))]);
    }

    #[test]
    fn test_visit_meshes_tolerates_bad_indices_and_cycles() {
        let mut scene = SceneGraph::new();
        let root = scene.add_root(SceneNode::mesh("a", MeshGeometry::default()));
        scene.nodes[root].children.push(root);
        scene.nodes[root].children.push(42);

        let mut count = 0;
        scene.visit_meshes(|_, _, _| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_missing_declared() {
        let model = LoadedModel::new(
            SceneGraph::new(),
            vec![AnimationClipInfo { name: "walk".into(), duration: 1.0 }],
        );
        let meta = AnimationMeta {
            available: vec!["walk".into(), "idle".into()],
            default_animation: None,
            auto_play: true,
        };
        assert_eq!(model.missing_declared(&meta), vec!["idle".to_string()]);
    }
}
