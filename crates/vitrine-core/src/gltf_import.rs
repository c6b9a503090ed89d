//! glTF / GLB import into a [`LoadedModel`]

use glam::{Mat4, Vec3};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::scene::{AnimationClipInfo, LoadedModel, MeshGeometry, SceneGraph, SceneNode};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported or corrupt asset: {0}")]
    Format(#[from] gltf::Error),
    #[error("asset contains no scene nodes")]
    Empty,
}

/// Load a .gltf or .glb file; external buffers resolve relative to the file
pub fn load_path(path: &Path) -> Result<LoadedModel, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    load_with_base(&bytes, path.parent())
}

/// Load a self-contained asset (GLB or glTF with data URIs)
pub fn load_slice(bytes: &[u8]) -> Result<LoadedModel, LoadError> {
    load_with_base(bytes, None)
}

fn load_with_base(bytes: &[u8], base: Option<&Path>) -> Result<LoadedModel, LoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base, blob)?;

    let mut scene = SceneGraph::new();
    if let Some(gltf_scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in gltf_scene.nodes() {
            let root = scene.add_root(convert_node(&node));
            add_node_contents(&mut scene, root, &node, &buffers);
        }
    }

    if scene.is_empty() {
        return Err(LoadError::Empty);
    }

    let animations = document
        .animations()
        .map(|anim| AnimationClipInfo {
            name: anim
                .name()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Animation{}", anim.index())),
            duration: clip_duration(&anim, &buffers),
        })
        .collect::<Vec<_>>();

    debug!(
        nodes = scene.nodes.len(),
        animations = animations.len(),
        "Imported glTF asset"
    );

    Ok(LoadedModel::new(scene, animations))
}

fn convert_node(node: &gltf::Node) -> SceneNode {
    SceneNode {
        name: node.name().map(str::to_string),
        transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
        mesh: None,
        children: Vec::new(),
    }
}

/// Attach a node's primitives and children below `idx`
fn add_node_contents(
    scene: &mut SceneGraph,
    idx: usize,
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
) {
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions = positions.map(Vec3::from).collect::<Vec<_>>();
            let indices = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect::<Vec<_>>());

            let name = format!(
                "{}#{}",
                mesh.name().unwrap_or("mesh"),
                primitive.index()
            );
            scene.add_child(idx, SceneNode::mesh(name, MeshGeometry::new(positions, indices)));
        }
    }

    for child in node.children() {
        let child_idx = scene.add_child(idx, convert_node(&child));
        add_node_contents(scene, child_idx, &child, buffers);
    }
}

/// Latest keyframe time across all channels
fn clip_duration(anim: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> f32 {
    anim.channels()
        .filter_map(|channel| {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
            reader.read_inputs().and_then(|inputs| inputs.reduce(f32::max))
        })
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::analyze_complexity;
    use crate::normalize::{normalize, NormalizeOptions};
    use base64::Engine;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// One triangle spanning 2 units on X, offset by a node translation,
    /// with a single named translation animation lasting 1.5 s.
    fn triangle_gltf(animation_name: Option<&str>) -> Vec<u8> {
        let mut buffer = f32_bytes(&[0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        buffer.extend(f32_bytes(&[0.0, 1.5]));
        buffer.extend(f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]));
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buffer)
        );
        let name = animation_name
            .map(|n| format!(r#""name": "{n}","#))
            .unwrap_or_default();

        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [0]}}],
  "nodes": [{{"name": "body", "mesh": 0, "translation": [5.0, 0.0, 0.0]}}],
  "meshes": [{{"name": "tri", "primitives": [{{"attributes": {{"POSITION": 0}}}}]}}],
  "buffers": [{{"byteLength": {len}, "uri": "{uri}"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 8}},
    {{"buffer": 0, "byteOffset": 44, "byteLength": 24}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [2.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
      "min": [0.0], "max": [1.5]}},
    {{"bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3"}}
  ],
  "animations": [{{
    {name}
    "channels": [{{"sampler": 0, "target": {{"node": 0, "path": "translation"}}}}],
    "samplers": [{{"input": 1, "output": 2}}]
  }}]
}}"#,
            len = buffer.len(),
        )
        .into_bytes()
    }

    #[test]
    fn test_import_triangle() {
        let model = load_slice(&triangle_gltf(Some("slide"))).unwrap();

        assert_eq!(model.clip_names(), vec!["slide".to_string()]);
        assert!((model.animations[0].duration - 1.5).abs() < 1e-6);

        let report = analyze_complexity(&model.scene);
        assert_eq!(report.mesh_count, 1);
        assert_eq!(report.triangle_count, 1);

        let r = normalize(&model.scene, &NormalizeOptions::default());
        assert_eq!(r.original_size, Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(r.scale, 1.5);
        assert_eq!(r.translation, -Vec3::new(6.0, 0.5, 0.0) * 1.5);
    }

    #[test]
    fn test_unnamed_animation_gets_index_name() {
        let model = load_slice(&triangle_gltf(None)).unwrap();
        assert_eq!(model.clip_names(), vec!["Animation0".to_string()]);
    }

    #[test]
    fn test_empty_scene_is_error() {
        let json = br#"{"asset": {"version": "2.0"}}"#;
        assert!(matches!(load_slice(json), Err(LoadError::Empty)));
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(load_slice(b"not a model"), Err(LoadError::Format(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_path(&dir.path().join("nope.glb")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
