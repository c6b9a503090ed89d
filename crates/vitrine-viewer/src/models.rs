//! glTF model loading and management

use bevy::asset::LoadState;
use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use bevy::scene::SceneInstance;
use vitrine_core::glam;
use vitrine_core::{
    AnimationClipInfo, CycleDirection, LoadTicket, LoadedModel, MeshGeometry, ModelReport, ModelSession,
    ProductId, SceneGraph, SceneNode,
};

use crate::app::{SelectedProduct, ViewerPreferences};
use crate::network::DaemonConfig;
use crate::scene::{GroundPlane, Turntable};

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelViewer>()
            .add_message::<ViewerAction>()
            .add_systems(
                Update,
                (
                    start_model_load,
                    poll_model_load,
                    capture_loaded_scene,
                    prepare_for_rendering,
                    sync_model_scale,
                    apply_normalization,
                    handle_viewer_actions,
                    sync_animation,
                )
                    .chain(),
            );
    }
}

/// User requests coming from the viewer panel
#[derive(Message, Debug, Clone, PartialEq)]
pub enum ViewerAction {
    Retry,
    Play(String),
    Next,
    Previous,
    Stop,
}

/// Root entity of the displayed model; children come from the glTF scene
#[derive(Component)]
pub struct ModelRoot {
    pub ticket: LoadTicket,
}

/// Scene spawned but not yet instantiated
#[derive(Component)]
pub struct PendingScene;

/// Materials of this scene have been prepared
#[derive(Component)]
pub struct PreparedForRendering;

/// Displayed product and the state of its model
#[derive(Resource, Default)]
pub struct ModelViewer {
    pub session: ModelSession,
    /// Product id and model reference currently shown
    current: Option<(ProductId, String)>,
    loading: Option<(LoadTicket, Handle<Gltf>)>,
    root: Option<Entity>,
    /// Clips in document order
    clips: Vec<(String, Handle<AnimationClip>)>,
    /// Clip last pushed to the animation players, `Some(None)` when stopped
    applied: Option<Option<String>>,
}

impl ModelViewer {
    fn clear(&mut self, commands: &mut Commands) {
        if let Some(root) = self.root.take() {
            commands.entity(root).despawn();
        }
        self.loading = None;
        self.clips.clear();
        self.applied = None;
    }

    fn load(&mut self, commands: &mut Commands, asset_server: &AssetServer, daemon: &DaemonConfig, ticket: LoadTicket, url: &str) {
        self.clear(commands);
        let asset_path = daemon.model_asset_path(url);
        tracing::info!("Starting to load model: {}", asset_path);
        let handle: Handle<Gltf> = asset_server.load(asset_path);
        self.loading = Some((ticket, handle));
    }
}

/// Identity of what should be displayed for a selection
fn selection_key(selected: &SelectedProduct) -> Option<(ProductId, String)> {
    selected
        .0
        .as_ref()
        .map(|p| (p.id.clone(), p.model_ref().unwrap_or_default().to_string()))
}

/// Start a new load when the selected product or its model changes
fn start_model_load(
    mut commands: Commands,
    selected: Res<SelectedProduct>,
    mut viewer: ResMut<ModelViewer>,
    asset_server: Res<AssetServer>,
    daemon: Res<DaemonConfig>,
) {
    if !selected.is_changed() {
        return;
    }

    let key = selection_key(&selected);
    if key == viewer.current {
        return;
    }
    viewer.current = key;

    match &selected.0 {
        Some(product) => {
            if let Some((ticket, url)) = viewer.session.begin(product) {
                viewer.load(&mut commands, &asset_server, &daemon, ticket, &url);
            } else {
                viewer.clear(&mut commands);
            }
        }
        None => {
            viewer.clear(&mut commands);
            let options = *viewer.session.options();
            viewer.session = ModelSession::new(options);
        }
    }
}

/// Check the glTF load state and spawn the scene once loaded
fn poll_model_load(
    mut commands: Commands,
    mut viewer: ResMut<ModelViewer>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    turntable: Query<Entity, With<Turntable>>,
) {
    let Some((ticket, handle)) = viewer.loading.clone() else {
        return;
    };
    if !viewer.session.is_current(ticket) {
        viewer.loading = None;
        return;
    }

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            viewer.loading = None;
            let Some(gltf) = gltf_assets.get(&handle) else {
                viewer.session.fail(ticket, "glTF asset missing after load");
                return;
            };
            let Some(scene) = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) else {
                viewer.session.fail(ticket, vitrine_core::LoadError::Empty);
                return;
            };

            viewer.clips = clip_handles(gltf);
            let root = commands
                .spawn((
                    SceneRoot(scene),
                    Transform::default(),
                    Visibility::Hidden,
                    ModelRoot { ticket },
                    PendingScene,
                ))
                .id();
            if let Ok(turntable) = turntable.single() {
                commands.entity(turntable).add_child(root);
            }
            viewer.root = Some(root);
        }
        Some(LoadState::Failed(err)) => {
            viewer.loading = None;
            viewer.session.fail(ticket, err);
        }
        _ => {
            // Still loading
        }
    }
}

/// Named clip handles in document order; unnamed clips are numbered by position
fn clip_handles(gltf: &Gltf) -> Vec<(String, Handle<AnimationClip>)> {
    gltf.animations
        .iter()
        .enumerate()
        .map(|(i, handle)| {
            let name = gltf
                .named_animations
                .iter()
                .find(|(_, h)| h.id() == handle.id())
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| format!("Animation{}", i));
            (name, handle.clone())
        })
        .collect()
}

/// Clip descriptions in the order the loader produced them
pub fn clip_infos(
    clips: &[(String, Handle<AnimationClip>)],
    assets: &Assets<AnimationClip>,
) -> Vec<AnimationClipInfo> {
    clips
        .iter()
        .map(|(name, handle)| AnimationClipInfo {
            name: name.clone(),
            duration: assets.get(handle).map(|c| c.duration()).unwrap_or(0.0),
        })
        .collect()
}

/// Once the scene instance exists, build the core scene graph and analyze it
#[allow(clippy::too_many_arguments)]
fn capture_loaded_scene(
    mut commands: Commands,
    mut viewer: ResMut<ModelViewer>,
    scene_spawner: Res<SceneSpawner>,
    roots: Query<(Entity, &ModelRoot, &SceneInstance), With<PendingScene>>,
    children: Query<&Children>,
    nodes: Query<(Option<&Name>, &Transform, Option<&Mesh3d>)>,
    meshes: Res<Assets<Mesh>>,
    clips: Res<Assets<AnimationClip>>,
) {
    for (entity, root, instance) in roots.iter() {
        if !scene_spawner.instance_is_ready(**instance) {
            continue;
        }
        commands.entity(entity).remove::<PendingScene>();

        if !viewer.session.is_current(root.ticket) {
            tracing::debug!("Despawning stale model scene");
            commands.entity(entity).despawn();
            if viewer.root == Some(entity) {
                viewer.root = None;
            }
            continue;
        }

        let mut scene = SceneGraph::new();
        if let Ok(top) = children.get(entity) {
            for child in top.iter() {
                capture_node(child, None, &mut scene, &children, &nodes, &meshes);
            }
        }

        let model = LoadedModel::new(scene, clip_infos(&viewer.clips, &clips));
        if viewer.session.succeed(root.ticket, &model) {
            commands.entity(entity).insert(Visibility::Inherited);
        }
    }
}

fn capture_node(
    entity: Entity,
    parent: Option<usize>,
    scene: &mut SceneGraph,
    children: &Query<&Children>,
    nodes: &Query<(Option<&Name>, &Transform, Option<&Mesh3d>)>,
    meshes: &Assets<Mesh>,
) {
    let Ok((name, transform, mesh3d)) = nodes.get(entity) else {
        return;
    };

    let node = SceneNode {
        name: name.map(|n| n.to_string()),
        transform: local_matrix(transform),
        mesh: mesh3d.and_then(|m| meshes.get(&m.0)).and_then(mesh_geometry),
        children: Vec::new(),
    };
    let idx = match parent {
        Some(p) => scene.add_child(p, node),
        None => scene.add_root(node),
    };

    if let Ok(kids) = children.get(entity) {
        for child in kids.iter() {
            capture_node(child, Some(idx), scene, children, nodes, meshes);
        }
    }
}

fn local_matrix(transform: &Transform) -> glam::Mat4 {
    let m = Mat4::from_scale_rotation_translation(transform.scale, transform.rotation, transform.translation);
    glam::Mat4::from_cols_array(&m.to_cols_array())
}

/// Positions and indices of a triangle-list mesh
pub fn mesh_geometry(mesh: &Mesh) -> Option<MeshGeometry> {
    if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
        return None;
    }
    let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
        VertexAttributeValues::Float32x3(values) => values
            .iter()
            .map(|p| glam::Vec3::from_array(*p))
            .collect(),
        _ => return None,
    };
    let indices = mesh.indices().map(|indices| match indices {
        Indices::U16(v) => v.iter().map(|&i| i as u32).collect(),
        Indices::U32(v) => v.clone(),
    });
    Some(MeshGeometry::new(positions, indices))
}

/// Make every material of a freshly instantiated scene render from both sides
fn prepare_for_rendering(
    mut commands: Commands,
    roots: Query<Entity, (With<ModelRoot>, Without<PendingScene>, Without<PreparedForRendering>)>,
    children: Query<&Children>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for root in roots.iter() {
        let mut prepared = 0;
        for entity in children.iter_descendants(root) {
            if let Ok(handle) = material_handles.get(entity) {
                if let Some(material) = materials.get_mut(&handle.0) {
                    material.double_sided = true;
                    material.cull_mode = None;
                    prepared += 1;
                }
            }
        }
        tracing::debug!(materials = prepared, "Prepared model for rendering");
        commands.entity(root).insert(PreparedForRendering);
    }
}

/// Follow the scale multiplier from the viewer settings
fn sync_model_scale(prefs: Res<ViewerPreferences>, mut viewer: ResMut<ModelViewer>) {
    if !prefs.is_changed() {
        return;
    }
    let multiplier = prefs.settings.scale_multiplier;
    if viewer.session.options().scale_multiplier() == multiplier {
        return;
    }
    if let Err(e) = viewer.session.rescale(multiplier) {
        tracing::warn!(error = %e, "Ignoring invalid scale multiplier");
    }
}

/// Model root transform from a report
pub fn normalization_transform(report: &ModelReport) -> Transform {
    let n = &report.normalization;
    Transform {
        translation: Vec3::from_array(n.translation.to_array()),
        rotation: Quat::IDENTITY,
        scale: Vec3::splat(n.scale),
    }
}

/// Height of the model's lowest point once normalized
pub fn ground_height(report: &ModelReport) -> f32 {
    report.bounds.min.y * report.normalization.scale + report.normalization.translation.y
}

fn apply_normalization(
    viewer: Res<ModelViewer>,
    mut roots: Query<&mut Transform, (With<ModelRoot>, Without<GroundPlane>)>,
    mut ground: Query<&mut Transform, (With<GroundPlane>, Without<ModelRoot>)>,
) {
    if !viewer.is_changed() {
        return;
    }
    let Some(report) = viewer.session.report() else {
        return;
    };
    let Some(root) = viewer.root else {
        return;
    };

    if let Ok(mut transform) = roots.get_mut(root) {
        *transform = normalization_transform(report);
    }
    if let Ok(mut transform) = ground.single_mut() {
        transform.translation.y = ground_height(report) - 0.001;
    }
}

fn handle_viewer_actions(
    mut commands: Commands,
    mut actions: MessageReader<ViewerAction>,
    mut viewer: ResMut<ModelViewer>,
    asset_server: Res<AssetServer>,
    daemon: Res<DaemonConfig>,
) {
    for action in actions.read() {
        match action {
            ViewerAction::Retry => {
                if let Some((ticket, url)) = viewer.session.retry() {
                    viewer.load(&mut commands, &asset_server, &daemon, ticket, &url);
                }
            }
            ViewerAction::Play(name) => {
                if !viewer.session.play(name) {
                    tracing::warn!("Animation not found: {}", name);
                }
            }
            ViewerAction::Next => viewer.session.cycle(CycleDirection::Next),
            ViewerAction::Previous => viewer.session.cycle(CycleDirection::Previous),
            ViewerAction::Stop => viewer.session.stop(),
        }
    }
}

/// Push the session's active clip to the scene's animation players
fn sync_animation(
    mut commands: Commands,
    mut viewer: ResMut<ModelViewer>,
    roots: Query<Entity, (With<ModelRoot>, Without<PendingScene>)>,
    children: Query<&Children>,
    mut players: Query<(Entity, &mut AnimationPlayer)>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    let Some(root) = viewer.root else {
        return;
    };
    if roots.get(root).is_err() {
        return;
    }
    let Some(state) = viewer.session.animation() else {
        return;
    };

    let wanted = state.active().map(str::to_string);
    if viewer.applied.as_ref() == Some(&wanted) {
        return;
    }

    let clip = wanted.as_ref().and_then(|name| {
        viewer
            .clips
            .iter()
            .find(|(clip_name, _)| clip_name == name)
            .map(|(_, handle)| handle.clone())
    });
    let graph = clip.map(|handle| {
        let (graph, indices) = AnimationGraph::from_clips([handle]);
        (graphs.add(graph), indices)
    });

    let mut found = false;
    for entity in children.iter_descendants(root) {
        let Ok((player_entity, mut player)) = players.get_mut(entity) else {
            continue;
        };
        found = true;
        player.stop_all();
        if let Some((graph, indices)) = &graph {
            commands
                .entity(player_entity)
                .insert(AnimationGraphHandle(graph.clone()));
            if let Some(&index) = indices.first() {
                player.play(index).repeat();
            }
        }
    }

    // Players appear with the scene; wait for them when a clip should run
    if found || wanted.is_none() {
        tracing::debug!(clip = ?wanted, "Applied animation");
        viewer.applied = Some(wanted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::asset::RenderAssetUsages;
    use vitrine_core::{AnimationMeta, NormalizeOptions};

    #[test]
    fn test_mesh_geometry_from_triangle_list() {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        );
        mesh.insert_indices(Indices::U16(vec![0, 1, 2, 1, 3, 2]));

        let geometry = mesh_geometry(&mesh).unwrap();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.indices, Some(vec![0, 1, 2, 1, 3, 2]));
    }

    #[test]
    fn test_mesh_geometry_skips_lines() {
        let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(mesh_geometry(&mesh).is_none());
    }

    #[test]
    fn test_normalization_transform_and_ground() {
        let mut scene = SceneGraph::new();
        scene.add_root(SceneNode::mesh(
            "box",
            MeshGeometry::new(vec![glam::Vec3::new(0.0, 0.0, 0.0), glam::Vec3::new(2.0, 4.0, 2.0)], None),
        ));
        let model = LoadedModel::new(scene, Vec::new());
        let options = NormalizeOptions::new(2.0, 1.0).unwrap();
        let report = ModelReport::analyze("box.glb", &model, &AnimationMeta::default(), &options);

        let transform = normalization_transform(&report);
        assert_eq!(transform.scale, Vec3::splat(0.5));
        assert_eq!(transform.translation, Vec3::new(-0.5, -1.0, -0.5));
        assert_eq!(ground_height(&report), -1.0);
    }

    #[test]
    fn test_clip_order_follows_document() {
        let clips = vec![
            ("walk".to_string(), Handle::<AnimationClip>::default()),
            ("idle".to_string(), Handle::<AnimationClip>::default()),
        ];
        let infos = clip_infos(&clips, &Assets::<AnimationClip>::default());
        let names: Vec<_> = infos.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["walk", "idle"]);

        let model = LoadedModel::new(SceneGraph::new(), infos);
        let meta = AnimationMeta {
            available: vec!["walk".into(), "idle".into()],
            default_animation: Some("run".into()),
            auto_play: true,
        };
        let report = ModelReport::analyze("robot.glb", &model, &meta, &NormalizeOptions::default());
        assert_eq!(report.default_animation.as_deref(), Some("walk"));
    }

    #[test]
    fn test_local_matrix() {
        let transform = Transform::from_xyz(1.0, 2.0, 3.0).with_scale(Vec3::splat(2.0));
        let m = local_matrix(&transform);
        assert_eq!(m.transform_point3(glam::Vec3::ONE), glam::Vec3::new(3.0, 4.0, 5.0));
    }
}
