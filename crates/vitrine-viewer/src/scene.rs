//! 3D scene management

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use vitrine_core::{EnvironmentPreset, RenderQuality};

use crate::app::{CameraSettings, ViewerPreferences};

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        // Line-mode rendering needs a GPU feature WebGL2/WebGPU do not expose
        #[cfg(not(target_arch = "wasm32"))]
        {
            app.add_plugins(bevy::pbr::wireframe::WireframePlugin::default());
        }

        app.add_systems(Startup, setup_scene)
            .add_systems(Update, (update_camera, auto_rotate, apply_viewer_settings));
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Parent of the model root; spins when auto-rotate is on
#[derive(Component)]
pub struct Turntable;

/// Shadow-receiving floor under the model
#[derive(Component)]
pub struct GroundPlane;

#[derive(Component)]
pub struct KeyLight;

#[derive(Component)]
pub struct FillLight;

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    camera_settings: Res<CameraSettings>,
) {
    // Y-up orbit camera looking at the origin
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 500.0,
            ..default()
        }),
        Msaa::Sample4,
        Transform::from_translation(orbit_position(&camera_settings)).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.95, 1.0),
        brightness: 300.0,
        ..default()
    });

    // Key light from above, like sunlight
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
        KeyLight,
    ));

    // Point light for fill - softer
    commands.spawn((
        PointLight {
            intensity: 400000.0,
            shadows_enabled: false,
            color: Color::srgb(1.0, 0.95, 0.9), // Warm fill light
            ..default()
        },
        Transform::from_xyz(-4.0, 3.0, -2.0),
        FillLight,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.35, 0.35, 0.38),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, -1.5, 0.0),
        GroundPlane,
    ));

    commands.spawn((Transform::default(), Visibility::default(), Turntable));
}

/// Camera position for the current orbit parameters (Y is up)
pub fn orbit_position(settings: &CameraSettings) -> Vec3 {
    let horizontal = settings.distance * settings.elevation.cos();
    Vec3::new(
        horizontal * settings.azimuth.sin(),
        settings.distance * settings.elevation.sin(),
        horizontal * settings.azimuth.cos(),
    )
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    // Orbit with left mouse drag
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        let delta = mouse_motion.delta;
        settings.azimuth -= delta.x * settings.sensitivity;
        settings.elevation = (settings.elevation + delta.y * settings.sensitivity).clamp(-0.1, 1.5);
    }

    // Zoom with scroll
    if !egui_wants_pointer && mouse_scroll.delta.y != 0.0 {
        let zoom_factor = 1.0 - mouse_scroll.delta.y * settings.zoom_speed;
        settings.target_distance =
            (settings.target_distance * zoom_factor).clamp(settings.min_distance, settings.max_distance);
    }

    // Touch support for mobile
    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.azimuth -= delta.x * settings.sensitivity;
                settings.elevation = (settings.elevation + delta.y * settings.sensitivity).clamp(-0.1, 1.5);
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            settings.target_distance =
                (settings.target_distance * zoom_factor).clamp(settings.min_distance, settings.max_distance);
        }
    }

    // Smooth interpolation for zoom
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = orbit_position(&settings);
        transform.look_at(Vec3::ZERO, Vec3::Y);
    }
}

fn auto_rotate(prefs: Res<ViewerPreferences>, time: Res<Time>, mut turntable: Query<&mut Transform, With<Turntable>>) {
    if !prefs.settings.auto_rotate {
        return;
    }
    if let Ok(mut transform) = turntable.single_mut() {
        transform.rotate_y(prefs.settings.auto_rotate_speed * time.delta_secs());
    }
}

/// Lighting values for an environment preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentLook {
    pub clear_color: Color,
    pub ambient_color: Color,
    pub ambient_brightness: f32,
    pub key_color: Color,
    pub key_illuminance: f32,
}

pub fn environment_look(preset: EnvironmentPreset) -> EnvironmentLook {
    let (clear, ambient, ambient_brightness, key, key_illuminance) = match preset {
        EnvironmentPreset::Studio => ((0.1, 0.1, 0.15), (0.9, 0.95, 1.0), 300.0, (1.0, 1.0, 1.0), 8000.0),
        EnvironmentPreset::Sunset => ((0.35, 0.18, 0.12), (1.0, 0.75, 0.55), 250.0, (1.0, 0.6, 0.35), 6000.0),
        EnvironmentPreset::Dawn => ((0.45, 0.42, 0.55), (0.85, 0.8, 1.0), 220.0, (1.0, 0.85, 0.75), 5000.0),
        EnvironmentPreset::Night => ((0.02, 0.02, 0.06), (0.4, 0.45, 0.7), 80.0, (0.6, 0.7, 1.0), 1500.0),
        EnvironmentPreset::Warehouse => ((0.22, 0.2, 0.18), (1.0, 0.92, 0.8), 350.0, (1.0, 0.9, 0.75), 7000.0),
        EnvironmentPreset::Forest => ((0.12, 0.2, 0.12), (0.7, 0.9, 0.7), 260.0, (0.95, 1.0, 0.85), 5500.0),
        EnvironmentPreset::Apartment => ((0.3, 0.27, 0.24), (1.0, 0.9, 0.8), 320.0, (1.0, 0.92, 0.82), 6500.0),
        EnvironmentPreset::City => ((0.25, 0.28, 0.32), (0.85, 0.9, 1.0), 300.0, (0.95, 0.97, 1.0), 9000.0),
        EnvironmentPreset::Park => ((0.45, 0.6, 0.8), (0.85, 0.95, 1.0), 350.0, (1.0, 0.98, 0.9), 10000.0),
        EnvironmentPreset::Lobby => ((0.35, 0.33, 0.3), (1.0, 0.95, 0.88), 380.0, (1.0, 0.95, 0.9), 7500.0),
    };
    let rgb = |(r, g, b): (f32, f32, f32)| Color::srgb(r, g, b);
    EnvironmentLook {
        clear_color: rgb(clear),
        ambient_color: rgb(ambient),
        ambient_brightness,
        key_color: rgb(key),
        key_illuminance,
    }
}

/// MSAA sample count and key-light shadows for a quality tier
pub fn quality_profile(quality: RenderQuality) -> (Msaa, bool) {
    match quality {
        RenderQuality::Low => (Msaa::Off, false),
        RenderQuality::Medium => (Msaa::Sample4, false),
        RenderQuality::High => (Msaa::Sample4, true),
    }
}

/// Push environment, quality and wireframe settings into the scene
#[allow(clippy::too_many_arguments)]
fn apply_viewer_settings(
    prefs: Res<ViewerPreferences>,
    mut clear_color: ResMut<ClearColor>,
    mut ambient: ResMut<AmbientLight>,
    mut key_light: Query<&mut DirectionalLight, With<KeyLight>>,
    mut camera: Query<&mut Msaa, With<MainCamera>>,
    #[cfg(not(target_arch = "wasm32"))] mut wireframe: ResMut<bevy::pbr::wireframe::WireframeConfig>,
) {
    if !prefs.is_changed() {
        return;
    }
    let settings = &prefs.settings;

    let look = environment_look(settings.environment);
    clear_color.0 = look.clear_color;
    ambient.color = look.ambient_color;
    ambient.brightness = look.ambient_brightness;

    let (msaa, shadows) = quality_profile(settings.quality);
    if let Ok(mut light) = key_light.single_mut() {
        light.color = look.key_color;
        light.illuminance = look.key_illuminance;
        light.shadows_enabled = shadows;
    }
    if let Ok(mut camera_msaa) = camera.single_mut() {
        if *camera_msaa != msaa {
            *camera_msaa = msaa;
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        wireframe.global = settings.wireframe;
    }

    tracing::debug!(
        environment = settings.environment.label(),
        quality = settings.quality.label(),
        "Applied viewer settings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_position() {
        let settings = CameraSettings {
            distance: 2.0,
            azimuth: 0.0,
            elevation: 0.0,
            ..Default::default()
        };
        let p = orbit_position(&settings);
        assert!((p - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);

        let overhead = CameraSettings {
            elevation: std::f32::consts::FRAC_PI_2,
            ..settings
        };
        assert!((orbit_position(&overhead).y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_night_is_darker_than_studio() {
        let night = environment_look(EnvironmentPreset::Night);
        let studio = environment_look(EnvironmentPreset::Studio);
        assert!(night.ambient_brightness < studio.ambient_brightness);
        assert!(night.key_illuminance < studio.key_illuminance);
    }

    #[test]
    fn test_quality_profile() {
        assert_eq!(quality_profile(RenderQuality::Low), (Msaa::Off, false));
        assert_eq!(quality_profile(RenderQuality::High), (Msaa::Sample4, true));
    }
}
