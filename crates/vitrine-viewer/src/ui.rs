//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use vitrine_core::settings::{MAX_ROTATE_SPEED, MAX_SCALE_MULTIPLIER, MIN_SCALE_MULTIPLIER};
use vitrine_core::{Category, EnvironmentPreset, ModelReport, Product, RenderQuality, SessionState, ViewerSettings};

use crate::app::{GalleryState, SelectedProduct, UiLayout, ViewerPreferences};
use crate::models::{ModelViewer, ViewerAction};
use crate::network::DaemonConfig;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // UI layout updates run in Update
        app.add_systems(Update, update_ui_layout)
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Update UI layout based on window size
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0 || (ui_layout.screen_height - height).abs() > 1.0 {
            ui_layout.update_for_screen(width, height);
        }
    }
}

pub fn format_price(price: f64) -> String {
    format!("${:.2}", price)
}

/// Short status line for the viewer panel
pub fn session_status(state: &SessionState) -> String {
    match state {
        SessionState::Idle => "Select a product".to_string(),
        SessionState::NoModel => "No 3D model available".to_string(),
        SessionState::Loading { .. } => "Loading model...".to_string(),
        SessionState::Ready(report) => format!("{} triangles", report.complexity.triangle_count),
        SessionState::Failed { error, .. } => format!("Failed to load model: {}", error),
    }
}

#[allow(clippy::too_many_arguments)]
fn ui_system(
    mut contexts: EguiContexts,
    time: Res<Time>,
    daemon_config: Res<DaemonConfig>,
    mut gallery: ResMut<GalleryState>,
    mut selected: ResMut<SelectedProduct>,
    viewer: Res<ModelViewer>,
    mut prefs: ResMut<ViewerPreferences>,
    mut ui_layout: ResMut<UiLayout>,
    mut actions: MessageWriter<ViewerAction>,
) {
    let is_mobile = ui_layout.is_mobile;
    let panel_width = ui_layout.panel_width();
    let now = time.elapsed_secs_f64();

    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    // Mobile: Show toggle buttons at top
    if is_mobile {
        egui::TopBottomPanel::top("mobile_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("☰ Products").clicked() {
                    ui_layout.show_gallery = !ui_layout.show_gallery;
                    if ui_layout.show_gallery {
                        ui_layout.show_details = false;
                    }
                }
                if selected.0.is_some() && ui.button("Details").clicked() {
                    ui_layout.show_details = !ui_layout.show_details;
                    if ui_layout.show_details {
                        ui_layout.show_gallery = false;
                    }
                }
            });
        });
    }

    // Product gallery (left side)
    if !is_mobile || ui_layout.show_gallery {
        egui::SidePanel::left("gallery_panel")
            .default_width(panel_width)
            .resizable(!is_mobile)
            .show(ctx, |ui| {
                ui.heading("Products");

                // Connection status
                ui.horizontal(|ui| {
                    let status_color = if gallery.connected {
                        egui::Color32::GREEN
                    } else {
                        egui::Color32::RED
                    };
                    ui.colored_label(status_color, "●");
                    if gallery.connected {
                        ui.label(daemon_config.http_url.as_str());
                    } else {
                        ui.label("Live updates unavailable");
                    }
                });
                ui.separator();

                let search = ui.add(egui::TextEdit::singleline(&mut gallery.search).hint_text("Search products"));
                if search.changed() {
                    gallery.debounce.touch(now);
                }

                let current = gallery.category;
                let mut chosen = current;
                egui::ComboBox::from_label("Category")
                    .selected_text(current.map(|c| c.label()).unwrap_or("All"))
                    .show_ui(ui, |ui| {
                        if ui.selectable_label(chosen.is_none(), "All").clicked() {
                            chosen = None;
                        }
                        for category in Category::ALL {
                            let count = gallery
                                .categories
                                .iter()
                                .find(|c| c.category == category)
                                .map(|c| c.count)
                                .unwrap_or(0);
                            let label = format!("{} ({})", category.label(), count);
                            if ui.selectable_label(chosen == Some(category), label).clicked() {
                                chosen = Some(category);
                            }
                        }
                    });
                if chosen != current {
                    gallery.category = chosen;
                    gallery.refresh_requested = true;
                }

                ui.separator();
                if gallery.loading || gallery.debounce.is_pending() {
                    ui.spinner();
                }

                let mut clicked: Option<Product> = None;
                egui::ScrollArea::vertical().show(ui, |ui| {
                    if gallery.products.is_empty() && !gallery.loading {
                        ui.label("No products found");
                    }
                    for product in &gallery.products {
                        let is_selected = selected.0.as_ref().is_some_and(|p| p.id == product.id);
                        let text = format!("{}  {}", product.name, format_price(product.price));
                        let response = ui.selectable_label(is_selected, text);
                        if !product.in_stock {
                            ui.label(egui::RichText::new("Out of stock").small().color(egui::Color32::LIGHT_RED));
                        }
                        if response.clicked() {
                            clicked = Some(product.clone());
                        }
                    }
                });

                if let Some(product) = clicked {
                    tracing::info!("Selected product {}", product.id);
                    selected.0 = Some(product);
                    if is_mobile {
                        ui_layout.show_gallery = false;
                        ui_layout.show_details = true;
                    }
                }
            });
    }

    // Product details (right side)
    let Some(product) = selected.0.clone() else {
        return;
    };
    if is_mobile && !ui_layout.show_details {
        return;
    }

    egui::SidePanel::right("details_panel")
        .default_width(panel_width)
        .resizable(!is_mobile)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(product.name.as_str());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✕").clicked() {
                        selected.0 = None;
                    }
                });
            });
            ui.label(egui::RichText::new(format_price(product.price)).strong());
            ui.label(product.category.label());
            if !product.description.is_empty() {
                ui.label(product.description.as_str());
            }
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                specifications_grid(ui, &product);
                ui.separator();

                match viewer.session.state() {
                    SessionState::Failed { error, .. } => {
                        ui.colored_label(egui::Color32::LIGHT_RED, format!("Failed to load model: {}", error));
                        if ui.button("Retry").clicked() {
                            actions.write(ViewerAction::Retry);
                        }
                    }
                    SessionState::Ready(report) => {
                        model_section(ui, report);
                        animation_section(ui, report, &mut actions);
                    }
                    state => {
                        ui.label(session_status(state));
                        if matches!(state, SessionState::Loading { .. }) {
                            ui.spinner();
                        }
                    }
                }

                ui.separator();
                let mut settings = prefs.settings.clone();
                settings_section(ui, &mut settings);
                if settings != prefs.settings {
                    prefs.apply(settings);
                }
            });
        });
}

fn specifications_grid(ui: &mut egui::Ui, product: &Product) {
    let specs = &product.specifications;
    let rows = [
        ("Dimensions", &specs.dimensions),
        ("Weight", &specs.weight),
        ("Material", &specs.material),
        ("Color", &specs.color),
    ];

    egui::Grid::new("specifications_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            for (label, value) in rows {
                if let Some(value) = value {
                    ui.label(label);
                    ui.label(value.as_str());
                    ui.end_row();
                }
            }
            ui.label("Stock");
            ui.label(if product.in_stock { "In stock" } else { "Out of stock" });
            ui.end_row();
        });
}

fn model_section(ui: &mut egui::Ui, report: &ModelReport) {
    let size = report.normalization.original_size;
    egui::CollapsingHeader::new("Model")
        .default_open(true)
        .show(ui, |ui| {
            egui::Grid::new("model_grid").num_columns(2).show(ui, |ui| {
                ui.label("Complexity");
                ui.label(report.complexity.tier.label());
                ui.end_row();
                ui.label("Triangles");
                ui.label(report.complexity.triangle_count.to_string());
                ui.end_row();
                ui.label("Meshes");
                ui.label(report.complexity.mesh_count.to_string());
                ui.end_row();
                ui.label("Original size");
                ui.label(format!("{:.2} × {:.2} × {:.2}", size.x, size.y, size.z));
                ui.end_row();
            });
        });
}

fn animation_section(ui: &mut egui::Ui, report: &ModelReport, actions: &mut MessageWriter<ViewerAction>) {
    let state = &report.animation;
    if state.clips().is_empty() {
        return;
    }

    egui::CollapsingHeader::new("Animations")
        .default_open(true)
        .show(ui, |ui| {
            for clip in state.clips() {
                let active = state.active() == Some(clip.as_str());
                if ui.selectable_label(active, clip.as_str()).clicked() {
                    actions.write(ViewerAction::Play(clip.clone()));
                }
            }
            ui.horizontal(|ui| {
                if ui.button("⏮").on_hover_text("Previous").clicked() {
                    actions.write(ViewerAction::Previous);
                }
                if state.is_playing() {
                    if ui.button("⏹").on_hover_text("Stop").clicked() {
                        actions.write(ViewerAction::Stop);
                    }
                } else if let Some(clip) = state.selected() {
                    if ui.button("▶").on_hover_text("Play").clicked() {
                        actions.write(ViewerAction::Play(clip.to_string()));
                    }
                }
                if ui.button("⏭").on_hover_text("Next").clicked() {
                    actions.write(ViewerAction::Next);
                }
            });
        });
}

fn settings_section(ui: &mut egui::Ui, settings: &mut ViewerSettings) {
    egui::CollapsingHeader::new("Viewer Settings")
        .default_open(false)
        .show(ui, |ui| {
            ui.checkbox(&mut settings.wireframe, "Wireframe");
            ui.checkbox(&mut settings.auto_rotate, "Auto-rotate");
            ui.add_enabled(
                settings.auto_rotate,
                egui::Slider::new(&mut settings.auto_rotate_speed, 0.0..=MAX_ROTATE_SPEED).text("Speed"),
            );
            ui.add(
                egui::Slider::new(&mut settings.scale_multiplier, MIN_SCALE_MULTIPLIER..=MAX_SCALE_MULTIPLIER)
                    .text("Scale"),
            );

            egui::ComboBox::from_label("Environment")
                .selected_text(settings.environment.label())
                .show_ui(ui, |ui| {
                    for preset in EnvironmentPreset::ALL {
                        ui.selectable_value(&mut settings.environment, preset, preset.label());
                    }
                });

            egui::ComboBox::from_label("Quality")
                .selected_text(settings.quality.label())
                .show_ui(ui, |ui| {
                    for quality in RenderQuality::ALL {
                        ui.selectable_value(&mut settings.quality, quality, quality.label());
                    }
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(42.5), "$42.50");
        assert_eq!(format_price(0.0), "$0.00");
    }

    #[test]
    fn test_session_status() {
        assert_eq!(session_status(&SessionState::NoModel), "No 3D model available");
        let failed = SessionState::Failed {
            url: "chair.glb".into(),
            error: "404".into(),
        };
        assert_eq!(session_status(&failed), "Failed to load model: 404");
    }
}
