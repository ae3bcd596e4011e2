//! UI panels for the application
//!
//! Sidebar (search, location, route, history, data and map settings), the
//! sidebar toggle button, toasts and the help window.

use crate::app::notify::{Notifier, ToastKind};
use crate::app::state::{AppState, TilesProvider};
use egui::{Color32, RichText, Ui};
use facility_finder_lib::utils;

/// Side length of the sidebar toggle, in points
const TOGGLE_SIZE: f32 = 40.0;

/// Sidebar toggle overlaid on the top-right corner of the map
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let open = state.ui_settings.sidebar_open;
    let (icon, hint) = if open {
        ("✕", "Hide sidebar")
    } else {
        ("☰", "Show sidebar")
    };

    let corner = ui.max_rect().right_top() + egui::vec2(-TOGGLE_SIZE - 10.0, 10.0);
    let area = egui::Rect::from_min_size(corner, egui::Vec2::splat(TOGGLE_SIZE));
    let button = egui::Button::new(RichText::new(icon).size(20.0))
        .min_size(egui::Vec2::splat(TOGGLE_SIZE))
        .corner_radius(5.0);

    if ui.put(area, button).on_hover_text(hint).clicked() {
        state.ui_settings.sidebar_open = !open;
    }
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    if screen_size.y > screen_size.x {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(300.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    }
}

fn render_sidebar_content(ui: &mut Ui, state: &mut AppState) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            render_search_section(ui, state);
            section_separator(ui);
            render_location_section(ui, state);
            section_separator(ui);
            render_history_section(ui, &state.notifier);
            section_separator(ui);
            render_data_section(ui, state);
            section_separator(ui);
            render_map_section(ui, state);
        });
}

fn section_separator(ui: &mut Ui) {
    ui.add_space(8.0);
    ui.separator();
    ui.add_space(6.0);
}

/// Category picker, "Find nearest" and the active route
fn render_search_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🔍 Find Nearest").strong());
    ui.add_space(6.0);

    let categories = state.store.categories();
    let selected_text = if state.ui_settings.selected_category.is_empty() {
        "Select a category".to_string()
    } else {
        state.ui_settings.selected_category.clone()
    };

    ui.horizontal(|ui| {
        egui::ComboBox::from_id_salt("category_picker")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for category in &categories {
                    ui.selectable_value(
                        &mut state.ui_settings.selected_category,
                        category.as_str().to_string(),
                        category.as_str(),
                    );
                }
            });

        if ui.button("🧭 Find nearest").clicked() {
            state.find_nearest();
        }
    });

    if let Some((label, distance)) = state.route_summary() {
        ui.add_space(6.0);
        egui::Grid::new("route_grid")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("Route to:");
                ui.label(RichText::new(label).strong());
                ui.end_row();

                ui.label("Distance:");
                ui.label(RichText::new(utils::format_distance(distance)).strong());
                ui.end_row();
            });
    }
}

fn render_location_section(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("📍 Location").strong());
    ui.add_space(4.0);

    let color = if state.session.position().is_some() {
        Color32::GREEN
    } else {
        ui.visuals().warn_fg_color
    };
    ui.label(RichText::new(state.location_status_text()).color(color));
    ui.label(RichText::new(state.location.describe()).small().weak());

    let notified = state.session.watcher().notified().len();
    if notified > 0 {
        ui.label(
            RichText::new(format!("{} facilities announced nearby", notified))
                .small()
                .weak(),
        );
    }
}

fn render_history_section(ui: &mut Ui, notifier: &Notifier) {
    ui.label(RichText::new("🔔 Notifications").strong());
    ui.add_space(4.0);

    if notifier.history().is_empty() {
        ui.label(RichText::new("Nothing nearby yet").small().weak());
        return;
    }

    egui::ScrollArea::vertical()
        .id_salt("history_scroll")
        .max_height(140.0)
        .show(ui, |ui| {
            for notification in notifier.history().iter().rev() {
                ui.label(RichText::new(format!("• {}", notification.body)).small());
            }
        });
}

/// Data set info, per-category counts and the file picker button
fn render_data_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("📊 Facilities").strong());
    ui.add_space(4.0);

    ui.label(RichText::new(&state.data.source).small().weak());

    if state.data.loading {
        ui.label(
            RichText::new("⏳ Loading facilities...")
                .strong()
                .color(ui.visuals().warn_fg_color),
        );
    }

    if let Some(error) = &state.data.error {
        ui.label(RichText::new(format!("⚠ {}", error)).small().color(Color32::RED));
    }

    let layer = state.map_layer.snapshot();
    egui::Grid::new("category_counts")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Total:");
            ui.label(RichText::new(format!("{}", state.store.len())).strong());
            ui.end_row();

            for category in state.store.categories() {
                ui.label(
                    RichText::new(format!("● {}", category)).color(layer.color_for(&category)),
                );
                ui.label(format!("{}", state.store.count_in(&category)));
                ui.end_row();
            }
        });

    #[cfg(not(target_arch = "wasm32"))]
    {
        ui.add_space(6.0);
        if ui.button("📂 Open facilities...").clicked() {
            state.data.show_picker = true;
        }
    }
}

fn render_map_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🗺 Map").strong());
    ui.add_space(6.0);

    for provider in TilesProvider::all() {
        let selected = state.ui_settings.tiles_provider == *provider;
        if ui.selectable_label(selected, provider.name()).clicked() {
            state.ui_settings.tiles_provider = *provider;
        }
    }

    ui.add_space(6.0);
    ui.horizontal(|ui| {
        ui.label("Route width:");
        ui.add(
            egui::Slider::new(&mut state.ui_settings.route_width, 1.0..=10.0)
                .suffix(" px")
                .step_by(0.5),
        );
    });

    ui.add_space(4.0);
    ui.label(RichText::new("Keyboard shortcuts:").small());
    ui.label(RichText::new("  F1 / Ctrl+H - Toggle help").small().weak());
    ui.label(RichText::new("  Ctrl+F - Find nearest").small().weak());
}

/// Show file picker dialog
#[cfg(not(target_arch = "wasm32"))]
pub fn show_file_picker(ctx: &egui::Context, state: &mut AppState) {
    if !state.data.show_picker {
        return;
    }
    state.data.show_picker = false;

    if let Some(path) = rfd::FileDialog::new()
        .add_filter("Facility JSON", &["json"])
        .set_title("Select facility data")
        .pick_file()
    {
        state.start_load(path.to_string_lossy().to_string(), ctx);
    }
}

/// Toasts stacked at the top center of the map
pub fn render_toasts(ctx: &egui::Context, notifier: &mut Notifier, now: instant::Instant) {
    let toasts = notifier.visible_toasts(now);
    if toasts.is_empty() {
        return;
    }

    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::CENTER_TOP, [0.0, 12.0])
        .order(egui::Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| {
            for toast in toasts {
                ui.scope(|ui| {
                    ui.set_opacity(toast.alpha(now));
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        match toast.kind {
                            ToastKind::Notification => {
                                ui.label(RichText::new(format!("🔔 {}", toast.title)).strong());
                                ui.label(&toast.body);
                            }
                            ToastKind::Info => {
                                ui.label(format!("ℹ {}", toast.body));
                            }
                        }
                    });
                });
                ui.add_space(6.0);
            }
        });
}

/// Help overlay
pub fn help_overlay(ctx: &egui::Context, show_help: &mut bool) {
    egui::Window::new("Help")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("Facility Finder");
            ui.add_space(8.0);

            ui.label("Shows facilities around you and tells you when one is close.");
            ui.add_space(12.0);

            ui.label(RichText::new("Finding Facilities").strong());
            ui.label("• Pick a category in the sidebar");
            ui.label("• Click 'Find nearest' to draw a route to the closest one");
            ui.label("• The route follows you as you move");
            ui.add_space(8.0);

            ui.label(RichText::new("Notifications").strong());
            ui.label("• You are notified once per facility when within 150 m");
            ui.label("• Red pulsing circles mark crowded areas");
            ui.add_space(8.0);

            ui.label(RichText::new("Keyboard Shortcuts").strong());
            ui.label("• F1 or Ctrl+H - Toggle this help");
            ui.label("• Ctrl+F - Find nearest of the selected category");
            ui.add_space(12.0);

            if ui.button("Close").clicked() {
                *show_help = false;
            }
        });
}
