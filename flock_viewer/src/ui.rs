use egui_macroquad::egui;
use flock_sim::{FlockConfig, WallPolicy};

pub struct UIState {
    pub params_collapsed: bool,
    /// Message from the last rejected restart, if any.
    pub error: Option<String>,
}

impl Default for UIState {
    fn default() -> Self {
        Self {
            params_collapsed: false,
            error: None,
        }
    }
}

#[derive(Default)]
pub struct UIControls {
    pub should_restart: bool,
}

fn slider(ui: &mut egui::Ui, label: &str, value: &mut f32, range: std::ops::RangeInclusive<f32>) {
    ui.vertical(|ui| {
        ui.label(label);
        ui.add(egui::Slider::new(value, range));
    });
}

/// Edits a draft configuration. Tunables never change under a running flock;
/// the draft only takes effect when the flock is restarted with it.
pub fn render_parameter_panel(
    egui_ctx: &egui::Context,
    draft: &mut FlockConfig,
    ui_state: &mut UIState,
    caught: usize,
    active: usize,
) -> UIControls {
    let mut controls = UIControls::default();

    if ui_state.params_collapsed {
        return controls;
    }

    egui::Window::new("##params")
        .title_bar(false)
        .default_pos(egui::pos2(10.0, 10.0))
        .resizable(false)
        .show(egui_ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Flock");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("X [p]").clicked() {
                        ui_state.params_collapsed = true;
                    }
                });
            });
            ui.label(format!("active {active}  caught {caught}"));

            ui.separator();
            egui::Frame::new()
                .fill(egui::Color32::from_rgb(60, 60, 60))
                .inner_margin(egui::Margin::same(8))
                .corner_radius(4.0)
                .show(ui, |ui| {
                    let mut style = (*ui.ctx().style()).clone();
                    style.visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(30, 30, 30);
                    style.visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(40, 40, 40);
                    style.visuals.widgets.active.bg_fill = egui::Color32::from_rgb(50, 50, 50);
                    ui.ctx().set_style(style);

                    let law = &mut draft.force_law;
                    ui.heading("Force Law");
                    ui.horizontal(|ui| {
                        slider(ui, "Separation Radius", &mut law.separation_radius, 1.0..=60.0);
                        slider(ui, "Separation Factor", &mut law.separation_factor, 0.0..=10.0);
                    });
                    ui.horizontal(|ui| {
                        slider(ui, "Cohesion Radius", &mut law.cohesion_radius, 1.0..=60.0);
                        slider(ui, "Cohesion Factor", &mut law.cohesion_factor, 0.0..=10.0);
                    });
                    ui.horizontal(|ui| {
                        slider(ui, "Alignment Radius", &mut law.alignment_radius, 1.0..=60.0);
                        slider(ui, "Alignment Factor", &mut law.alignment_factor, 0.0..=10.0);
                    });
                    ui.horizontal(|ui| {
                        slider(ui, "Seek Speed", &mut law.seek_speed, 0.0..=50.0);
                        slider(ui, "Repulsor Weight", &mut law.repulsor_weight, 0.0..=50.0);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Walls");
                        egui::ComboBox::from_id_salt("wall_policy")
                            .selected_text(format!("{:?}", law.wall_policy))
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut law.wall_policy, WallPolicy::Linear, "Linear");
                                ui.selectable_value(
                                    &mut law.wall_policy,
                                    WallPolicy::Quadratic,
                                    "Quadratic",
                                );
                            });
                    });
                });

            ui.add_space(6.0);

            egui::Frame::new()
                .fill(egui::Color32::from_rgb(40, 50, 80))
                .inner_margin(egui::Margin::same(8))
                .corner_radius(4.0)
                .show(ui, |ui| {
                    ui.heading("Population & Speed");
                    ui.horizontal(|ui| {
                        ui.vertical(|ui| {
                            ui.label("Small");
                            ui.add(egui::Slider::new(&mut draft.population.small, 0..=2000));
                        });
                        ui.vertical(|ui| {
                            ui.label("Big");
                            ui.add(egui::Slider::new(&mut draft.population.big, 0..=2000));
                        });
                    });
                    ui.horizontal(|ui| {
                        slider(ui, "Min Speed", &mut draft.speed.min, 0.0..=50.0);
                        slider(ui, "Max Speed", &mut draft.speed.max, 1.0..=300.0);
                    });
                    ui.horizontal(|ui| {
                        if ui.button("Restart [enter]").clicked() {
                            controls.should_restart = true;
                        }
                        if ui.button("Defaults").clicked() {
                            *draft = FlockConfig::default();
                        }
                    });
                    if let Some(error) = &ui_state.error {
                        ui.colored_label(egui::Color32::from_rgb(255, 90, 90), error);
                    }
                });
        });

    controls
}

pub fn render_collapsed_params_button(egui_ctx: &egui::Context, ui_state: &mut UIState) {
    if ui_state.params_collapsed {
        egui::Window::new("##collapsed_params")
            .title_bar(false)
            .fixed_pos(egui::pos2(10.0, 10.0))
            .fixed_size(egui::vec2(65.0, 40.0))
            .frame(
                egui::Frame::new()
                    .fill(egui::Color32::from_rgb(60, 60, 60))
                    .corner_radius(4.0),
            )
            .resizable(false)
            .show(egui_ctx, |ui| {
                if ui.button("≡ [p]").clicked() {
                    ui_state.params_collapsed = false;
                }
            });
    }
}
