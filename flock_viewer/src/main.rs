use flock_sim::glam::Vec3 as SimVec3;
use flock_sim::{Flock, FlockConfig, PointMass, PointMassFactory, Species};
use macroquad::prelude::*;
use tracing::{info, warn};

mod player;
mod ui;

use player::Player;
use ui::{UIState, render_collapsed_params_button, render_parameter_panel};

/// Longest step handed to the flock in a single frame.
const MAX_FRAME_DT: f32 = 0.05;

fn window_conf() -> Conf {
    Conf {
        window_title: "Flock".to_owned(),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        ..Default::default()
    }
}

fn to_screen(v: SimVec3) -> Vec3 {
    vec3(v.x, v.y, v.z)
}

fn spawn(config: FlockConfig) -> Result<Flock<PointMass>, flock_sim::FlockError> {
    let seed = u64::from(rand::rand());
    Flock::initialise(config, &mut PointMassFactory, seed)
}

fn draw_arena(config: &FlockConfig) {
    let arena = &config.arena;
    let w = arena.wall_half_extent;
    let wire = Color::from_rgba(90, 90, 110, 255);
    for y in [arena.floor, arena.ceiling] {
        let corners = [vec3(-w, y, -w), vec3(w, y, -w), vec3(w, y, w), vec3(-w, y, w)];
        for i in 0..4 {
            draw_line_3d(corners[i], corners[(i + 1) % 4], wire);
        }
    }
    draw_grid(
        arena.grid_dimension() as u32,
        arena.cell_size,
        Color::from_rgba(60, 60, 70, 255),
        Color::from_rgba(40, 40, 48, 255),
    );
}

fn draw_agents(flock: &Flock<PointMass>) {
    for agent in flock.agents().iter().filter(|a| a.is_enabled()) {
        let pos = to_screen(agent.position());
        let heading = to_screen(agent.velocity().normalize_or_zero());
        let (size, color) = match agent.species() {
            Species::Small => (0.8, Color::from_rgba(220, 60, 50, 255)),
            Species::Big => (1.4, Color::from_rgba(250, 150, 40, 255)),
        };
        draw_cube(pos, vec3(size, size, size), None, color);
        draw_line_3d(pos, pos + heading * size * 2.5, color);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut draft = FlockConfig::default();
    let mut flock = match spawn(draft) {
        Ok(flock) => flock,
        Err(err) => {
            warn!(error = %err, "default flock failed to spawn");
            return;
        }
    };
    let mut player = Player::new();
    let mut ui_state = UIState::default();

    loop {
        clear_background(Color::from_rgba(12, 12, 18, 255));
        let dt = get_frame_time().min(MAX_FRAME_DT);

        if is_key_pressed(KeyCode::P) {
            ui_state.params_collapsed = !ui_state.params_collapsed;
        }

        player.apply_controls(dt, flock.config().arena.wall_half_extent);
        flock.tick(dt, &[player.repulsor()]);
        for body in flock.active_bodies_mut() {
            body.advance(dt);
        }
        if is_key_pressed(KeyCode::Space) {
            if let Some(index) = player.try_catch(&mut flock) {
                info!(index, caught = player.caught, "caught agent");
            }
        }

        set_camera(&player.camera());
        draw_arena(flock.config());
        draw_agents(&flock);
        player.draw();

        set_default_camera();

        let mut should_restart = false;
        let active = flock.enabled_count();
        egui_macroquad::ui(|egui_ctx| {
            let controls =
                render_parameter_panel(egui_ctx, &mut draft, &mut ui_state, player.caught, active);
            render_collapsed_params_button(egui_ctx, &mut ui_state);
            should_restart = controls.should_restart;
        });

        if is_key_pressed(KeyCode::Enter) || should_restart {
            match spawn(draft) {
                Ok(fresh) => {
                    flock = fresh;
                    player = Player::new();
                    ui_state.error = None;
                }
                Err(err) => {
                    warn!(error = %err, "restart rejected, keeping current flock");
                    ui_state.error = Some(err.to_string());
                }
            }
        }

        draw_text(
            "WASD move  Q/E height  Space catch  P panel",
            10.0,
            screen_height() - 12.0,
            20.0,
            GRAY,
        );

        egui_macroquad::draw();
        next_frame().await
    }
}
