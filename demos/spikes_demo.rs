use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_spike_fluid::sim::pointer::PointerInput;
use bevy_spike_fluid::{FluidSet, FluidSim, FluidSimPlugin, SimulationConfig, Tunables};

const RENDER_SCALE: f32 = 60.0; // pixels per simulation unit
const PARTICLE_SIZE: f32 = 8.0;
const CYAN: Color = Color::srgb(0.0, 1.0, 1.0);

#[derive(Component)]
struct ParticleVisual(usize);

fn main() {
    App::new()
        .add_plugins((DefaultPlugins, FrameTimeDiagnosticsPlugin::default()))
        .insert_resource(ClearColor(Color::Srgba(
            bevy::color::palettes::css::DARK_SLATE_GRAY,
        )))
        .add_plugins(FluidSimPlugin {
            config: SimulationConfig {
                particle_count: 1024,
                ..default()
            },
        })
        .add_systems(Startup, setup.after(FluidSet::Init))
        .add_systems(
            Update,
            (
                (track_pointer, tweak_params).before(FluidSet::Step),
                sync_sprites.after(FluidSet::Step),
                log_fps,
            ),
        )
        .run();
}

fn setup(mut commands: Commands, sim: Res<FluidSim>) {
    commands.spawn(Camera2d);

    let Some(simulation) = sim.simulation() else {
        return;
    };
    // one sprite per particle
    for (i, p) in simulation.particles().iter().enumerate() {
        commands.spawn((
            Sprite {
                color: CYAN,
                custom_size: Some(Vec2::splat(PARTICLE_SIZE)),
                ..default()
            },
            Transform::from_xyz(p.position.x * RENDER_SCALE, p.position.y * RENDER_SCALE, 0.0),
            ParticleVisual(i),
        ));
    }
}

// cursor in window pixels -> simulation plane
fn track_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut pointer: ResMut<PointerInput>,
) {
    let (Ok(window), Ok((camera, camera_tf))) = (windows.single(), cameras.single()) else {
        return;
    };
    let world = window
        .cursor_position()
        .and_then(|cursor| camera.viewport_to_world_2d(camera_tf, cursor).ok());
    let Some(world) = world else {
        pointer.down = false;
        return;
    };
    let p = world / RENDER_SCALE;
    *pointer = PointerInput {
        position: glam::Vec2::new(p.x, p.y),
        down: buttons.pressed(MouseButton::Left),
    };
}

// up/down: substeps, left/right: stiffness. The plugin clamps.
fn tweak_params(keys: Res<ButtonInput<KeyCode>>, mut tunables: ResMut<Tunables>) {
    if keys.just_pressed(KeyCode::ArrowUp) {
        tunables.sim.steps += 1;
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        tunables.sim.steps = tunables.sim.steps.saturating_sub(1);
    }
    if keys.just_pressed(KeyCode::ArrowRight) {
        tunables.sim.gas_const *= 1.25;
    }
    if keys.just_pressed(KeyCode::ArrowLeft) {
        tunables.sim.gas_const /= 1.25;
    }
}

fn sync_sprites(sim: Res<FluidSim>, mut q: Query<(&ParticleVisual, &mut Transform)>) {
    let Some(simulation) = sim.simulation() else {
        return;
    };
    let particles = simulation.particles();
    for (vis, mut tf) in &mut q {
        let p = particles[vis.0].position;
        tf.translation.x = p.x * RENDER_SCALE;
        tf.translation.y = p.y * RENDER_SCALE;
    }
}

fn log_fps(diagnostics: Res<DiagnosticsStore>, sim: Res<FluidSim>, mut counter: Local<u32>) {
    *counter += 1;
    if *counter < 120 {
        return;
    }
    *counter = 0;

    if let Some(avg) = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.average())
    {
        info!(
            "==== Average FPS over last ~2 s: {:.1} (zoom {:.2}, {} uploads) ====",
            avg,
            sim.zoom(),
            sim.upload_count()
        );
    }
}
