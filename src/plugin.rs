use bevy::prelude::*;
use bevy::render::RenderApp;

use crate::gpu::buffers::GpuFieldPlugin;
use crate::sim::audio::{AudioSource, Silence};
use crate::sim::driver::{DriverState, SimulationDriver};
use crate::sim::params::{ParamName, Tunables};
use crate::sim::pointer::PointerInput;
use crate::sim::simulation::SimulationConfig;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum FluidSet {
    /// Startup: device acquisition and particle setup.
    Init,
    /// Update: parameter sync, pointer, and the frame's substeps.
    Step,
}

#[derive(Resource, Clone, Debug)]
pub struct FluidConfig(pub SimulationConfig);

#[derive(Resource, Default, Debug, Deref, DerefMut)]
pub struct FluidSim(pub SimulationDriver);

/// Audio collaborator. Replace before `Startup` to feed real input.
#[derive(Resource)]
pub struct AudioInput(pub Box<dyn AudioSource>);

impl Default for AudioInput {
    fn default() -> Self {
        Self(Box::new(Silence))
    }
}

// ========================== systems ==================================

fn init_simulation(
    config: Res<FluidConfig>,
    mut sim: ResMut<FluidSim>,
    mut audio: ResMut<AudioInput>,
    mut tunables: ResMut<Tunables>,
) {
    if let Err(e) = sim.initialize(&config.0) {
        error!("fluid simulation failed to start: {e}");
        return;
    }
    sim.attach_audio(&mut *audio.0);
    *tunables = *sim.tunables();
}

// `Tunables` is the editable copy; values are clamped by the driver and
// written back without retriggering change detection.
fn sync_tunables(mut sim: ResMut<FluidSim>, mut tunables: ResMut<Tunables>) {
    if !tunables.is_changed() || sim.state() == DriverState::Uninitialized {
        return;
    }
    let wanted = *tunables;
    for name in ParamName::ALL {
        let value = wanted.get(name);
        if value == sim.param(name) {
            continue;
        }
        if let Err(e) = sim.set_param(name, value) {
            warn!("{e}");
        }
    }
    *tunables.bypass_change_detection() = *sim.tunables();
}

fn feed_pointer(pointer: Res<PointerInput>, mut sim: ResMut<FluidSim>) {
    sim.apply_pointer(*pointer);
}

fn advance_simulation(time: Res<Time>, mut sim: ResMut<FluidSim>, mut audio: ResMut<AudioInput>) {
    if sim.state() == DriverState::Uninitialized {
        return;
    }
    let now_ms = time.elapsed_secs_f64() * 1000.0;
    match sim.tick(now_ms, &mut *audio.0) {
        Ok(report) => trace!("frame done: {} substeps, dt {} ms", report.substeps, report.dt_ms),
        Err(e) if e.is_fatal() => error!("{e}"),
        // already logged by the driver; the next frame retries
        Err(_) => {}
    }
}

// =====================================================================

/// Runs the fluid on the compute task pool and, when rendering is enabled,
/// mirrors it to the GPU.
#[derive(Default)]
pub struct FluidSimPlugin {
    pub config: SimulationConfig,
}

impl Plugin for FluidSimPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(FluidConfig(self.config.clone()))
            .init_resource::<FluidSim>()
            .init_resource::<AudioInput>()
            .init_resource::<PointerInput>()
            .init_resource::<Tunables>()
            .add_systems(Startup, init_simulation.in_set(FluidSet::Init))
            .add_systems(
                Update,
                (sync_tunables, feed_pointer, advance_simulation)
                    .chain()
                    .in_set(FluidSet::Step),
            );

        if app.get_sub_app(RenderApp).is_some() {
            app.add_plugins(GpuFieldPlugin);
        }
    }
}
