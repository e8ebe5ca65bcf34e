//! Frame driver: owns the simulation, the parameter cache, pointer smoothing
//! and the audio zoom, and turns wall-clock ticks into substeps.

use bevy::log::{debug, info, warn};

use crate::error::{FluidError, StepFailure};
use crate::sim::audio::{AudioSource, ZoomControl};
use crate::sim::device::Device;
use crate::sim::heightfield::HeightFieldParams;
use crate::sim::params::{ParamName, SolverParams, Tunables};
use crate::sim::pointer::{PointerInput, PointerState};
use crate::sim::simulation::{Simulation, SimulationConfig};

/// Nominal frame length the timestep is expressed in.
pub const TARGET_FRAME_MS: f32 = 16.0;
/// Longer wall-clock gaps (tab switches, debugger pauses) are cut to this.
pub const MAX_FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDelta {
    pub delta_ms: f32,
    pub delta_frames: f32,
}

impl FrameDelta {
    /// Timestep handed to every substep of the frame.
    pub fn dt_ms(&self) -> f32 {
        TARGET_FRAME_MS * self.delta_frames
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// The first tick counts as one full frame. Time going backwards counts as zero.
    pub fn advance(&mut self, now_ms: f64) -> FrameDelta {
        let wall = match self.last_ms {
            Some(last) if now_ms.is_finite() => (now_ms - last).max(0.0),
            Some(_) => 0.0,
            None => MAX_FRAME_MS,
        };
        if now_ms.is_finite() {
            self.last_ms = Some(now_ms);
        }
        let delta_ms = wall.min(MAX_FRAME_MS) as f32;
        FrameDelta {
            delta_ms,
            delta_frames: delta_ms / MAX_FRAME_MS as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Uninitialized,
    Ready,
    Stepping,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub substeps: u32,
    pub dt_ms: f32,
    pub zoom: f32,
    pub generation: usize,
}

#[derive(Debug)]
pub struct SimulationDriver {
    state: DriverState,
    tunables: Tunables,
    snapshot: SolverParams,
    dirty: bool,
    upload_count: u64,
    pointer: PointerState,
    clock: FrameClock,
    zoom: ZoomControl,
    audio_ready: bool,
    simulation: Option<Simulation>,
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Uninitialized,
            tunables: Tunables::default(),
            snapshot: SolverParams::default(),
            dirty: true,
            upload_count: 0,
            pointer: PointerState::default(),
            clock: FrameClock::default(),
            zoom: ZoomControl::default(),
            audio_ready: false,
            simulation: None,
        }
    }

    /// Acquires the device and builds the particle buffers. Any previous
    /// simulation is replaced.
    pub fn initialize(&mut self, config: &SimulationConfig) -> Result<(), FluidError> {
        let device = Device::acquire()?;
        let simulation = Simulation::new(config, device)?;

        let layout = *simulation.layout();
        let grid = *simulation.grid();
        info!(
            "fluid initialized: {} particles ({} requested), {}x{} cells, {} sort passes, {} workers",
            layout.count,
            layout.requested,
            grid.cell_side_count(),
            grid.cell_side_count(),
            simulation.hash().sort_pass_count(),
            device.threads(),
        );

        self.tunables = Tunables {
            sim: config.params,
            pointer: config.pointer,
        };
        self.dirty = true;
        self.pointer = PointerState::default();
        self.clock = FrameClock::default();
        self.simulation = Some(simulation);
        self.upload_if_dirty();
        if let Some(sim) = self.simulation.as_mut() {
            sim.refresh_height_field(self.snapshot.h, &HeightFieldParams::from_zoom(self.zoom.zoom()));
        }
        self.state = DriverState::Ready;
        Ok(())
    }

    /// Tries to start audio input. Failure only disables the zoom wobble.
    pub fn attach_audio(&mut self, audio: &mut dyn AudioSource) -> bool {
        match audio.initialize() {
            Ok(()) => {
                info!("audio input attached");
                self.audio_ready = true;
            }
            Err(e) => {
                warn!("{e}; surface zoom stays at rest");
                self.audio_ready = false;
            }
        }
        self.audio_ready
    }

    /// Clamps `value` to the parameter's range and stores it. Returns the
    /// value actually stored. The solver sees it from the next step on.
    pub fn set_param(&mut self, name: ParamName, value: f32) -> Result<f32, FluidError> {
        let mut v = name.sanitize(value)?;
        if name == ParamName::H {
            if let Some(grid) = self.simulation.as_ref().map(Simulation::grid) {
                if !grid.fits_kernel(v) {
                    v = grid.cell_width();
                }
            }
        }
        if self.tunables.set(name, v) {
            debug!("{} = {v}", name.as_str());
            self.dirty = true;
        }
        Ok(v)
    }

    pub fn param(&self, name: ParamName) -> f32 {
        self.tunables.get(name)
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn apply_pointer(&mut self, input: PointerInput) {
        self.pointer.apply(input);
    }

    /// One animation frame at wall-clock time `now_ms`.
    pub fn tick(&mut self, now_ms: f64, audio: &mut dyn AudioSource) -> Result<FrameReport, FluidError> {
        if self.simulation.is_none() {
            return Err(FluidError::Uninitialized);
        }
        let delta = self.clock.advance(now_ms);
        if self.audio_ready {
            self.zoom.update_from(audio);
        } else {
            self.zoom.update(audio.current_value(), false);
        }
        self.pointer.update();
        self.frame(delta.dt_ms())
    }

    /// Runs `1 + STEPS` steps with the same `dt_ms`, then refreshes the
    /// height field. Pointer smoothing and the clock are left alone.
    pub fn frame(&mut self, dt_ms: f32) -> Result<FrameReport, FluidError> {
        if self.simulation.is_none() {
            return Err(FluidError::Uninitialized);
        }
        if !(dt_ms.is_finite() && dt_ms >= 0.0) {
            return Err(StepFailure::InvalidTimestep(dt_ms).into());
        }

        self.state = DriverState::Stepping;
        let dt = dt_ms / 1000.0;
        let substeps = 1 + self.tunables.sim.steps;
        for substep in 0..substeps {
            self.upload_if_dirty();
            let pointer = self.pointer.sample();
            let Some(sim) = self.simulation.as_mut() else {
                return Err(FluidError::Uninitialized);
            };
            let result = sim.step(&self.snapshot, &pointer, dt);
            if substep == 0 {
                self.pointer.clear_delta();
            }
            if let Err(e) = result {
                warn!("substep {substep} of {substeps} abandoned: {e}");
                self.state = DriverState::Ready;
                return Err(e.into());
            }
        }

        let zoom = self.zoom.zoom();
        let Some(sim) = self.simulation.as_mut() else {
            return Err(FluidError::Uninitialized);
        };
        sim.refresh_height_field(self.snapshot.h, &HeightFieldParams::from_zoom(zoom));
        self.state = DriverState::Ready;

        Ok(FrameReport {
            substeps,
            dt_ms,
            zoom,
            generation: sim.generation_index(),
        })
    }

    fn upload_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.snapshot = SolverParams::snapshot(&self.tunables.sim, &self.tunables.pointer);
        self.dirty = false;
        self.upload_count += 1;
        debug!("solver parameters uploaded ({})", self.upload_count);
    }

    /// How many times the solver parameters were rebuilt.
    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    /// Parameters the last step ran with.
    pub fn snapshot(&self) -> &SolverParams {
        &self.snapshot
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.zoom()
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_caps_and_normalizes() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(1000.0).delta_frames, 1.0);
        let d = clock.advance(1008.0);
        assert_eq!(d.delta_ms, 8.0);
        assert_eq!(d.dt_ms(), 8.0);
        assert_eq!(clock.advance(5000.0).delta_ms, 16.0);
        assert_eq!(clock.advance(4000.0).delta_ms, 0.0);
    }

    #[test]
    fn uninitialized_driver_refuses_frames() {
        let mut driver = SimulationDriver::new();
        assert_eq!(driver.frame(16.0).err(), Some(FluidError::Uninitialized));
        assert_eq!(driver.state(), DriverState::Uninitialized);
    }
}
