//! One full SPH step over the particle store, and the setup that builds it.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::error::{SetupError, StepFailure};
use crate::sim::device::Device;
use crate::sim::heightfield::{self, HeightField, HeightFieldParams};
use crate::sim::params::{PointerParams, SimulationParams, SolverParams};
use crate::sim::pointer::PointerSample;
use crate::sim::spatial::{GridConfig, SpatialHash};
use crate::sim::store::{DensityPressure, ParticleLayout, ParticleState, ParticleStore};
use crate::sim::{density, force, integrate};

/// Where the particles start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialLayout {
    /// Uniformly scattered over `[-half_extent, half_extent]²`, seeded.
    RandomSquare { half_extent: f32 },
    /// Centred `side x side` lattice at rest.
    Lattice { spacing: f32 },
}

impl InitialLayout {
    pub fn generate(self, layout: &ParticleLayout, seed: u64) -> Result<Vec<ParticleState>, SetupError> {
        match self {
            InitialLayout::RandomSquare { half_extent: e } => {
                if !(e > 0.0 && e.is_finite()) {
                    return Err(SetupError::InvalidDomain { x: e, y: e });
                }
                let mut rng = Pcg32::seed_from_u64(seed);
                Ok((0..layout.count)
                    .map(|_| {
                        let x = rng.gen_range(-e..e);
                        let y = rng.gen_range(-e..e);
                        ParticleState::at_rest(Vec2::new(x, y))
                    })
                    .collect())
            }
            InitialLayout::Lattice { spacing } => {
                if !(spacing > 0.0 && spacing.is_finite()) {
                    return Err(SetupError::InvalidDomain { x: spacing, y: spacing });
                }
                Ok(lattice(layout.side, spacing))
            }
        }
    }
}

/// `side x side` particles at rest, centred on the origin.
pub fn lattice(side: usize, spacing: f32) -> Vec<ParticleState> {
    let centre = (side as f32 - 1.0) * 0.5;
    (0..side * side)
        .map(|k| {
            let g = Vec2::new((k % side) as f32, (k / side) as f32);
            ParticleState::at_rest((g - centre) * spacing)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Rounded up to the next perfect square.
    pub particle_count: usize,
    pub domain_scale: Vec2,
    /// `None` fits the grid to the kernel radius.
    pub cell_side_count: Option<u32>,
    pub params: SimulationParams,
    pub pointer: PointerParams,
    pub height_field_side: u32,
    pub layout: InitialLayout,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 500,
            domain_scale: Vec2::splat(8.0),
            cell_side_count: None,
            params: SimulationParams::default(),
            pointer: PointerParams::default(),
            height_field_side: heightfield::DEFAULT_SIDE,
            layout: InitialLayout::RandomSquare { half_extent: 1.0 },
            seed: 0x5eed,
        }
    }
}

#[derive(Debug)]
pub struct Simulation {
    device: Device,
    store: ParticleStore,
    hash: SpatialHash,
    height_field: HeightField,
}

impl Simulation {
    pub fn new(config: &SimulationConfig, device: Device) -> Result<Self, SetupError> {
        config.params.validate()?;
        config.pointer.validate()?;

        let grid = match config.cell_side_count {
            Some(n) => GridConfig::new(config.domain_scale, n)?,
            None => GridConfig::fitted(config.domain_scale, config.params.h)?,
        };
        // a wider kernel would reach past the 3x3 window
        if !grid.fits_kernel(config.params.h) {
            return Err(SetupError::InvalidKernelRadius(config.params.h));
        }

        let layout = ParticleLayout::for_count(config.particle_count)?;
        let particles = config.layout.generate(&layout, config.seed)?;
        Self::assemble(grid, layout, particles, device, config.height_field_side)
    }

    /// Starts from explicit states. Their count must be a perfect square.
    pub fn from_particles(
        grid: GridConfig,
        particles: Vec<ParticleState>,
        device: Device,
        height_field_side: u32,
    ) -> Result<Self, SetupError> {
        let layout = ParticleLayout::exact(particles.len())?;
        Self::assemble(grid, layout, particles, device, height_field_side)
    }

    fn assemble(
        grid: GridConfig,
        layout: ParticleLayout,
        particles: Vec<ParticleState>,
        device: Device,
        height_field_side: u32,
    ) -> Result<Self, SetupError> {
        Ok(Self {
            device,
            store: ParticleStore::new(layout, particles)?,
            hash: SpatialHash::new(grid, &layout),
            height_field: HeightField::new(height_field_side)?,
        })
    }

    /// Hash, density, force, integrate, then publish. `dt` is in seconds.
    ///
    /// On failure the freshly written generation is dropped and the live one
    /// stays as it was.
    pub fn step(&mut self, params: &SolverParams, pointer: &PointerSample, dt: f32) -> Result<(), StepFailure> {
        let device = &self.device;
        let bufs = self.store.step_buffers();

        self.hash.build(device, bufs.current);
        density::compute(device, bufs.current, &self.hash, params, &mut *bufs.density_pressure);
        force::compute(
            device,
            bufs.current,
            &*bufs.density_pressure,
            &self.hash,
            params,
            pointer,
            &mut *bufs.force,
        );
        integrate::compute(device, bufs.current, &*bufs.force, &*bufs.density_pressure, dt, bufs.next)?;

        self.store.swap();
        Ok(())
    }

    /// Rebuilds the hash on the live generation and resamples the surface.
    pub fn refresh_height_field(&mut self, h: f32, params: &HeightFieldParams) {
        let particles = self.store.current();
        self.hash.build(&self.device, particles);
        self.height_field.render(&self.device, particles, &self.hash, h, params);
    }

    pub fn particles(&self) -> &[ParticleState] {
        self.store.current()
    }

    pub fn density_pressure(&self) -> &[DensityPressure] {
        self.store.density_pressure()
    }

    pub fn forces(&self) -> &[Vec2] {
        self.store.forces()
    }

    pub fn hash(&self) -> &SpatialHash {
        &self.hash
    }

    pub fn grid(&self) -> &GridConfig {
        self.hash.grid()
    }

    pub fn layout(&self) -> &ParticleLayout {
        self.store.layout()
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    pub fn generation_index(&self) -> usize {
        self.store.generation_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_centred() {
        let p = lattice(3, 0.5);
        assert_eq!(p.len(), 9);
        assert_eq!(p[0].position, Vec2::splat(-0.5));
        assert_eq!(p[4].position, Vec2::ZERO);
        assert_eq!(p[8].position, Vec2::splat(0.5));
    }

    #[test]
    fn random_square_is_seeded_and_bounded() {
        let layout = ParticleLayout::for_count(100).unwrap();
        let a = InitialLayout::RandomSquare { half_extent: 1.0 }.generate(&layout, 7).unwrap();
        let b = InitialLayout::RandomSquare { half_extent: 1.0 }.generate(&layout, 7).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.position.abs().max_element() <= 1.0 && s.velocity == Vec2::ZERO));
    }

    #[test]
    fn kernel_wider_than_cell_is_rejected() {
        let config = SimulationConfig {
            cell_side_count: Some(16),
            ..Default::default()
        };
        let device = Device::acquire().unwrap();
        assert_eq!(
            Simulation::new(&config, device).err(),
            Some(SetupError::InvalidKernelRadius(1.0))
        );
    }
}
