//! Particle State Store: two generations of position/velocity plus the
//! single-generation per-step outputs (density/pressure, force).

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::SetupError;

pub const MAX_PARTICLES: usize = 1 << 20;

/// Two slots of the same shape. `swap` exchanges the roles by index; the
/// slots are never reallocated or copied.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    slots: [T; 2],
    front: usize,
}

impl<T> PingPong<T> {
    pub fn new(front: T, back: T) -> Self {
        Self {
            slots: [front, back],
            front: 0,
        }
    }

    pub fn front(&self) -> &T {
        &self.slots[self.front]
    }

    pub fn front_mut(&mut self) -> &mut T {
        &mut self.slots[self.front]
    }

    pub fn back(&self) -> &T {
        &self.slots[1 - self.front]
    }

    /// Read the front while writing the back.
    pub fn split(&mut self) -> (&T, &mut T) {
        let (a, b) = self.slots.split_at_mut(1);
        if self.front == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    pub fn front_index(&self) -> usize {
        self.front
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleState {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl ParticleState {
    pub fn at_rest(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DensityPressure {
    pub density: f32,
    pub pressure: f32,
}

/// Particle buffer shape. The count is a perfect square so the particles
/// tile a `side x side` buffer; the sort runs over the power-of-two padded
/// square around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleLayout {
    pub requested: usize,
    pub side: usize,
    pub count: usize,
    pub buffer_side: usize,
    pub padded_count: usize,
}

impl ParticleLayout {
    /// Rounds `requested` up to the next perfect square.
    pub fn for_count(requested: usize) -> Result<Self, SetupError> {
        if requested == 0 {
            return Err(SetupError::ZeroParticles);
        }
        if requested > MAX_PARTICLES {
            return Err(SetupError::TooManyParticles {
                requested,
                max: MAX_PARTICLES,
            });
        }
        let mut side = (requested as f64).sqrt() as usize;
        while side * side < requested {
            side += 1;
        }
        let buffer_side = side.next_power_of_two();
        Ok(Self {
            requested,
            side,
            count: side * side,
            buffer_side,
            padded_count: buffer_side * buffer_side,
        })
    }

    /// Layout for exactly `count` particles, which must be a perfect square.
    pub fn exact(count: usize) -> Result<Self, SetupError> {
        let layout = Self::for_count(count)?;
        if layout.count != count {
            return Err(SetupError::NotSquare(count));
        }
        Ok(layout)
    }

    /// log2 of the padded record count; the sort network depth is derived from it.
    pub fn log_padded(&self) -> u32 {
        self.padded_count.trailing_zeros()
    }
}

#[derive(Debug)]
pub struct ParticleStore {
    layout: ParticleLayout,
    generations: PingPong<Vec<ParticleState>>,
    density_pressure: Vec<DensityPressure>,
    force: Vec<Vec2>,
}

/// Disjoint views of everything one step touches: the live generation is
/// read-only, everything else is written.
pub(crate) struct StepBuffers<'a> {
    pub current: &'a [ParticleState],
    pub next: &'a mut [ParticleState],
    pub density_pressure: &'a mut [DensityPressure],
    pub force: &'a mut [Vec2],
}

impl ParticleStore {
    pub fn new(layout: ParticleLayout, particles: Vec<ParticleState>) -> Result<Self, SetupError> {
        if particles.len() != layout.count {
            return Err(SetupError::CountMismatch {
                expected: layout.count,
                got: particles.len(),
            });
        }
        let next = particles.clone();
        Ok(Self {
            layout,
            generations: PingPong::new(particles, next),
            density_pressure: vec![DensityPressure::default(); layout.count],
            force: vec![Vec2::ZERO; layout.count],
        })
    }

    pub fn layout(&self) -> &ParticleLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.count
    }

    pub fn is_empty(&self) -> bool {
        self.layout.count == 0
    }

    /// The live generation.
    pub fn current(&self) -> &[ParticleState] {
        self.generations.front()
    }

    pub fn generation_index(&self) -> usize {
        self.generations.front_index()
    }

    pub fn density_pressure(&self) -> &[DensityPressure] {
        &self.density_pressure
    }

    pub fn forces(&self) -> &[Vec2] {
        &self.force
    }

    pub(crate) fn step_buffers(&mut self) -> StepBuffers<'_> {
        let (front, back) = self.generations.split();
        StepBuffers {
            current: front.as_slice(),
            next: back.as_mut_slice(),
            density_pressure: &mut self.density_pressure,
            force: &mut self.force,
        }
    }

    /// Publishes the freshly written generation.
    pub(crate) fn swap(&mut self) {
        self.generations.swap();
    }
}
