//! Per-particle net force: pressure, viscosity, domain boundary and pointer.
//!
//! Boundary and pointer terms are expressed as accelerations scaled by the
//! particle's own density, so they act the same on dense and sparse regions
//! once the integrator divides by density.

use glam::Vec2;

use crate::sim::device::Device;
use crate::sim::kernels::{spiky_pressure, viscosity};
use crate::sim::params::{PointerParams, SolverParams};
use crate::sim::pointer::PointerSample;
use crate::sim::spatial::{GridConfig, SpatialHash};
use crate::sim::store::{DensityPressure, ParticleState};

/// Penalty stiffness of the domain walls, per unit of overshoot.
pub const BOUNDARY_STIFFNESS: f32 = 2000.0;
/// Pointer displacement is per target frame; this turns it into a speed.
pub const TARGET_FRAME_SECONDS: f32 = 0.016;

#[inline]
pub fn fluid_force(
    i: usize,
    particles: &[ParticleState],
    dp: &[DensityPressure],
    hash: &SpatialHash,
    params: &SolverParams,
) -> Vec2 {
    let ParticleState {
        position: pos_i,
        velocity: vel_i,
    } = particles[i];
    let p_i = dp[i].pressure;
    let mut f = Vec2::ZERO;

    hash.for_each_neighbor(pos_i, |j| {
        if i == j {
            return;
        }
        let d = pos_i - particles[j].position;
        let r = d.length();
        if r == 0.0 || r >= params.h {
            return;
        }
        let rho_j = dp[j].density;
        f += spiky_pressure(d, r, p_i, dp[j].pressure, rho_j, params);
        f += viscosity(r, vel_i, particles[j].velocity, rho_j, params);
    });
    f
}

/// Soft walls at the domain edge; zero anywhere inside.
#[inline]
pub fn boundary_force(position: Vec2, density: f32, grid: &GridConfig) -> Vec2 {
    let over = position.abs() - grid.half_extent();
    let push = |o: f32, x: f32| if o > 0.0 { -x.signum() * o * BOUNDARY_STIFFNESS } else { 0.0 };
    Vec2::new(push(over.x, position.x), push(over.y, position.y)) * density
}

/// Radial push away from the smoothed pointer, proportional to how fast the
/// pointer moved this frame. Exactly zero at or beyond `radius`.
#[inline]
pub fn pointer_force(position: Vec2, density: f32, pointer: &PointerSample, params: &PointerParams) -> Vec2 {
    let speed = pointer.delta.length() / TARGET_FRAME_SECONDS;
    if speed == 0.0 {
        return Vec2::ZERO;
    }
    let d = position - pointer.position;
    let dist = d.length();
    if dist == 0.0 || dist >= params.radius {
        return Vec2::ZERO;
    }
    let falloff = 1.0 - dist / params.radius;
    (d / dist) * params.strength * speed * falloff * falloff * density
}

pub fn compute(
    device: &Device,
    particles: &[ParticleState],
    dp: &[DensityPressure],
    hash: &SpatialHash,
    params: &SolverParams,
    pointer: &PointerSample,
    out: &mut [Vec2],
) {
    let grid = hash.grid();
    device.dispatch(out, |i, f| {
        let pos = particles[i].position;
        let rho = dp[i].density;
        *f = fluid_force(i, particles, dp, hash, params)
            + boundary_force(pos, rho, grid)
            + pointer_force(pos, rho, pointer, &params.pointer);
    });
}
