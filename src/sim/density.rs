use crate::sim::device::Device;
use crate::sim::kernels::poly6;
use crate::sim::params::SolverParams;
use crate::sim::spatial::SpatialHash;
use crate::sim::store::{DensityPressure, ParticleState};

/// Kernel-weighted mass sum over the 3x3 cell window, self included.
#[inline]
pub fn density_at(i: usize, particles: &[ParticleState], hash: &SpatialHash, params: &SolverParams) -> f32 {
    let pos_i = particles[i].position;
    let mut rho = 0.0;
    hash.for_each_neighbor(pos_i, |j| {
        let r2 = (pos_i - particles[j].position).length_squared();
        rho += poly6(r2, params);
    });
    rho
}

// negative pressure would attract, so it is clamped away
#[inline]
pub fn pressure_from_density(rho: f32, params: &SolverParams) -> f32 {
    params.gas_const * (rho - params.rest_density).max(0.0)
}

pub fn compute(
    device: &Device,
    particles: &[ParticleState],
    hash: &SpatialHash,
    params: &SolverParams,
    out: &mut [DensityPressure],
) {
    device.dispatch(out, |i, dp| {
        let density = density_at(i, particles, hash, params);
        *dp = DensityPressure {
            density,
            pressure: pressure_from_density(density, params),
        };
    });
}
