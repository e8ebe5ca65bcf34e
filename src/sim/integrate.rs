use glam::Vec2;

use crate::error::StepFailure;
use crate::sim::device::Device;
use crate::sim::store::{DensityPressure, ParticleState};

/// Semi-implicit Euler: velocity first, then position with the new velocity.
#[inline]
pub fn advance(state: ParticleState, force: Vec2, density: f32, dt: f32) -> ParticleState {
    let accel = if density > 0.0 { force / density } else { Vec2::ZERO };
    let velocity = state.velocity + accel * dt;
    ParticleState {
        position: state.position + velocity * dt,
        velocity,
    }
}

/// Writes the next generation from the current one. `dt` is in seconds.
/// A non-finite result fails the step; the caller must not publish `next`.
pub fn compute(
    device: &Device,
    current: &[ParticleState],
    force: &[Vec2],
    dp: &[DensityPressure],
    dt: f32,
    next: &mut [ParticleState],
) -> Result<(), StepFailure> {
    device.dispatch(next, |i, out| {
        *out = advance(current[i], force[i], dp[i].density, dt);
    });

    match next.iter().position(|s| !s.is_finite()) {
        Some(particle) => Err(StepFailure::NonFinite { particle }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_updates_before_position() {
        let s = ParticleState::at_rest(Vec2::ZERO);
        let n = advance(s, Vec2::new(2.0, 0.0), 2.0, 0.5);
        assert_eq!(n.velocity, Vec2::new(0.5, 0.0));
        assert_eq!(n.position, Vec2::new(0.25, 0.0));
    }

    #[test]
    fn zero_density_means_no_acceleration() {
        let s = ParticleState {
            position: Vec2::ONE,
            velocity: Vec2::X,
        };
        let n = advance(s, Vec2::splat(100.0), 0.0, 1.0);
        assert_eq!(n.velocity, Vec2::X);
    }
}
