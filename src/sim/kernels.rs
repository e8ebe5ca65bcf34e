// SPH smoothing kernels (2D plane, classic Müller constants)
use glam::Vec2;

use crate::sim::params::SolverParams;

#[inline]
pub fn poly6(r2: f32, params: &SolverParams) -> f32 {
    let c = &params.derived;
    if r2 < c.hsq {
        let d = c.hsq - r2;
        params.mass * c.poly6 * d * d * d
    } else {
        0.0
    }
}

// pressure acceleration contribution of j on i, `d = x_i - x_j`, `r = |d|`
#[inline]
pub fn spiky_pressure(d: Vec2, r: f32, p_i: f32, p_j: f32, rho_j: f32, params: &SolverParams) -> Vec2 {
    if r == 0.0 || r >= params.h {
        return Vec2::ZERO;
    }
    let w = params.h - r;
    -(d / r) * params.mass * (p_i + p_j) / (2.0 * rho_j) * params.derived.spiky_grad * w * w
}

#[inline]
pub fn viscosity(r: f32, vel_i: Vec2, vel_j: Vec2, rho_j: f32, params: &SolverParams) -> Vec2 {
    if r == 0.0 || r >= params.h {
        return Vec2::ZERO;
    }
    params.visc * params.mass * (vel_j - vel_i) / rho_j * params.derived.visc_lap * (params.h - r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly6_vanishes_at_radius() {
        let params = SolverParams::default();
        assert_eq!(poly6(params.derived.hsq, &params), 0.0);
        assert!(poly6(0.0, &params) > poly6(0.5, &params));
    }

    #[test]
    fn pressure_pushes_apart() {
        let params = SolverParams::default();
        let d = Vec2::new(0.5, 0.0);
        let f = spiky_pressure(d, 0.5, 10.0, 10.0, 2.0, &params);
        assert!(f.x > 0.0);
        assert_eq!(f.y, 0.0);
        assert_eq!(spiky_pressure(Vec2::ZERO, 0.0, 10.0, 10.0, 2.0, &params), Vec2::ZERO);
    }

    #[test]
    fn viscosity_pulls_toward_neighbour_velocity() {
        let params = SolverParams::default();
        let f = viscosity(0.5, Vec2::ZERO, Vec2::new(1.0, 0.0), 2.0, &params);
        assert!(f.x > 0.0);
    }
}
