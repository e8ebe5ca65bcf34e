//! Runtime-tunable simulation parameters.
//!
//! `SimulationParams` and `PointerParams` are what the user edits. Each step
//! receives a `SolverParams` snapshot with the kernel constants derived from
//! the same `h`, so the two can never disagree inside a step.

use std::f64::consts::PI;

use bevy::prelude::Resource;

use crate::error::{FluidError, SetupError};

/// Named values of the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    H,
    Mass,
    RestDensity,
    GasConst,
    Visc,
    Steps,
    PointerRadius,
    PointerStrength,
}

impl ParamName {
    pub const ALL: [ParamName; 8] = [
        ParamName::H,
        ParamName::Mass,
        ParamName::RestDensity,
        ParamName::GasConst,
        ParamName::Visc,
        ParamName::Steps,
        ParamName::PointerRadius,
        ParamName::PointerStrength,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::H => "H",
            ParamName::Mass => "MASS",
            ParamName::RestDensity => "REST_DENS",
            ParamName::GasConst => "GAS_CONST",
            ParamName::Visc => "VISC",
            ParamName::Steps => "STEPS",
            ParamName::PointerRadius => "RADIUS",
            ParamName::PointerStrength => "STRENGTH",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Documented UI range, inclusive.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamName::H => (0.25, 2.0),
            ParamName::Mass => (0.01, 5.0),
            ParamName::RestDensity => (0.1, 5.0),
            ParamName::GasConst => (10.0, 500.0),
            ParamName::Visc => (1.0, 20.0),
            ParamName::Steps => (0.0, 6.0),
            ParamName::PointerRadius => (0.1, 5.0),
            ParamName::PointerStrength => (1.0, 35.0),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ParamName::Steps)
    }

    /// Clamps `value` into the documented range. Non-finite input is rejected.
    pub fn sanitize(self, value: f32) -> Result<f32, FluidError> {
        if !value.is_finite() {
            return Err(FluidError::InvalidParameter { name: self, value });
        }
        let (min, max) = self.range();
        let v = value.clamp(min, max);
        Ok(if self.is_integer() { v.round() } else { v })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub h: f32,           // kernel radius
    pub mass: f32,        // particle mass
    pub rest_density: f32,
    pub gas_const: f32,
    pub visc: f32,
    pub steps: u32, // extra substeps per frame
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            h: 1.0,
            mass: 1.0,
            rest_density: 1.8,
            gas_const: 40.0,
            visc: 5.5,
            steps: 0,
        }
    }
}

impl SimulationParams {
    /// Physical validity only. The UI ranges are enforced by `ParamName::sanitize`,
    /// so programmatic setups may still use e.g. `gas_const = 0`.
    pub fn validate(&self) -> Result<(), SetupError> {
        let checks = [
            (ParamName::H, self.h, self.h > 0.0),
            (ParamName::Mass, self.mass, self.mass > 0.0),
            (ParamName::RestDensity, self.rest_density, self.rest_density >= 0.0),
            (ParamName::GasConst, self.gas_const, self.gas_const >= 0.0),
            (ParamName::Visc, self.visc, self.visc >= 0.0),
        ];
        for (name, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(SetupError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerParams {
    pub radius: f32,
    pub strength: f32,
}

impl Default for PointerParams {
    fn default() -> Self {
        Self {
            radius: 1.1,
            strength: 15.0,
        }
    }
}

impl PointerParams {
    pub fn validate(&self) -> Result<(), SetupError> {
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(SetupError::InvalidParameter {
                name: ParamName::PointerRadius,
                value: self.radius,
            });
        }
        if !(self.strength >= 0.0 && self.strength.is_finite()) {
            return Err(SetupError::InvalidParameter {
                name: ParamName::PointerStrength,
                value: self.strength,
            });
        }
        Ok(())
    }
}

/// Both parameter groups behind one named get/set surface.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct Tunables {
    pub sim: SimulationParams,
    pub pointer: PointerParams,
}

impl Tunables {
    pub fn get(&self, name: ParamName) -> f32 {
        match name {
            ParamName::H => self.sim.h,
            ParamName::Mass => self.sim.mass,
            ParamName::RestDensity => self.sim.rest_density,
            ParamName::GasConst => self.sim.gas_const,
            ParamName::Visc => self.sim.visc,
            ParamName::Steps => self.sim.steps as f32,
            ParamName::PointerRadius => self.pointer.radius,
            ParamName::PointerStrength => self.pointer.strength,
        }
    }

    /// Writes an already sanitized value. Returns whether anything changed.
    pub fn set(&mut self, name: ParamName, value: f32) -> bool {
        if self.get(name) == value {
            return false;
        }
        match name {
            ParamName::H => self.sim.h = value,
            ParamName::Mass => self.sim.mass = value,
            ParamName::RestDensity => self.sim.rest_density = value,
            ParamName::GasConst => self.sim.gas_const = value,
            ParamName::Visc => self.sim.visc = value,
            ParamName::Steps => self.sim.steps = value as u32,
            ParamName::PointerRadius => self.pointer.radius = value,
            ParamName::PointerStrength => self.pointer.strength = value,
        }
        true
    }
}

/// Kernel constants that depend only on `h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    pub poly6: f32,
    pub hsq: f32,
    pub spiky_grad: f32,
    pub visc_lap: f32,
}

impl DerivedConstants {
    pub fn from_h(h: f32) -> Self {
        let h = h as f64;
        Self {
            poly6: (315.0 / (64.0 * PI * h.powi(9))) as f32,
            hsq: (h * h) as f32,
            spiky_grad: (-45.0 / (PI * h.powi(6))) as f32,
            visc_lap: (45.0 / (PI * h.powi(5))) as f32,
        }
    }
}

/// Immutable per-step view of every parameter a kernel may read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub h: f32,
    pub mass: f32,
    pub rest_density: f32,
    pub gas_const: f32,
    pub visc: f32,
    pub derived: DerivedConstants,
    pub pointer: PointerParams,
}

impl SolverParams {
    pub fn snapshot(sim: &SimulationParams, pointer: &PointerParams) -> Self {
        Self {
            h: sim.h,
            mass: sim.mass,
            rest_density: sim.rest_density,
            gas_const: sim.gas_const,
            visc: sim.visc,
            derived: DerivedConstants::from_h(sim.h),
            pointer: *pointer,
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self::snapshot(&SimulationParams::default(), &PointerParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_constants_for_unit_radius() {
        let c = DerivedConstants::from_h(1.0);
        assert_eq!(c.hsq, 1.0);
        assert!((c.poly6 - 1.566_681).abs() < 1e-5);
        assert!((c.spiky_grad + 14.323_944).abs() < 1e-4);
        assert!((c.visc_lap - 14.323_944).abs() < 1e-4);
    }

    #[test]
    fn sanitize_clamps_and_rounds() {
        assert_eq!(ParamName::Mass.sanitize(9.0), Ok(5.0));
        assert_eq!(ParamName::Steps.sanitize(2.6), Ok(3.0));
        assert_eq!(ParamName::Steps.sanitize(-4.0), Ok(0.0));
        assert!(ParamName::Visc.sanitize(f32::NAN).is_err());
        assert!(ParamName::H.sanitize(f32::INFINITY).is_err());
    }

    #[test]
    fn names_round_trip() {
        for name in ParamName::ALL {
            assert_eq!(ParamName::parse(name.as_str()), Some(name));
        }
        assert_eq!(ParamName::parse("GRAVITY"), None);
    }
}
