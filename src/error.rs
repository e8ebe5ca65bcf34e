use std::fmt;

use crate::sim::heightfield::MAX_SIDE;
use crate::sim::params::ParamName;
use crate::sim::spatial::MAX_CELL_SIDE;

/// Invalid particle count, grid or domain configuration. Aborts initialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    ZeroParticles,
    TooManyParticles { requested: usize, max: usize },
    NotSquare(usize),
    CountMismatch { expected: usize, got: usize },
    InvalidCellCount(u32),
    InvalidKernelRadius(f32),
    InvalidDomain { x: f32, y: f32 },
    InvalidParameter { name: ParamName, value: f32 },
    InvalidHeightFieldSide(u32),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::ZeroParticles => write!(f, "particle count must be at least 1"),
            SetupError::TooManyParticles { requested, max } => {
                write!(f, "{requested} particles requested, at most {max} supported")
            }
            SetupError::NotSquare(n) => write!(f, "particle count {n} is not a perfect square"),
            SetupError::CountMismatch { expected, got } => {
                write!(f, "expected {expected} particle states, got {got}")
            }
            SetupError::InvalidCellCount(n) => {
                write!(f, "cell side count must be in 1..={MAX_CELL_SIDE}, got {n}")
            }
            SetupError::InvalidKernelRadius(h) => write!(f, "kernel radius must be positive, got {h}"),
            SetupError::InvalidDomain { x, y } => {
                write!(f, "domain scale must be positive and finite, got ({x}, {y})")
            }
            SetupError::InvalidParameter { name, value } => {
                write!(f, "invalid value {value} for {}", name.as_str())
            }
            SetupError::InvalidHeightFieldSide(n) => {
                write!(f, "height field side must be in 1..={MAX_SIDE}, got {n}")
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// The compute backend could not be acquired.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    NoWorkers,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoWorkers => write!(f, "compute pool has no worker threads"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// One step's device work failed; the next generation was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum StepFailure {
    NonFinite { particle: usize },
    InvalidTimestep(f32),
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::NonFinite { particle } => {
                write!(f, "integration produced a non-finite state for particle {particle}")
            }
            StepFailure::InvalidTimestep(dt) => write!(f, "invalid timestep {dt} ms"),
        }
    }
}

impl std::error::Error for StepFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum FluidError {
    Setup(SetupError),
    Device(DeviceError),
    /// Audio or pointer input was not granted. Callers degrade to neutral input.
    CollaboratorUnavailable(&'static str),
    TransientStep(StepFailure),
    Uninitialized,
    InvalidParameter { name: ParamName, value: f32 },
}

impl fmt::Display for FluidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluidError::Setup(e) => write!(f, "setup failed: {e}"),
            FluidError::Device(e) => write!(f, "device error: {e}"),
            FluidError::CollaboratorUnavailable(what) => write!(f, "{what} unavailable"),
            FluidError::TransientStep(e) => write!(f, "step abandoned: {e}"),
            FluidError::Uninitialized => write!(f, "simulation is not initialized"),
            FluidError::InvalidParameter { name, value } => {
                write!(f, "rejected value {value} for {}", name.as_str())
            }
        }
    }
}

impl std::error::Error for FluidError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FluidError::Setup(e) => Some(e),
            FluidError::Device(e) => Some(e),
            FluidError::TransientStep(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SetupError> for FluidError {
    fn from(e: SetupError) -> Self {
        FluidError::Setup(e)
    }
}

impl From<DeviceError> for FluidError {
    fn from(e: DeviceError) -> Self {
        FluidError::Device(e)
    }
}

impl From<StepFailure> for FluidError {
    fn from(e: StepFailure) -> Self {
        FluidError::TransientStep(e)
    }
}

impl FluidError {
    /// Fatal errors end the session; the rest are retried or degraded.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FluidError::Setup(_) | FluidError::Device(_))
    }
}
