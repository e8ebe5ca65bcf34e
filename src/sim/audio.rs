//! Audio collaborator seam and the zoom wobble it drives.

use crate::error::FluidError;

/// Returned by `AudioSource::current_value` while there is no usable signal.
pub const NO_SIGNAL: f32 = -1.0;

pub trait AudioSource: Send + Sync {
    /// Acquires the input device. Failure is not fatal to the simulation.
    fn initialize(&mut self) -> Result<(), FluidError>;

    fn is_initialized(&self) -> bool;

    /// Control value in `[-1, 1]`, or `NO_SIGNAL`.
    fn current_value(&mut self) -> f32;
}

/// Neutral source used when no audio input is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silence;

impl AudioSource for Silence {
    fn initialize(&mut self) -> Result<(), FluidError> {
        Err(FluidError::CollaboratorUnavailable("audio input"))
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn current_value(&mut self) -> f32 {
        NO_SIGNAL
    }
}

/// Damped spring pulling the surface zoom toward the audio control value.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomControl {
    zoom: f32,
    offset: f32,
    momentum: f32,
    target: f32,
}

impl Default for ZoomControl {
    fn default() -> Self {
        Self {
            zoom: 0.5,
            offset: 0.0,
            momentum: 0.0,
            target: 0.0,
        }
    }
}

impl ZoomControl {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Advances one frame. Without an initialized source the zoom stays put.
    pub fn update(&mut self, value: f32, source_ready: bool) -> f32 {
        let value = if value == NO_SIGNAL || !value.is_finite() {
            0.0
        } else {
            value.clamp(-1.0, 1.0)
        };
        self.target += (value - self.target) / 10.0;
        let delta = self.offset - self.target;
        self.momentum -= delta / 50.0;
        self.momentum *= 0.92;
        self.offset += self.momentum;
        if source_ready {
            self.zoom = 0.5 - self.offset / 2.0;
        }
        self.zoom
    }

    pub fn update_from(&mut self, source: &mut dyn AudioSource) -> f32 {
        let ready = source.is_initialized();
        let value = source.current_value();
        self.update(value, ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_keeps_rest_zoom() {
        let mut zoom = ZoomControl::default();
        let mut audio = Silence;
        assert!(audio.initialize().is_err());
        for _ in 0..100 {
            zoom.update_from(&mut audio);
        }
        assert_eq!(zoom.zoom(), 0.5);
    }

    #[test]
    fn signal_settles_toward_target() {
        let mut zoom = ZoomControl::default();
        for _ in 0..2000 {
            zoom.update(1.0, true);
        }
        // offset -> 1, zoom -> 0.5 - 1/2
        assert!(zoom.zoom().abs() < 0.02);
    }
}
