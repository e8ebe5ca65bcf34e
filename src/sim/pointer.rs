use bevy::prelude::Resource;
use glam::Vec2;

/// Pointer as supplied by the host, already projected onto the simulation plane.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerInput {
    pub position: Vec2,
    pub down: bool,
}

/// What the force solver sees: smoothed position and its per-frame delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    pub position: Vec2,
    pub delta: Vec2,
}

const SMOOTHING: f32 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct PointerState {
    target: Vec2,
    smoothed: Vec2,
    prev: Vec2,
    delta: Vec2,
    down: bool,
}

impl PointerState {
    /// Press snaps the smoothing to the press point so it doesn't fling particles.
    pub fn press(&mut self, position: Vec2) {
        self.down = true;
        self.target = position;
        self.smoothed = position;
        self.prev = position;
    }

    pub fn move_to(&mut self, position: Vec2) {
        if self.down {
            self.target = position;
        }
    }

    pub fn release(&mut self) {
        self.down = false;
    }

    pub fn apply(&mut self, input: PointerInput) {
        match (self.down, input.down) {
            (false, true) => self.press(input.position),
            (true, true) => self.move_to(input.position),
            (true, false) => self.release(),
            (false, false) => {}
        }
    }

    /// Once per frame, before the first substep.
    pub fn update(&mut self) {
        self.smoothed += (self.target - self.smoothed) / SMOOTHING;
        self.delta = self.smoothed - self.prev;
        self.prev = self.smoothed;
    }

    /// After the first substep, so extra substeps don't reapply the impulse.
    pub fn clear_delta(&mut self) {
        self.delta = Vec2::ZERO;
    }

    pub fn sample(&self) -> PointerSample {
        PointerSample {
            position: self.smoothed,
            delta: self.delta,
        }
    }
}
