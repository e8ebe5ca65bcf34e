//! Height field sampled from the live particle generation.
//!
//! Each texel sums a poly6-shaped falloff of the particles within `h` of its
//! sample point and maps the sum through a saturating spike curve. The curve
//! and the sampling scale follow the surface zoom.

use glam::Vec2;

use crate::error::SetupError;
use crate::sim::device::Device;
use crate::sim::spatial::SpatialHash;
use crate::sim::store::ParticleState;

pub const DEFAULT_SIDE: u32 = 256;
pub const MAX_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightFieldParams {
    pub height_factor: f32,
    pub scale: f32,
    pub smooth_factor: f32,
    pub spike_factor: f32,
}

impl HeightFieldParams {
    pub fn from_zoom(zoom: f32) -> Self {
        let z2 = zoom * zoom;
        Self {
            height_factor: -0.36 * z2 - 0.02 * zoom + 0.38,
            scale: 2.0 * z2 + zoom + 1.0,
            smooth_factor: 0.3 * z2 - 0.07 * zoom + 0.02,
            spike_factor: 12.0 * z2 - 36.0 * zoom + 25.0,
        }
    }

    #[inline]
    pub fn shape(&self, field: f32) -> f32 {
        self.height_factor * (1.0 - (-field * self.smooth_factor * self.spike_factor).exp())
    }
}

impl Default for HeightFieldParams {
    fn default() -> Self {
        Self::from_zoom(0.5)
    }
}

#[derive(Debug, Clone)]
pub struct HeightField {
    side: u32,
    heights: Vec<f32>,
}

impl HeightField {
    pub fn new(side: u32) -> Result<Self, SetupError> {
        if side == 0 || side > MAX_SIDE {
            return Err(SetupError::InvalidHeightFieldSide(side));
        }
        Ok(Self {
            side,
            heights: vec![0.0; side as usize * side as usize],
        })
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Row-major, row 0 at the domain's lower edge.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.heights[(y * self.side + x) as usize]
    }

    /// `hash` must have been built from `particles`.
    pub fn render(
        &mut self,
        device: &Device,
        particles: &[ParticleState],
        hash: &SpatialHash,
        h: f32,
        params: &HeightFieldParams,
    ) {
        let side = self.side;
        let domain_scale = hash.grid().domain_scale();
        let inv_hsq = 1.0 / (h * h);

        device.dispatch(&mut self.heights, |texel, out| {
            let (x, y) = (texel as u32 % side, texel as u32 / side);
            let p = texel_to_plane(side, x, y, domain_scale, params.scale);
            let mut field = 0.0;
            hash.for_each_neighbor(p, |j| {
                let q = 1.0 - (p - particles[j].position).length_squared() * inv_hsq;
                if q > 0.0 {
                    field += q * q * q;
                }
            });
            *out = params.shape(field);
        });
    }
}

#[inline]
fn texel_to_plane(side: u32, x: u32, y: u32, domain_scale: Vec2, scale: f32) -> Vec2 {
    let uv = (Vec2::new(x as f32, y as f32) + 0.5) / side as f32;
    (uv - 0.5) * domain_scale / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_remaps() {
        let p = HeightFieldParams::from_zoom(0.0);
        assert_eq!(p.scale, 1.0);
        assert!((p.height_factor - 0.38).abs() < 1e-6);
        assert!((p.spike_factor - 25.0).abs() < 1e-6);
        let p = HeightFieldParams::from_zoom(1.0);
        assert!((p.scale - 4.0).abs() < 1e-6);
        assert!((p.smooth_factor - 0.25).abs() < 1e-6);
        assert!((p.spike_factor - 1.0).abs() < 1e-6);
    }

    #[test]
    fn shape_is_bounded_and_monotonic() {
        let p = HeightFieldParams::default();
        assert_eq!(p.shape(0.0), 0.0);
        assert!(p.shape(1.0) < p.shape(2.0));
        assert!(p.shape(1e6) <= p.height_factor);
    }

    #[test]
    fn texels_cover_the_domain_symmetrically() {
        let a = texel_to_plane(4, 0, 0, Vec2::splat(8.0), 1.0);
        let b = texel_to_plane(4, 3, 3, Vec2::splat(8.0), 1.0);
        assert_eq!(a, -b);
        assert_eq!(a, Vec2::splat(-3.0));
    }

    #[test]
    fn oversized_side_is_rejected() {
        assert_eq!(
            HeightField::new(MAX_SIDE + 1).err(),
            Some(SetupError::InvalidHeightFieldSide(MAX_SIDE + 1))
        );
        assert_eq!(
            HeightField::new(65536).err(),
            Some(SetupError::InvalidHeightFieldSide(65536))
        );
    }
}
