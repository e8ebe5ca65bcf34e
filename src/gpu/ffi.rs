use bytemuck::{Pod, Zeroable};

use crate::sim::store::ParticleState;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuParticle {
    // plain arrays instead of glam to pin the WGSL layout
    pub pos: [f32; 2],
    pub vel: [f32; 2],
}

impl From<&ParticleState> for GpuParticle {
    fn from(s: &ParticleState) -> Self {
        Self {
            pos: s.position.to_array(),
            vel: s.velocity.to_array(),
        }
    }
}

/// Uniform block; padded to 32 bytes for uniform alignment.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuFieldInfo {
    pub domain_scale: [f32; 2],
    pub particle_count: u32,
    pub height_side: u32,
    pub h: f32,
    pub zoom: f32,
    pub _pad: [f32; 2],
}

pub fn particle_payload(particles: &[ParticleState]) -> Vec<GpuParticle> {
    particles.iter().map(GpuParticle::from).collect()
}
