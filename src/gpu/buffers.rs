use bevy::prelude::*;
use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer,
    BufferBindingType, BufferInitDescriptor, BufferUsages, ShaderStages,
};
use bevy::render::renderer::{RenderDevice, RenderQueue};
use bevy::render::{Extract, ExtractSchedule, Render, RenderApp, RenderSet};

use crate::gpu::ffi::{GpuFieldInfo, GpuParticle, particle_payload};
use crate::plugin::{FluidSet, FluidSim};
use crate::sim::driver::SimulationDriver;

// ==================== resources ======================================

/* what a shader sees: particles (binding 0), heights (binding 1) and the
field info uniform (binding 2), all read-only. */
#[derive(Resource, Clone)]
pub struct FieldBindGroupLayout(pub BindGroupLayout);

#[derive(Resource, Clone)]
pub struct FieldBindGroup(pub BindGroup);

/// Main-world handles of the mirrored buffers.
#[derive(Resource)]
pub struct FieldBuffers {
    pub particles: Buffer,
    pub heights: Buffer,
    pub info: Buffer,
    pub particle_count: u32,
    pub height_side: u32,
}

// render world copy
#[derive(Resource, Clone)]
pub struct ExtractedFieldBuffers {
    pub particles: Buffer,
    pub heights: Buffer,
    pub info: Buffer,
    pub particle_count: u32,
    pub height_side: u32,
}

// =====================================================================

pub fn field_info(driver: &SimulationDriver) -> Option<GpuFieldInfo> {
    let sim = driver.simulation()?;
    Some(GpuFieldInfo {
        domain_scale: sim.grid().domain_scale().to_array(),
        particle_count: sim.layout().count as u32,
        height_side: sim.height_field().side(),
        h: driver.snapshot().h,
        zoom: driver.zoom(),
        _pad: [0.0; 2],
    })
}

// ========================== systems ==================================

fn init_field_buffers(mut commands: Commands, render_device: Res<RenderDevice>, sim: Res<FluidSim>) {
    let Some(buffers) = FieldBuffers::new(&render_device, &sim) else {
        warn!("no simulation to mirror, GPU field buffers not created");
        return;
    };
    commands.insert_resource(buffers);
}

fn init_field_bind_group_layout(mut commands: Commands, render_device: Res<RenderDevice>) {
    let read_only = |binding: u32, ty: BufferBindingType| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT | ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let layout = render_device.create_bind_group_layout(
        Some("field_bind_group_layout"),
        &[
            read_only(0, BufferBindingType::Storage { read_only: true }),
            read_only(1, BufferBindingType::Storage { read_only: true }),
            read_only(2, BufferBindingType::Uniform),
        ],
    );
    commands.insert_resource(FieldBindGroupLayout(layout));
}

// per frame, after the driver has stepped
fn queue_field_buffers(
    sim: Res<FluidSim>,
    buffers: Option<Res<FieldBuffers>>,
    render_queue: Res<RenderQueue>,
) {
    let Some(buffers) = buffers else {
        return;
    };
    let (Some(simulation), Some(info)) = (sim.simulation(), field_info(&sim)) else {
        return;
    };
    let particles = particle_payload(simulation.particles());
    render_queue.write_buffer(&buffers.particles, 0, bytemuck::cast_slice(&particles));
    render_queue.write_buffer(
        &buffers.heights,
        0,
        bytemuck::cast_slice(simulation.height_field().heights()),
    );
    render_queue.write_buffer(&buffers.info, 0, bytemuck::bytes_of(&info));
}

fn extract_field_buffers(mut commands: Commands, buffers: Extract<Option<Res<FieldBuffers>>>) {
    let Some(buffers) = &*buffers else {
        return;
    };
    commands.insert_resource(ExtractedFieldBuffers {
        particles: buffers.particles.clone(),
        heights: buffers.heights.clone(),
        info: buffers.info.clone(),
        particle_count: buffers.particle_count,
        height_side: buffers.height_side,
    });
}

fn extract_bind_group_layout(
    mut commands: Commands,
    layout: Extract<Option<Res<FieldBindGroupLayout>>>,
) {
    if let Some(layout) = &*layout {
        commands.insert_resource(FieldBindGroupLayout(layout.0.clone()));
    }
}

fn prepare_field_bind_group(
    mut commands: Commands,
    render_device: Res<RenderDevice>,
    layout: Option<Res<FieldBindGroupLayout>>,
    extracted: Option<Res<ExtractedFieldBuffers>>,
) {
    let (Some(layout), Some(extracted)) = (layout, extracted) else {
        return;
    };
    let bind_group = render_device.create_bind_group(
        Some("field_bind_group"),
        &layout.0,
        &[
            BindGroupEntry {
                binding: 0,
                resource: extracted.particles.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: extracted.heights.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 2,
                resource: extracted.info.as_entire_binding(),
            },
        ],
    );
    commands.insert_resource(FieldBindGroup(bind_group));
}

impl FieldBuffers {
    pub fn new(render_device: &RenderDevice, driver: &SimulationDriver) -> Option<Self> {
        let sim = driver.simulation()?;
        let info = field_info(driver)?;
        let particles: Vec<GpuParticle> = particle_payload(sim.particles());
        let heights = sim.height_field().heights();

        let storage = BufferUsages::STORAGE | BufferUsages::COPY_DST;
        let particles_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(&particles),
            usage: storage,
        });
        let heights_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("Height Field Buffer"),
            contents: bytemuck::cast_slice(heights),
            usage: storage,
        });
        let info_buffer = render_device.create_buffer_with_data(&BufferInitDescriptor {
            label: Some("Field Info Buffer"),
            contents: bytemuck::bytes_of(&info),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        Some(Self {
            particles: particles_buffer,
            heights: heights_buffer,
            info: info_buffer,
            particle_count: info.particle_count,
            height_side: info.height_side,
        })
    }
}

// =====================================================================

/// Mirrors the live particle generation and the height field to GPU
/// storage buffers every frame. Needs `RenderPlugin`.
pub struct GpuFieldPlugin;

impl Plugin for GpuFieldPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Startup,
            (init_field_buffers.after(FluidSet::Init), init_field_bind_group_layout),
        )
        .add_systems(Update, queue_field_buffers.after(FluidSet::Step));

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        render_app
            .add_systems(
                ExtractSchedule,
                (extract_field_buffers, extract_bind_group_layout),
            )
            .add_systems(Render, prepare_field_bind_group.in_set(RenderSet::Prepare));
    }
}
