use bevy_spike_fluid::sim::device::Device;
use bevy_spike_fluid::sim::spatial::{GridConfig, SpatialHash};
use bevy_spike_fluid::sim::store::ParticleLayout;
use bevy_spike_fluid::{InitialLayout, SimulationConfig, SimulationDriver};
use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec2;

fn bench_frame(c: &mut Criterion) {
    let mut driver = SimulationDriver::new();
    driver
        .initialize(&SimulationConfig {
            particle_count: 4096,
            ..Default::default()
        })
        .expect("bench setup");

    c.bench_function("frame_4k", |b| b.iter(|| driver.frame(16.0)));
}

fn bench_hash(c: &mut Criterion) {
    let layout = ParticleLayout::for_count(4096).expect("layout");
    let particles = InitialLayout::RandomSquare { half_extent: 4.0 }
        .generate(&layout, 1)
        .expect("particles");
    let grid = GridConfig::new(Vec2::splat(8.0), 8).expect("grid");
    let device = Device::acquire().expect("device");
    let mut hash = SpatialHash::new(grid, &layout);

    c.bench_function("hash_build_4k", |b| b.iter(|| hash.build(&device, &particles)));
}

criterion_group!(benches, bench_frame, bench_hash);
criterion_main!(benches);
