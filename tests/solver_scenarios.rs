use bevy_spike_fluid::sim::device::Device;
use bevy_spike_fluid::sim::params::{PointerParams, SimulationParams, SolverParams};
use bevy_spike_fluid::sim::pointer::PointerSample;
use bevy_spike_fluid::sim::simulation::lattice;
use bevy_spike_fluid::sim::spatial::GridConfig;
use bevy_spike_fluid::sim::store::ParticleState;
use bevy_spike_fluid::Simulation;
use glam::Vec2;

const DT: f32 = 0.016;

fn simulation(particles: Vec<ParticleState>) -> Simulation {
    let grid = GridConfig::new(Vec2::splat(8.0), 8).unwrap();
    let device = Device::acquire().unwrap().with_chunk_size(32);
    Simulation::from_particles(grid, particles, device, 16).unwrap()
}

fn inert() -> SolverParams {
    let sim = SimulationParams {
        gas_const: 0.0,
        visc: 0.0,
        ..Default::default()
    };
    SolverParams::snapshot(&sim, &PointerParams::default())
}

fn mean_density(sim: &Simulation) -> f32 {
    let dp = sim.density_pressure();
    dp.iter().map(|d| d.density).sum::<f32>() / dp.len() as f32
}

#[test]
fn resting_fluid_without_pressure_or_viscosity_stays_put() {
    let start = lattice(16, 0.25);
    let mut sim = simulation(start.clone());
    let params = inert();

    for _ in 0..100 {
        sim.step(&params, &PointerSample::default(), DT).unwrap();
    }

    for (a, b) in sim.particles().iter().zip(&start) {
        assert_eq!(a.position, b.position);
        assert_eq!(a.velocity, Vec2::ZERO);
    }
    assert!(sim.density_pressure().iter().all(|d| d.density > 0.0 && d.pressure == 0.0));
}

#[test]
fn compressed_block_relaxes_toward_rest_density() {
    let mut sim = simulation(lattice(16, 0.1));
    let params = SolverParams::default();
    let rest = params.rest_density;

    sim.step(&params, &PointerSample::default(), DT).unwrap();
    let initial = mean_density(&sim);
    for _ in 1..60 {
        sim.step(&params, &PointerSample::default(), DT).unwrap();
    }
    let last = mean_density(&sim);

    assert!(initial > 50.0, "block not compressed: {initial}");
    assert!(last.is_finite());
    // the box holds more fluid than REST_DENS allows, so the mean only gets close
    assert!((last - rest).abs() < 0.1 * (initial - rest).abs(), "{initial} -> {last}");
    assert!(sim.particles().iter().all(|p| p.position.abs().max_element() < 4.5));
}

#[test]
fn pointer_pushes_out_only_within_radius() {
    // no particle sits exactly under the pointer
    let start = lattice(10, 0.25);
    let params = inert();
    let radius = params.pointer.radius;
    let pointer = PointerSample {
        position: Vec2::ZERO,
        delta: Vec2::new(0.1, 0.0),
    };

    let mut pushed = simulation(start.clone());
    pushed.step(&params, &pointer, DT).unwrap();
    let mut baseline = simulation(start.clone());
    baseline.step(&params, &PointerSample::default(), DT).unwrap();

    let mut inside = Vec::new();
    for ((p, b), s) in pushed.particles().iter().zip(baseline.particles()).zip(&start) {
        let dist = s.position.length();
        if dist < radius {
            let radial = p.velocity.dot(s.position / dist);
            assert!(radial > 0.0, "no push at {dist}");
            inside.push((dist, radial));
        } else {
            assert_eq!(p, b);
        }
    }
    assert!(!inside.is_empty());

    // closer particles get the stronger kick
    inside.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert!(inside.windows(2).all(|w| w[0].1 >= w[1].1 - 1e-5));
}

#[test]
fn failed_step_keeps_the_live_generation() {
    let mut sim = simulation(lattice(8, 0.2));
    let params = SolverParams::default();
    sim.step(&params, &PointerSample::default(), DT).unwrap();

    let before: Vec<ParticleState> = sim.particles().to_vec();
    let generation = sim.generation_index();

    assert!(sim.step(&params, &PointerSample::default(), f32::MAX).is_err());
    assert_eq!(sim.particles(), before.as_slice());
    assert_eq!(sim.generation_index(), generation);

    sim.step(&params, &PointerSample::default(), DT).unwrap();
    assert_ne!(sim.generation_index(), generation);
    assert!(sim.particles().iter().all(ParticleState::is_finite));
}

#[test]
fn height_field_rises_where_the_fluid_is() {
    let mut sim = simulation(lattice(10, 0.2));
    let hf = bevy_spike_fluid::sim::heightfield::HeightFieldParams::from_zoom(0.5);
    sim.refresh_height_field(1.0, &hf);

    let field = sim.height_field();
    assert_eq!(field.heights().len(), 16 * 16);
    assert!(field.heights().iter().all(|h| (0.0..=hf.height_factor).contains(h)));
    assert!(field.get(8, 8) > 0.0);
    assert_eq!(field.get(0, 0), 0.0);
}
