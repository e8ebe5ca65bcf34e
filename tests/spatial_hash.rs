use bevy_spike_fluid::sim::device::Device;
use bevy_spike_fluid::sim::spatial::{EMPTY_CELL, GridConfig, PADDING_CELL, SpatialHash};
use bevy_spike_fluid::sim::store::{ParticleLayout, ParticleState};
use bevy_spike_fluid::InitialLayout;
use glam::Vec2;

fn build(count: usize, half_extent: f32, seed: u64, cells: u32) -> (Vec<ParticleState>, SpatialHash) {
    let layout = ParticleLayout::for_count(count).unwrap();
    let particles = InitialLayout::RandomSquare { half_extent }
        .generate(&layout, seed)
        .unwrap();
    let grid = GridConfig::new(Vec2::splat(8.0), cells).unwrap();
    // small chunks so the dispatches actually fan out
    let device = Device::acquire().unwrap().with_chunk_size(16);
    let mut hash = SpatialHash::new(grid, &layout);
    hash.build(&device, &particles);
    (particles, hash)
}

#[test]
fn sorted_records_are_a_permutation_in_cell_order() {
    for (count, seed) in [(1, 1), (10, 2), (500, 3), (1000, 4)] {
        let (particles, hash) = build(count, 4.5, seed, 8);
        let sorted = hash.sorted();
        assert_eq!(sorted.len(), particles.len());

        let mut seen = vec![false; particles.len()];
        for e in sorted {
            assert!(!seen[e.particle as usize], "particle {} twice", e.particle);
            seen[e.particle as usize] = true;
            assert_eq!(e.cell, hash.grid().cell_id(particles[e.particle as usize].position));
        }
        assert!(sorted.windows(2).all(|w| (w[0].cell, w[0].particle) < (w[1].cell, w[1].particle)));
    }
}

#[test]
fn padding_sorts_to_the_tail() {
    let (particles, hash) = build(500, 2.0, 9, 8);
    let padded = hash.sorted_padded();
    assert_eq!(padded.len(), 1024);
    assert!(padded[..particles.len()].iter().all(|e| !e.is_padding()));
    assert!(padded[particles.len()..].iter().all(|e| e.cell == PADDING_CELL));
}

#[test]
fn offset_ranges_partition_the_sorted_records() {
    let (particles, hash) = build(900, 3.0, 5, 8);
    let mut covered = 0;
    for cell in 0..hash.grid().cell_count() as u32 {
        let range = hash.cell_range(cell);
        if hash.offsets()[cell as usize] == EMPTY_CELL {
            assert!(range.is_empty());
            assert!(hash.sorted().iter().all(|e| e.cell != cell));
            continue;
        }
        assert!(!range.is_empty());
        assert!(hash.sorted()[range.clone()].iter().all(|e| e.cell == cell));
        covered += range.len();
    }
    assert_eq!(covered, particles.len());
}

#[test]
fn neighbour_walk_finds_everything_within_a_cell_width() {
    let (particles, hash) = build(400, 3.8, 11, 8);
    let h = hash.grid().cell_width();
    for (i, p) in particles.iter().enumerate().step_by(7) {
        let mut found = Vec::new();
        hash.for_each_neighbor(p.position, |j| found.push(j));
        for (j, q) in particles.iter().enumerate() {
            if (p.position - q.position).length() < h {
                assert!(found.contains(&j), "{j} missing around {i}");
            }
        }
    }
}

#[test]
fn cell_boundaries_go_to_exactly_one_cell() {
    let grid = GridConfig::new(Vec2::splat(8.0), 8).unwrap();
    // x = 0 is the boundary between cells 3 and 4
    assert_eq!(grid.cell_id(Vec2::new(0.0, -4.0)), 4);
    assert_eq!(grid.cell_id(Vec2::new(-0.001, -4.0)), 3);
    assert_eq!(grid.cell_id(Vec2::new(-4.0, 0.0)), 4 * 8);
    // outside points clamp to the border
    assert_eq!(grid.cell_id(Vec2::new(100.0, 100.0)), 63);
    assert_eq!(grid.cell_id(Vec2::new(-100.0, -100.0)), 0);
}

#[test]
fn rebuild_follows_moved_particles() {
    let layout = ParticleLayout::exact(4).unwrap();
    let grid = GridConfig::new(Vec2::splat(8.0), 4).unwrap();
    let device = Device::acquire().unwrap();
    let mut hash = SpatialHash::new(grid, &layout);

    let mut particles: Vec<ParticleState> = (0..4)
        .map(|_| ParticleState::at_rest(Vec2::splat(-3.0)))
        .collect();
    hash.build(&device, &particles);
    assert_eq!(hash.cell_range(0), 0..4);

    particles[2].position = Vec2::splat(3.0);
    hash.build(&device, &particles);
    assert_eq!(hash.cell_range(0), 0..3);
    assert_eq!(hash.cell_range(15), 3..4);
    assert_eq!(hash.sorted()[3].particle, 2);
    assert!(hash.offsets()[5] == EMPTY_CELL);
}
