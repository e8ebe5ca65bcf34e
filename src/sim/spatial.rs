//! Uniform-grid spatial hash built by sorting.
//!
//! Every step each particle gets a `(cell, particle)` record, the records are
//! sorted by cell with an odd-even merge sort network, and an offset table
//! records where each cell's run starts in the sorted array. Neighbour
//! queries then read the contiguous runs of the 3x3 cell window.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};

use crate::error::SetupError;
use crate::sim::device::Device;
use crate::sim::store::{ParticleLayout, ParticleState, PingPong};

/// Offset table value of a cell without particles.
pub const EMPTY_CELL: u32 = u32::MAX;
/// Cell id of padding records; larger than any real cell id so padding sorts last.
pub const PADDING_CELL: u32 = u32::MAX;
/// Largest grid side accepted; the offset table holds `side²` entries.
pub const MAX_CELL_SIDE: u32 = 1024;
// relative slack for kernel radii that only exceed the cell width by f32 rounding
const KERNEL_SLACK: f32 = 1e-5;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CellEntry {
    pub cell: u32,
    pub particle: u32,
}

impl CellEntry {
    // particle ids are unique, so the network never sees equal keys and its
    // output matches a stable sort by cell
    #[inline]
    fn key(self) -> u64 {
        ((self.cell as u64) << 32) | self.particle as u64
    }

    pub fn is_padding(self) -> bool {
        self.cell == PADDING_CELL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    domain_scale: Vec2,
    cell_side_count: u32,
}

impl GridConfig {
    pub fn new(domain_scale: Vec2, cell_side_count: u32) -> Result<Self, SetupError> {
        if !(domain_scale.is_finite() && domain_scale.x > 0.0 && domain_scale.y > 0.0) {
            return Err(SetupError::InvalidDomain {
                x: domain_scale.x,
                y: domain_scale.y,
            });
        }
        if cell_side_count == 0 || cell_side_count > MAX_CELL_SIDE {
            return Err(SetupError::InvalidCellCount(cell_side_count));
        }
        Ok(Self {
            domain_scale,
            cell_side_count,
        })
    }

    /// As many cells per side as fit without a cell getting narrower than `h`,
    /// up to `MAX_CELL_SIDE`.
    pub fn fitted(domain_scale: Vec2, h: f32) -> Result<Self, SetupError> {
        if !(h > 0.0 && h.is_finite()) {
            return Err(SetupError::InvalidKernelRadius(h));
        }
        let side = (domain_scale.min_element() / h).floor().clamp(1.0, MAX_CELL_SIDE as f32);
        Self::new(domain_scale, side as u32)
    }

    pub fn domain_scale(&self) -> Vec2 {
        self.domain_scale
    }

    pub fn half_extent(&self) -> Vec2 {
        self.domain_scale * 0.5
    }

    pub fn cell_side_count(&self) -> u32 {
        self.cell_side_count
    }

    pub fn cell_count(&self) -> usize {
        (self.cell_side_count * self.cell_side_count) as usize
    }

    pub fn cell_size(&self) -> Vec2 {
        self.domain_scale / self.cell_side_count as f32
    }

    /// Narrowest cell extent; the 3x3 window covers a kernel radius up to this.
    pub fn cell_width(&self) -> f32 {
        self.cell_size().min_element()
    }

    /// Whether the 3x3 window still covers a kernel of radius `h`.
    pub fn fits_kernel(&self, h: f32) -> bool {
        h <= self.cell_width() * (1.0 + KERNEL_SLACK)
    }

    /// Grid coordinates of a position. Outside points clamp to the border cell.
    pub fn cell_coords(&self, position: Vec2) -> UVec2 {
        let side = self.cell_side_count as f32;
        let g = ((position / self.domain_scale + 0.5) * side).floor();
        let max = side - 1.0;
        UVec2::new(g.x.clamp(0.0, max) as u32, g.y.clamp(0.0, max) as u32)
    }

    pub fn cell_id(&self, position: Vec2) -> u32 {
        let c = self.cell_coords(position);
        c.y * self.cell_side_count + c.x
    }

    /// Cell ids of the 3x3 window around `position`, skipping cells off the grid.
    pub fn neighborhood(&self, position: Vec2) -> impl Iterator<Item = u32> + use<> {
        let c = self.cell_coords(position).as_ivec2();
        let side = self.cell_side_count as i32;
        (-1..=1).flat_map(move |oy| {
            (-1..=1).filter_map(move |ox| {
                let (x, y) = (c.x + ox, c.y + oy);
                (x >= 0 && y >= 0 && x < side && y < side).then(|| (y * side + x) as u32)
            })
        })
    }
}

/// One compare-exchange pass of the odd-even merge sort network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortPass {
    pub stage: u32,
    pub pass: u32,
}

impl SortPass {
    #[inline]
    fn two_stage(self) -> usize {
        2 << self.stage
    }

    #[inline]
    fn ppass(self) -> usize {
        1 << self.pass
    }

    #[inline]
    fn pass_mod_stage(self) -> usize {
        self.ppass() % (1 << self.stage)
    }

    #[inline]
    fn two_stage_pms1(self) -> usize {
        self.two_stage() - self.pass_mod_stage() - 1
    }

    /// Compare partner of slot `i` and whether `i` keeps the smaller record.
    /// `None` means the slot passes through unchanged in this pass.
    pub fn partner(self, i: usize) -> Option<(usize, bool)> {
        let j = i % self.two_stage();
        let pms = self.pass_mod_stage();
        if j < pms || j > self.two_stage_pms1() {
            return None;
        }
        let ppass = self.ppass();
        if ((j + pms) / ppass) % 2 == 0 {
            Some((i + ppass, true))
        } else {
            Some((i - ppass, false))
        }
    }

    #[inline]
    pub fn select(self, i: usize, src: &[CellEntry]) -> CellEntry {
        let me = src[i];
        let Some((p, keep_min)) = self.partner(i) else {
            return me;
        };
        let other = src[p];
        let me_first = me.key() < other.key();
        if me_first == keep_min { me } else { other }
    }
}

/// Passes needed to sort `2^log_len` records, in execution order.
pub fn sort_passes(log_len: u32) -> Vec<SortPass> {
    let total = (log_len * (log_len + 1) / 2) as usize;
    let mut passes = Vec::with_capacity(total);
    let mut stage: i32 = -1;
    let mut pass: i32 = -1;
    while passes.len() < total {
        pass -= 1;
        if pass < 0 {
            stage += 1;
            pass = stage;
        }
        passes.push(SortPass {
            stage: stage as u32,
            pass: pass as u32,
        });
    }
    passes
}

#[derive(Debug)]
pub struct SpatialHash {
    grid: GridConfig,
    particle_count: usize,
    records: PingPong<Vec<CellEntry>>,
    offsets: Vec<u32>,
    passes: Vec<SortPass>,
}

impl SpatialHash {
    pub fn new(grid: GridConfig, layout: &ParticleLayout) -> Self {
        let padded = vec![CellEntry::zeroed(); layout.padded_count];
        Self {
            grid,
            particle_count: layout.count,
            records: PingPong::new(padded.clone(), padded),
            offsets: vec![EMPTY_CELL; grid.cell_count()],
            passes: sort_passes(layout.log_padded()),
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn sort_pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Cell assignment, sort and offset table. Each phase is a dispatch and
    /// therefore a barrier for the next one.
    pub fn build(&mut self, device: &Device, particles: &[ParticleState]) {
        let grid = self.grid;
        let n = self.particle_count;
        debug_assert_eq!(particles.len(), n);

        device.dispatch(self.records.front_mut(), |i, rec| {
            *rec = if i < n {
                CellEntry {
                    cell: grid.cell_id(particles[i].position),
                    particle: i as u32,
                }
            } else {
                CellEntry {
                    cell: PADDING_CELL,
                    particle: i as u32,
                }
            };
        });

        for &pass in &self.passes {
            let (src, dst) = self.records.split();
            let src = src.as_slice();
            device.dispatch(dst, |i, out| *out = pass.select(i, src));
            self.records.swap();
        }

        let sorted = self.records.front().as_slice();
        device.dispatch(&mut self.offsets, |cell, offset| {
            let cell = cell as u32;
            let first = sorted[..n].partition_point(|e| e.cell < cell);
            *offset = if first < n && sorted[first].cell == cell {
                first as u32
            } else {
                EMPTY_CELL
            };
        });
    }

    /// Sorted records of the real particles (padding excluded).
    pub fn sorted(&self) -> &[CellEntry] {
        &self.records.front()[..self.particle_count]
    }

    /// All sorted records including the padding tail.
    pub fn sorted_padded(&self) -> &[CellEntry] {
        self.records.front()
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Slice of `sorted()` holding `cell`'s particles.
    pub fn cell_range(&self, cell: u32) -> Range<usize> {
        let start = self.offsets[cell as usize];
        if start == EMPTY_CELL {
            return 0..0;
        }
        let start = start as usize;
        let len = self.sorted()[start..]
            .iter()
            .take_while(|e| e.cell == cell)
            .count();
        start..start + len
    }

    /// Calls `f` with the index of every particle in the 3x3 window around `position`.
    #[inline]
    pub fn for_each_neighbor(&self, position: Vec2, mut f: impl FnMut(usize)) {
        let sorted = self.sorted();
        for cell in self.grid.neighborhood(position) {
            let start = self.offsets[cell as usize];
            if start == EMPTY_CELL {
                continue;
            }
            for entry in sorted[start as usize..].iter().take_while(|e| e.cell == cell) {
                f(entry.particle as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_grid_is_capped() {
        let grid = GridConfig::fitted(Vec2::splat(8.0), 1e-4).unwrap();
        assert_eq!(grid.cell_side_count(), MAX_CELL_SIDE);
        assert!(GridConfig::new(Vec2::splat(8.0), 1 << 15).is_err());
    }

    #[test]
    fn kernel_fit_tolerates_rounding_only() {
        // 3.3 / 11 rounds to 0.29999998 in f32
        let grid = GridConfig::new(Vec2::splat(3.3), 11).unwrap();
        assert!(grid.cell_width() < 0.3);
        assert!(grid.fits_kernel(0.3));
        assert!(!grid.fits_kernel(0.301));
    }

    #[test]
    fn pass_schedule_matches_network_depth() {
        let passes = sort_passes(3);
        let expected = [(0, 0), (1, 1), (1, 0), (2, 2), (2, 1), (2, 0)];
        assert_eq!(passes.len(), expected.len());
        for (p, (stage, pass)) in passes.iter().zip(expected) {
            assert_eq!((p.stage, p.pass), (stage, pass));
        }
        assert!(sort_passes(0).is_empty());
    }

    #[test]
    fn network_sorts_eight_keys() {
        let cells = [5u32, 1, 7, 1, 0, 3, 9, 2];
        let mut buf: Vec<CellEntry> = cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| CellEntry {
                cell,
                particle: i as u32,
            })
            .collect();
        for pass in sort_passes(3) {
            let src = buf.clone();
            for (i, out) in buf.iter_mut().enumerate() {
                *out = pass.select(i, &src);
            }
        }
        let got: Vec<u32> = buf.iter().map(|e| e.cell).collect();
        assert_eq!(got, vec![0, 1, 1, 2, 3, 5, 7, 9]);
        // equal cells keep particle order
        assert_eq!((buf[1].particle, buf[2].particle), (1, 3));
    }

    #[test]
    fn neighborhood_is_clipped_at_corners() {
        let grid = GridConfig::new(Vec2::splat(8.0), 8).unwrap();
        let corner: Vec<u32> = grid.neighborhood(Vec2::new(-3.9, -3.9)).collect();
        assert_eq!(corner, vec![0, 1, 8, 9]);
        assert_eq!(grid.neighborhood(Vec2::ZERO).count(), 9);
    }
}
