use glam::Vec3;

use crate::config::{ArenaConfig, MAX_GRID_DIMENSION};

/// Uniform bucket index over the arena's X-Z footprint.
///
/// Cells are stored row-major as `cells[x * dimension + z]`. Positions outside
/// the covered square are clamped into the edge cells rather than dropped.
pub struct SpatialGrid {
    dimension: usize,
    cell_size: f32,
    half_extent: f32,
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(dimension: usize, cell_size: f32, half_extent: f32) -> Self {
        // at most 1024 * 1024 buckets
        let dimension = dimension.clamp(1, MAX_GRID_DIMENSION);
        Self {
            dimension,
            cell_size,
            half_extent,
            cells: vec![Vec::new(); dimension * dimension],
        }
    }

    pub fn from_arena(arena: &ArenaConfig) -> Self {
        Self::new(arena.grid_dimension(), arena.cell_size, arena.grid_half_extent)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn insert(&mut self, index: usize, cell_x: usize, cell_z: usize) {
        debug_assert!(cell_x < self.dimension && cell_z < self.dimension);
        let slot = self.slot(cell_x, cell_z);
        self.cells[slot].push(index);
    }

    pub fn cell_coordinates(&self, position: Vec3) -> (usize, usize) {
        (self.axis_cell(position.x), self.axis_cell(position.z))
    }

    pub fn cell(&self, cell_x: usize, cell_z: usize) -> &[usize] {
        if cell_x >= self.dimension || cell_z >= self.dimension {
            return &[];
        }
        &self.cells[self.slot(cell_x, cell_z)]
    }

    pub fn neighbors(&self, cell_x: usize, cell_z: usize) -> Vec<usize> {
        let mut nearby = Vec::new();
        self.neighbors_into(cell_x, cell_z, &mut nearby);
        nearby
    }

    /// Appends the occupants of the 3x3 block centred on `(cell_x, cell_z)`.
    /// Cells past the grid edge are skipped, there is no wraparound.
    pub fn neighbors_into(&self, cell_x: usize, cell_z: usize, nearby: &mut Vec<usize>) {
        let last = self.dimension - 1;
        // saturate at both edges instead of wrapping
        let min_x = cell_x.saturating_sub(1);
        let max_x = (cell_x + 1).min(last);
        let min_z = cell_z.saturating_sub(1);
        let max_z = (cell_z + 1).min(last);

        for x in min_x..=max_x {
            for z in min_z..=max_z {
                nearby.extend_from_slice(&self.cells[self.slot(x, z)]);
            }
        }
    }

    fn slot(&self, cell_x: usize, cell_z: usize) -> usize {
        cell_x * self.dimension + cell_z
    }

    fn axis_cell(&self, coord: f32) -> usize {
        let cell = ((coord + self.half_extent) / self.cell_size).floor();
        // NaN and negative cells both land in cell 0
        if cell.is_nan() || cell < 0.0 {
            0
        } else {
            (cell as usize).min(self.dimension - 1)
        }
    }
}
