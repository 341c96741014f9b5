use crate::config::ResourceConfig;
use crate::spatial::{Cell, FieldError, Grid};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

/// Out-of-bounds draws tolerated per unit before the draw is clamped onto the grid.
const MAX_REJECTIONS: usize = 64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceGenerationError {
    #[error("at least one cluster is required")]
    NoClusters,
    #[error("cluster_std must be positive and finite, got {0}")]
    InvalidClusterStd(f64),
    #[error("grid must have at least one cell")]
    EmptyGrid,
}

/// Remaining catchable units per cell, shared by every fisher on the lake.
///
/// Only `deplete` mutates a live field, and it never drives a cell below zero.
#[derive(Clone, Debug)]
pub struct ResourceField {
    grid: Grid,
    data: Vec<u32>,
    total: u64,
}

impl ResourceField {
    pub fn new(width: usize, height: usize, initial_value: u32) -> Self {
        let grid = Grid::new(width, height);
        let data = vec![initial_value; grid.cell_count()];
        let total = initial_value as u64 * data.len() as u64;
        Self { grid, data, total }
    }

    /// Build a field with explicit abundances; cells not listed start empty.
    pub fn from_cells(
        width: usize,
        height: usize,
        cells: &[(Cell, u32)],
    ) -> Result<Self, FieldError> {
        let mut field = Self::new(width, height, 0);
        for &(cell, value) in cells {
            field.grid.check(cell)?;
            let idx = field.grid.index(cell);
            field.total = field.total - field.data[idx] as u64 + value as u64;
            field.data[idx] = value;
        }
        Ok(field)
    }

    /// Spatially clustered field whose total equals `config.total_abundance`.
    ///
    /// Cluster centres are drawn uniformly; each unit is then drawn from an
    /// isotropic Gaussian around a uniformly chosen centre. Returns the field
    /// together with the centres.
    pub fn generate_clustered<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        config: &ResourceConfig,
        rng: &mut R,
    ) -> Result<(Self, Vec<Cell>), ResourceGenerationError> {
        if width == 0 || height == 0 {
            return Err(ResourceGenerationError::EmptyGrid);
        }
        if config.clusters == 0 {
            return Err(ResourceGenerationError::NoClusters);
        }
        if !(config.cluster_std.is_finite() && config.cluster_std > 0.0) {
            return Err(ResourceGenerationError::InvalidClusterStd(config.cluster_std));
        }
        let normal = Normal::new(0.0, config.cluster_std)
            .map_err(|_| ResourceGenerationError::InvalidClusterStd(config.cluster_std))?;

        let mut field = Self::new(width, height, 0);
        let centers: Vec<Cell> = (0..config.clusters)
            .map(|_| {
                [
                    rng.random_range(0..width as i32),
                    rng.random_range(0..height as i32),
                ]
            })
            .collect();

        for _ in 0..config.total_abundance {
            let center = centers[rng.random_range(0..centers.len())];
            let mut cell = None;
            for _ in 0..MAX_REJECTIONS {
                let candidate = [
                    (center[0] as f64 + normal.sample(rng)).round() as i32,
                    (center[1] as f64 + normal.sample(rng)).round() as i32,
                ];
                if field.grid.contains(candidate) {
                    cell = Some(candidate);
                    break;
                }
            }
            let cell = cell.unwrap_or_else(|| {
                let x = (center[0] as f64 + normal.sample(rng)).round() as i32;
                let y = (center[1] as f64 + normal.sample(rng)).round() as i32;
                [x.clamp(0, width as i32 - 1), y.clamp(0, height as i32 - 1)]
            });
            let idx = field.grid.index(cell);
            field.data[idx] += 1;
            field.total += 1;
        }
        Ok((field, centers))
    }

    pub fn abundance_at(&self, cell: Cell) -> Result<u32, FieldError> {
        self.grid.check(cell)?;
        Ok(self.data[self.grid.index(cell)])
    }

    /// Remove one unit from `cell`, floored at zero. Returns the remaining abundance.
    pub fn deplete(&mut self, cell: Cell) -> Result<u32, FieldError> {
        self.grid.check(cell)?;
        let idx = self.grid.index(cell);
        if self.data[idx] > 0 {
            self.data[idx] -= 1;
            self.total -= 1;
        }
        Ok(self.data[idx])
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn depleted_cells(&self) -> usize {
        self.data.iter().filter(|&&v| v == 0).count()
    }
}
