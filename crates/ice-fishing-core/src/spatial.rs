use crate::agent::AgentId;
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use thiserror::Error;

/// Grid cell coordinate `[x, y]`.
pub type Cell = [i32; 2];

/// One occupancy entry: the cell an agent stands on, tagged with its id.
pub type AgentLocation = GeomWithData<Cell, AgentId>;

/// Errors raised at the field/neighborhood boundary. Nothing is mutated when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(i32),
    #[error("cell {cell:?} lies outside the {width}x{height} grid")]
    OutOfBounds {
        cell: Cell,
        width: usize,
        height: usize,
    },
    #[error("{locations} observed locations but {rates} observed rates")]
    ObservationMismatch { locations: usize, rates: usize },
}

/// Chebyshev distance between two cells.
pub fn chebyshev(a: Cell, b: Cell) -> i32 {
    (a[0] - b[0]).abs().max((a[1] - b[1]).abs())
}

/// Bounded, non-toroidal grid extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell[0] >= 0
            && cell[1] >= 0
            && (cell[0] as usize) < self.width
            && (cell[1] as usize) < self.height
    }

    pub fn check(&self, cell: Cell) -> Result<(), FieldError> {
        if self.contains(cell) {
            Ok(())
        } else {
            Err(FieldError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Row-major index of an in-bounds cell.
    pub fn index(&self, cell: Cell) -> usize {
        debug_assert!(self.contains(cell));
        cell[1] as usize * self.width + cell[0] as usize
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        [(index % self.width) as i32, (index / self.width) as i32]
    }

    pub fn center(&self) -> Cell {
        [(self.width / 2) as i32, (self.height / 2) as i32]
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Moore neighborhood of `center` within Chebyshev `radius`, clipped to the grid.
    /// Cells are returned in row-major order.
    pub fn neighborhood(
        &self,
        center: Cell,
        radius: i32,
        include_center: bool,
    ) -> Result<Vec<Cell>, FieldError> {
        if radius <= 0 {
            return Err(FieldError::NonPositiveRadius(radius));
        }
        self.check(center)?;
        let x_lo = center[0].saturating_sub(radius).max(0);
        let x_hi = center[0].saturating_add(radius).min(self.width as i32 - 1);
        let y_lo = center[1].saturating_sub(radius).max(0);
        let y_hi = center[1].saturating_add(radius).min(self.height as i32 - 1);

        let span = (x_hi - x_lo + 1) as usize * (y_hi - y_lo + 1) as usize;
        let mut cells = Vec::with_capacity(span);
        for y in y_lo..=y_hi {
            for x in x_lo..=x_hi {
                if !include_center && x == center[0] && y == center[1] {
                    continue;
                }
                cells.push([x, y]);
            }
        }
        Ok(cells)
    }

    /// Advance at most one unit along each axis from `from` toward `to`.
    pub fn step_toward(from: Cell, to: Cell) -> Cell {
        [
            from[0] + (to[0] - from[0]).signum(),
            from[1] + (to[1] - from[1]).signum(),
        ]
    }
}

/// R*-tree of agent positions, kept in sync with every placement and move.
#[derive(Default)]
pub struct OccupancyIndex {
    tree: RTree<AgentLocation>,
}

impl OccupancyIndex {
    /// Bulk-load the index from initial placements (O(n log n)).
    pub fn build(locations: Vec<AgentLocation>) -> Self {
        Self {
            tree: RTree::bulk_load(locations),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn place(&mut self, id: AgentId, cell: Cell) {
        self.tree.insert(AgentLocation::new(cell, id));
    }

    /// Relocate `id` from `from` to `to`. Returns false if `id` was not at `from`.
    pub fn relocate(&mut self, id: AgentId, from: Cell, to: Cell) -> bool {
        if self.tree.remove(&AgentLocation::new(from, id)).is_none() {
            return false;
        }
        self.tree.insert(AgentLocation::new(to, id));
        true
    }

    /// Agents standing on `cell`, sorted by id.
    pub fn occupants(&self, cell: Cell) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .tree
            .locate_all_at_point(&cell)
            .map(|loc| loc.data)
            .collect();
        ids.sort();
        ids
    }

    /// Agents within Chebyshev `radius` of `center` (center cell included), sorted by id.
    pub fn within(&self, center: Cell, radius: i32) -> Vec<AgentLocation> {
        let envelope = AABB::from_corners(
            [center[0].saturating_sub(radius), center[1].saturating_sub(radius)],
            [center[0].saturating_add(radius), center[1].saturating_add(radius)],
        );
        let mut found: Vec<AgentLocation> =
            self.tree.locate_in_envelope(&envelope).cloned().collect();
        found.sort_by_key(|loc| loc.data);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn neighborhood_counts_full_moore_window() {
        let grid = Grid::new(20, 20);
        assert_eq!(grid.neighborhood([10, 10], 1, false).unwrap().len(), 8);
        assert_eq!(grid.neighborhood([10, 10], 1, true).unwrap().len(), 9);
        assert_eq!(grid.neighborhood([10, 10], 5, false).unwrap().len(), 120);
    }

    #[test]
    fn neighborhood_clips_at_corner() {
        let grid = Grid::new(20, 20);
        let cells = grid.neighborhood([0, 0], 1, false).unwrap();
        assert_eq!(cells, vec![[1, 0], [0, 1], [1, 1]]);
    }

    #[test]
    fn neighborhood_rejects_bad_arguments() {
        let grid = Grid::new(5, 5);
        assert_eq!(
            grid.neighborhood([2, 2], 0, false),
            Err(FieldError::NonPositiveRadius(0))
        );
        assert!(matches!(
            grid.neighborhood([5, 2], 1, false),
            Err(FieldError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn neighborhood_radius_beyond_grid_covers_whole_lake() {
        let grid = Grid::new(20, 20);
        assert_eq!(grid.neighborhood([3, 17], 30_000, true).unwrap().len(), 400);
        let cells = grid.neighborhood([3, 17], i32::MAX, false).unwrap();
        assert_eq!(cells.len(), 399);
        assert!(cells.iter().all(|&c| grid.contains(c)));
    }

    #[test]
    fn step_toward_moves_one_unit_per_axis() {
        assert_eq!(Grid::step_toward([0, 0], [5, 3]), [1, 1]);
        assert_eq!(Grid::step_toward([4, 4], [4, 0]), [4, 3]);
        assert_eq!(Grid::step_toward([2, 2], [2, 2]), [2, 2]);
    }

    #[test]
    fn occupancy_tracks_relocation() {
        let mut keys: SlotMap<AgentId, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());
        let mut index = OccupancyIndex::build(vec![
            AgentLocation::new([1, 1], a),
            AgentLocation::new([1, 1], b),
        ]);
        assert_eq!(index.occupants([1, 1]), vec![a, b]);

        assert!(index.relocate(a, [1, 1], [2, 2]));
        assert_eq!(index.occupants([1, 1]), vec![b]);
        assert_eq!(index.occupants([2, 2]), vec![a]);
        assert!(!index.relocate(a, [1, 1], [3, 3]), "stale origin is rejected");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn within_uses_chebyshev_window() {
        let mut keys: SlotMap<AgentId, ()> = SlotMap::with_key();
        let ids: Vec<AgentId> = (0..3).map(|_| keys.insert(())).collect();
        let index = OccupancyIndex::build(vec![
            AgentLocation::new([5, 5], ids[0]),
            AgentLocation::new([7, 3], ids[1]),
            AgentLocation::new([9, 5], ids[2]),
        ]);
        let near: Vec<AgentId> = index.within([5, 5], 2).iter().map(|l| l.data).collect();
        assert_eq!(near, vec![ids[0], ids[1]]);
        assert_eq!(chebyshev([5, 5], [7, 3]), 2);
        assert_eq!(index.within([5, 5], i32::MAX).len(), 3);
    }
}
