//! Spatial binning of the agents of a tile.
//!
//! A `BinPartition` maps every grid cell of a tile to the agents located in it. The map is
//! stored as a prefix sum over cell counts (`offsets`) and a permutation of agent indices
//! (`items`), so the agents of cell `c` are `items[offsets[c]..offsets[c + 1]]`.

use super::agent::{Position, Tile};
use crate::errors::{EpiError, Result};

/// Largest number of cells a single tile may be split into.
pub const MAX_CELLS: usize = 1 << 24;

#[derive(Clone, Debug, PartialEq)]
pub struct BinPartition {
    cell_size: f64,
    shape: [usize; 2],
    offsets: Vec<usize>,
    items: Vec<usize>,
}

impl BinPartition {
    /// Bin the agents of `tile` into square cells of side `cell_size`.
    ///
    /// Cells are aligned to `origin`. The cell of an agent is clamped to the cells that
    /// overlap the tile bounds. Agents keep their tile order within a cell.
    pub fn build(tile: &Tile, origin: Position, cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(EpiError::InvariantViolation(format!(
                "cell size must be finite and positive, but is {cell_size}"
            )));
        }
        let inv_cell_size = 1. / cell_size;
        let bounds = tile.bounds();

        let cell_of = |x: f64, d: usize| ((x - origin[d]) * inv_cell_size).floor() as i64;
        let lo = [cell_of(bounds.lo[0], 0), cell_of(bounds.lo[1], 1)];
        let hi = [cell_of(bounds.hi[0], 0), cell_of(bounds.hi[1], 1)];
        if hi[0] < lo[0] || hi[1] < lo[1] {
            return Err(EpiError::InvariantViolation(format!(
                "tile {} has inverted bounds {:?}",
                tile.id(),
                bounds
            )));
        }
        let extent = |d: usize| {
            hi[d]
                .checked_sub(lo[d])
                .and_then(|n| n.checked_add(1))
                .and_then(|n| usize::try_from(n).ok())
        };
        let (shape, n_cells) = match (extent(0), extent(1)) {
            (Some(nx), Some(ny)) => match nx.checked_mul(ny) {
                Some(n_cells) if n_cells <= MAX_CELLS => ([nx, ny], n_cells),
                _ => return Err(Self::too_many_cells(tile, cell_size)),
            },
            _ => return Err(Self::too_many_cells(tile, cell_size)),
        };

        let cells = tile
            .agents()
            .iter()
            .enumerate()
            .map(|(idx, agent)| {
                if !bounds.contains(&agent.position) {
                    return Err(EpiError::InvariantViolation(format!(
                        "agent {idx} of tile {} at {:?} lies outside {:?}",
                        tile.id(),
                        agent.position,
                        bounds
                    )));
                }
                let i = cell_of(agent.position[0], 0).clamp(lo[0], hi[0]) - lo[0];
                let j = cell_of(agent.position[1], 1).clamp(lo[1], hi[1]) - lo[1];
                Ok(j as usize * shape[0] + i as usize)
            })
            .collect::<Result<Vec<usize>>>()?;

        // compute prefix sum of cell counts
        let mut offsets = vec![0; n_cells + 1];
        for &cell in cells.iter() {
            offsets[cell + 1] += 1;
        }
        for c in 0..n_cells {
            offsets[c + 1] += offsets[c];
        }

        // fill cells front to back to keep the tile order
        let mut cursor = offsets[..n_cells].to_vec();
        let mut items = vec![0; cells.len()];
        for (idx, &cell) in cells.iter().enumerate() {
            items[cursor[cell]] = idx;
            cursor[cell] += 1;
        }

        let partition = Self {
            cell_size,
            shape,
            offsets,
            items,
        };

        if partition.n_items() != tile.len() {
            return Err(EpiError::InvariantViolation(format!(
                "partition of tile {} holds {} agents instead of {}",
                tile.id(),
                partition.n_items(),
                tile.len()
            )));
        }

        Ok(partition)
    }

    fn too_many_cells(tile: &Tile, cell_size: f64) -> EpiError {
        EpiError::InvariantViolation(format!(
            "cell size {cell_size} splits tile {} with bounds {:?} into more than {MAX_CELLS} cells",
            tile.id(),
            tile.bounds()
        ))
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of cells along each axis.
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.offsets[self.n_cells()]
    }

    /// Agent indices located in cell `cell`.
    pub fn cell(&self, cell: usize) -> &[usize] {
        if cell >= self.n_cells() {
            return &[];
        }
        &self.items[self.offsets[cell]..self.offsets[cell + 1]]
    }

    /// Non-empty cells with their index.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &[usize])> {
        (0..self.n_cells())
            .map(|cell| (cell, self.cell(cell)))
            .filter(|(_, members)| !members.is_empty())
    }
}
