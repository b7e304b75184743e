use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::grid::PixelGrid;

/// Binarized mask value the search treats as walkable.
pub const WALKABLE: u8 = 255;

/// A position in the grid: `x` is the column, `y` the row.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

/// Walkability of a single cell while a search is in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CellState {
    /// Walkable, not yet claimed by the search.
    Available,
    /// Walkable, already enqueued once.
    Processed,
    /// Wall.
    Blocked,
}

impl Default for CellState {
    fn default() -> Self {
        Self::Blocked
    }
}

/// Tri-state walkability map derived from a binarized mask.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectivityMap {
    rows: usize,
    columns: usize,
    cells: Vec<CellState>,
}

impl ConnectivityMap {
    /// Every mask pixel equal to [`WALKABLE`] becomes `Available`, everything
    /// else `Blocked`.
    pub fn from_mask(mask: &PixelGrid) -> Self {
        let cells = mask
            .as_slice()
            .iter()
            .map(|&value| {
                if value == WALKABLE {
                    CellState::Available
                } else {
                    CellState::Blocked
                }
            })
            .collect();

        Self {
            rows: mask.rows(),
            columns: mask.columns(),
            cells,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn state(&self, point: Point) -> CellState {
        self.cells[point.y * self.columns + point.x]
    }

    /// Claim a cell for processing. Returns true exactly once per cell: the
    /// transition is `Available -> Processed`, walls and already-claimed
    /// cells are refused and no cell ever goes back to `Available`.
    pub fn claim(&mut self, point: Point) -> bool {
        let index = point.y * self.columns + point.x;
        if self.cells[index] == CellState::Available {
            self.cells[index] = CellState::Processed;
            true
        } else {
            false
        }
    }
}

impl Display for ConnectivityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.columns {
                write!(
                    f,
                    "{}",
                    match self.cells[row * self.columns + col] {
                        CellState::Blocked => 'X',
                        CellState::Available => ' ',
                        CellState::Processed => '·',
                    }
                )?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Grow the walkable regions of a binarized mask by one layer: every wall
/// pixel 4-adjacent to a walkable pixel is promoted. Marks are collected
/// first and committed after the full pass, so growth cannot cascade within
/// a single call.
pub fn dilate(mask: &mut PixelGrid) {
    let rows = mask.rows();
    let columns = mask.columns();
    let mut promotions: Vec<(usize, usize)> = Vec::new();

    for row in 0..rows {
        for col in 0..columns {
            if mask.get(row, col) != WALKABLE {
                continue;
            }
            if row > 0 && mask.get(row - 1, col) == 0 {
                promotions.push((row - 1, col));
            }
            if col > 0 && mask.get(row, col - 1) == 0 {
                promotions.push((row, col - 1));
            }
            if row + 1 < rows && mask.get(row + 1, col) == 0 {
                promotions.push((row + 1, col));
            }
            if col + 1 < columns && mask.get(row, col + 1) == 0 {
                promotions.push((row, col + 1));
            }
        }
    }

    for (row, col) in promotions {
        mask.set(row, col, WALKABLE);
    }
}
