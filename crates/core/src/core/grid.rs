//! Box and cell addressing.
//!
//! Boxes are laid out row-major in a `rows x cols` arrangement; each box holds a
//! `res x res` sub-grid of cells, also row-major. A (box, cell) pair additionally
//! maps onto a flat identifier space and onto the overall mosaic of
//! `(rows * res) x (cols * res)` positions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on `rows * cols`.
pub const MAX_BOXES: usize = 1024;

/// Upper bound on `res * res`.
pub const MAX_CELLS_PER_BOX: usize = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridShape {
    rows: u32,
    cols: u32,
    res: u32,
}

impl GridShape {
    pub fn new(rows: u32, cols: u32, res: u32) -> Result<Self> {
        if rows == 0 {
            return Err(Error::config("gridRows", "must be at least 1"));
        }
        if cols == 0 {
            return Err(Error::config("gridCols", "must be at least 1"));
        }
        if res == 0 {
            return Err(Error::config("gridRes", "must be at least 1"));
        }

        // u64 products cannot overflow for u32 factors.
        let boxes = u64::from(rows) * u64::from(cols);
        if boxes > MAX_BOXES as u64 {
            return Err(Error::config(
                "gridCols",
                format!("gridRows x gridCols must not exceed {MAX_BOXES} boxes"),
            ));
        }
        let cells = u64::from(res) * u64::from(res);
        if cells > MAX_CELLS_PER_BOX as u64 {
            return Err(Error::config(
                "gridRes",
                format!("gridRes x gridRes must not exceed {MAX_CELLS_PER_BOX} cells"),
            ));
        }

        Ok(Self { rows, cols, res })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn res(&self) -> u32 {
        self.res
    }

    pub fn box_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn cells_per_box(&self) -> usize {
        self.res as usize * self.res as usize
    }

    /// Size of the flat identifier space.
    pub fn total_cells(&self) -> usize {
        self.box_count() * self.cells_per_box()
    }

    pub fn box_index(&self, row: u32, col: u32) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(self.box_out_of_range(row as usize * self.cols as usize + col as usize));
        }
        Ok(row as usize * self.cols as usize + col as usize)
    }

    pub fn box_coords(&self, box_index: usize) -> Result<(u32, u32)> {
        self.check_box(box_index)?;
        let cols = self.cols as usize;
        Ok(((box_index / cols) as u32, (box_index % cols) as u32))
    }

    pub fn cell_index(&self, inner_row: u32, inner_col: u32) -> Result<usize> {
        if inner_row >= self.res || inner_col >= self.res {
            return Err(Error::config(
                "gridRes",
                format!(
                    "cell ({inner_row}, {inner_col}) lies outside a {0}x{0} box",
                    self.res
                ),
            ));
        }
        Ok(inner_row as usize * self.res as usize + inner_col as usize)
    }

    pub fn cell_coords(&self, cell: usize) -> Result<(u32, u32)> {
        self.check_cell(cell)?;
        let res = self.res as usize;
        Ok(((cell / res) as u32, (cell % res) as u32))
    }

    pub fn contains_box(&self, box_index: usize) -> bool {
        box_index < self.box_count()
    }

    pub fn contains_cell(&self, cell: usize) -> bool {
        cell < self.cells_per_box()
    }

    pub fn flat_id(&self, box_index: usize, cell: usize) -> Result<usize> {
        self.check_box(box_index)?;
        self.check_cell(cell)?;
        Ok(box_index * self.cells_per_box() + cell)
    }

    pub fn from_flat_id(&self, id: usize) -> Result<(usize, usize)> {
        if id >= self.total_cells() {
            return Err(self.box_out_of_range(id / self.cells_per_box()));
        }
        let per_box = self.cells_per_box();
        Ok((id / per_box, id % per_box))
    }

    /// Position of a cell in the overall mosaic, as (row, col).
    pub fn global_coords(&self, box_index: usize, cell: usize) -> Result<(u32, u32)> {
        let (box_row, box_col) = self.box_coords(box_index)?;
        let (inner_row, inner_col) = self.cell_coords(cell)?;
        Ok((
            box_row * self.res + inner_row,
            box_col * self.res + inner_col,
        ))
    }

    /// Stable element identifier used by renderers.
    pub fn cell_label(&self, box_index: usize, cell: usize) -> Result<String> {
        self.flat_id(box_index, cell)?;
        Ok(format!("cell-{box_index}-{cell}"))
    }

    fn check_box(&self, box_index: usize) -> Result<()> {
        if self.contains_box(box_index) {
            Ok(())
        } else {
            Err(self.box_out_of_range(box_index))
        }
    }

    fn check_cell(&self, cell: usize) -> Result<()> {
        if self.contains_cell(cell) {
            Ok(())
        } else {
            Err(Error::config(
                "gridRes",
                format!(
                    "cell {cell} lies outside the {} cells of a box",
                    self.cells_per_box()
                ),
            ))
        }
    }

    fn box_out_of_range(&self, box_index: usize) -> Error {
        Error::BoxOutOfRange {
            box_index,
            box_count: self.box_count(),
        }
    }
}
