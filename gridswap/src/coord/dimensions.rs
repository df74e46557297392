//! Real-world extent of a grid and the x/y <-> row/col mapping.
//!
//! All arithmetic is done in `Decimal` so that large extents built from small
//! cell sizes do not accumulate floating point drift. Rows grow with `y`:
//! row 0 is the band of cells starting at `y_min`.

use super::layout::ChunkLayout;
use super::types::{CellId, CoordError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Origin, cell size and extent of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    x_min: Decimal,
    y_min: Decimal,
    x_max: Decimal,
    y_max: Decimal,
    cell_size: Decimal,
}

impl Dimensions {
    /// Dimensions of a grid with the given origin and cell size, sized to `layout`.
    pub fn new(
        x_min: Decimal,
        y_min: Decimal,
        cell_size: Decimal,
        layout: &ChunkLayout,
    ) -> Result<Self, CoordError> {
        if cell_size <= Decimal::ZERO {
            return Err(CoordError::InvalidCellSize(cell_size));
        }

        let width = cell_size
            .checked_mul(Decimal::from(layout.n_cols()))
            .ok_or(CoordError::ExtentOverflow)?;
        let height = cell_size
            .checked_mul(Decimal::from(layout.n_rows()))
            .ok_or(CoordError::ExtentOverflow)?;

        Ok(Self {
            x_min,
            y_min,
            x_max: x_min.checked_add(width).ok_or(CoordError::ExtentOverflow)?,
            y_max: y_min.checked_add(height).ok_or(CoordError::ExtentOverflow)?,
            cell_size,
        })
    }

    /// Unit cells with the origin at (0, 0).
    pub fn unit(layout: &ChunkLayout) -> Result<Self, CoordError> {
        Self::new(Decimal::ZERO, Decimal::ZERO, Decimal::ONE, layout)
    }

    pub fn x_min(&self) -> Decimal {
        self.x_min
    }

    pub fn y_min(&self) -> Decimal {
        self.y_min
    }

    pub fn x_max(&self) -> Decimal {
        self.x_max
    }

    pub fn y_max(&self) -> Decimal {
        self.y_max
    }

    pub fn cell_size(&self) -> Decimal {
        self.cell_size
    }

    /// Column containing `x`: `floor((x - x_min) / cell_size)`.
    ///
    /// Not clamped; the result may lie outside the grid.
    pub fn col_of(&self, x: Decimal) -> i64 {
        self.floor_index(x, self.x_min)
    }

    /// Row containing `y`: `floor((y - y_min) / cell_size)`.
    pub fn row_of(&self, y: Decimal) -> i64 {
        self.floor_index(y, self.y_min)
    }

    fn floor_index(&self, value: Decimal, origin: Decimal) -> i64 {
        let below = value < origin;
        value
            .checked_sub(origin)
            .and_then(|offset| offset.checked_div(self.cell_size))
            .and_then(|index| index.floor().to_i64())
            .unwrap_or(if below { i64::MIN } else { i64::MAX })
    }

    /// X coordinate of the centre of cells in `col`.
    pub fn centroid_x(&self, col: i64) -> Decimal {
        self.x_min + self.cell_size * Decimal::from(col) + self.half_cell()
    }

    /// Y coordinate of the centre of cells in `row`.
    pub fn centroid_y(&self, row: i64) -> Decimal {
        self.y_min + self.cell_size * Decimal::from(row) + self.half_cell()
    }

    fn half_cell(&self) -> Decimal {
        self.cell_size / Decimal::from(2)
    }

    /// Boundary-inclusive containment test; points on the max edges are inside.
    pub fn contains(&self, x: Decimal, y: Decimal) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Cell containing `(x, y)`, or `None` when the point lies outside the extent.
    ///
    /// Points on the max edges resolve to the last row/column.
    pub fn cell_of(&self, x: Decimal, y: Decimal, layout: &ChunkLayout) -> Option<CellId> {
        if !self.contains(x, y) {
            return None;
        }
        Some(CellId::new(
            self.row_of(y).min(layout.n_rows() - 1),
            self.col_of(x).min(layout.n_cols() - 1),
        ))
    }

    /// Cell nearest to `(x, y)`.
    ///
    /// Inside the extent this is [`cell_of`](Self::cell_of). Outside it the
    /// point is clamped to an edge or corner cell: the right edge is tested
    /// before the left edge, and above the top edge resolves to row 0 while
    /// below the bottom edge resolves to the last row. Boundary queries
    /// depend on this exact tie-break.
    pub fn nearest_cell(&self, x: Decimal, y: Decimal, layout: &ChunkLayout) -> CellId {
        if let Some(cell) = self.cell_of(x, y, layout) {
            return cell;
        }

        let col = if x > self.x_max {
            layout.n_cols() - 1
        } else if x < self.x_min {
            0
        } else {
            self.col_of(x).min(layout.n_cols() - 1)
        };

        let row = if y > self.y_max {
            0
        } else if y < self.y_min {
            layout.n_rows() - 1
        } else {
            self.row_of(y).min(layout.n_rows() - 1)
        };

        CellId::new(row, col)
    }
}
