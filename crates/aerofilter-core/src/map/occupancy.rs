//! Binary occupancy grid
//!
//! Cells are addressed by integer `(x, y)` with `x` along the columns and
//! `y` along the rows. A continuous position `(x, y)` lies in the cell
//! `(floor(x), floor(y))`.

use std::path::Path;

use thiserror::Error;

/// Errors raised while building or loading a map
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map must have at least one cell")]
    Empty,
    #[error("expected {expected} cells for a {width}x{height} map, found {found}")]
    CellCount {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },
    #[error("a {width}x{height} map has more cells than fit in memory")]
    TooLarge { width: usize, height: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cannot parse {value:?} at line {line}, column {column}")]
    Parse {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
}

fn cell_count(width: usize, height: usize) -> Result<usize, MapError> {
    width
        .checked_mul(height)
        .ok_or(MapError::TooLarge { width, height })
}

/// Fixed-size binary obstacle grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyMap {
    width: usize,
    height: usize,
    /// Row-major, `true` = obstacle
    cells: Vec<bool>,
}

impl OccupancyMap {
    /// Build a map from row-major cells (`true` = obstacle)
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::Empty);
        }
        let expected = cell_count(width, height)?;
        if cells.len() != expected {
            return Err(MapError::CellCount {
                width,
                height,
                expected,
                found: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a map from rows, row index being `y`
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self, MapError> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(MapError::Ragged {
                    row,
                    expected: width,
                    found: r.len(),
                });
            }
            cells.extend_from_slice(r);
        }
        Self::from_cells(width, rows.len(), cells)
    }

    /// All cells free
    pub fn empty(width: usize, height: usize) -> Result<Self, MapError> {
        let count = cell_count(width, height)?;
        Self::from_cells(width, height, vec![false; count])
    }

    /// Free interior enclosed by a one-cell obstacle border
    pub fn bordered(width: usize, height: usize) -> Result<Self, MapError> {
        let mut map = Self::empty(width, height)?;
        map.fill_rect(0, 0, width - 1, 0);
        map.fill_rect(0, height - 1, width - 1, height - 1);
        map.fill_rect(0, 0, 0, height - 1);
        map.fill_rect(width - 1, 0, width - 1, height - 1);
        Ok(map)
    }

    /// Parse delimited numeric text, one row per line; nonzero = obstacle
    ///
    /// Blank lines are skipped. Cells may be integers or floats.
    pub fn from_delimited(text: &str, delimiter: char) -> Result<Self, MapError> {
        let mut rows: Vec<Vec<bool>> = Vec::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(delimiter)
                .enumerate()
                .map(|(column, field)| {
                    let field = field.trim();
                    field
                        .parse::<f64>()
                        .map(|v| v != 0.0)
                        .map_err(|_| MapError::Parse {
                            line: line_idx + 1,
                            column: column + 1,
                            value: field.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Self::from_rows(&rows)
    }

    /// Load a delimited map file
    pub fn load(path: impl AsRef<Path>, delimiter: char) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_delimited(&text, delimiter)
    }

    /// Mark an inclusive rectangle of cells as obstacles, clipped to the map
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize) {
        let x1 = x1.min(self.width - 1);
        let y1 = y1.min(self.height - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.cells[y * self.width + x] = true;
            }
        }
    }

    /// Mark a single cell as an obstacle; out-of-range cells are ignored
    pub fn set_obstacle(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = true;
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether a continuous position lies inside the map extents
    pub fn inbounds(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    /// Whether an integer cell lies inside the map
    pub fn cell_inbounds(&self, cx: i64, cy: i64) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.width && (cy as usize) < self.height
    }

    /// Obstacle test for an integer cell; out-of-range cells are not obstacles
    pub fn is_occupied(&self, cx: i64, cy: i64) -> bool {
        self.cell_inbounds(cx, cy) && self.cells[cy as usize * self.width + cx as usize]
    }

    /// In bounds and not inside an obstacle cell
    pub fn valid_location(&self, x: f64, y: f64) -> bool {
        self.inbounds(x, y) && !self.is_occupied(x.floor() as i64, y.floor() as i64)
    }

    pub fn free_cell_count(&self) -> usize {
        self.cells.iter().filter(|&&c| !c).count()
    }
}
