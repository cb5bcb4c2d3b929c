//! First-fit placement of new widgets on the dashboard grid.
//!
//! Pure functions only. The drag/resize collision engine lives in the client
//! grid library; this module only decides where a freshly added widget lands.

use serde::{Deserialize, Serialize};

/// Default number of grid columns.
pub const DEFAULT_COLS: u32 = 12;

/// Default number of rows scanned before falling back to appending.
pub const DEFAULT_MAX_SCAN_ROWS: u32 = 20;

/// Highest row a widget may start on. Client coordinates are clamped to it.
pub const MAX_ROW: u32 = 10_000;

/// An axis-aligned rectangle in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Two rectangles overlap unless one lies entirely beside or above the
    /// other. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.x >= other.right()
            || self.right() <= other.x
            || self.y >= other.bottom()
            || self.bottom() <= other.y)
    }

    /// One past the last occupied column.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// One past the last occupied row.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// Grid dimensions used by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub cols: u32,
    pub max_scan_rows: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            max_scan_rows: DEFAULT_MAX_SCAN_ROWS,
        }
    }
}

/// Find the first free cell for a `w` x `h` rectangle.
///
/// Scans rows top to bottom and, within a row, columns left to right; the
/// first position that overlaps nothing in `existing` wins. When the scan
/// limit is exhausted the rectangle is appended below everything at
/// `(0, bottom)`. Never fails.
pub fn find_free_position(existing: &[Rect], w: u32, h: u32, grid: GridSpec) -> (u32, u32) {
    if w <= grid.cols {
        for y in 0..grid.max_scan_rows {
            for x in 0..=(grid.cols - w) {
                let candidate = Rect::new(x, y, w, h);
                if !existing.iter().any(|r| candidate.overlaps(r)) {
                    return (x, y);
                }
            }
        }
    }

    let bottom = existing.iter().map(Rect::bottom).max().unwrap_or(0);
    (0, bottom)
}

/// Whether `candidate` collides with any rectangle in `existing`.
pub fn collides(candidate: &Rect, existing: &[Rect]) -> bool {
    existing.iter().any(|r| candidate.overlaps(r))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
