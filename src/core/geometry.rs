//! Window geometry.
//!
//! The window size is always derived from the character grid: `padding + cell * grid`.
//! Users can still resize the window by hand, so the reconciler runs a two-phase
//! protocol:
//!
//! 1. [`GeometryReconciler::on_user_resize`] only records the observed size and sets
//!    the `resized` flag when it differs from what we last asked for.
//! 2. The next [`GeometryReconciler::apply_size`] re-derives the grid from the observed
//!    size if the flag is set, then computes the window size to request.
//!
//! Resize handlers never resize the window themselves, so our own size requests
//! cannot feed back into another recomputation.

use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Default grid size
pub const DEFAULT_COLUMNS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;

/// Size of one character cell in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

impl CellMetrics {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Total inner border around the grid (left + right, top + bottom)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub x: u32,
    pub y: u32,
}

impl Padding {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Window size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Terminal size in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub columns: u16,
    pub rows: u16,
}

impl GridSize {
    /// Grid of at least one cell in each direction
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS, DEFAULT_ROWS)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

/// Window size for a grid. Saturates at `u32::MAX` for absurd cell metrics.
pub fn derive_pixels(grid: GridSize, metrics: CellMetrics, padding: Padding) -> PixelSize {
    let extent =
        |pad: u32, cell: u32, cells: u16| pad.saturating_add(cell.saturating_mul(u32::from(cells)));
    PixelSize {
        width: extent(padding.x, metrics.width, grid.columns),
        height: extent(padding.y, metrics.height, grid.rows),
    }
}

/// Largest grid that fits in a window, never smaller than 1x1
pub fn derive_grid(size: PixelSize, metrics: CellMetrics, padding: Padding) -> GridSize {
    let cells = |pixels: u32, pad: u32, cell: u32| {
        let n = pixels.saturating_sub(pad) / cell.max(1);
        u16::try_from(n).unwrap_or(u16::MAX)
    };
    GridSize::new(
        cells(size.width, padding.x, metrics.width),
        cells(size.height, padding.y, metrics.height),
    )
}

/// Grid and window size bookkeeping for the single terminal window
#[derive(Debug, Clone)]
pub struct GeometryReconciler {
    grid: GridSize,
    /// Size passed to the last window resize we requested
    requested: Option<PixelSize>,
    /// Size last reported by the window
    observed: Option<PixelSize>,
    /// Metrics and padding the current window layout was computed with
    layout: Option<(CellMetrics, Padding)>,
    resized: bool,
}

impl GeometryReconciler {
    pub fn new(grid: GridSize) -> Self {
        Self {
            grid,
            requested: None,
            observed: None,
            layout: None,
            resized: false,
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Override the grid, e.g. from `--geometry`
    pub fn set_grid(&mut self, grid: GridSize) {
        self.grid = grid;
    }

    /// A user resize happened since the last [`apply_size`](Self::apply_size)
    #[allow(dead_code)]
    pub fn is_resized(&self) -> bool {
        self.resized
    }

    #[allow(dead_code)]
    pub fn last_requested(&self) -> Option<PixelSize> {
        self.requested
    }

    /// Compute the window size for `requested` (or for the user's size, if they
    /// resized the window since our last request) and record it as requested.
    pub fn apply_size(
        &mut self,
        requested: GridSize,
        metrics: CellMetrics,
        padding: Padding,
    ) -> PixelSize {
        self.grid = requested;

        if self.resized {
            if let Some(observed) = self.observed {
                let (old_metrics, old_padding) = self.layout.unwrap_or((metrics, padding));
                self.grid = derive_grid(observed, old_metrics, old_padding);
                debug!(
                    "User resized window to {}x{}: grid is now {}",
                    observed.width, observed.height, self.grid
                );
            }
            self.resized = false;
        }

        let size = derive_pixels(self.grid, metrics, padding);
        self.requested = Some(size);
        self.layout = Some((metrics, padding));
        size
    }

    /// Record a size reported by the window. Returns whether it was flagged as a user resize.
    pub fn on_user_resize(&mut self, size: PixelSize) -> bool {
        self.observed = Some(size);
        if self.requested != Some(size) {
            self.resized = true;
        }
        self.resized
    }
}

/// Offset of a window edge from a screen edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// `+N`: from the left or top
    FromStart(u32),
    /// `-N`: from the right or bottom
    FromEnd(u32),
}

/// Window position from a geometry string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: Offset,
    pub y: Offset,
}

/// A parsed X-style `WxH+X+Y` geometry, in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySpec {
    pub grid: Option<GridSize>,
    pub position: Option<Position>,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid geometry.")]
pub struct InvalidGeometry;

/// Parse `[=][WxH][{+-}X{+-}Y]`. At least one of the size and the position is required.
pub fn parse_geometry(s: &str) -> Result<GeometrySpec, InvalidGeometry> {
    let s = s.trim();
    let s = s.strip_prefix('=').unwrap_or(s);

    let pos_start = s.find(['+', '-']).unwrap_or(s.len());
    let (size_part, pos_part) = s.split_at(pos_start);

    let grid = if size_part.is_empty() {
        None
    } else {
        let (w, h) = size_part
            .split_once(['x', 'X'])
            .ok_or(InvalidGeometry)?;
        let columns = parse_cells(w)?;
        let rows = parse_cells(h)?;
        Some(GridSize::new(columns, rows))
    };

    let position = if pos_part.is_empty() {
        None
    } else {
        let (x, rest) = parse_offset(pos_part)?;
        let (y, rest) = parse_offset(rest)?;
        if !rest.is_empty() {
            return Err(InvalidGeometry);
        }
        Some(Position { x, y })
    };

    if grid.is_none() && position.is_none() {
        return Err(InvalidGeometry);
    }
    Ok(GeometrySpec { grid, position })
}

fn parse_cells(s: &str) -> Result<u16, InvalidGeometry> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidGeometry);
    }
    match s.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InvalidGeometry),
    }
}

fn parse_offset(s: &str) -> Result<(Offset, &str), InvalidGeometry> {
    let mut chars = s.chars();
    let sign = chars.next().ok_or(InvalidGeometry)?;
    let rest = chars.as_str();
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits == 0 {
        return Err(InvalidGeometry);
    }
    let value: u32 = rest[..digits].parse().map_err(|_| InvalidGeometry)?;
    let offset = match sign {
        '+' => Offset::FromStart(value),
        '-' => Offset::FromEnd(value),
        _ => return Err(InvalidGeometry),
    };
    Ok((offset, &rest[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellMetrics = CellMetrics::new(8, 16);
    const PAD: Padding = Padding::new(2, 2);

    #[test]
    fn test_derive_pixels() {
        let size = derive_pixels(GridSize::new(80, 24), CELL, PAD);
        assert_eq!(size, PixelSize::new(642, 386));
        assert_eq!(derive_grid(size, CELL, PAD), GridSize::new(80, 24));
    }

    #[test]
    fn test_derive_pixels_is_monotonic() {
        for metrics in [CellMetrics::new(1, 1), CELL, CellMetrics::new(13, 27)] {
            for pad in [Padding::default(), PAD, Padding::new(7, 31)] {
                for n in 1..200u16 {
                    let a = derive_pixels(GridSize::new(n, 10), metrics, pad);
                    let b = derive_pixels(GridSize::new(n + 1, 10), metrics, pad);
                    assert!(b.width > a.width);
                    assert_eq!(b.height, a.height);

                    let c = derive_pixels(GridSize::new(10, n), metrics, pad);
                    let d = derive_pixels(GridSize::new(10, n + 1), metrics, pad);
                    assert!(d.height > c.height);
                    assert_eq!(d.width, c.width);
                }
            }
        }
    }

    #[test]
    fn test_derive_pixels_saturates() {
        let huge = CellMetrics::new(u32::MAX, u32::MAX);
        let size = derive_pixels(GridSize::new(80, 24), huge, PAD);
        assert_eq!(size, PixelSize::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_derive_grid_never_below_one() {
        let grid = derive_grid(PixelSize::new(3, 1), CELL, PAD);
        assert_eq!(grid, GridSize::new(1, 1));
    }

    #[test]
    fn test_user_resize_overrides_stale_request() {
        let mut geometry = GeometryReconciler::new(GridSize::default());
        let first = geometry.apply_size(GridSize::new(80, 24), CELL, PAD);
        assert_eq!(first, PixelSize::new(642, 386));

        // 100x30 cells
        assert!(geometry.on_user_resize(PixelSize::new(802, 482)));

        let second = geometry.apply_size(GridSize::new(80, 24), CELL, PAD);
        assert_eq!(geometry.grid(), GridSize::new(100, 30));
        assert_eq!(second, PixelSize::new(802, 482));
        assert!(!geometry.is_resized());
    }

    #[test]
    fn test_own_resize_is_not_flagged() {
        let mut geometry = GeometryReconciler::new(GridSize::default());
        let size = geometry.apply_size(GridSize::new(80, 24), CELL, PAD);
        assert!(!geometry.on_user_resize(size));

        geometry.apply_size(GridSize::new(90, 20), CELL, PAD);
        assert_eq!(geometry.grid(), GridSize::new(90, 20));
    }

    #[test]
    fn test_font_change_preserves_grid() {
        let mut geometry = GeometryReconciler::new(GridSize::default());
        let before = geometry.apply_size(GridSize::new(80, 24), CELL, PAD);

        let larger = CellMetrics::new(9, 18);
        let after = geometry.apply_size(geometry.grid(), larger, PAD);

        assert_eq!(geometry.grid(), GridSize::new(80, 24));
        assert!(after.width > before.width);
        assert!(after.height > before.height);
    }

    #[test]
    fn test_user_resize_then_font_change_uses_old_metrics() {
        let mut geometry = GeometryReconciler::new(GridSize::default());
        geometry.apply_size(GridSize::new(80, 24), CELL, PAD);
        geometry.on_user_resize(PixelSize::new(802, 482));

        let size = geometry.apply_size(geometry.grid(), CellMetrics::new(10, 20), PAD);
        assert_eq!(geometry.grid(), GridSize::new(100, 30));
        assert_eq!(size, PixelSize::new(1002, 602));
    }

    #[test]
    fn test_parse_geometry() {
        assert_eq!(
            parse_geometry("100x30+10-20"),
            Ok(GeometrySpec {
                grid: Some(GridSize::new(100, 30)),
                position: Some(Position {
                    x: Offset::FromStart(10),
                    y: Offset::FromEnd(20),
                }),
            })
        );
        assert_eq!(
            parse_geometry("=132X43"),
            Ok(GeometrySpec {
                grid: Some(GridSize::new(132, 43)),
                position: None,
            })
        );
        assert_eq!(parse_geometry("+0+0").unwrap().grid, None);
    }

    #[test]
    fn test_parse_geometry_rejects_garbage() {
        let garbage = [
            "", "=", "80", "80x", "x24", "0x24", "80x24+1", "80x24+1+2+3", "80x24+a+b", "big",
        ];
        for bad in garbage {
            assert_eq!(parse_geometry(bad), Err(InvalidGeometry), "{bad}");
        }
    }
}
