//! Overlay placement and sprite-grid math.
//!
//! Everything here is pure. The controller feeds it measured rectangles and
//! decoded image sizes and gets back what the overlay should look like.

use crate::page::Rect;
use crate::providers::SpriteCandidate;
use serde::Serialize;

/// Ratios closer than this are treated as equal to avoid sub-pixel jitter.
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Placement of the sprite layer inside the overlay container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRect {
    pub width: f64,
    pub height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl FrameRect {
    /// Layer covering the whole container, used when no sheet size is known.
    pub fn fill(container_width: f64, container_height: f64) -> Self {
        Self {
            width: container_width,
            height: container_height,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Pixel size of a complete sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SheetSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
}

/// Fit one frame of a `cols`x`rows` sheet into the container, centering
/// along the axis with slack.
pub fn frame_rect(
    container_width: f64,
    container_height: f64,
    cols: u32,
    rows: u32,
    sheet_width: f64,
    sheet_height: f64,
) -> FrameRect {
    let usable = [container_width, container_height, sheet_width, sheet_height]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
    if !usable || cols == 0 || rows == 0 {
        return FrameRect::fill(container_width, container_height);
    }

    let frame_width = sheet_width / f64::from(cols);
    let frame_height = sheet_height / f64::from(rows);
    let frame_ratio = frame_width / frame_height;
    let container_ratio = container_width / container_height;

    if (frame_ratio - container_ratio).abs() < ASPECT_TOLERANCE {
        FrameRect::fill(container_width, container_height)
    } else if frame_ratio > container_ratio {
        let height = container_width / frame_ratio;
        FrameRect {
            width: container_width,
            height,
            offset_x: 0.0,
            offset_y: (container_height - height) / 2.0,
        }
    } else {
        let width = container_height * frame_ratio;
        FrameRect {
            width,
            height: container_height,
            offset_x: (container_width - width) / 2.0,
            offset_y: 0.0,
        }
    }
}

/// Grid cell shown for a scrub position in `[0, 1]`.
pub fn frame_for_progress(progress: f64, cols: u32, rows: u32, frame_count: u32) -> GridCell {
    if cols == 0 || frame_count == 0 {
        return GridCell { col: 0, row: 0 };
    }
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    let index = (progress * f64::from(frame_count - 1)).floor() as u32;
    let row = index / cols;
    GridCell {
        col: index % cols,
        row: row.min(rows.saturating_sub(1)),
    }
}

/// CSS `background-position` percentages for a cell, expressed as a share of
/// the remaining travel rather than of the cell index.
pub fn background_position_percent(cell: GridCell, cols: u32, rows: u32) -> (f64, f64) {
    let x = if cols > 1 {
        100.0 * f64::from(cell.col) / f64::from(cols - 1)
    } else {
        0.0
    };
    let y = if rows > 1 {
        100.0 * f64::from(cell.row) / f64::from(rows - 1)
    } else {
        0.0
    };
    (x, y)
}

/// CSS `background-size` percentages that make one cell fill the layer.
pub fn background_size_percent(cols: u32, rows: u32) -> (u32, u32) {
    (cols.saturating_mul(100), rows.saturating_mul(100))
}

/// Horizontal pointer position across `bounds`, clamped to `[0, 1]`.
pub fn progress_at(pointer_x: f64, bounds: Rect) -> f64 {
    if !(bounds.width > 0.0) {
        return 0.0;
    }
    let progress = (pointer_x - bounds.left) / bounds.width;
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Full-sheet size implied by a preview image whose grid is undistorted.
pub fn sheet_size_from_preview(
    candidate: &SpriteCandidate,
    preview_width: u32,
    preview_height: u32,
) -> Option<SheetSize> {
    let preview = candidate.preview.as_ref()?;
    if preview.cols == 0 || preview.rows == 0 {
        return None;
    }
    Some(SheetSize {
        width: f64::from(preview_width) / f64::from(preview.cols) * f64::from(candidate.cols),
        height: f64::from(preview_height) / f64::from(preview.rows) * f64::from(candidate.rows),
    })
}
