//! Terminal rendering of RGB frames.
//!
//! Each terminal cell shows two vertically stacked pixels using the upper
//! half block: foreground is the upper pixel, background the lower one.
//! Frames are scaled with nearest-neighbour sampling to fit the area while
//! keeping their aspect ratio.

use parkwatch_core::{Frame, Point};
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

const HALF_BLOCK: &str = "▀";

/// Where a frame lands inside an area, in cells and half-cell rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameViewport {
    /// Cells covered by the scaled frame.
    pub rect: Rect,
    frame_width: u32,
    frame_height: u32,
    /// Scaled size in pixels (columns, half-rows).
    scaled_width: u32,
    scaled_height: u32,
}

impl FrameViewport {
    /// Fits a `frame_width` x `frame_height` frame into `area`, centered.
    ///
    /// Returns `None` when either the frame or the area is empty.
    pub fn fit(area: Rect, frame_width: u32, frame_height: u32) -> Option<Self> {
        if area.is_empty() || frame_width == 0 || frame_height == 0 {
            return None;
        }
        let max_w = u64::from(area.width);
        let max_h = u64::from(area.height) * 2;
        let (fw, fh) = (u64::from(frame_width), u64::from(frame_height));

        let (mut sw, mut sh) = (max_w, fh * max_w / fw);
        if sh > max_h {
            sh = max_h;
            sw = fw * max_h / fh;
        }
        let sw = sw.clamp(1, max_w);
        let sh = sh.clamp(1, max_h);

        let cols = u16::try_from(sw).unwrap_or(area.width);
        let rows = u16::try_from(sh.div_ceil(2)).unwrap_or(area.height);
        let rect = Rect::new(
            area.x + (area.width - cols) / 2,
            area.y + (area.height - rows) / 2,
            cols,
            rows,
        );

        Some(Self {
            rect,
            frame_width,
            frame_height,
            scaled_width: u32::try_from(sw).unwrap_or(frame_width),
            scaled_height: u32::try_from(sh).unwrap_or(frame_height),
        })
    }

    /// Frame column shown at scaled column `sx`.
    fn source_x(&self, sx: u32) -> u32 {
        let x = u64::from(sx) * u64::from(self.frame_width) / u64::from(self.scaled_width);
        u32::try_from(x).unwrap_or(u32::MAX).min(self.frame_width - 1)
    }

    /// Frame row shown at scaled half-row `sy`.
    fn source_y(&self, sy: u32) -> u32 {
        let y = u64::from(sy) * u64::from(self.frame_height) / u64::from(self.scaled_height);
        u32::try_from(y).unwrap_or(u32::MAX).min(self.frame_height - 1)
    }

    /// Maps a terminal cell back to frame coordinates.
    ///
    /// The cell center is used; cells outside the scaled frame map to `None`.
    pub fn cell_to_frame(&self, column: u16, row: u16) -> Option<Point> {
        if !self.rect.contains((column, row).into()) {
            return None;
        }
        let dx = u64::from(column - self.rect.x);
        let dy = u64::from(row - self.rect.y);
        let (fw, fh) = (u64::from(self.frame_width), u64::from(self.frame_height));
        let (sw, sh) = (u64::from(self.scaled_width), u64::from(self.scaled_height));

        // Cell center: half a column across, one half-row down
        let x = ((2 * dx + 1) * fw / (2 * sw)).min(fw - 1);
        let y = ((2 * dy + 1) * fh / sh).min(fh - 1);
        Some(Point::new(
            i32::try_from(x).ok()?,
            i32::try_from(y).ok()?,
        ))
    }
}

/// Widget drawing a frame with half blocks.
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn new(frame: &'a Frame) -> Self {
        Self { frame }
    }

    pub fn viewport(&self, area: Rect) -> Option<FrameViewport> {
        FrameViewport::fit(area, self.frame.width(), self.frame.height())
    }

    fn color_at(&self, viewport: &FrameViewport, sx: u32, sy: u32) -> Color {
        let x = viewport.source_x(sx);
        let y = viewport.source_y(sy);
        match self.frame.pixel(i64::from(x), i64::from(y)) {
            Some([r, g, b]) => Color::Rgb(r, g, b),
            None => Color::Reset,
        }
    }
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(viewport) = self.viewport(area) else {
            return;
        };
        let rect = viewport.rect;

        for row in 0..rect.height {
            let upper = u32::from(row) * 2;
            let lower = upper + 1;
            for col in 0..rect.width {
                let sx = u32::from(col);
                let fg = self.color_at(&viewport, sx, upper);
                let bg = if lower < viewport.scaled_height {
                    self.color_at(&viewport, sx, lower)
                } else {
                    Color::Reset
                };
                if let Some(cell) = buf.cell_mut((rect.x + col, rect.y + row)) {
                    cell.set_symbol(HALF_BLOCK).set_fg(fg).set_bg(bg);
                }
            }
        }
    }
}
