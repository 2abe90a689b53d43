//! Tick labels and gridlines over a (possibly pixelated) image.
//!
//! Positions are in plot coordinates: pixel centres sit on integers, x grows
//! to the right and y grows upwards from the bottom row. `offset` nudges
//! lines and labelled ticks onto cell boundaries (0.5 puts them exactly
//! between cells).

use image::{Rgba, RgbaImage};

use crate::buffer::PixelBuffer;
use crate::error::{PixelError, Result};

/// Opacity of gridlines.
pub const LINE_ALPHA: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridColor(pub [u8; 3]);

impl GridColor {
    pub const BLACK: GridColor = GridColor([0, 0, 0]);

    /// Named color or `#rrggbb`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let rgb = match text.to_ascii_lowercase().as_str() {
            "black" | "k" => [0, 0, 0],
            "white" | "w" => [255, 255, 255],
            "red" | "r" => [255, 0, 0],
            "green" | "g" => [0, 128, 0],
            "blue" | "b" => [0, 0, 255],
            "yellow" | "y" => [255, 255, 0],
            "cyan" | "c" => [0, 255, 255],
            "magenta" | "m" => [255, 0, 255],
            "gray" | "grey" => [128, 128, 128],
            "orange" => [255, 165, 0],
            hex => return Self::parse_hex(hex),
        };
        Ok(GridColor(rgb))
    }

    fn parse_hex(text: &str) -> Result<Self> {
        let invalid = || PixelError::Parse(format!("unknown grid color '{text}'"));
        let digits = text.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(GridColor([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl Default for GridColor {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    /// Buffer pixels between lines.
    pub line_spacing: u32,
    pub line_thickness: f32,
    pub offset: f32,
    pub color: GridColor,
    /// Reverse the x axis so 0 is on the right.
    pub flip_x: bool,
}

impl GridSpec {
    pub fn validate(&self) -> Result<()> {
        if self.line_spacing == 0 {
            return Err(PixelError::InvalidGrid("line spacing must be positive".to_string()));
        }
        if !(self.line_thickness.is_finite() && self.line_thickness > 0.0) {
            return Err(PixelError::InvalidGrid(format!(
                "line thickness must be positive, got {}",
                self.line_thickness
            )));
        }
        if !self.offset.is_finite() {
            return Err(PixelError::InvalidGrid("offset must be finite".to_string()));
        }
        Ok(())
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            line_spacing: 1,
            line_thickness: 1.0,
            offset: 0.5,
            color: GridColor::BLACK,
            flip_x: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub position: f32,
    pub label: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TickConfig {
    /// Whatever the renderer picks on its own.
    #[default]
    Auto,
    Labeled { x: Vec<Tick>, y: Vec<Tick> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLines {
    pub vertical: Vec<f32>,
    pub horizontal: Vec<f32>,
    pub thickness: f32,
    pub color: GridColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    pub width: u32,
    pub height: u32,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub lines: GridLines,
    /// `(left, right)` x limits of the plot.
    pub x_limits: (f32, f32),
}

impl GridGeometry {
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::Labeled {
            x: self.x_ticks.clone(),
            y: self.y_ticks.clone(),
        }
    }
}

/// Label every `stride`-th cell: 10 on small images, 150 once either side
/// reaches 250 pixels.
pub fn label_stride(width: u32, height: u32) -> u32 {
    if width < 250 && height < 250 {
        10
    } else {
        150
    }
}

/// Ticks along one axis of `extent` pixels.
pub fn axis_ticks(extent: u32, spacing: u32, offset: f32, stride: u32) -> Vec<Tick> {
    let mut ticks = Vec::new();
    for n in (0..extent).step_by(spacing.max(1) as usize) {
        if n == 0 {
            ticks.push(Tick { position: n as f32 - offset, label: n });
        }
        if (n + 1) % stride == 0 {
            ticks.push(Tick { position: n as f32 + offset, label: n + 1 });
        }
    }
    ticks
}

fn axis_lines(extent: u32, spacing: u32, offset: f32) -> Vec<f32> {
    (0..extent)
        .step_by(spacing.max(1) as usize)
        .map(|n| n as f32 + offset)
        .collect()
}

pub fn compute_grid(width: u32, height: u32, spec: &GridSpec) -> Result<GridGeometry> {
    spec.validate()?;
    let stride = label_stride(width, height);
    let right = width as f32 - spec.offset;

    let geometry = GridGeometry {
        width,
        height,
        x_ticks: axis_ticks(width, spec.line_spacing, spec.offset, stride),
        y_ticks: axis_ticks(height, spec.line_spacing, spec.offset, stride),
        lines: GridLines {
            vertical: axis_lines(width, spec.line_spacing, spec.offset),
            horizontal: axis_lines(height, spec.line_spacing, spec.offset),
            thickness: spec.line_thickness,
            color: spec.color,
        },
        x_limits: if spec.flip_x { (right, 0.0) } else { (0.0, right) },
    };
    tracing::debug!(
        width,
        height,
        stride,
        vertical = geometry.lines.vertical.len(),
        horizontal = geometry.lines.horizontal.len(),
        "Computed grid"
    );
    Ok(geometry)
}

/// Grid visibility plus the tick configuration it displaced.
#[derive(Debug, Clone, Default)]
pub struct GridOverlay {
    ticks: TickConfig,
    displaced: Option<TickConfig>,
    lines: Option<GridLines>,
}

impl GridOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> &TickConfig {
        &self.ticks
    }

    pub fn lines(&self) -> Option<&GridLines> {
        self.lines.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.lines.is_some()
    }

    /// Replace the tick configuration while the grid is hidden.
    pub fn set_ticks(&mut self, ticks: TickConfig) {
        if self.is_visible() {
            self.displaced = Some(ticks);
        } else {
            self.ticks = ticks;
        }
    }

    pub fn show(&mut self, geometry: &GridGeometry) {
        if self.displaced.is_none() {
            self.displaced = Some(std::mem::take(&mut self.ticks));
        }
        self.ticks = geometry.tick_config();
        self.lines = Some(geometry.lines.clone());
    }

    /// Remove the lines added by [`show`](Self::show) and restore the previous
    /// ticks. Returns the removed lines.
    pub fn hide(&mut self) -> Option<GridLines> {
        let removed = self.lines.take();
        if let Some(previous) = self.displaced.take() {
            self.ticks = previous;
        }
        removed
    }

    pub fn toggle(&mut self, geometry: &GridGeometry) -> bool {
        if self.is_visible() {
            self.hide();
        } else {
            self.show(geometry);
        }
        self.is_visible()
    }
}

/// Largest exported image, in pixels.
pub const MAX_EXPORT_PIXELS: u64 = 1 << 28;

/// Upscale every cell to `cell_px` pixels and draw the gridlines on top,
/// for export.
pub fn render_grid(buffer: &PixelBuffer, geometry: &GridGeometry, cell_px: u32) -> Result<PixelBuffer> {
    if cell_px == 0 {
        return Err(PixelError::InvalidGrid("cell size must be positive".to_string()));
    }
    let src = buffer.to_rgba8();
    let (w, h) = src.dimensions();
    let (out_w, out_h) = match (w.checked_mul(cell_px), h.checked_mul(cell_px)) {
        (Some(out_w), Some(out_h)) if u64::from(out_w) * u64::from(out_h) <= MAX_EXPORT_PIXELS => {
            (out_w, out_h)
        }
        _ => {
            return Err(PixelError::InvalidGrid(format!(
                "cell size {cell_px} is too large for a {w}x{h} image"
            )))
        }
    };
    let mut out = RgbaImage::from_fn(out_w, out_h, |x, y| *src.get_pixel(x / cell_px, y / cell_px));

    let lines = &geometry.lines;
    let thickness = lines.thickness.round().max(1.0) as i64;
    let cell = cell_px as f32;
    let mut mask = vec![false; out_w as usize * out_h as usize];

    let span = |center: f32, limit: u32| {
        let start = (center.round() as i64 - thickness / 2).max(0);
        let end = (start + thickness).min(limit as i64);
        start..end.max(start)
    };

    for &x in &lines.vertical {
        for col in span((x + 0.5) * cell, out_w) {
            for row in 0..out_h as usize {
                mask[row * out_w as usize + col as usize] = true;
            }
        }
    }
    for &y in &lines.horizontal {
        for row in span((h as f32 - 0.5 - y) * cell, out_h) {
            let start = row as usize * out_w as usize;
            mask[start..start + out_w as usize].fill(true);
        }
    }

    let [r, g, b] = lines.color.0;
    for (pixel, &on) in out.pixels_mut().zip(&mask) {
        if !on {
            continue;
        }
        let mix = |src: u8, line: u8| {
            (src as f32 * (1.0 - LINE_ALPHA) + line as f32 * LINE_ALPHA).round() as u8
        };
        let alpha = pixel[3].max((255.0 * LINE_ALPHA) as u8);
        *pixel = Rgba([mix(pixel[0], r), mix(pixel[1], g), mix(pixel[2], b), alpha]);
    }

    Ok(PixelBuffer::from_rgba(out))
}
