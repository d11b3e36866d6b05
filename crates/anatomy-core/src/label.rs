//! Label rasterization
//!
//! Renders the marker label into a fixed-size RGBA8 buffer: a rounded
//! rectangle with a two-stop horizontal gradient, a light border, and the
//! label text centered on top. Glyph outlines come from `ab_glyph`. DejaVu Sans
//! Bold is bundled so text is drawn without any font asset; a configured font
//! replaces it.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bundled label font (DejaVu Sans Bold, see `assets/fonts/LICENSE-DejaVu.txt`)
pub const DEFAULT_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

/// Largest accepted canvas side in pixels
pub const MAX_CANVAS_SIDE: u32 = 4096;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Invalid font data: {0}")]
    InvalidFont(#[from] ab_glyph::InvalidFont),
    #[error("Label canvas must be non-empty, got {0}x{1}")]
    EmptyCanvas(u32, u32),
    #[error("Label canvas {0}x{1} exceeds {MAX_CANVAS_SIDE} pixels per side")]
    CanvasTooLarge(u32, u32),
}

/// Visual contract of the label plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// Canvas size in pixels
    pub width: u32,
    pub height: u32,
    pub corner_radius: f32,
    /// Left gradient stop (RGBA)
    pub gradient_start: [u8; 4],
    /// Right gradient stop (RGBA)
    pub gradient_end: [u8; 4],
    pub border_color: [u8; 4],
    pub border_width: f32,
    pub text_color: [u8; 4],
    /// Nominal glyph height; shrunk when the text would not fit
    pub font_px: f32,
    /// Horizontal space kept free on each side of the text
    pub padding: f32,
    /// Draw each glyph twice, one pixel apart, for fonts without a bold face
    pub faux_bold: bool,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            width: 256,
            height: 64,
            corner_radius: 12.0,
            gradient_start: [220, 38, 38, 235],
            gradient_end: [153, 27, 27, 235],
            border_color: [255, 255, 255, 220],
            border_width: 2.0,
            text_color: [255, 255, 255, 255],
            font_px: 30.0,
            padding: 12.0,
            faux_bold: false,
        }
    }
}

/// Straight-alpha RGBA8 pixels, row-major, top row first
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl LabelBitmap {
    fn transparent(width: u32, height: u32) -> Result<Self, LabelError> {
        if width == 0 || height == 0 {
            return Err(LabelError::EmptyCanvas(width, height));
        }
        if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
            return Err(LabelError::CanvasTooLarge(width, height));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(LabelError::CanvasTooLarge(width, height))?;
        Ok(Self {
            width,
            height,
            pixels: vec![0; len],
        })
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let i = self.offset(x, y);
        &mut self.pixels[i..i + 4]
    }

    /// Width-to-height ratio, used to size the billboard quad
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Turns label text into a pixel buffer
#[derive(Clone)]
pub struct LabelRasterizer {
    font: Option<FontArc>,
}

impl Default for LabelRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelRasterizer {
    /// Rasterizer using the bundled font
    pub fn new() -> Self {
        match FontArc::try_from_slice(DEFAULT_FONT) {
            Ok(font) => Self { font: Some(font) },
            Err(err) => {
                tracing::warn!("Bundled label font unusable: {}", err);
                Self::plate_only()
            }
        }
    }

    /// Rasterizer without glyphs; renders the plate only
    pub fn plate_only() -> Self {
        Self { font: None }
    }

    pub fn with_font_bytes(bytes: Vec<u8>) -> Result<Self, LabelError> {
        let font = FontArc::try_from_vec(bytes)?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(&self, text: &str, style: &LabelStyle) -> Result<LabelBitmap, LabelError> {
        let mut bitmap = LabelBitmap::transparent(style.width, style.height)?;
        draw_plate(&mut bitmap, style);

        if let Some(font) = &self.font {
            draw_text(&mut bitmap, font, text, style);
        }

        Ok(bitmap)
    }
}

fn draw_plate(bitmap: &mut LabelBitmap, style: &LabelStyle) {
    let w = bitmap.width as f32;
    let h = bitmap.height as f32;
    let radius = style.corner_radius.clamp(0.0, w.min(h) * 0.5);

    for y in 0..bitmap.height {
        for x in 0..bitmap.width {
            let d = rounded_rect_distance(x as f32 + 0.5, y as f32 + 0.5, w, h, radius);
            let coverage = (0.5 - d).clamp(0.0, 1.0);
            if coverage <= 0.0 {
                continue;
            }

            let u = if bitmap.width > 1 {
                x as f32 / (bitmap.width - 1) as f32
            } else {
                0.0
            };
            let fill = mix(style.gradient_start, style.gradient_end, u);
            let border_mix = (d + style.border_width + 0.5).clamp(0.0, 1.0);
            let mut color = mix(fill, style.border_color, border_mix);
            color[3] = (color[3] as f32 * coverage).round() as u8;

            bitmap.pixel_mut(x, y).copy_from_slice(&color);
        }
    }
}

fn draw_text(bitmap: &mut LabelBitmap, font: &FontArc, text: &str, style: &LabelStyle) {
    let available = (bitmap.width as f32 - style.padding * 2.0).max(1.0);

    let mut scale = PxScale::from(style.font_px);
    let natural = measure(font, scale, text);
    if natural > available {
        scale = PxScale::from(style.font_px * available / natural);
    }

    let scaled = font.as_scaled(scale);
    let text_width = measure(font, scale, text);
    let text_height = scaled.ascent() - scaled.descent();
    let baseline = (bitmap.height as f32 - text_height) * 0.5 + scaled.ascent();

    let mut caret = (bitmap.width as f32 - text_width) * 0.5;
    let mut prev: Option<GlyphId> = None;
    let passes = if style.faux_bold { 2 } else { 1 };

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();

        for pass in 0..passes {
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32 + pass;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px >= bitmap.width as i32 || py >= bitmap.height as i32 {
                    return;
                }
                blend_over(bitmap.pixel_mut(px as u32, py as u32), style.text_color, coverage);
            });
        }
    }
}

/// Advance width of a single line of text, kerning included
fn measure(font: &FontArc, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Signed distance from a pixel center to the rounded rectangle filling the
/// canvas. Negative inside.
fn rounded_rect_distance(px: f32, py: f32, w: f32, h: f32, radius: f32) -> f32 {
    let qx = (px - w * 0.5).abs() - (w * 0.5 - radius);
    let qy = (py - h * 0.5).abs() - (h * 0.5 - radius);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    outside + inside - radius
}

fn mix(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t).round() as u8;
    }
    out
}

/// Composite `color` over `dst` with straight alpha
fn blend_over(dst: &mut [u8], color: [u8; 4], coverage: f32) {
    let sa = color[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    for i in 0..3 {
        let c = (color[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
