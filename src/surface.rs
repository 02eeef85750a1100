//! Drawing-surface seam between the engine and whatever displays it.
//!
//! The engine only needs an immediate-mode 2d context that can clear a
//! rectangle, pick a fill color, set a glow, and draw centered text at a pixel
//! position. Hosts implement [`RasterSurface`] for their display; the
//! [`RecordingSurface`] keeps every call in memory for headless runs and tests.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0..=1.0
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// Shadow-style halo around drawn glyphs. `blur == 0` disables it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glow {
    pub blur: f32,
    pub color: Rgba,
}

impl Glow {
    pub const NONE: Glow = Glow {
        blur: 0.0,
        color: Rgba::rgba(0, 0, 0, 0.0),
    };

    pub fn is_off(&self) -> bool {
        self.blur <= 0.0 || self.color.a <= 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family: &'static str,
    pub px: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "\"Fira Code\", monospace",
            px: 12.0,
        }
    }
}

/// Colors and glyph styling for a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub head: Rgba,
    pub head_glow: Glow,
    pub tail: Rgba,
    /// Tail alpha is `opacity * tail_alpha_scale`.
    pub tail_alpha_scale: f32,
    pub background: Rgba,
    pub font: Font,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            head: Rgba::rgb(34, 211, 238),
            head_glow: Glow {
                blur: 8.0,
                color: Rgba::rgba(34, 211, 238, 0.8),
            },
            tail: Rgba::rgb(16, 185, 129),
            tail_alpha_scale: 0.6,
            background: Rgba::rgb(2, 6, 23),
            font: Font::default(),
        }
    }
}

/// Immediate-mode 2d drawing calls used by the render loop. Coordinates are
/// surface pixels.
pub trait DrawContext {
    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32);
    fn set_font(&mut self, font: &Font);
    fn set_fill(&mut self, color: Rgba);
    fn set_glow(&mut self, glow: Glow);
    /// Draws `text` centered horizontally and vertically on `(x, y)`.
    fn fill_text_centered(&mut self, text: &str, x: f32, y: f32);
}

/// A displayable raster with known pixel dimensions.
pub trait RasterSurface {
    type Context: DrawContext;

    fn size(&self) -> (u32, u32);

    /// `None` when the surface cannot provide a 2d context.
    fn context(&mut self) -> Option<&mut Self::Context>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear { x: f32, y: f32, w: f32, h: f32 },
    Font(Font),
    Fill(Rgba),
    Glow(Glow),
    Text { text: String, x: f32, y: f32 },
}

/// A glyph as it would appear on screen, with the state active when drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub fill: Rgba,
    pub glow: Glow,
}

/// In-memory surface that records the draw calls of the current frame.
///
/// A `clear_rect` covering the whole surface starts a new frame and discards
/// the previous frame's ops, so memory stays flat over long runs.
#[derive(Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
    fill: Rgba,
    glow: Glow,
    glyphs: Vec<Glyph>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            fill: Rgba::rgb(0, 0, 0),
            glow: Glow::NONE,
            glyphs: Vec::new(),
            frames: 0,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Glyphs drawn since the last full clear.
    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Number of full-surface clears seen.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DrawContext for RecordingSurface {
    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let full = x <= 0.0 && y <= 0.0 && w >= self.width as f32 && h >= self.height as f32;
        if full {
            self.ops.clear();
            self.glyphs.clear();
            self.frames += 1;
        }
        self.ops.push(DrawOp::Clear { x, y, w, h });
    }

    fn set_font(&mut self, font: &Font) {
        self.ops.push(DrawOp::Font(font.clone()));
    }

    fn set_fill(&mut self, color: Rgba) {
        self.fill = color;
        self.ops.push(DrawOp::Fill(color));
    }

    fn set_glow(&mut self, glow: Glow) {
        self.glow = glow;
        self.ops.push(DrawOp::Glow(glow));
    }

    fn fill_text_centered(&mut self, text: &str, x: f32, y: f32) {
        self.glyphs.push(Glyph {
            text: text.to_string(),
            x,
            y,
            fill: self.fill,
            glow: self.glow,
        });
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
        });
    }
}

impl RasterSurface for RecordingSurface {
    type Context = Self;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn context(&mut self) -> Option<&mut Self::Context> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_clear_starts_a_new_frame() {
        let mut s = RecordingSurface::new(100, 50);
        s.set_fill(Rgba::rgb(1, 2, 3));
        s.fill_text_centered("1", 10.0, 10.0);
        assert_eq!(s.glyphs().len(), 1);

        s.clear_rect(0.0, 0.0, 100.0, 50.0);
        assert_eq!(s.frames(), 1);
        assert!(s.glyphs().is_empty());
        assert_eq!(s.ops().len(), 1);

        // Partial clears do not reset the frame.
        s.fill_text_centered("0", 20.0, 20.0);
        s.clear_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(s.frames(), 1);
        assert_eq!(s.glyphs().len(), 1);
        assert_eq!(s.glyphs()[0].fill, Rgba::rgb(1, 2, 3));
    }

    #[test]
    fn glow_off_detection() {
        assert!(Glow::NONE.is_off());
        assert!(!Palette::default().head_glow.is_off());
        assert_eq!(Rgba::rgb(1, 1, 1).with_alpha(3.0).a, 1.0);
    }
}
