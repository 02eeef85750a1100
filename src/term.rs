use crate::surface::{DrawContext, Font, Glow, RasterSurface, Rgba};
use anyhow::Context;
use crossterm::{
    cursor, execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Global opacity of the pulse layer in dim mode.
pub const DIM_OPACITY: f32 = 0.3;
/// Share of the glow alpha used to tint the glyph cell background.
const GLOW_TINT: f32 = 0.35;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
}

impl Cell {
    fn blank(bg: Color) -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg,
            bold: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CellBuffer {
    pub w: u16,
    pub h: u16,
    pub cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: u16, h: u16, bg: Color) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::blank(bg); (w as usize) * (h as usize)],
        }
    }

    pub fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        (x < self.w && y < self.h).then(|| &self.cells[self.idx(x, y)])
    }

    pub fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub fn fill(&mut self, c: Cell) {
        self.cells.fill(c);
    }
}

fn to_color(c: Rgba) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// `fg` composited over opaque `bg` with alpha `a`.
pub fn blend(bg: Rgba, fg: Rgba, a: f32) -> Rgba {
    let a = a.clamp(0.0, 1.0);
    let mix = |b: u8, f: u8| -> u8 {
        let out = b as f32 * (1.0 - a) + f as f32 * a;
        (out.clamp(0.0, 255.0) + 0.5) as u8
    };
    Rgba::rgb(mix(bg.r, fg.r), mix(bg.g, fg.g), mix(bg.b, fg.b))
}

/// Monochrome fallback: bucket the effective alpha into terminal greys.
fn grey_for(a: f32) -> Color {
    if a >= 0.66 {
        Color::White
    } else if a >= 0.25 {
        Color::Grey
    } else {
        Color::DarkGrey
    }
}

/// Pixel-space drawing surface backed by a grid of terminal cells.
///
/// Each cell stands for `cell_px_w x cell_px_h` virtual pixels, so lattice
/// points land on exact cells when the lattice size is a multiple of both.
pub struct TermSurface {
    buf: CellBuffer,
    cell_px_w: u32,
    cell_px_h: u32,
    background: Rgba,
    layer_opacity: f32,
    enable_color: bool,
    fill: Rgba,
    glow: Glow,
}

impl TermSurface {
    pub fn new(cols: u16, rows: u16, cell_px_w: u32, cell_px_h: u32, background: Rgba) -> Self {
        Self {
            buf: CellBuffer::new(cols, rows, to_color(background)),
            cell_px_w: cell_px_w.max(1),
            cell_px_h: cell_px_h.max(1),
            background,
            layer_opacity: 1.0,
            enable_color: true,
            fill: Rgba::rgb(255, 255, 255),
            glow: Glow::NONE,
        }
    }

    pub fn buffer(&self) -> &CellBuffer {
        &self.buf
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == self.buf.w && rows == self.buf.h {
            return;
        }
        self.buf = CellBuffer::new(cols, rows, to_color(self.background));
    }

    pub fn set_dim(&mut self, dim: bool) {
        self.layer_opacity = if dim { DIM_OPACITY } else { 1.0 };
    }

    pub fn is_dim(&self) -> bool {
        self.layer_opacity < 1.0
    }

    pub fn set_color(&mut self, enable: bool) {
        self.enable_color = enable;
    }

    /// Cell under pixel `(x, y)`, rounding to the nearest cell origin.
    /// Pixels inside the surface always map to a cell inside the grid.
    pub fn cell_at(&self, x: f32, y: f32) -> (i64, i64) {
        let snap = |v: f32, px: u32, cells: u16| -> i64 {
            let c = (v / px as f32).round() as i64;
            if v >= 0.0 && v < (cells as u32 * px) as f32 {
                c.min(cells as i64 - 1)
            } else {
                c
            }
        };
        (
            snap(x, self.cell_px_w, self.buf.w),
            snap(y, self.cell_px_h, self.buf.h),
        )
    }

    fn ink(&self, c: Rgba, a: f32) -> Color {
        if self.enable_color {
            to_color(blend(self.background, c, a))
        } else {
            grey_for(a)
        }
    }
}

impl DrawContext for TermSurface {
    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let blank = Cell::blank(to_color(self.background));
        let full = x <= 0.0
            && y <= 0.0
            && w >= (self.buf.w as u32 * self.cell_px_w) as f32
            && h >= (self.buf.h as u32 * self.cell_px_h) as f32;
        if full {
            self.buf.fill(blank);
            return;
        }

        let x0 = (x / self.cell_px_w as f32).floor().max(0.0) as u32;
        let y0 = (y / self.cell_px_h as f32).floor().max(0.0) as u32;
        let x1 = ((x + w) / self.cell_px_w as f32).ceil().max(0.0) as u32;
        let y1 = ((y + h) / self.cell_px_h as f32).ceil().max(0.0) as u32;
        for cy in y0..y1.min(self.buf.h as u32) {
            for cx in x0..x1.min(self.buf.w as u32) {
                self.buf.set(cx as u16, cy as u16, blank);
            }
        }
    }

    // Terminals draw one fixed-width face; nothing to select.
    fn set_font(&mut self, _font: &Font) {}

    fn set_fill(&mut self, color: Rgba) {
        self.fill = color;
    }

    fn set_glow(&mut self, glow: Glow) {
        self.glow = glow;
    }

    fn fill_text_centered(&mut self, text: &str, x: f32, y: f32) {
        let a = self.fill.a * self.layer_opacity;
        if a <= 0.0 {
            return;
        }
        let (cx, cy) = self.cell_at(x, y);
        if cy < 0 || cy >= self.buf.h as i64 {
            return;
        }

        let fg = self.ink(self.fill, a);
        let bold = !self.glow.is_off();
        let bg = if bold && self.enable_color {
            let tint = self.glow.color.a * GLOW_TINT * self.layer_opacity;
            to_color(blend(self.background, self.glow.color, tint))
        } else {
            to_color(self.background)
        };

        let n = text.chars().count() as i64;
        let start = cx - n / 2;
        for (i, ch) in text.chars().enumerate() {
            let col = start + i as i64;
            if col < 0 || col >= self.buf.w as i64 {
                continue;
            }
            self.buf.set(col as u16, cy as u16, Cell { ch, fg, bg, bold });
        }
    }
}

impl RasterSurface for TermSurface {
    type Context = Self;

    fn size(&self) -> (u32, u32) {
        (
            self.buf.w as u32 * self.cell_px_w,
            self.buf.h as u32 * self.cell_px_h,
        )
    }

    fn context(&mut self) -> Option<&mut Self::Context> {
        Some(self)
    }
}

/// Where finished cell buffers go.
pub trait Present {
    fn present(&mut self, buf: &CellBuffer) -> anyhow::Result<()>;
    /// Forces the next present to repaint every cell.
    fn invalidate(&mut self);
    fn end(&mut self) -> anyhow::Result<()>;
}

/// Alternate-screen terminal that presents cell buffers by diff.
pub struct Terminal {
    out: io::Stdout,
    prev: Option<CellBuffer>,
}

impl Terminal {
    pub fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )
        .context("entering alternate screen")?;
        Ok(Self { out, prev: None })
    }

    pub fn size() -> anyhow::Result<(u16, u16)> {
        terminal::size().context("querying terminal size")
    }

    pub fn invalidate(&mut self) {
        self.prev = None;
    }

    pub fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn present(&mut self, cur: &CellBuffer) -> anyhow::Result<()> {
        let full = match &self.prev {
            Some(p) => p.w != cur.w || p.h != cur.h,
            None => true,
        };
        queue!(self.out, BeginSynchronizedUpdate)?;
        if full {
            queue!(self.out, Clear(ClearType::All))?;
        }

        let mut last_fg = None;
        let mut last_bg = None;
        let mut last_bold = None;

        for y in 0..cur.h {
            for x in 0..cur.w {
                let i = cur.idx(x, y);
                let c = cur.cells[i];
                if !full {
                    if let Some(prev) = &self.prev {
                        if prev.cells[i] == c {
                            continue;
                        }
                    }
                }

                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_bold != Some(c.bold) {
                    let attr = if c.bold {
                        Attribute::Bold
                    } else {
                        Attribute::NormalIntensity
                    };
                    queue!(self.out, SetAttribute(attr))?;
                    last_bold = Some(c.bold);
                }
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        if full {
            self.prev = Some(cur.clone());
        } else if let Some(p) = self.prev.as_mut() {
            p.cells.copy_from_slice(&cur.cells);
        }
        Ok(())
    }
}

impl Present for Terminal {
    fn present(&mut self, buf: &CellBuffer) -> anyhow::Result<()> {
        Terminal::present(self, buf)
    }

    fn invalidate(&mut self) {
        Terminal::invalidate(self);
    }

    fn end(&mut self) -> anyhow::Result<()> {
        Terminal::end(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgba = Rgba::rgb(2, 6, 23);

    #[test]
    fn pixel_size_follows_cells() {
        let mut s = TermSurface::new(80, 24, 10, 15, BG);
        assert_eq!(s.size(), (800, 360));
        s.resize(40, 12);
        assert_eq!(s.size(), (400, 180));
        assert_eq!(s.buffer().cells.len(), 480);
    }

    #[test]
    fn lattice_points_land_on_cells() {
        let s = TermSurface::new(80, 24, 10, 15, BG);
        assert_eq!(s.cell_at(0.0, 0.0), (0, 0));
        assert_eq!(s.cell_at(30.0, 30.0), (3, 2));
        assert_eq!(s.cell_at(270.0, 330.0), (27, 22));
    }

    #[test]
    fn in_bounds_points_never_round_off_the_grid() {
        let mut s = TermSurface::new(8, 2, 10, 20, BG);
        assert_eq!(s.size(), (80, 40));
        assert_eq!(s.cell_at(0.0, 30.0), (0, 1));
        assert_eq!(s.cell_at(78.0, 39.0), (7, 1));

        s.set_fill(Rgba::rgb(255, 255, 255));
        s.fill_text_centered("1", 60.0, 30.0);
        assert_eq!(s.buffer().get(6, 1).unwrap().ch, '1');
    }

    #[test]
    fn text_is_centered_on_its_cell() {
        let mut s = TermSurface::new(20, 4, 10, 15, BG);
        s.set_fill(Rgba::rgb(255, 255, 255));
        s.fill_text_centered("1", 60.0, 30.0);
        assert_eq!(s.buffer().get(6, 2).unwrap().ch, '1');

        s.fill_text_centered("abc", 100.0, 15.0);
        let row: String = (9..12).map(|x| s.buffer().get(x, 1).unwrap().ch).collect();
        assert_eq!(row, "abc");
    }

    #[test]
    fn fill_alpha_blends_over_background() {
        let mut s = TermSurface::new(4, 2, 10, 15, Rgba::rgb(0, 0, 0));
        s.set_fill(Rgba::rgba(200, 100, 50, 0.5));
        s.fill_text_centered("0", 0.0, 0.0);
        assert_eq!(
            s.buffer().get(0, 0).unwrap().fg,
            Color::Rgb { r: 100, g: 50, b: 25 }
        );

        s.set_dim(true);
        s.set_fill(Rgba::rgb(200, 100, 50));
        s.fill_text_centered("0", 10.0, 0.0);
        assert_eq!(
            s.buffer().get(1, 0).unwrap().fg,
            Color::Rgb { r: 60, g: 30, b: 15 }
        );
    }

    #[test]
    fn glow_makes_bold_and_tints_background() {
        let mut s = TermSurface::new(4, 2, 10, 15, BG);
        s.set_fill(Rgba::rgb(34, 211, 238));
        s.set_glow(Glow {
            blur: 8.0,
            color: Rgba::rgba(34, 211, 238, 0.8),
        });
        s.fill_text_centered("1", 0.0, 0.0);
        let c = *s.buffer().get(0, 0).unwrap();
        assert!(c.bold);
        assert_ne!(c.bg, to_color(BG));

        s.set_glow(Glow::NONE);
        s.fill_text_centered("0", 10.0, 0.0);
        let c = *s.buffer().get(1, 0).unwrap();
        assert!(!c.bold);
        assert_eq!(c.bg, to_color(BG));
    }

    #[test]
    fn clear_rect_blanks_covered_cells_only() {
        let mut s = TermSurface::new(10, 4, 10, 15, BG);
        s.set_fill(Rgba::rgb(255, 255, 255));
        for x in 0..10 {
            s.fill_text_centered("1", x as f32 * 10.0, 0.0);
        }
        s.clear_rect(0.0, 0.0, 30.0, 15.0);
        let row: String = (0..10).map(|x| s.buffer().get(x, 0).unwrap().ch).collect();
        assert_eq!(row, "   1111111");

        let (w, h) = s.size();
        s.clear_rect(0.0, 0.0, w as f32, h as f32);
        assert!(s.buffer().cells.iter().all(|c| c.ch == ' '));
    }

    #[test]
    fn monochrome_uses_grey_ramp() {
        let mut s = TermSurface::new(4, 1, 10, 15, BG);
        s.set_color(false);
        s.set_fill(Rgba::rgba(16, 185, 129, 0.1));
        s.fill_text_centered("0", 0.0, 0.0);
        assert_eq!(s.buffer().get(0, 0).unwrap().fg, Color::DarkGrey);
        s.set_fill(Rgba::rgb(16, 185, 129));
        s.fill_text_centered("1", 10.0, 0.0);
        assert_eq!(s.buffer().get(1, 0).unwrap().fg, Color::White);
    }
}
