use crate::error::{EngineError, EngineResult};
use crate::pool::PulsePool;
use crate::pulse::PulseConfig;
use crate::surface::{DrawContext, Glow, Palette, RasterSurface};
use crate::viewport::ViewportWatcher;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Frame delta at which a pulse advances by exactly its speed.
pub const NOMINAL_TICK: Duration = Duration::from_nanos(16_666_667);

/// Upper bound on how many nominal ticks one long frame may cover.
pub const MAX_STEP_SCALE: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Detached,
}

/// What the host should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub pulse: PulseConfig,
    pub palette: Palette,
    /// Extra stable observations required before a resize reseeds.
    pub resize_settle_frames: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub reseeds: u64,
    pub spawned: u64,
    pub expired: u64,
    /// Glyphs painted in the last frame.
    pub glyphs: usize,
    /// Pulses with at least one glyph on screen in the last frame.
    pub pulses_drawn: usize,
}

/// The background animation bound to one surface.
///
/// Hosts call [`Engine::tick`] once per display frame until it returns
/// [`TickControl::Stop`]. All state lives here; nothing is shared.
pub struct Engine<S: RasterSurface, R: Rng> {
    surface: S,
    rng: R,
    cfg: EngineConfig,
    pool: PulsePool,
    watcher: ViewportWatcher,
    state: LoopState,
    stats: FrameStats,
}

impl<S: RasterSurface, R: Rng> Engine<S, R> {
    /// Binds to `surface`, sizes the viewport and seeds the pulse pool.
    ///
    /// Fails when the surface has no drawing context or the config is
    /// invalid; the engine is never half-attached.
    pub fn attach(mut surface: S, cfg: EngineConfig, rng: R) -> EngineResult<Self> {
        cfg.pulse.validate()?;
        if surface.context().is_none() {
            return Err(EngineError::NoDrawingContext);
        }

        let (w, h) = surface.size();
        let mut engine = Self {
            surface,
            rng,
            watcher: ViewportWatcher::new(cfg.resize_settle_frames),
            cfg,
            pool: PulsePool::new(),
            state: LoopState::Running,
            stats: FrameStats::default(),
        };
        engine.sync_viewport();
        info!(
            width = w,
            height = h,
            pulses = engine.pool.len(),
            "engine attached"
        );
        Ok(engine)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn pool(&self) -> &PulsePool {
        &self.pool
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Viewport size the pool was last seeded for.
    pub fn viewport(&self) -> (u32, u32) {
        self.watcher.size().unwrap_or((0, 0))
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// One frame: viewport check, advance, clear, paint, expire, replenish.
    pub fn tick(&mut self, dt: Duration) -> TickControl {
        if self.state == LoopState::Detached {
            return TickControl::Stop;
        }

        self.sync_viewport();

        let scale = (dt.as_secs_f64() / NOMINAL_TICK.as_secs_f64()).clamp(0.0, MAX_STEP_SCALE);
        for p in self.pool.iter_mut() {
            p.advance(scale);
        }

        // While a resize is still settling the surface may already be smaller
        // than the seeded viewport; draw and spawn only inside both.
        let (sw, sh) = self.surface.size();
        let (vw, vh) = self.viewport();
        let (w, h) = (vw.min(sw), vh.min(sh));
        if let Some(ctx) = self.surface.context() {
            let (pulses_drawn, glyphs) = paint(ctx, &self.pool, &self.cfg.palette, sw, sh);
            self.stats.pulses_drawn = pulses_drawn;
            self.stats.glyphs = glyphs;
        }

        let rep = self.pool.step(&mut self.rng, w, h, &self.cfg.pulse);
        self.stats.frames += 1;
        self.stats.expired += rep.expired as u64;
        self.stats.spawned += rep.spawned as u64;

        trace!(
            frame = self.stats.frames,
            live = self.pool.len(),
            glyphs = self.stats.glyphs,
            expired = rep.expired,
            spawned = rep.spawned,
            "tick"
        );
        TickControl::Continue
    }

    /// Stops the loop for good. Safe to call more than once.
    pub fn detach(&mut self) {
        if self.state == LoopState::Detached {
            return;
        }
        self.state = LoopState::Detached;
        self.watcher.disarm();
        self.pool.clear();
        info!(frames = self.stats.frames, "engine detached");
    }

    fn sync_viewport(&mut self) {
        let (w, h) = self.surface.size();
        let Some(resize) = self.watcher.observe(w, h) else {
            return;
        };
        let rep = self
            .pool
            .reset(&mut self.rng, resize.width, resize.height, &self.cfg.pulse);
        self.stats.reseeds += 1;
        self.stats.spawned += rep.spawned as u64;
        match resize.from {
            Some((fw, fh)) => info!(
                from_width = fw,
                from_height = fh,
                width = w,
                height = h,
                pulses = self.pool.len(),
                "viewport resized, pool reseeded"
            ),
            None => debug!(width = w, height = h, pulses = self.pool.len(), "pool seeded"),
        }
    }
}

/// Draws every pulse's visible trail. Returns `(pulses drawn, glyphs drawn)`.
fn paint<C: DrawContext + ?Sized>(
    ctx: &mut C,
    pool: &PulsePool,
    palette: &Palette,
    width: u32,
    height: u32,
) -> (usize, usize) {
    ctx.clear_rect(0.0, 0.0, width as f32, height as f32);
    ctx.set_font(&palette.font);

    let mut pulses_drawn = 0;
    let mut glyphs = 0;
    let mut glow_on = false;

    for p in pool.iter() {
        let len = p.payload().len();
        let mut drew = false;

        for j in 0..len {
            let Some(pt) = p.symbol_position(j) else {
                continue;
            };
            if !pt.in_bounds(width, height) {
                continue;
            }
            let opacity = 1.0 - j as f32 / len as f32;
            if opacity <= 0.0 {
                continue;
            }

            if j == 0 {
                ctx.set_fill(palette.head);
                ctx.set_glow(palette.head_glow);
                glow_on = true;
            } else {
                ctx.set_fill(palette.tail.with_alpha(opacity * palette.tail_alpha_scale));
                if glow_on {
                    ctx.set_glow(Glow::NONE);
                    glow_on = false;
                }
            }
            ctx.fill_text_centered(p.payload().symbol(j), pt.x as f32, pt.y as f32);
            glyphs += 1;
            drew = true;
        }

        if glow_on {
            ctx.set_glow(Glow::NONE);
            glow_on = false;
        }
        if drew {
            pulses_drawn += 1;
        }
    }

    (pulses_drawn, glyphs)
}
