use crate::config::Settings;
use crate::engine::{Engine, FrameStats, TickControl, NOMINAL_TICK};
use crate::surface::RecordingSurface;
use crate::term::{Present, TermSurface, Terminal};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::info;

/// Things the terminal host reacts to between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostAction {
    Quit,
    ToggleDim,
    Resize(u16, u16),
}

pub fn map_event(ev: Event) -> Option<HostAction> {
    match ev {
        Event::Resize(c, r) => Some(HostAction::Resize(c, r)),
        Event::Key(k) => map_key(k),
        _ => None,
    }
}

fn map_key(k: KeyEvent) -> Option<HostAction> {
    if k.kind != KeyEventKind::Press {
        return None;
    }
    match k.code {
        KeyCode::Char('c') | KeyCode::Char('C') if k.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(HostAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(HostAction::Quit),
        KeyCode::Char('m') | KeyCode::Char('M') => Some(HostAction::ToggleDim),
        _ => None,
    }
}

fn collect_actions() -> Result<Vec<HostAction>> {
    let mut out = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Some(a) = map_event(event::read()?) {
            out.push(a);
            if out.len() >= 32 {
                break;
            }
        }
    }
    Ok(out)
}

/// Display-refresh scheduler for the terminal host: one pending deadline at
/// most, cancellable.
#[derive(Clone, Debug)]
pub struct FrameClock {
    frame_dt: Duration,
    next: Option<Instant>,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            frame_dt: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            next: None,
        }
    }

    pub fn frame_dt(&self) -> Duration {
        self.frame_dt
    }

    pub fn schedule(&mut self, now: Instant) {
        self.next = Some(now + self.frame_dt);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.next.is_some()
    }

    /// Waits for the pending deadline by handing the remaining time to
    /// `block`, which may return early with `true` when input is ready.
    /// Returns false when nothing is scheduled.
    pub fn wait_with<F>(&mut self, mut block: F) -> Result<bool>
    where
        F: FnMut(Duration) -> Result<bool>,
    {
        let Some(end) = self.next.take() else {
            return Ok(false);
        };
        loop {
            let now = Instant::now();
            if now >= end || block(end - now)? {
                return Ok(true);
            }
        }
    }
}

pub fn rng_for(settings: &Settings) -> StdRng {
    match settings.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// The engine running full-screen in the terminal.
pub struct Runner<P: Present = Terminal> {
    engine: Engine<TermSurface, StdRng>,
    term: P,
    clock: FrameClock,
}

impl Runner<Terminal> {
    pub fn start(settings: &Settings) -> Result<Self> {
        let cfg = settings.engine_config()?;
        let (cols, rows) = Terminal::size()?;
        let mut surface = TermSurface::new(
            cols,
            rows,
            settings.cell_px_w,
            settings.cell_px_h,
            cfg.palette.background,
        );
        surface.set_dim(settings.dim);
        surface.set_color(settings.enable_color);

        let engine = Engine::attach(surface, cfg, rng_for(settings))?;
        let term = Terminal::begin()?;
        Ok(Runner::with_presenter(engine, term, settings.fps()))
    }
}

impl<P: Present> Runner<P> {
    pub fn with_presenter(engine: Engine<TermSurface, StdRng>, term: P, fps: u32) -> Self {
        Self {
            engine,
            term,
            clock: FrameClock::new(fps),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut last = Instant::now();
        self.clock.schedule(last);

        // Block in the input poll between frames so keys wake the loop early.
        while self.clock.wait_with(|left| Ok(event::poll(left)?))? {
            for action in collect_actions()? {
                match action {
                    HostAction::Quit => self.detach(),
                    HostAction::ToggleDim => {
                        let s = self.engine.surface_mut();
                        let dim = !s.is_dim();
                        s.set_dim(dim);
                        info!(dim, "layer mode toggled");
                    }
                    HostAction::Resize(c, r) => {
                        self.engine.surface_mut().resize(c, r);
                        self.term.invalidate();
                    }
                }
            }

            let now = Instant::now();
            let dt = now.saturating_duration_since(last);
            last = now;

            match self.engine.tick(dt) {
                TickControl::Continue => {
                    self.term.present(self.engine.surface().buffer())?;
                    self.clock.schedule(now);
                }
                TickControl::Stop => self.clock.cancel(),
            }
        }
        Ok(())
    }

    /// Cancels the pending frame and detaches the engine together.
    pub fn detach(&mut self) {
        self.clock.cancel();
        self.engine.detach();
    }

    pub fn finish(mut self) -> Result<FrameStats> {
        self.detach();
        self.term.end()?;
        Ok(self.engine.stats())
    }
}

pub fn run(settings: &Settings) -> Result<()> {
    let mut runner = Runner::start(settings)?;
    let res = runner.run();
    // Restore the terminal even when the loop failed.
    let stats = runner.finish();
    res?;
    let stats = stats?;
    info!(
        frames = stats.frames,
        spawned = stats.spawned,
        expired = stats.expired,
        reseeds = stats.reseeds,
        "session finished"
    );
    Ok(())
}

/// Summary of a headless run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadlessReport {
    pub width: u32,
    pub height: u32,
    pub stats: FrameStats,
    pub live: usize,
}

/// Drives `frames` nominal ticks against an in-memory surface of
/// `width x height` pixels.
pub fn run_headless(settings: &Settings, width: u32, height: u32, frames: u32) -> Result<HeadlessReport> {
    let surface = RecordingSurface::new(width, height);
    let mut engine = Engine::attach(surface, settings.engine_config()?, rng_for(settings))?;
    for _ in 0..frames {
        if engine.tick(NOMINAL_TICK) == TickControl::Stop {
            break;
        }
    }
    let report = HeadlessReport {
        width,
        height,
        stats: engine.stats(),
        live: engine.pool().len(),
    };
    engine.detach();
    info!(
        width,
        height,
        frames = report.stats.frames,
        live = report.live,
        spawned = report.stats.spawned,
        expired = report.stats.expired,
        glyphs_last_frame = report.stats.glyphs,
        "headless run complete"
    );
    Ok(report)
}
