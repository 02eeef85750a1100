use anyhow::{Context, Result};
use circuitpulse::{app, config};
use clap::Parser;
use std::{fs::File, path::PathBuf, sync::Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Grid-aligned binary data pulses drifting across the terminal")]
struct Args {
    /// settings file (JSON); defaults to settings.json in the config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// fixed RNG seed for a repeatable animation
    #[arg(long)]
    seed: Option<u64>,

    /// frame cap
    #[arg(long)]
    fps: Option<u32>,

    /// lattice cell size in virtual pixels
    #[arg(long)]
    cell_size: Option<u32>,

    /// number of live pulses
    #[arg(long)]
    population: Option<usize>,

    /// symbols per pulse payload
    #[arg(long)]
    payload_len: Option<usize>,

    /// start in dim mode (toggle with M)
    #[arg(long)]
    dim: bool,

    /// monochrome output
    #[arg(long)]
    no_color: bool,

    /// run N frames off-screen and print a summary instead of drawing
    #[arg(long, value_name = "FRAMES")]
    headless: Option<u32>,

    /// surface size for --headless, in pixels
    #[arg(long, num_args = 2, value_names = ["W", "H"], default_values_t = [1280, 720])]
    headless_size: Vec<u32>,

    /// write logs to this file (filter with RUST_LOG)
    #[arg(long)]
    log: Option<PathBuf>,
}

impl Args {
    fn apply(&self, s: &mut config::Settings) {
        if let Some(v) = self.seed {
            s.seed = Some(v);
        }
        if let Some(v) = self.fps {
            s.fps_cap = v;
        }
        if let Some(v) = self.cell_size {
            s.cell_size = v;
        }
        if let Some(v) = self.population {
            s.population = v;
        }
        if let Some(v) = self.payload_len {
            s.payload_len = v;
        }
        if self.dim {
            s.dim = true;
        }
        if self.no_color {
            s.enable_color = false;
        }
    }
}

fn init_logging(path: Option<&PathBuf>, headless: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("creating log file {}", p.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // Headless runs own no screen, so stderr is free.
        None if headless => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_ref(), args.headless.is_some())?;

    let mut settings = match &args.config {
        Some(p) => config::load_settings_from(p)?,
        None => config::load_settings(config::default_settings_path().as_deref()),
    };
    args.apply(&mut settings);

    if let Some(frames) = args.headless {
        let (w, h) = (args.headless_size[0], args.headless_size[1]);
        let rep = app::run_headless(&settings, w, h, frames)?;
        println!(
            "{}x{}: {} frames, {} live, {} spawned, {} expired, {} glyphs in last frame",
            rep.width,
            rep.height,
            rep.stats.frames,
            rep.live,
            rep.stats.spawned,
            rep.stats.expired,
            rep.stats.glyphs
        );
        return Ok(());
    }

    app::run(&settings)
}
