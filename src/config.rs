use crate::engine::EngineConfig;
use crate::error::EngineResult;
use crate::pulse::{
    PulseConfig, DEFAULT_CELL_SIZE, DEFAULT_MAX_ROUTE_STEPS, DEFAULT_MAX_SPAWN_FAILURES,
    DEFAULT_MIN_ROUTE_LEN, DEFAULT_PAYLOAD_LEN, DEFAULT_POPULATION, DEFAULT_SPEED_MAX,
    DEFAULT_SPEED_MIN,
};
use crate::surface::Palette;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cell_size: u32,
    pub population: usize,
    pub payload_len: usize,
    pub speed_min: f64,
    pub speed_max: f64,
    pub min_route_len: usize,
    pub max_route_steps: usize,
    pub max_spawn_failures: usize,
    pub fps_cap: u32,
    pub enable_color: bool,
    pub dim: bool,
    /// Virtual pixels per terminal column.
    pub cell_px_w: u32,
    /// Virtual pixels per terminal row.
    pub cell_px_h: u32,
    pub resize_settle_frames: u32,
    /// Fixed RNG seed; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            population: DEFAULT_POPULATION,
            payload_len: DEFAULT_PAYLOAD_LEN,
            speed_min: DEFAULT_SPEED_MIN,
            speed_max: DEFAULT_SPEED_MAX,
            min_route_len: DEFAULT_MIN_ROUTE_LEN,
            max_route_steps: DEFAULT_MAX_ROUTE_STEPS,
            max_spawn_failures: DEFAULT_MAX_SPAWN_FAILURES,
            fps_cap: 60,
            enable_color: true,
            dim: false,
            cell_px_w: 10,
            cell_px_h: 15,
            resize_settle_frames: 0,
            seed: None,
        }
    }
}

impl Settings {
    pub fn fps(&self) -> u32 {
        self.fps_cap.clamp(10, 240)
    }

    pub fn pulse_config(&self) -> EngineResult<PulseConfig> {
        let cfg = PulseConfig {
            cell_size: self.cell_size,
            population: self.population,
            payload_len: self.payload_len,
            speed_min: self.speed_min,
            speed_max: self.speed_max,
            min_route_len: self.min_route_len,
            max_route_steps: self.max_route_steps,
            max_spawn_failures: self.max_spawn_failures,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn engine_config(&self) -> EngineResult<EngineConfig> {
        Ok(EngineConfig {
            pulse: self.pulse_config()?,
            palette: Palette::default(),
            resize_settle_frames: self.resize_settle_frames,
        })
    }
}

/// `settings.json` in the platform config directory, if one can be resolved.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "circuitpulse", "circuitpulse")
        .map(|p| p.config_dir().join(SETTINGS_FILE))
}

/// Reads settings from an explicitly requested file. Any failure is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing settings in {}", path.display()))
}

/// Reads settings from the default location. A missing file means defaults;
/// a broken one is logged and also falls back to defaults.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                Settings::default()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Settings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read settings file");
            Settings::default()
        }
    }
}
