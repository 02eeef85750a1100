//! Grid-aligned "data pulse" background animation.
//!
//! Pulses are random Manhattan routes over a fixed lattice, each carrying a
//! short binary payload that is drawn as a bright head with a fading trail.
//! [`Engine`] owns the pulse pool and a drawing surface and redraws the whole
//! frame on every [`Engine::tick`]; hosts decide when ticks happen.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod pool;
pub mod pulse;
pub mod route;
pub mod surface;
pub mod term;
pub mod viewport;

pub use engine::{Engine, EngineConfig, FrameStats, LoopState, TickControl, NOMINAL_TICK};
pub use error::{EngineError, EngineResult};
pub use grid::LatticePoint;
pub use pool::PulsePool;
pub use pulse::{Payload, Pulse, PulseConfig};
pub use route::Route;
pub use surface::{DrawContext, Glow, Palette, RasterSurface, RecordingSurface, Rgba};
