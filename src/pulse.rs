use crate::error::{EngineError, EngineResult};
use crate::grid::{sample, LatticePoint};
use crate::route::{route, Route};
use rand::Rng;

pub const DEFAULT_CELL_SIZE: u32 = 30;
pub const DEFAULT_POPULATION: usize = 15;
pub const DEFAULT_PAYLOAD_LEN: usize = 20;
pub const DEFAULT_SPEED_MIN: f64 = 0.2;
pub const DEFAULT_SPEED_MAX: f64 = 0.5;
pub const DEFAULT_MIN_ROUTE_LEN: usize = 6;
pub const DEFAULT_MAX_ROUTE_STEPS: usize = 50;
pub const DEFAULT_MAX_SPAWN_FAILURES: usize = 5;

/// Engine constants shared by the factory, the pool and the render loop.
#[derive(Clone, Debug, PartialEq)]
pub struct PulseConfig {
    /// Lattice cell size in pixels.
    pub cell_size: u32,
    /// Target number of live pulses.
    pub population: usize,
    /// Symbols per payload.
    pub payload_len: usize,
    pub speed_min: f64,
    pub speed_max: f64,
    /// Routes with fewer points are discarded.
    pub min_route_len: usize,
    /// Manhattan walk step ceiling.
    pub max_route_steps: usize,
    /// Consecutive failed spawns tolerated per replenish call.
    pub max_spawn_failures: usize,
}

impl Default for PulseConfig {
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
        }
    }
}

impl PulseConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.cell_size == 0 {
            return Err(EngineError::invalid_config("cell_size must be > 0"));
        }
        if self.population == 0 {
            return Err(EngineError::invalid_config("population must be > 0"));
        }
        if self.payload_len == 0 {
            return Err(EngineError::invalid_config("payload_len must be > 0"));
        }
        if !(self.speed_min.is_finite() && self.speed_max.is_finite())
            || self.speed_min < 0.0
            || self.speed_min >= self.speed_max
        {
            return Err(EngineError::invalid_config(format!(
                "speed range [{}, {}) is empty or negative",
                self.speed_min, self.speed_max
            )));
        }
        if self.min_route_len == 0 {
            return Err(EngineError::invalid_config("min_route_len must be > 0"));
        }
        if self.max_route_steps == 0 {
            return Err(EngineError::invalid_config("max_route_steps must be > 0"));
        }
        if self.max_spawn_failures == 0 {
            return Err(EngineError::invalid_config("max_spawn_failures must be > 0"));
        }
        Ok(())
    }
}

/// Fixed binary glyph string carried by a pulse. Index 0 is the head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        Self(
            (0..len)
                .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
                .collect(),
        )
    }

    /// Accepts only strings made of '0' and '1'.
    pub fn from_bits(bits: &str) -> Option<Self> {
        bits.bytes()
            .all(|b| b == b'0' || b == b'1')
            .then(|| Self(bits.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol `j` as a one-char string slice, ready for drawing.
    pub fn symbol(&self, j: usize) -> &str {
        &self.0[j..j + 1]
    }
}

#[derive(Clone, Debug)]
pub struct Pulse {
    route: Route,
    cursor: f64,
    speed: f64,
    payload: Payload,
}

impl Pulse {
    pub fn new(route: Route, speed: f64, payload: Payload) -> Self {
        Self {
            route,
            cursor: 0.0,
            speed,
            payload,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Moves the head forward by `speed * scale` route indices.
    pub fn advance(&mut self, scale: f64) {
        self.cursor += self.speed * scale;
    }

    /// Route point under payload symbol `j`, if that symbol is on the route.
    pub fn symbol_position(&self, j: usize) -> Option<LatticePoint> {
        let idx = (self.cursor - j as f64).floor();
        if idx < 0.0 {
            return None;
        }
        self.route.get(idx as usize)
    }

    /// True once even the last payload symbol has left the route.
    pub fn is_expired(&self) -> bool {
        self.cursor - self.payload.len() as f64 >= self.route.len() as f64
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.route.fits(width, height)
    }
}

/// One spawn attempt: two samples, a route between them, and a payload.
/// Returns `None` on a zero-area viewport or when the route is too short.
pub fn spawn<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    cfg: &PulseConfig,
) -> Option<Pulse> {
    let start = sample(rng, width, height, cfg.cell_size)?;
    let end = sample(rng, width, height, cfg.cell_size)?;
    let path = route(rng, start, end, cfg.cell_size, cfg.max_route_steps);
    if path.len() < cfg.min_route_len {
        return None;
    }
    let speed = rng.gen_range(cfg.speed_min..cfg.speed_max);
    let payload = Payload::random(rng, cfg.payload_len);
    Some(Pulse::new(path, speed, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn line_route(n: u32) -> Route {
        let pts = (0..n).map(|i| LatticePoint::new(i * 30, 0)).collect();
        Route::from_points(pts, 30).unwrap()
    }

    #[test]
    fn spawned_pulses_respect_config() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut made = 0;
        for _ in 0..400 {
            if let Some(p) = spawn(&mut rng, 1280, 720, &cfg) {
                made += 1;
                assert_eq!(p.payload().len(), cfg.payload_len);
                assert!(p.payload().as_str().chars().all(|c| c == '0' || c == '1'));
                assert!((0.2..0.5).contains(&p.speed()));
                assert!(p.route().len() >= cfg.min_route_len);
                assert!(p.fits(1280, 720));
                assert_eq!(p.cursor(), 0.0);
            }
        }
        assert!(made > 300, "only {made} of 400 spawns succeeded");
    }

    #[test]
    fn spawn_on_zero_area_is_none() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            assert!(spawn(&mut rng, 0, 600, &cfg).is_none());
            assert!(spawn(&mut rng, 800, 0, &cfg).is_none());
        }
    }

    #[test]
    fn single_cell_viewport_never_yields_a_pulse() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            assert!(spawn(&mut rng, 20, 20, &cfg).is_none());
        }
    }

    #[test]
    fn head_leaves_route_before_tail() {
        let payload = Payload::from_bits("01100110011001100110").unwrap();
        let mut p = Pulse::new(line_route(10), 0.3, payload);
        for _ in 0..47 {
            p.advance(1.0);
        }
        assert!((p.cursor() - 14.1).abs() < 1e-9);
        assert_eq!(p.symbol_position(0), None);
        let visible = (0..20).filter(|&j| p.symbol_position(j).is_some()).count();
        assert_eq!(visible, 10);
        assert_eq!(p.symbol_position(5), Some(LatticePoint::new(270, 0)));
        assert_eq!(p.symbol_position(14), Some(LatticePoint::new(0, 0)));
        assert!(!p.is_expired());
    }

    #[test]
    fn expires_once_tail_clears_route() {
        let mut p = Pulse::new(line_route(10), 0.3, Payload::random(&mut StdRng::seed_from_u64(1), 20));
        let mut ticks = 0;
        while !p.is_expired() {
            p.advance(1.0);
            ticks += 1;
            assert!(ticks < 200);
        }
        assert!((100..=101).contains(&ticks), "expired after {ticks}");
        assert!(p.cursor() >= 30.0 - 1e-9);
    }

    #[test]
    fn payload_rejects_other_glyphs() {
        assert!(Payload::from_bits("0101").is_some());
        assert!(Payload::from_bits("01x1").is_none());
        assert_eq!(Payload::from_bits("10").unwrap().symbol(1), "0");
    }

    #[test]
    fn validate_catches_bad_constants() {
        assert!(PulseConfig::default().validate().is_ok());
        let bad = [
            PulseConfig { cell_size: 0, ..Default::default() },
            PulseConfig { population: 0, ..Default::default() },
            PulseConfig { payload_len: 0, ..Default::default() },
            PulseConfig { speed_min: 0.5, speed_max: 0.5, ..Default::default() },
            PulseConfig { speed_min: -0.1, ..Default::default() },
            PulseConfig { speed_max: f64::NAN, ..Default::default() },
            PulseConfig { min_route_len: 0, ..Default::default() },
            PulseConfig { max_route_steps: 0, ..Default::default() },
            PulseConfig { max_spawn_failures: 0, ..Default::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }
}
