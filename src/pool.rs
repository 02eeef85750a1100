use crate::pulse::{spawn, Pulse, PulseConfig};
use rand::Rng;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplenishReport {
    pub spawned: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub expired: usize,
    pub spawned: usize,
}

/// Live pulses. The render loop is the only owner and mutator.
#[derive(Clone, Debug, Default)]
pub struct PulsePool {
    pulses: Vec<Pulse>,
}

impl PulsePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pulse> {
        self.pulses.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Pulse> {
        self.pulses.iter_mut()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }

    pub fn insert(&mut self, p: Pulse) {
        self.pulses.push(p);
    }

    /// Spawns until the pool reaches `cfg.population`, giving up after
    /// `cfg.max_spawn_failures` failures in a row.
    pub fn replenish<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        width: u32,
        height: u32,
        cfg: &PulseConfig,
    ) -> ReplenishReport {
        let mut report = ReplenishReport::default();
        if width == 0 || height == 0 {
            return report;
        }

        let mut streak = 0;
        while self.pulses.len() < cfg.population && streak < cfg.max_spawn_failures {
            match spawn(rng, width, height, cfg) {
                Some(p) => {
                    self.pulses.push(p);
                    report.spawned += 1;
                    streak = 0;
                }
                None => {
                    report.failed += 1;
                    streak += 1;
                }
            }
        }

        if self.pulses.len() < cfg.population {
            debug!(
                live = self.pulses.len(),
                target = cfg.population,
                width,
                height,
                "replenish gave up after consecutive spawn failures"
            );
        }
        report
    }

    /// Drops every pulse and reseeds for the given viewport.
    pub fn reset<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        width: u32,
        height: u32,
        cfg: &PulseConfig,
    ) -> ReplenishReport {
        self.pulses.clear();
        self.replenish(rng, width, height, cfg)
    }

    /// Next-state pool: survivors collected fresh, then topped up.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        width: u32,
        height: u32,
        cfg: &PulseConfig,
    ) -> StepReport {
        let before = self.pulses.len();
        let survivors: Vec<Pulse> = std::mem::take(&mut self.pulses)
            .into_iter()
            .filter(|p| !p.is_expired())
            .collect();
        let expired = before - survivors.len();
        self.pulses = survivors;

        let rep = self.replenish(rng, width, height, cfg);
        StepReport {
            expired,
            spawned: rep.spawned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn reset_fills_to_target_and_is_repeatable() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        let mut pool = PulsePool::new();

        pool.reset(&mut rng, 1024, 768, &cfg);
        assert_eq!(pool.len(), cfg.population);
        pool.reset(&mut rng, 1024, 768, &cfg);
        assert_eq!(pool.len(), cfg.population);
    }

    #[test]
    fn zero_area_spawns_nothing() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = PulsePool::new();
        let rep = pool.replenish(&mut rng, 0, 768, &cfg);
        assert_eq!(rep, ReplenishReport::default());
        assert!(pool.is_empty());
        let rep = pool.reset(&mut rng, 1024, 0, &cfg);
        assert_eq!(rep.spawned, 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn degenerate_viewport_gives_up_after_failure_budget() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = PulsePool::new();
        let rep = pool.replenish(&mut rng, 25, 25, &cfg);
        assert_eq!(rep.spawned, 0);
        assert_eq!(rep.failed, cfg.max_spawn_failures);
    }

    #[test]
    fn step_drops_expired_and_tops_up() {
        let cfg = PulseConfig::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut pool = PulsePool::new();
        pool.reset(&mut rng, 1280, 720, &cfg);

        // Push the first three well past their routes.
        for p in pool.iter_mut().take(3) {
            p.advance(1000.0);
        }
        let rep = pool.step(&mut rng, 1280, 720, &cfg);
        assert_eq!(rep.expired, 3);
        assert_eq!(rep.spawned, 3);
        assert_eq!(pool.len(), cfg.population);
        assert!(pool.iter().all(|p| !p.is_expired()));
    }
}
