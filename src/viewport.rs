/// A size change reported by the watcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    /// Previous size, `None` on the first observation.
    pub from: Option<(u32, u32)>,
}

/// Tracks the surface size and reports changes.
///
/// With `settle_frames > 0` a new size must be observed unchanged that many
/// extra times before it is reported, so a drag-resize reseeds once at the end
/// instead of on every intermediate size.
#[derive(Clone, Debug)]
pub struct ViewportWatcher {
    size: Option<(u32, u32)>,
    pending: Option<((u32, u32), u32)>,
    settle_frames: u32,
    armed: bool,
}

impl ViewportWatcher {
    pub fn new(settle_frames: u32) -> Self {
        Self {
            size: None,
            pending: None,
            settle_frames,
            armed: true,
        }
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Stops reporting. Used when the engine detaches.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.pending = None;
    }

    pub fn observe(&mut self, width: u32, height: u32) -> Option<Resize> {
        if !self.armed {
            return None;
        }
        let now = (width, height);
        if self.size == Some(now) {
            self.pending = None;
            return None;
        }

        // The first size is taken immediately; there is nothing to keep.
        if self.size.is_some() && self.settle_frames > 0 {
            let seen = match self.pending {
                Some((p, n)) if p == now => n + 1,
                _ => 0,
            };
            if seen < self.settle_frames {
                self.pending = Some((now, seen));
                return None;
            }
        }

        let from = self.size.replace(now);
        self.pending = None;
        Some(Resize {
            width,
            height,
            from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_always_reports() {
        let mut w = ViewportWatcher::new(3);
        let r = w.observe(800, 600).unwrap();
        assert_eq!((r.width, r.height, r.from), (800, 600, None));
        assert_eq!(w.observe(800, 600), None);
    }

    #[test]
    fn immediate_mode_reports_every_change() {
        let mut w = ViewportWatcher::new(0);
        w.observe(800, 600);
        let r = w.observe(400, 300).unwrap();
        assert_eq!(r.from, Some((800, 600)));
        assert_eq!(w.size(), Some((400, 300)));
    }

    #[test]
    fn settle_waits_for_a_stable_size() {
        let mut w = ViewportWatcher::new(2);
        w.observe(800, 600);
        assert_eq!(w.observe(700, 500), None);
        assert_eq!(w.observe(600, 400), None);
        assert_eq!(w.observe(600, 400), None);
        let r = w.observe(600, 400).unwrap();
        assert_eq!((r.width, r.height), (600, 400));
        assert_eq!(r.from, Some((800, 600)));
    }

    #[test]
    fn bouncing_back_cancels_pending() {
        let mut w = ViewportWatcher::new(1);
        w.observe(800, 600);
        assert_eq!(w.observe(400, 300), None);
        assert_eq!(w.observe(800, 600), None);
        assert_eq!(w.observe(400, 300), None);
    }

    #[test]
    fn disarmed_watcher_is_silent() {
        let mut w = ViewportWatcher::new(0);
        w.observe(800, 600);
        w.disarm();
        assert!(!w.is_armed());
        assert_eq!(w.observe(100, 100), None);
        assert_eq!(w.size(), Some((800, 600)));
    }
}
