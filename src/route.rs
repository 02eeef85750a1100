use crate::grid::LatticePoint;
use rand::Rng;

/// Axis-aligned walk over lattice points. Never empty; consecutive points are
/// one cell apart on exactly one axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    points: Vec<LatticePoint>,
}

impl Route {
    pub fn points(&self) -> &[LatticePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    // A route always holds its start point.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn start(&self) -> LatticePoint {
        self.points[0]
    }

    pub fn last(&self) -> LatticePoint {
        self.points[self.points.len() - 1]
    }

    pub fn get(&self, i: usize) -> Option<LatticePoint> {
        self.points.get(i).copied()
    }

    /// False when the step ceiling stopped the walk before `end`.
    pub fn is_complete(&self, end: LatticePoint) -> bool {
        self.last() == end
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.points.iter().all(|p| p.in_bounds(width, height))
    }

    /// Builds a route from explicit points, checking the adjacency invariant.
    pub fn from_points(points: Vec<LatticePoint>, cell: u32) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let adjacent = points.windows(2).all(|w| is_step(w[0], w[1], cell));
        adjacent.then_some(Self { points })
    }
}

/// True when `a` and `b` differ by exactly `cell` along exactly one axis.
pub fn is_step(a: LatticePoint, b: LatticePoint, cell: u32) -> bool {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    (dx == cell && dy == 0) || (dx == 0 && dy == cell)
}

fn toward(from: u32, to: u32, cell: u32) -> u32 {
    if from < to {
        from + cell
    } else {
        from - cell
    }
}

/// Greedy randomized Manhattan walk from `start` to `end`.
///
/// While both axes differ a fair coin chooses which gap to close; once one
/// axis matches only the other moves. Every step shrinks the distance to
/// `end` by one cell. The walk stops after `max_steps` steps even if `end`
/// was not reached; that shorter route is still valid.
///
/// Both endpoints must lie on the same `cell` lattice.
pub fn route<R: Rng + ?Sized>(
    rng: &mut R,
    start: LatticePoint,
    end: LatticePoint,
    cell: u32,
    max_steps: usize,
) -> Route {
    let cells = start.manhattan(end) as usize / cell.max(1) as usize;
    let mut points = Vec::with_capacity(cells.min(max_steps) + 1);
    points.push(start);
    let mut cur = start;
    let mut steps = 0;

    while cur != end && steps < max_steps {
        let x_open = cur.x != end.x;
        let y_open = cur.y != end.y;
        let step_x = match (x_open, y_open) {
            (true, true) => rng.gen_bool(0.5),
            (true, false) => true,
            _ => false,
        };
        if step_x {
            cur.x = toward(cur.x, end.x, cell);
        } else {
            cur.y = toward(cur.y, end.y, cell);
        }
        points.push(cur);
        steps += 1;
    }

    Route { points }
}
