use rand::Rng;

/// A lattice intersection in surface pixels. Both coordinates are multiples of
/// the cell size they were sampled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LatticePoint {
    pub x: u32,
    pub y: u32,
}

impl LatticePoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }

    /// Manhattan distance in pixels.
    pub fn manhattan(self, o: LatticePoint) -> u32 {
        self.x.abs_diff(o.x) + self.y.abs_diff(o.y)
    }
}

/// Number of lattice lines that fit strictly inside `dim`; at least one when
/// `dim > 0`, even if `dim` is smaller than a cell.
pub fn lattice_lines(dim: u32, cell: u32) -> u32 {
    if dim == 0 || cell == 0 {
        return 0;
    }
    dim.div_ceil(cell)
}

/// Random lattice point inside `[0, width) x [0, height)`, or `None` for a
/// zero-area viewport.
pub fn sample<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    cell: u32,
) -> Option<LatticePoint> {
    let nx = lattice_lines(width, cell);
    let ny = lattice_lines(height, cell);
    if nx == 0 || ny == 0 {
        return None;
    }
    Some(LatticePoint {
        x: rng.gen_range(0..nx) * cell,
        y: rng.gen_range(0..ny) * cell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn samples_stay_on_the_300px_lattice() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..5000 {
            let p = sample(&mut rng, 300, 300, 30).unwrap();
            assert_eq!(p.x % 30, 0);
            assert_eq!(p.y % 30, 0);
            assert!(p.x <= 270 && p.y <= 270);
            seen.insert(p);
        }
        // 100 valid points; 5000 draws covers them all with overwhelming odds.
        assert_eq!(seen.len(), 100);
    }

    #[test]
    fn zero_area_never_samples() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample(&mut rng, 0, 300, 30), None);
        assert_eq!(sample(&mut rng, 300, 0, 30), None);
        assert_eq!(sample(&mut rng, 0, 0, 30), None);
    }

    #[test]
    fn tiny_viewport_clamps_to_one_cell() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            assert_eq!(sample(&mut rng, 12, 7, 30), Some(LatticePoint::new(0, 0)));
        }
    }

    #[test]
    fn partial_cell_still_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..2000 {
            let p = sample(&mut rng, 310, 95, 30).unwrap();
            assert!(p.in_bounds(310, 95), "{p:?}");
        }
        assert_eq!(lattice_lines(310, 30), 11);
        assert_eq!(lattice_lines(95, 30), 4);
    }
}
