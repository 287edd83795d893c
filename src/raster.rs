//! Uniform-grid index over planar positions, providing the radius queries
//! behind the incidence construction and the collision bookkeeping.

use crate::focal_plane::{dist_sq, PlanePos};

/// Spatial index over a fixed set of planar locations.
///
/// The bounding box of the input is split into `nx * ny` uniform cells;
/// each cell records the indices of the locations falling inside it.
/// Queries enumerate the cells touched by the search disk and filter the
/// candidates by squared distance. The structure is immutable once built
/// and safe to share between concurrent readers.
pub struct FpRaster {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    inv_dx: f64,
    inv_dy: f64,
    nx: usize,
    ny: usize,
    cells: Vec<Vec<usize>>,
    loc: Vec<PlanePos>,
}

impl FpRaster {
    /// Builds the index over `loc` with `nx` by `ny` bins.
    ///
    /// Panics on an empty location set or zero bin counts; constructing an
    /// index over nothing is a programming error.
    pub fn new(loc: Vec<PlanePos>, nx: usize, ny: usize) -> Self {
        assert!(nx > 0 && ny > 0, "bad array sizes");
        assert!(!loc.is_empty(), "input array too small");
        let (mut x0, mut x1) = (loc[0].x, loc[0].x);
        let (mut y0, mut y1) = (loc[0].y, loc[0].y);
        for p in &loc[1..] {
            x0 = x0.min(p.x);
            x1 = x1.max(p.x);
            y0 = y0.min(p.y);
            y1 = y1.max(p.y);
        }
        // A degenerate extent would make the bin width infinite.
        if x0 == x1 {
            x1 += 1e-9;
        }
        if y0 == y1 {
            y1 += 1e-9;
        }
        let mut raster = FpRaster {
            x0,
            y0,
            x1,
            y1,
            inv_dx: nx as f64 / (x1 - x0),
            inv_dy: ny as f64 / (y1 - y0),
            nx,
            ny,
            cells: vec![Vec::new(); nx * ny],
            loc,
        };
        for i in 0..raster.loc.len() {
            let cell = raster.cell_index(&raster.loc[i]);
            raster.cells[cell].push(i);
        }
        raster
    }

    fn index_x(&self, x: f64) -> usize {
        (((x - self.x0) * self.inv_dx) as i64).clamp(0, self.nx as i64 - 1) as usize
    }

    fn index_y(&self, y: f64) -> usize {
        (((y - self.y0) * self.inv_dy) as i64).clamp(0, self.ny as i64 - 1) as usize
    }

    fn cell_index(&self, pos: &PlanePos) -> usize {
        self.index_x(pos.x) + self.nx * self.index_y(pos.y)
    }

    fn outside(&self, center: &PlanePos, rad: f64) -> bool {
        center.x < self.x0 - rad
            || center.x > self.x1 + rad
            || center.y < self.y0 - rad
            || center.y > self.y1 + rad
    }

    /// Indices of all stored locations within distance `rad` of `center`,
    /// in cell-major order, then insertion order within a cell.
    pub fn query(&self, center: &PlanePos, rad: f64) -> Vec<usize> {
        let mut res = Vec::new();
        if self.outside(center, rad) {
            return res;
        }
        let rsq = rad * rad;
        let (i0, i1) = (self.index_x(center.x - rad), self.index_x(center.x + rad));
        let (j0, j1) = (self.index_y(center.y - rad), self.index_y(center.y + rad));
        for j in j0..=j1 {
            for i in i0..=i1 {
                for &k in &self.cells[i + self.nx * j] {
                    if dist_sq(center, &self.loc[k]) <= rsq {
                        res.push(k);
                    }
                }
            }
        }
        res
    }

    /// True if any stored location lies within distance `rad` of `center`.
    pub fn any_in(&self, center: &PlanePos, rad: f64) -> bool {
        if self.outside(center, rad) {
            return false;
        }
        let rsq = rad * rad;
        let (i0, i1) = (self.index_x(center.x - rad), self.index_x(center.x + rad));
        let (j0, j1) = (self.index_y(center.y - rad), self.index_y(center.y + rad));
        for j in j0..=j1 {
            for i in i0..=i1 {
                for &k in &self.cells[i + self.nx * j] {
                    if dist_sq(center, &self.loc[k]) <= rsq {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod raster_test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_cloud(rng: &mut StdRng, n: usize) -> Vec<PlanePos> {
        (0..n)
            .map(|_| PlanePos::new(rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0)))
            .collect()
    }

    fn brute_force(loc: &[PlanePos], center: &PlanePos, rad: f64) -> Vec<usize> {
        (0..loc.len())
            .filter(|&i| dist_sq(center, &loc[i]) <= rad * rad)
            .collect()
    }

    #[test]
    fn test_every_point_finds_itself() {
        let mut rng = StdRng::seed_from_u64(7);
        let loc = random_cloud(&mut rng, 200);
        let raster = FpRaster::new(loc.clone(), 17, 23);
        for (i, p) in loc.iter().enumerate() {
            assert!(raster.query(p, 0.0).contains(&i));
        }
    }

    #[test]
    fn test_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let loc = random_cloud(&mut rng, 300);
        let raster = FpRaster::new(loc.clone(), 100, 100);
        for _ in 0..200 {
            let center = PlanePos::new(rng.random_range(-60.0..60.0), rng.random_range(-60.0..60.0));
            let rad = rng.random_range(0.0..20.0);
            let mut got = raster.query(&center, rad);
            got.sort_unstable();
            assert_eq!(got, brute_force(&loc, &center, rad));
        }
    }

    #[test]
    fn test_any_in_agrees_with_query() {
        let mut rng = StdRng::seed_from_u64(1234);
        let loc = random_cloud(&mut rng, 100);
        let raster = FpRaster::new(loc.clone(), 10, 10);
        for _ in 0..200 {
            let center = PlanePos::new(rng.random_range(-80.0..80.0), rng.random_range(-80.0..80.0));
            let rad = rng.random_range(0.0..10.0);
            assert_eq!(
                raster.any_in(&center, rad),
                !raster.query(&center, rad).is_empty()
            );
        }
    }

    #[test]
    fn test_single_point_degenerate_box() {
        let p = PlanePos::new(3.25, -1.5);
        let raster = FpRaster::new(vec![p], 100, 100);
        assert_eq!(raster.query(&p, 0.5), vec![0]);
        assert!(raster.any_in(&PlanePos::new(3.3, -1.5), 0.1));
        assert!(!raster.any_in(&PlanePos::new(4.0, -1.5), 0.1));
    }

    #[test]
    fn test_far_outside_is_empty() {
        let loc = vec![PlanePos::new(0.0, 0.0), PlanePos::new(1.0, 1.0)];
        let raster = FpRaster::new(loc, 4, 4);
        assert!(raster.query(&PlanePos::new(100.0, 100.0), 5.0).is_empty());
        assert!(!raster.any_in(&PlanePos::new(-100.0, 0.5), 5.0));
    }

    #[test]
    fn test_result_order_is_deterministic() {
        let loc = vec![
            PlanePos::new(0.0, 0.0),
            PlanePos::new(0.1, 0.0),
            PlanePos::new(0.0, 0.1),
            PlanePos::new(5.0, 5.0),
        ];
        let raster = FpRaster::new(loc, 8, 8);
        let a = raster.query(&PlanePos::new(0.05, 0.05), 1.0);
        let b = raster.query(&PlanePos::new(0.05, 0.05), 1.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }
}
