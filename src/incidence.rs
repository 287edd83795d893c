//! The bipartite fiber↔target incidence: which targets every cobra can
//! reach, and which cobras can observe every target. Both sides are views
//! of the same relation and are only mutated together.

use smallvec::SmallVec;

use crate::catalog::Target;
use crate::constants::{COLLDIST, DOTDIST, NFIBER, RMAX};
use crate::focal_plane::{dist_sq, dot_position, fiber_position};
use crate::raster::FpRaster;

/// Fibers able to observe one target. The hex lattice lets at most three
/// cobras reach any point, so the list stays inline.
pub type FiberSet = SmallVec<[usize; 4]>;

/// Remove exactly one occurrence of `val`; anything else means the two
/// sides of the relation have drifted apart.
fn strip_fiber(list: &mut FiberSet, val: usize) {
    let before = list.len();
    list.retain(|&mut f| f != val);
    assert!(list.len() + 1 == before, "fiber {val} missing from mapping");
}

fn strip_target(list: &mut Vec<usize>, val: usize) {
    let before = list.len();
    list.retain(|&t| t != val);
    assert!(list.len() + 1 == before, "target {val} missing from mapping");
}

pub struct Incidence {
    f2t: Vec<Vec<usize>>,
    t2f: Vec<FiberSet>,
}

impl Incidence {
    /// Computes the fiber→target and target→fiber mappings.
    ///
    /// A target is reachable by a fiber when it lies within the patrol
    /// radius of the fiber center and outside the blocking area of the
    /// fiber's dot. Per-fiber lists keep the raster's query order.
    pub fn build(tgt: &[Target], raster: &FpRaster) -> Self {
        let mut f2t = vec![Vec::new(); NFIBER];
        for (fiber, list) in f2t.iter_mut().enumerate() {
            let fp = fiber_position(fiber);
            let dp = dot_position(fiber);
            for j in raster.query(&fp, RMAX) {
                if dist_sq(&dp, &tgt[j].pos) >= DOTDIST * DOTDIST {
                    list.push(j);
                }
            }
        }
        let mut t2f = vec![FiberSet::new(); tgt.len()];
        for (fiber, list) in f2t.iter().enumerate() {
            for &t in list {
                t2f[t].push(fiber);
            }
        }
        let inc = Incidence { f2t, t2f };
        inc.check_symmetry();
        inc
    }

    /// Targets currently reachable by `fiber`.
    pub fn fiber_targets(&self, fiber: usize) -> &[usize] {
        &self.f2t[fiber]
    }

    /// Fibers currently able to observe `itgt`.
    pub fn target_fibers(&self, itgt: usize) -> &[usize] {
        &self.t2f[itgt]
    }

    pub fn nfibers(&self) -> usize {
        self.f2t.len()
    }

    /// Given a target `itgt` and the `fiber` chosen to observe it, remove
    /// all references to `itgt` from the mappings, all targets inside the
    /// collision area around `itgt`, and all targets exclusively visible
    /// from `fiber`.
    pub fn cleanup(&mut self, tgt: &[Target], raster: &FpRaster, fiber: usize, itgt: usize) {
        // remove everything related to the selected fiber
        for &cur in &self.f2t[fiber] {
            strip_fiber(&mut self.t2f[cur], fiber);
        }
        self.f2t[fiber].clear();
        // remove the target and everything in its blocking area
        for i in raster.query(&tgt[itgt].pos, COLLDIST) {
            for &j in &self.t2f[i] {
                strip_target(&mut self.f2t[j], i);
            }
            self.t2f[i].clear();
        }
        self.check_symmetry();
    }

    /// Debug-build sweep over both sides of the relation.
    fn check_symmetry(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (fiber, list) in self.f2t.iter().enumerate() {
            for &t in list {
                assert!(
                    self.t2f[t].contains(&fiber),
                    "target {t} does not list fiber {fiber}"
                );
            }
        }
        for (t, list) in self.t2f.iter().enumerate() {
            for &fiber in list {
                assert!(
                    self.f2t[fiber].contains(&t),
                    "fiber {fiber} does not list target {t}"
                );
            }
        }
    }
}

#[cfg(test)]
mod incidence_test {
    use smallvec::smallvec;

    use super::*;
    use crate::constants::RASTER_BINS;
    use crate::focal_plane::PlanePos;

    fn raster_over(tgt: &[Target]) -> FpRaster {
        FpRaster::new(
            tgt.iter().map(|t| t.pos).collect(),
            RASTER_BINS,
            RASTER_BINS,
        )
    }

    fn target_near_fiber(fiber: usize, off: PlanePos, id: i32) -> Target {
        let p = fiber_position(fiber) + off;
        Target::new(p.x, p.y, 1.0, id, 1)
    }

    #[test]
    fn test_build_is_symmetric() {
        let tgt = vec![
            target_near_fiber(0, PlanePos::new(0.0, -2.0), 1),
            target_near_fiber(0, PlanePos::new(2.5, 1.0), 2),
            target_near_fiber(100, PlanePos::new(0.0, -2.0), 3),
        ];
        let raster = raster_over(&tgt);
        let inc = Incidence::build(&tgt, &raster);
        for fiber in 0..inc.nfibers() {
            for &t in inc.fiber_targets(fiber) {
                assert!(inc.target_fibers(t).contains(&fiber));
            }
        }
        assert!(inc.fiber_targets(0).contains(&0));
        assert!(inc.fiber_targets(0).contains(&1));
    }

    #[test]
    fn test_dot_blocked_target_is_unreachable() {
        // Directly on the dot center of fiber 0.
        let tgt = vec![target_near_fiber(0, PlanePos::new(0.0, 1.19), 1)];
        let raster = raster_over(&tgt);
        let inc = Incidence::build(&tgt, &raster);
        assert!(inc.fiber_targets(0).is_empty());
        assert!(inc.target_fibers(0).is_empty());
    }

    #[test]
    fn test_cleanup_clears_fiber_target_and_collisions() {
        let tgt = vec![
            target_near_fiber(0, PlanePos::new(0.0, -2.0), 1),
            // within COLLDIST of the first target
            target_near_fiber(0, PlanePos::new(0.5, -2.0), 2),
            // reachable by fiber 0 but outside the collision disk
            target_near_fiber(0, PlanePos::new(2.5, 1.0), 3),
        ];
        let raster = raster_over(&tgt);
        let mut inc = Incidence::build(&tgt, &raster);
        assert!(inc.fiber_targets(0).len() == 3);
        inc.cleanup(&tgt, &raster, 0, 0);
        assert!(inc.fiber_targets(0).is_empty());
        assert!(inc.target_fibers(0).is_empty());
        assert!(inc.target_fibers(1).is_empty());
        // the survivor was exclusively visible from fiber 0, so it is
        // stranded once that fiber is retired
        assert!(inc.target_fibers(2).is_empty());
    }

    #[test]
    #[should_panic(expected = "missing from mapping")]
    fn test_strip_missing_fiber_aborts() {
        let mut list: FiberSet = smallvec![1, 2, 3];
        strip_fiber(&mut list, 7);
    }

    #[test]
    #[should_panic(expected = "missing from mapping")]
    fn test_strip_missing_target_aborts() {
        let mut list = vec![0, 4];
        strip_target(&mut list, 2);
    }
}
