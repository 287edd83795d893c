//! The three fiber-to-target assignment strategies and the density
//! machinery behind the `new` assigner.

use std::cmp::Ordering;
use std::str::FromStr;

use ordered_float::NotNan;

use crate::catalog::Target;
use crate::constants::{PRI_SENTINEL, RASTER_BINS, R_KERNEL};
use crate::fiberplan_errors::FiberplanError;
use crate::focal_plane::dist_sq;
use crate::incidence::Incidence;
use crate::pqueue::PQueue;
use crate::raster::FpRaster;

/// Proximity kernel of the density-aware strategy.
///
/// The parabolic form is the historical default; the alternatives decay
/// more gently and can be selected from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelShape {
    #[default]
    Parabolic,
    Linear,
    Gaussian,
}

impl KernelShape {
    /// Kernel weight for a squared distance in mm².
    pub fn eval(self, rsq: f64) -> f64 {
        match self {
            KernelShape::Parabolic => (R_KERNEL * R_KERNEL - rsq).max(0.0),
            KernelShape::Linear => (R_KERNEL * R_KERNEL - rsq).max(0.0).sqrt(),
            KernelShape::Gaussian => (-9.0 * rsq / (R_KERNEL * R_KERNEL)).exp(),
        }
    }
}

impl FromStr for KernelShape {
    type Err = FiberplanError;

    fn from_str(name: &str) -> Result<Self, FiberplanError> {
        match name {
            "parabolic" => Ok(KernelShape::Parabolic),
            "linear" => Ok(KernelShape::Linear),
            "gaussian" => Ok(KernelShape::Gaussian),
            other => Err(FiberplanError::UnknownKernel(other.to_string())),
        }
    }
}

/// Assignments chosen for one exposure: parallel rows of target and fiber
/// indices. Target indices refer to the slice handed to the assigner,
/// fiber indices are zero-based cobra ids.
#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    pub tid: Vec<usize>,
    pub fid: Vec<usize>,
}

impl AssignmentResult {
    pub fn len(&self) -> usize {
        self.tid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tid.is_empty()
    }

    fn push(&mut self, itgt: usize, fiber: usize) {
        self.tid.push(itgt);
        self.fid.push(fiber);
    }
}

/// Assignment strategy, selected once at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assigner {
    /// Walk the fibers in id order, give each its most urgent target.
    Naive,
    /// Serve the fiber with the fewest remaining candidates first, after
    /// the assignment method of Morales et al. (2012), MNRAS 419, 1187.
    Draining,
    /// Process targets by decreasing density-aware priority.
    Density(KernelShape),
}

impl FromStr for Assigner {
    type Err = FiberplanError;

    fn from_str(name: &str) -> Result<Self, FiberplanError> {
        match name {
            "naive" => Ok(Assigner::Naive),
            "draining" => Ok(Assigner::Draining),
            "new" => Ok(Assigner::Density(KernelShape::default())),
            other => Err(FiberplanError::UnknownAssigner(other.to_string())),
        }
    }
}

impl Assigner {
    /// Assigns targets from `tgt` (focal-plane millimeters) to fibers.
    pub fn assign(&self, tgt: &[Target]) -> AssignmentResult {
        if tgt.is_empty() {
            return AssignmentResult::default();
        }
        let raster = target_raster(tgt);
        let mut inc = Incidence::build(tgt, &raster);
        match self {
            Assigner::Naive => assign_naive(tgt, &raster, &mut inc),
            Assigner::Draining => assign_draining(tgt, &raster, &mut inc),
            Assigner::Density(kernel) => assign_density(tgt, &raster, &mut inc, *kernel),
        }
    }
}

fn target_raster(tgt: &[Target]) -> FpRaster {
    FpRaster::new(
        tgt.iter().map(|t| t.pos).collect(),
        RASTER_BINS,
        RASTER_BINS,
    )
}

/// Target in the fiber's candidate list with the numerically smallest
/// priority value; the first position wins ties.
fn most_urgent_in_fiber(fiber: usize, tgt: &[Target], inc: &Incidence) -> usize {
    let list = inc.fiber_targets(fiber);
    assert!(!list.is_empty(), "searching in empty fiber");
    let mut best = list[0];
    for &t in &list[1..] {
        if tgt[t].pri < tgt[best].pri {
            best = t;
        }
    }
    best
}

fn assign_naive(tgt: &[Target], raster: &FpRaster, inc: &mut Incidence) -> AssignmentResult {
    let mut res = AssignmentResult::default();
    for fiber in 0..inc.nfibers() {
        if inc.fiber_targets(fiber).is_empty() {
            continue;
        }
        let itgt = most_urgent_in_fiber(fiber, tgt, inc);
        res.push(itgt, fiber);
        inc.cleanup(tgt, raster, fiber, itgt);
    }
    res
}

fn assign_draining(tgt: &[Target], raster: &FpRaster, inc: &mut Incidence) -> AssignmentResult {
    let mut res = AssignmentResult::default();
    loop {
        let fiber = (0..inc.nfibers())
            .filter(|&f| !inc.fiber_targets(f).is_empty())
            .min_by_key(|&f| inc.fiber_targets(f).len());
        let Some(fiber) = fiber else {
            break; // assignment done
        };
        let itgt = most_urgent_in_fiber(fiber, tgt, inc);
        res.push(itgt, fiber);
        inc.cleanup(tgt, raster, fiber, itgt);
    }
    res
}

/// Heap entry of the density-aware strategy: a smaller priority value is
/// more urgent; on equal priority the larger proximity wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PqEntry {
    prox: NotNan<f64>,
    pri: i32,
}

impl PqEntry {
    fn retired() -> Self {
        PqEntry {
            prox: NotNan::default(),
            pri: PRI_SENTINEL,
        }
    }
}

impl Ord for PqEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .pri
            .cmp(&self.pri)
            .then_with(|| self.prox.cmp(&other.prox))
    }
}

impl PartialOrd for PqEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn pair_weight(tgt: &[Target], i: usize, j: usize, kernel: KernelShape) -> NotNan<f64> {
    let w = tgt[i].time * tgt[j].time * kernel.eval(dist_sq(&tgt[i].pos, &tgt[j].pos));
    NotNan::new(w).expect("proximity weight is NaN")
}

/// Initial density queue: every observable target starts with the
/// kernel-weighted sum of time products over its neighborhood.
fn build_density_queue(
    tgt: &[Target],
    inc: &Incidence,
    raster: &FpRaster,
    kernel: KernelShape,
) -> PQueue<PqEntry> {
    let mut pri = vec![PqEntry::default(); tgt.len()];
    for i in 0..tgt.len() {
        if inc.target_fibers(i).is_empty() {
            continue;
        }
        for j in raster.query(&tgt[i].pos, R_KERNEL) {
            if i == j {
                pri[i].prox += pair_weight(tgt, i, i, kernel);
            }
            if i < j {
                let w = pair_weight(tgt, i, j, kernel);
                pri[i].prox += w;
                pri[j].prox += w;
            }
        }
    }
    for (entry, t) in pri.iter_mut().zip(tgt) {
        entry.pri = t.pri;
    }
    PQueue::from_priorities(pri)
}

/// After `itgt` was assigned, take its contribution out of the proximity
/// of every neighbor still in play.
fn relax_neighborhood(
    tgt: &[Target],
    inc: &Incidence,
    raster: &FpRaster,
    itgt: usize,
    kernel: KernelShape,
    pri: &mut PQueue<PqEntry>,
) {
    for j in raster.query(&tgt[itgt].pos, R_KERNEL) {
        let entry = *pri.priority(j);
        if !inc.target_fibers(j).is_empty() || entry.prox.into_inner() != 0.0 {
            let mut next = entry;
            next.prox -= pair_weight(tgt, itgt, j, kernel);
            pri.set_priority(next, j);
        }
    }
}

fn assign_density(
    tgt: &[Target],
    raster: &FpRaster,
    inc: &mut Incidence,
    kernel: KernelShape,
) -> AssignmentResult {
    let mut res = AssignmentResult::default();
    let mut pri = build_density_queue(tgt, inc, raster, kernel);
    loop {
        if pri.top_priority().pri == PRI_SENTINEL {
            break;
        }
        let itgt = pri.top();
        if inc.target_fibers(itgt).is_empty() {
            pri.set_priority(PqEntry::retired(), itgt);
            continue;
        }
        let fibers = inc.target_fibers(itgt);
        let mut fiber = fibers[0];
        let mut min_load = inc.fiber_targets(fiber).len();
        for &f in &fibers[1..] {
            let load = inc.fiber_targets(f).len();
            if load < min_load {
                fiber = f;
                min_load = load;
            }
        }
        res.push(itgt, fiber);
        inc.cleanup(tgt, raster, fiber, itgt);
        relax_neighborhood(tgt, inc, raster, itgt, kernel, &mut pri);
    }
    res
}
