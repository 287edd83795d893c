//! Evaluation of one telescope exposure: observability filtering, the
//! single-pointing evaluator and the dithered search for the pointing and
//! position angle that serve the most targets.

use nalgebra::Vector3;

use crate::assigner::{Assigner, AssignmentResult};
use crate::catalog::Target;
use crate::constants::{Degree, Millimeter, Radian, NFIBER, RASTER_BINS, RMAX};
use crate::focal_plane::{fiber_position, project_to_focal_plane};
use crate::raster::FpRaster;

/// Indices of targets close enough to some cobra patrol area to be worth
/// handing to an assigner. `safety` widens the acceptance ring so that
/// targets just outside a patrol disk still take part in density scoring.
pub fn select_observable(tgt: &[Target], safety: Millimeter) -> Vec<usize> {
    let fpos = (0..NFIBER).map(fiber_position).collect();
    let raster = FpRaster::new(fpos, RASTER_BINS, RASTER_BINS);
    (0..tgt.len())
        .filter(|&i| raster.any_in(&tgt[i].pos, RMAX + safety))
        .collect()
}

/// Runs the assigner for a single pointing and position angle.
///
/// The catalog is copied, projected onto the focal plane, restricted to
/// the observable region, assigned, and the resulting target indices are
/// rewritten back into the caller's frame.
pub fn single_exposure(
    tgt: &[Target],
    center: &Vector3<f64>,
    posang: Radian,
    elevation: Degree,
    safety: Millimeter,
    ass: &Assigner,
) -> AssignmentResult {
    let mut projected = tgt.to_vec();
    project_to_focal_plane(&mut projected, center, posang, elevation);
    let idx = select_observable(&projected, safety);
    let restricted: Vec<Target> = idx.iter().map(|&i| projected[i].clone()).collect();
    let mut res = ass.assign(&restricted);
    for t in &mut res.tid {
        *t = idx[*t];
    }
    res
}

/// One planned exposure: the pointing, the position angle and the chosen
/// assignments.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub center: Vector3<f64>,
    pub posang: Radian,
    pub result: AssignmentResult,
}

/// Dither grid of the optimal-exposure search.
#[derive(Debug, Clone, Copy)]
pub struct DitherGrid {
    pub dptg: Radian,
    pub nptg: usize,
    pub dposang: Radian,
    pub nposang: usize,
}

/// Scans the dither grid around `center0`/`posang0` and keeps the
/// candidate with the most assigned targets; the first candidate in scan
/// order wins ties.
pub fn optimal_exposure(
    tgt: &[Target],
    center0: &Vector3<f64>,
    posang0: Radian,
    elevation: Degree,
    safety: Millimeter,
    grid: &DitherGrid,
    ass: &Assigner,
) -> Exposure {
    let vcenter = *center0;
    let mut ex = vcenter.cross(&Vector3::z());
    if ex.norm_squared() == 0.0 {
        // center lies at a pole
        ex = Vector3::x();
    } else {
        ex.normalize_mut();
    }
    let ey = vcenter.cross(&ex);
    let mut best = Exposure {
        center: vcenter,
        posang: posang0,
        result: AssignmentResult::default(),
    };
    for idx in 0..grid.nptg {
        let dx = -grid.dptg + 2.0 * grid.dptg * (idx as f64 + 0.5) / grid.nptg as f64;
        for idy in 0..grid.nptg {
            let dy = -grid.dptg + 2.0 * grid.dptg * (idy as f64 + 0.5) / grid.nptg as f64;
            for ida in 0..grid.nposang {
                let da =
                    -grid.dposang + 2.0 * grid.dposang * (ida as f64 + 0.5) / grid.nposang as f64;
                let cand = (vcenter + ex * dx + ey * dy).normalize();
                let posang = posang0 + da;
                let result = single_exposure(tgt, &cand, posang, elevation, safety, ass);
                if result.len() > best.result.len() {
                    best = Exposure {
                        center: cand,
                        posang,
                        result,
                    };
                }
            }
        }
    }
    best
}
