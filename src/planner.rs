//! The outer planning loop: repeatedly find the most productive exposure,
//! book the observed time, strip finished targets and report progress.

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use itertools::Itertools;
use nalgebra::Vector3;

use crate::assigner::Assigner;
use crate::catalog::Target;
use crate::constants::{
    Degree, Millimeter, Radian, Seconds, FIELD_RADIUS_MM, NFIBER, R_KERNEL, TIME_EPS,
};
use crate::exposure::{optimal_exposure, DitherGrid};
use crate::fiberplan_errors::FiberplanError;
use crate::focal_plane::{project_to_focal_plane, unit_to_radec};

/// Tunable parameters of the planning loop. Angles are radians
/// internally; the builder accepts degrees, like the command line.
#[derive(Debug, Clone)]
pub struct PlannerParams {
    pub fract: f64,
    pub posang: Radian,
    pub dposang: Radian,
    pub nposang: usize,
    pub dptg: Radian,
    pub nptg: usize,
    pub elevation: Degree,
    pub safety: Millimeter,
}

impl PlannerParams {
    pub fn builder() -> PlannerParamsBuilder {
        PlannerParamsBuilder::default()
    }
}

/// Builder for [`PlannerParams`] with the standard survey defaults.
#[derive(Debug, Clone)]
pub struct PlannerParamsBuilder {
    fract: Option<f64>,
    posang: Degree,
    dposang: Degree,
    nposang: usize,
    dptg: Degree,
    nptg: usize,
    elevation: Degree,
    safety: Millimeter,
}

impl Default for PlannerParamsBuilder {
    fn default() -> Self {
        PlannerParamsBuilder {
            fract: None,
            posang: 0.0,
            dposang: 4.0,
            nposang: 5,
            // should roughly correspond to 4 mm in the focal plane
            dptg: 4.0 / 320.0,
            nptg: 5,
            elevation: 0.0,
            safety: R_KERNEL,
        }
    }
}

impl PlannerParamsBuilder {
    /// Coverage fraction at which the survey stops. Required.
    pub fn fract(mut self, fract: f64) -> Self {
        self.fract = Some(fract);
        self
    }

    /// Nominal position angle, degrees.
    pub fn posang(mut self, deg: Degree) -> Self {
        self.posang = deg;
        self
    }

    /// Position-angle dither half-width, degrees.
    pub fn dposang(mut self, deg: Degree) -> Self {
        self.dposang = deg;
        self
    }

    /// Position-angle grid count.
    pub fn nposang(mut self, n: usize) -> Self {
        self.nposang = n;
        self
    }

    /// Pointing dither half-width, degrees.
    pub fn dptg(mut self, deg: Degree) -> Self {
        self.dptg = deg;
        self
    }

    /// Pointing grid count per axis.
    pub fn nptg(mut self, n: usize) -> Self {
        self.nptg = n;
        self
    }

    /// Telescope elevation, degrees. Accepted but not yet used by the
    /// projection.
    pub fn elevation(mut self, deg: Degree) -> Self {
        self.elevation = deg;
        self
    }

    /// Extra margin around the patrol radius for the observability
    /// filter, millimeters.
    pub fn safety(mut self, mm: Millimeter) -> Self {
        self.safety = mm;
        self
    }

    pub fn build(self) -> Result<PlannerParams, FiberplanError> {
        let fract = self.fract.ok_or_else(|| {
            FiberplanError::InvalidParameter("fract is required".to_string())
        })?;
        if !fract.is_finite() || fract <= 0.0 {
            return Err(FiberplanError::InvalidParameter(format!(
                "fract must be a positive fraction, got {fract}"
            )));
        }
        if self.nptg == 0 || self.nposang == 0 {
            return Err(FiberplanError::InvalidParameter(
                "dither grid counts must be at least 1".to_string(),
            ));
        }
        if self.dptg < 0.0 || self.dposang < 0.0 {
            return Err(FiberplanError::InvalidParameter(
                "dither half-widths must be non-negative".to_string(),
            ));
        }
        Ok(PlannerParams {
            fract,
            posang: self.posang.to_radians(),
            dposang: self.dposang.to_radians(),
            nposang: self.nposang,
            dptg: self.dptg.to_radians(),
            nptg: self.nptg,
            elevation: self.elevation,
            safety: self.safety,
        })
    }
}

/// One assigned target as it appears in the per-exposure report.
#[derive(Debug, Clone)]
pub struct AssignedTarget {
    pub id: i32,
    /// Zero-based cobra id; reported one-based.
    pub fiber: usize,
    pub ra: Degree,
    pub dec: Degree,
}

/// One planned exposure with its pointing, orientation and duration.
#[derive(Debug, Clone)]
pub struct ExposureRecord {
    pub ra: Degree,
    pub dec: Degree,
    pub posang: Degree,
    pub duration: Seconds,
    pub targets: Vec<AssignedTarget>,
}

/// Outcome of a planning run.
#[derive(Debug, Clone, Default)]
pub struct PlanSummary {
    pub exposures: Vec<ExposureRecord>,
    /// Total requested target time at the start of the run.
    pub total_time: Seconds,
    /// Accumulated target·seconds observed.
    pub observed: f64,
    /// Total exposure time spent.
    pub exposure_time: Seconds,
}

impl PlanSummary {
    pub fn count(&self) -> usize {
        self.exposures.len()
    }
}

/// Plans a full observation sequence for `tgt`.
///
/// Targets projecting outside the instrument field under the nominal
/// pointing are dropped up front; the loop then alternates optimal
/// exposures and residual-time stripping until the coverage fraction is
/// reached or no fiber can be assigned anymore.
///
/// Arguments
/// ---------
/// * `tgt`: catalog targets, coordinates RA/DEC in degrees
/// * `center0`: nominal pointing
/// * `ass`: assignment strategy
/// * `params`: planning parameters
/// * `report`: optional per-exposure report file
pub fn plan_survey(
    mut tgt: Vec<Target>,
    center0: &Vector3<f64>,
    ass: &Assigner,
    params: &PlannerParams,
    report: Option<&Utf8Path>,
) -> Result<PlanSummary, FiberplanError> {
    // keep only targets inside the instrument field under the nominal
    // pointing
    let mut probe = tgt.clone();
    project_to_focal_plane(&mut probe, center0, params.posang, params.elevation);
    let mut inside = probe
        .iter()
        .map(|t| t.pos.norm_squared() < FIELD_RADIUS_MM * FIELD_RADIUS_MM);
    tgt.retain(|_| inside.next().unwrap());
    drop(inside);

    let mut out = match report {
        Some(path) => Some(BufWriter::new(File::create(path).map_err(|source| {
            FiberplanError::ReportOpen {
                path: path.to_owned(),
                source,
            }
        })?)),
        None => None,
    };
    run_exposures(tgt, center0, ass, params, &mut out)
}

fn run_exposures(
    mut tgt: Vec<Target>,
    center0: &Vector3<f64>,
    ass: &Assigner,
    params: &PlannerParams,
    out: &mut Option<BufWriter<File>>,
) -> Result<PlanSummary, FiberplanError> {
    let ttime: Seconds = tgt.iter().map(|t| t.time).sum();
    let grid = DitherGrid {
        dptg: params.dptg,
        nptg: params.nptg,
        dposang: params.dposang,
        nposang: params.nposang,
    };
    let mut summary = PlanSummary {
        total_time: ttime,
        ..PlanSummary::default()
    };
    println!("\nTotal observation time: {ttime}");
    println!("\ntile # | fiber allocation fraction | total observation fraction | time");
    loop {
        let exp = optimal_exposure(
            &tgt,
            center0,
            params.posang,
            params.elevation,
            params.safety,
            &grid,
            ass,
        );
        if exp.result.is_empty() {
            break; // stop if no more fibers could be assigned
        }
        let time = exp
            .result
            .tid
            .iter()
            .map(|&i| tgt[i].time)
            .fold(f64::INFINITY, f64::min);
        summary.exposure_time += time;
        summary.observed += exp.result.len() as f64 * time;
        let (ra, dec) = unit_to_radec(&exp.center);
        let posang = exp.posang.to_degrees();
        let record = ExposureRecord {
            ra,
            dec,
            posang,
            duration: time,
            targets: exp
                .result
                .tid
                .iter()
                .zip_eq(&exp.result.fid)
                .map(|(&i, &fiber)| AssignedTarget {
                    id: tgt[i].id,
                    fiber,
                    ra: tgt[i].pos.x,
                    dec: tgt[i].pos.y,
                })
                .collect(),
        };
        let cnt = summary.count();
        if let Some(out) = out.as_mut() {
            write_exposure(out, cnt, &record)?;
            out.flush()?;
        }
        println!(
            "{:6}{:18.5}{:28.5}{:20.0}",
            cnt,
            exp.result.len() as f64 / NFIBER as f64,
            summary.observed / ttime,
            summary.exposure_time
        );
        println!("{:12.8} {:12.8} {:12.8}", ra, dec, posang);
        let assigned = exp.result.tid;
        summary.exposures.push(record);
        if summary.observed / ttime > params.fract {
            break;
        }
        strip(&mut tgt, &assigned, time);
    }
    Ok(summary)
}

/// Writes one exposure block of the report. Fiber ids are one-based in
/// the report, zero-based everywhere else.
fn write_exposure(
    out: &mut impl Write,
    cnt: usize,
    rec: &ExposureRecord,
) -> Result<(), FiberplanError> {
    writeln!(
        out,
        "Exposure {}: duration {}s, RA: {}, DEC {} PA: {}",
        cnt, rec.duration, rec.ra, rec.dec, rec.posang
    )?;
    writeln!(out, "  Target     Fiber        RA       DEC")?;
    for t in &rec.targets {
        writeln!(
            out,
            "{:8}{:10}{:10.5}{:10.5}",
            t.id,
            t.fiber + 1,
            t.ra,
            t.dec
        )?;
    }
    Ok(())
}

/// Subtracts the exposure duration from every assigned target and drops
/// the targets that are done.
fn strip(tgt: &mut Vec<Target>, assigned: &[usize], time: Seconds) {
    let mut observed = vec![false; tgt.len()];
    for &i in assigned {
        observed[i] = true;
    }
    let mut kept = Vec::with_capacity(tgt.len());
    for (i, mut t) in tgt.drain(..).enumerate() {
        if !observed[i] {
            kept.push(t);
        } else if t.time > time + TIME_EPS {
            t.time -= time;
            kept.push(t);
        }
    }
    *tgt = kept;
}
