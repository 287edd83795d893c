//! Target catalog: the observation target record, the ASCII catalog
//! reader and the derivation of a default pointing from the catalog.

use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use nalgebra::Vector3;
use thiserror::Error;

use crate::constants::Seconds;
use crate::fiberplan_errors::FiberplanError;
use crate::focal_plane::{radec_to_unit, unit_to_radec, PlanePos};

/// All relevant properties of one observation target.
///
/// `pos` holds (RA, DEC) in degrees as read from the catalog; after the
/// focal-plane projection it is reinterpreted as millimeters.
#[derive(Debug, Clone)]
pub struct Target {
    pub pos: PlanePos,
    pub time: Seconds,
    pub pri: i32,
    pub id: i32,
}

impl Target {
    pub fn new(x: f64, y: f64, time: Seconds, id: i32, pri: i32) -> Self {
        Target {
            pos: PlanePos::new(x, y),
            time,
            pri,
            id,
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseTargetError {
    #[error("expected 5 fields, found {0}")]
    WrongFieldCount(usize),
    #[error("identifier not starting with 'ID'")]
    BadIdPrefix,
    #[error("invalid identifier: {0}")]
    BadId(String),
    #[error("invalid number: {0}")]
    BadNumber(String),
    #[error("non-finite coordinate or time")]
    NotFinite,
    #[error("integration time must be positive")]
    NonPositiveTime,
}

fn parse_f64(tok: &str) -> Result<f64, ParseTargetError> {
    tok.parse::<f64>()
        .map_err(|_| ParseTargetError::BadNumber(tok.to_string()))
}

/// Parse one whitespace-delimited catalog record:
/// `ID<int> <ra> <dec> <time> <priority>`. Extra trailing fields are
/// ignored.
fn parse_target_line(line: &str) -> Result<Target, ParseTargetError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(ParseTargetError::WrongFieldCount(fields.len()));
    }
    let id_digits = fields[0]
        .strip_prefix("ID")
        .ok_or(ParseTargetError::BadIdPrefix)?;
    let id = id_digits
        .parse::<i32>()
        .map_err(|_| ParseTargetError::BadId(fields[0].to_string()))?;
    let x = parse_f64(fields[1])?;
    let y = parse_f64(fields[2])?;
    let time = parse_f64(fields[3])?;
    let pri = fields[4]
        .parse::<i32>()
        .map_err(|_| ParseTargetError::BadNumber(fields[4].to_string()))?;
    if !(x.is_finite() && y.is_finite() && time.is_finite()) {
        return Err(ParseTargetError::NotFinite);
    }
    if time <= 0.0 {
        return Err(ParseTargetError::NonPositiveTime);
    }
    Ok(Target::new(x, y, time, id, pri))
}

/// Reads targets from the ASCII catalog at `path`.
///
/// Blank lines and content following `#` are ignored; a trailing carriage
/// return is stripped. Malformed records are reported on stderr with
/// their line number and skipped.
///
/// Arguments
/// ---------
/// * `path`: catalog file, one record per line
///
/// Return
/// ------
/// * the well-formed targets, coordinates still RA/DEC in degrees
pub fn read_targets(path: &Utf8Path) -> Result<Vec<Target>, FiberplanError> {
    let file = File::open(path).map_err(|source| FiberplanError::CatalogOpen {
        path: path.to_owned(),
        source,
    })?;
    let mut res = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        let line = match line.find('#') {
            Some(hash) => &line[..hash],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_target_line(line) {
            Ok(target) => res.push(target),
            Err(err) => eprintln!(
                "Warning: unrecognized format in '{}', line {} ({}):\n{}",
                path,
                lineno + 1,
                err,
                line
            ),
        }
    }
    Ok(res)
}

/// Center of a small circle on the sky enclosing all catalog targets.
///
/// Used to find a telescope pointing that hits the given target list when
/// the user supplies none: the normalized centroid of the target
/// directions is pulled toward the angularly farthest target until the
/// enclosing circle stops shrinking.
pub fn catalog_center(tgt: &[Target]) -> Vector3<f64> {
    assert!(!tgt.is_empty(), "cannot derive a pointing from an empty catalog");
    let dirs: Vec<Vector3<f64>> = tgt
        .iter()
        .map(|t| radec_to_unit(t.pos.x, t.pos.y))
        .collect();
    let mut center: Vector3<f64> = dirs.iter().sum();
    if center.norm() < 1e-12 {
        center = dirs[0];
    }
    center.normalize_mut();
    for pass in 0..100 {
        let far = dirs
            .iter()
            .copied()
            .min_by(|a, b| a.dot(&center).total_cmp(&b.dot(&center)))
            .unwrap();
        let step = 1.0 / (pass + 2) as f64;
        let next = (center * (1.0 - step) + far * step).normalize();
        if (next - center).norm() < 1e-12 {
            break;
        }
        center = next;
    }
    let (ra, dec) = unit_to_radec(&center);
    println!("center of data set: RA {}, DEC {}", ra, dec);
    center
}
