#![allow(dead_code)]

use fiberplan::catalog::Target;
use fiberplan::focal_plane::{fiber_position, PlanePos};

/// Target at an absolute focal-plane position (millimeters).
pub fn target_at(pos: PlanePos, id: i32, time: f64, pri: i32) -> Target {
    Target::new(pos.x, pos.y, time, id, pri)
}

/// Target offset from a cobra center, in millimeters.
pub fn near_fiber(fiber: usize, dx: f64, dy: f64, id: i32, time: f64, pri: i32) -> Target {
    target_at(fiber_position(fiber) + PlanePos::new(dx, dy), id, time, pri)
}

/// RA/DEC in degrees that project close to the requested focal-plane
/// position for a pointing at RA 0, DEC 0 with zero position angle. The
/// linear plate scale is ~320 mm per degree, x against DEC and y against
/// RA; the neglected distortion terms stay well under the patrol slack
/// for positions within ~100 mm of the axis.
pub fn radec_for_mm(pos: PlanePos) -> (f64, f64) {
    (-pos.y / 320.0, -pos.x / 320.0)
}

/// Catalog target that lands close to `pos` under the nominal pointing
/// used by the planner tests.
pub fn sky_target_at(pos: PlanePos, id: i32, time: f64, pri: i32) -> Target {
    let (ra, dec) = radec_for_mm(pos);
    Target::new(ra, dec, time, id, pri)
}
