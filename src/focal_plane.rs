//! Focal-plane geometry: cobra and dot layout, and the transformation of
//! celestial target coordinates into focal-plane millimeters.

use nalgebra::{Vector2, Vector3};

use crate::catalog::Target;
use crate::constants::{Degree, Radian, NFIBER};

/// Position in the focal plane, millimeters.
pub type PlanePos = Vector2<f64>;

/// Squared Euclidean distance between two planar positions.
#[inline]
pub fn dist_sq(a: &PlanePos, b: &PlanePos) -> f64 {
    (a - b).norm_squared()
}

/// In-place rotation by the angle with sine `sa` and cosine `ca`.
fn rotate(pos: &mut PlanePos, sa: f64, ca: f64) {
    let t = *pos;
    pos.x = ca * t.x - sa * t.y;
    pos.y = sa * t.x + ca * t.y;
}

/// Central patrol position of a cobra, given its zero-based fiber id.
///
/// The base lattice is laid out for the first field; the second and third
/// fields are the same lattice rotated by ±120°.
pub fn fiber_position(id: usize) -> PlanePos {
    debug_assert!(id < NFIBER, "fiber id out of range");
    let field = id / (57 * 14);
    let rest = id % (57 * 14);
    let module = rest / 57;
    let cobra = rest % 57;
    let vspace = 0.75_f64.sqrt(); // cos(30 deg)
    let mut res = PlanePos::new(
        -vspace * (1.0 + 2.0 * module as f64 + (cobra & 1) as f64),
        0.5 + module as f64 - 0.5 * cobra as f64,
    );
    if field == 1 {
        rotate(&mut res, -vspace, -0.5);
    }
    if field == 2 {
        rotate(&mut res, vspace, -0.5);
    }
    res * 8.0
}

/// Center of the blocking dot belonging to a fiber.
pub fn dot_position(id: usize) -> PlanePos {
    let mut res = fiber_position(id);
    res.y += 1.19;
    res
}

/// Unit vector on the celestial sphere from RA/DEC in degrees.
pub fn radec_to_unit(ra: Degree, dec: Degree) -> Vector3<f64> {
    let theta = (90.0 - dec).to_radians();
    let phi = ra.to_radians();
    Vector3::new(
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    )
}

/// RA/DEC in degrees from a direction vector (not necessarily unit).
pub fn unit_to_radec(v: &Vector3<f64>) -> (Degree, Degree) {
    let theta = (v.z / v.norm()).acos();
    let phi = v.y.atan2(v.x);
    (phi.to_degrees(), 90.0 - theta.to_degrees())
}

// Radial distortion polynomial, c0 + c1*r^2 + c2*r^4, applied to the
// projected angles in degrees.
const DIST_A0: f64 = 0.0;
const DIST_A1: f64 = -3.2e2;
const DIST_A2: f64 = -1.37e1;
const DIST_A3: f64 = -7.45e0;

/// Converts target coordinates from RA/DEC in degrees to focal-plane
/// millimeters, in place, given a telescope pointing and orientation.
///
/// Arguments
/// ---------
/// * `tgt`: targets whose `pos` holds (RA, DEC) in degrees on entry and
///   focal-plane millimeters on return
/// * `los`: pointing direction (renormalized internally)
/// * `posang`: position angle of the focal plane, radians
/// * `_elevation`: telescope elevation, accepted but not yet used
pub fn project_to_focal_plane(
    tgt: &mut [Target],
    los: &Vector3<f64>,
    posang: Radian,
    _elevation: Degree,
) {
    let z = los.normalize();
    let sky = Vector3::new(0.0, 0.0, 1.0);
    let x = (sky - z * z.dot(&sky)).normalize();
    let y = z.cross(&x);
    let (spsi, cpsi) = posang.sin_cos();
    for t in tgt {
        let p = radec_to_unit(t.pos.x, t.pos.y);
        let xp = p - y * p.dot(&y);
        let yp = p - x * p.dot(&x);
        let mut pnew = PlanePos::new(
            xp.dot(&x).atan2(xp.dot(&z)).to_degrees(),
            yp.dot(&y).atan2(yp.dot(&z)).to_degrees(),
        );
        rotate(&mut pnew, spsi, cpsi);
        let rsq = pnew.norm_squared();
        t.pos.x = (DIST_A3 * rsq * rsq + DIST_A2 * rsq + DIST_A1) * pnew.x + DIST_A0;
        t.pos.y = (-DIST_A3 * rsq * rsq - DIST_A2 * rsq - DIST_A1) * pnew.y + DIST_A0;
    }
}
