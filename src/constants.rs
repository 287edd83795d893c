/// Number of cobras: three fields of fourteen modules of fifty-seven.
pub const NFIBER: usize = 3 * 57 * 14;

pub const RMAX: f64 = 4.75; // maximum radius of a cobra patrol area (mm)
pub const R_KERNEL: f64 = 4.75; // radius of the density kernel (mm)
pub const DOTDIST: f64 = 1.375; // radius of the dot blocking area (mm)
pub const COLLDIST: f64 = 2.0; // minimum distance between assigned targets (mm)

/// Priority value marking a heap entry that is out of consideration.
pub const PRI_SENTINEL: i32 = 1 << 30;

/// Targets projecting farther than this from the focal-plane origin are
/// outside the instrument field.
pub const FIELD_RADIUS_MM: f64 = 190.0;

/// Bin count per axis for the spatial rasters.
pub const RASTER_BINS: usize = 100;

pub const TIME_EPS: f64 = 1e-7; // residual integration time below this counts as done

// type def
pub type Degree = f64;
pub type Radian = f64;
pub type Millimeter = f64;
pub type Seconds = f64;
