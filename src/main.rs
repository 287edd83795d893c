use camino::Utf8PathBuf;
use clap::Parser;

use fiberplan::assigner::{Assigner, KernelShape};
use fiberplan::catalog::{catalog_center, read_targets};
use fiberplan::fiberplan_errors::FiberplanError;
use fiberplan::focal_plane::radec_to_unit;
use fiberplan::planner::{plan_survey, PlannerParams};

#[derive(Parser)]
#[command(name = "fiberplan")]
#[command(about = "Plan telescope exposures assigning cobra fibers to catalog targets")]
#[command(version)]
struct Cli {
    /// Assignment strategy (naive | draining | new).
    #[arg(long)]
    assigner: Assigner,

    /// Target catalog path.
    #[arg(long)]
    input: Utf8PathBuf,

    /// Per-exposure report path (omit to skip the report).
    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Stop once this fraction of the requested target time is observed.
    #[arg(long)]
    fract: f64,

    /// Nominal pointing RA in degrees (default: derived from the catalog).
    #[arg(long)]
    ra: Option<f64>,

    /// Nominal pointing DEC in degrees (default: derived from the catalog).
    #[arg(long)]
    dec: Option<f64>,

    /// Nominal position angle in degrees.
    #[arg(long, default_value_t = 0.0)]
    posang: f64,

    /// Position-angle dither half-width in degrees.
    #[arg(long, default_value_t = 4.0)]
    dposang: f64,

    /// Position-angle grid count.
    #[arg(long, default_value_t = 5)]
    nposang: usize,

    /// Pointing dither half-width in degrees (~4 mm in the focal plane).
    #[arg(long, default_value_t = 4.0 / 320.0)]
    dptg: f64,

    /// Pointing grid count per axis.
    #[arg(long, default_value_t = 5)]
    nptg: usize,

    /// Density kernel for the 'new' assigner
    /// (parabolic | linear | gaussian).
    #[arg(long, default_value = "parabolic")]
    kernel: KernelShape,
}

fn run() -> Result<(), FiberplanError> {
    let cli = Cli::parse();

    let assigner = match cli.assigner {
        Assigner::Density(_) => Assigner::Density(cli.kernel),
        other => other,
    };

    let tgt = read_targets(&cli.input)?;
    let center = match (cli.ra, cli.dec) {
        (Some(ra), Some(dec)) => radec_to_unit(ra, dec),
        (None, None) => {
            if tgt.is_empty() {
                return Err(FiberplanError::InvalidParameter(
                    "cannot derive a pointing from an empty catalog; pass --ra and --dec"
                        .to_string(),
                ));
            }
            catalog_center(&tgt)
        }
        _ => {
            return Err(FiberplanError::InvalidParameter(
                "--ra and --dec must be given together".to_string(),
            ))
        }
    };

    let params = PlannerParams::builder()
        .fract(cli.fract)
        .posang(cli.posang)
        .dposang(cli.dposang)
        .nposang(cli.nposang)
        .dptg(cli.dptg)
        .nptg(cli.nptg)
        .build()?;

    plan_survey(tgt, &center, &assigner, &params, cli.output.as_deref())?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("fiberplan: {err}");
        std::process::exit(1);
    }
}
