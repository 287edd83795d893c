mod common;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use common::sky_target_at;
use fiberplan::assigner::Assigner;
use fiberplan::catalog::Target;
use fiberplan::focal_plane::{radec_to_unit, PlanePos};
use fiberplan::planner::{plan_survey, PlannerParams};

fn nominal_center() -> nalgebra::Vector3<f64> {
    radec_to_unit(0.0, 0.0)
}

fn scratch_path(name: &str) -> Utf8PathBuf {
    let dir = std::env::temp_dir().join("fiberplan_planner_test");
    std::fs::create_dir_all(&dir).unwrap();
    Utf8PathBuf::from_path_buf(dir.join(name)).unwrap()
}

#[test]
fn test_empty_catalog_plans_nothing() {
    let report = scratch_path("empty_report.txt");
    let params = PlannerParams::builder().fract(0.9).build().unwrap();
    let summary = plan_survey(
        Vec::new(),
        &nominal_center(),
        &Assigner::Naive,
        &params,
        Some(Utf8Path::new(&report)),
    )
    .unwrap();
    assert_eq!(summary.count(), 0);
    assert_eq!(summary.observed, 0.0);
    assert_eq!(std::fs::read_to_string(&report).unwrap(), "");
    std::fs::remove_file(&report).ok();
}

#[test]
fn test_single_target_single_exposure() {
    // a target on the pointing axis is reachable only after the dither
    // search walks the grid toward a patrol area
    let report = scratch_path("single_report.txt");
    let tgt = vec![Target::new(0.0, 0.0, 10.0, 7, 1)];
    let params = PlannerParams::builder().fract(0.9).build().unwrap();
    let summary = plan_survey(
        tgt,
        &nominal_center(),
        &Assigner::Naive,
        &params,
        Some(Utf8Path::new(&report)),
    )
    .unwrap();
    assert_eq!(summary.count(), 1);
    assert_relative_eq!(summary.exposures[0].duration, 10.0);
    assert_relative_eq!(summary.observed, 10.0);
    assert_relative_eq!(summary.total_time, 10.0);
    assert_eq!(summary.exposures[0].targets.len(), 1);
    assert_eq!(summary.exposures[0].targets[0].id, 7);

    let text = std::fs::read_to_string(&report).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("Exposure 0: duration 10s"));
    assert_eq!(lines.next().unwrap(), "  Target     Fiber        RA       DEC");
    let row = lines.next().unwrap();
    assert!(row.contains('7'));
    std::fs::remove_file(&report).ok();
}

#[test]
fn test_residual_time_spans_two_exposures() {
    // two isolated targets with unequal demands: the first exposure runs
    // for the shorter demand, the longer target keeps its residual
    let tgt = vec![
        sky_target_at(PlanePos::new(-6.93, 2.0), 1, 5.0, 1),
        sky_target_at(PlanePos::new(6.93, -2.0), 2, 7.0, 1),
    ];
    let params = PlannerParams::builder().fract(0.99).build().unwrap();
    let summary = plan_survey(tgt, &nominal_center(), &Assigner::Naive, &params, None).unwrap();
    assert_eq!(summary.count(), 2);
    assert_relative_eq!(summary.exposures[0].duration, 5.0);
    assert_relative_eq!(summary.exposures[1].duration, 2.0);
    assert_eq!(summary.exposures[0].targets.len(), 2);
    assert_eq!(summary.exposures[1].targets.len(), 1);
    assert_eq!(summary.exposures[1].targets[0].id, 2);
    assert_relative_eq!(summary.observed, 12.0);
    assert_relative_eq!(summary.exposure_time, 7.0);
}

#[test]
fn test_survey_runs_to_exhaustion() {
    // four targets on one cobra column, served in parallel until each
    // demand runs out; no dithering needed, so the grid is collapsed
    let times = [3.0, 6.0, 9.0, 12.0];
    let tgt: Vec<Target> = times
        .iter()
        .enumerate()
        .map(|(k, &time)| {
            let y = 4.0 - 16.0 * k as f64; // cobras 0, 4, 8, 12 of module 0
            sky_target_at(PlanePos::new(-6.93, y - 2.0), k as i32 + 1, time, 1)
        })
        .collect();
    let params = PlannerParams::builder()
        .fract(1.0)
        .nptg(1)
        .nposang(1)
        .build()
        .unwrap();
    let summary =
        plan_survey(tgt, &nominal_center(), &Assigner::Draining, &params, None).unwrap();
    assert_eq!(summary.count(), 4);
    let counts: Vec<usize> = summary.exposures.iter().map(|e| e.targets.len()).collect();
    assert_eq!(counts, vec![4, 3, 2, 1]);
    for exposure in &summary.exposures {
        assert_relative_eq!(exposure.duration, 3.0);
    }
    assert_relative_eq!(summary.observed, summary.total_time, epsilon = 1e-9);
    assert_relative_eq!(summary.observed, 30.0, epsilon = 1e-9);
    assert_relative_eq!(summary.exposure_time, 12.0, epsilon = 1e-9);
}

#[test]
fn test_out_of_field_targets_are_dropped() {
    // 100 degrees off axis is far outside the 190 mm acceptance circle
    let tgt = vec![Target::new(100.0, 30.0, 10.0, 1, 1)];
    let params = PlannerParams::builder().fract(0.9).build().unwrap();
    let summary = plan_survey(tgt, &nominal_center(), &Assigner::Naive, &params, None).unwrap();
    assert_eq!(summary.count(), 0);
    assert_eq!(summary.total_time, 0.0);
}
