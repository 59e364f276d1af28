//! Runs the bundled metro demo end to end through the public API.
use geolens::analysis::{Cancellation, perform_full_analysis};
use geolens::input::load_analysis;
use std::path::{Path, PathBuf};

/// Path to the metro demo shipped with the binary
fn metro_dir() -> PathBuf {
    Path::new(file!())
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
        .join("metro")
}

#[test]
fn test_metro_demo() {
    let (customers, service_points, analysis_file) = load_analysis(&metro_dir()).unwrap();
    assert_eq!(customers.len(), 20);
    assert_eq!(service_points.len(), 4);
    assert_eq!(analysis_file.options.cluster_count, 4);
    assert_eq!(analysis_file.config.max_proposed_sites, 2);

    let report = perform_full_analysis(
        &customers,
        &service_points,
        &analysis_file.options,
        &analysis_file.config,
        &Cancellation::new(),
    )
    .unwrap();

    // Every demo customer has parseable coordinates
    assert_eq!(report.excluded_customers, 0);
    assert_eq!(report.excluded_service_points, 0);

    // Four well-separated neighbourhoods plus a fifth small group; k=4 partitions
    // all twenty customers with no empty cluster
    assert_eq!(report.effective_cluster_count, 4);
    let total: usize = report.clusters.iter().map(|c| c.customer_count).sum();
    assert_eq!(total, 20);
    assert_eq!(report.forecasts.len(), 4);

    // The bazaar and Valiasr groups sit on top of service points; the airport and
    // southern groups are well beyond the 3 km radius
    assert!(report.coverage.coverage_percentage > 0.0);
    assert!(report.coverage.coverage_percentage < 100.0);
    assert!(!report.coverage.uncovered_customers.is_empty());
    assert!(report.coverage.proposed_sites.len() <= 2);
    assert!(!report.coverage.proposed_sites.is_empty());

    // Suggestions are capped and ordered best-first
    assert!(report.suggestions.len() <= 3);
    for pair in report.suggestions.windows(2) {
        assert!(pair[0].expansion_score >= pair[1].expansion_score);
    }
}

#[test]
fn test_metro_demo_rerun_is_identical() {
    let (customers, service_points, analysis_file) = load_analysis(&metro_dir()).unwrap();
    let run = || {
        perform_full_analysis(
            &customers,
            &service_points,
            &analysis_file.options,
            &analysis_file.config,
            &Cancellation::new(),
        )
        .unwrap()
    };
    assert_eq!(run(), run());
}
