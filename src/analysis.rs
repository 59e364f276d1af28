//! The orchestrator: runs the clustering, forecasting and coverage engines against
//! one immutable input snapshot and merges their results.
//!
//! The engines are pure functions of the snapshot plus explicit options, so a full
//! analysis owns no state, may run concurrently with other runs, and re-running with
//! unchanged inputs yields identical output. Forecasting and coverage read the same
//! snapshot and write disjoint outputs, so they run on separate threads joined at
//! the end.
use crate::clustering::{GeoCluster, cluster};
use crate::config::{AnalysisConfig, AnalysisOptions};
use crate::coverage::{CoverageReport, coverage};
use crate::customer::{CustomerLocation, CustomerRecord};
use crate::forecast::{ExpansionSuggestion, RegionalForecast, forecast};
use crate::service_point::{ServicePoint, ServicePointRecord};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// Why an analysis run ended without producing a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The options were rejected before any computation started
    InvalidOptions(String),
    /// The caller cancelled the run or its deadline passed; no partial results
    Cancelled,
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AnalysisError::InvalidOptions(message) => {
                write!(f, "Invalid analysis options: {message}")
            }
            AnalysisError::Cancelled => write!(f, "Analysis cancelled"),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Cooperative cancellation handle checked by the engines at iteration boundaries.
///
/// Cloning shares the underlying flag, so a caller can hand one clone to the run and
/// keep another to cancel it (e.g. when the dashboard re-triggers on a slider
/// change). An optional deadline cancels long runs nobody is waiting for.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A handle that never fires unless [`Cancellation::cancel`] is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that additionally fires once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation; takes effect at the next engine checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the flag is set or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Checkpoint used by the engines
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        Ok(())
    }
}

/// The combined result of a full analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Spatial clusters with business-potential scoring
    pub clusters: Vec<GeoCluster>,
    /// Per-region growth forecasts
    pub forecasts: Vec<RegionalForecast>,
    /// Top-ranked expansion candidates
    pub suggestions: Vec<ExpansionSuggestion>,
    /// Service coverage statistics and proposed sites
    pub coverage: CoverageReport,
    /// Customer records excluded for unparseable or out-of-range coordinates
    pub excluded_customers: usize,
    /// Service point records excluded for invalid coordinates
    pub excluded_service_points: usize,
    /// Cluster count actually used after clamping
    pub effective_cluster_count: usize,
}

/// Validate raw customer records, counting the excluded ones
pub fn filter_customers(records: &[CustomerRecord]) -> (Vec<CustomerLocation>, usize) {
    let eligible: Vec<_> = records.iter().filter_map(CustomerLocation::from_record).collect();
    let excluded = records.len() - eligible.len();
    if excluded > 0 {
        warn!("Excluded {excluded} of {} customer records with invalid coordinates", records.len());
    }

    (eligible, excluded)
}

/// Validate raw service point records, counting the excluded ones
pub fn filter_service_points(records: &[ServicePointRecord]) -> (Vec<ServicePoint>, usize) {
    let eligible: Vec<_> = records.iter().filter_map(ServicePoint::from_record).collect();
    let excluded = records.len() - eligible.len();
    if excluded > 0 {
        warn!(
            "Excluded {excluded} of {} service point records with invalid coordinates",
            records.len()
        );
    }

    (eligible, excluded)
}

/// Run the full geospatial analysis over one snapshot.
///
/// Validates and clamps the options, filters out records without usable coordinates
/// (counted, never an error), then runs clustering followed by forecasting and
/// coverage in parallel. Cancellation yields [`AnalysisError::Cancelled`] with no
/// partial results.
pub fn perform_full_analysis(
    customers: &[CustomerRecord],
    service_points: &[ServicePointRecord],
    options: &AnalysisOptions,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<AnalysisReport, AnalysisError> {
    options
        .validate()
        .map_err(|err| AnalysisError::InvalidOptions(err.to_string()))?;
    config
        .validate()
        .map_err(|err| AnalysisError::InvalidOptions(err.to_string()))?;

    // The optional grid resolution overrides how finely the uncovered population is
    // sub-clustered when proposing sites
    let mut config = config.clone();
    if let Some(grid_resolution) = options.grid_resolution {
        config.candidate_clusters = grid_resolution as usize;
    }

    let (eligible_customers, excluded_customers) = filter_customers(customers);
    let (eligible_points, excluded_service_points) = filter_service_points(service_points);
    info!(
        "Analysing {} customers against {} service points (radius {} km)",
        eligible_customers.len(),
        eligible_points.len(),
        options.coverage_radius_km
    );

    let clusters = cluster(
        &eligible_customers,
        options.cluster_count as usize,
        &config,
        cancel,
    )?;

    // Forecasting and coverage only read the snapshot and write disjoint outputs
    let (forecast_outcome, coverage_report) = thread::scope(|scope| {
        let forecast_handle = scope.spawn(|| {
            forecast(
                &clusters,
                &eligible_points,
                options.coverage_radius_km,
                &config,
                cancel,
            )
        });
        let coverage_handle = scope.spawn(|| {
            coverage(
                &eligible_customers,
                &eligible_points,
                options.coverage_radius_km,
                &config,
                cancel,
            )
        });

        (
            forecast_handle.join().expect("forecast worker panicked"),
            coverage_handle.join().expect("coverage worker panicked"),
        )
    });
    let forecast_outcome = forecast_outcome?;
    let coverage_report = coverage_report?;

    Ok(AnalysisReport {
        effective_cluster_count: clusters.len(),
        clusters,
        forecasts: forecast_outcome.forecasts,
        suggestions: forecast_outcome.suggestions,
        coverage: coverage_report,
        excluded_customers,
        excluded_service_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{analysis_options, config, customer_record, service_point_record};
    use rstest::rstest;

    #[rstest]
    fn test_invalid_options_rejected(config: AnalysisConfig) {
        let options = AnalysisOptions {
            cluster_count: 0,
            coverage_radius_km: 5.0,
            grid_resolution: None,
        };
        let result = perform_full_analysis(&[], &[], &options, &config, &Cancellation::new());
        assert!(matches!(result, Err(AnalysisError::InvalidOptions(_))));
    }

    #[rstest]
    fn test_negative_radius_rejected(config: AnalysisConfig) {
        let options = AnalysisOptions {
            cluster_count: 3,
            coverage_radius_km: -1.0,
            grid_resolution: None,
        };
        let result = perform_full_analysis(&[], &[], &options, &config, &Cancellation::new());
        assert!(matches!(result, Err(AnalysisError::InvalidOptions(_))));
    }

    #[rstest]
    fn test_empty_snapshot_has_defined_output(config: AnalysisConfig) {
        let report = perform_full_analysis(
            &[],
            &[],
            &analysis_options(),
            &config,
            &Cancellation::new(),
        )
        .unwrap();
        assert!(report.clusters.is_empty());
        assert!(report.forecasts.is_empty());
        assert_eq!(report.coverage.coverage_percentage, 100.0);
        assert_eq!(report.excluded_customers, 0);
    }

    /// Customers with unusable coordinates are counted out, not errored out
    #[rstest]
    fn test_all_customers_excluded(config: AnalysisConfig) {
        let records = vec![
            customer_record("C1", "", ""),
            customer_record("C2", "abc", "46.29"),
            customer_record("C3", "38.08", "999"),
        ];
        let report = perform_full_analysis(
            &records,
            &[service_point_record("B1", 38.08, 46.29)],
            &analysis_options(),
            &config,
            &Cancellation::new(),
        )
        .unwrap();
        assert_eq!(report.excluded_customers, 3);
        assert!(report.clusters.is_empty());
        assert!(report.forecasts.is_empty());
        assert_eq!(report.coverage.coverage_percentage, 100.0);
    }

    #[rstest]
    fn test_full_run_partition_and_determinism(config: AnalysisConfig) {
        let customers: Vec<_> = (0..12)
            .map(|i| {
                customer_record(
                    &format!("C{i}"),
                    &format!("{}", 38.0 + 0.04 * f64::from(i)),
                    "46.29",
                )
            })
            .collect();
        let service_points = vec![service_point_record("B1", 38.08, 46.29)];

        let first = perform_full_analysis(
            &customers,
            &service_points,
            &analysis_options(),
            &config,
            &Cancellation::new(),
        )
        .unwrap();
        let second = perform_full_analysis(
            &customers,
            &service_points,
            &analysis_options(),
            &config,
            &Cancellation::new(),
        )
        .unwrap();

        let total: usize = first.clusters.iter().map(|c| c.customer_count).sum();
        assert_eq!(total, customers.len());
        assert_eq!(first.forecasts.len(), first.clusters.len());
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_cancellation_before_start(config: AnalysisConfig) {
        let cancel = Cancellation::new();
        cancel.cancel();
        let result = perform_full_analysis(
            &[customer_record("C1", "38.08", "46.29")],
            &[],
            &analysis_options(),
            &config,
            &cancel,
        );
        assert_eq!(result.unwrap_err(), AnalysisError::Cancelled);
    }

    #[test]
    fn test_cancellation_deadline_in_past() {
        let cancel = Cancellation::with_deadline(Instant::now());
        assert!(cancel.is_cancelled());
        assert_eq!(cancel.check().unwrap_err(), AnalysisError::Cancelled);
    }
}
