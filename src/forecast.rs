//! The regional forecasting engine classifies growth trends per region and ranks
//! expansion candidates.
//!
//! Regions map one-to-one onto the clusters produced by [`crate::clustering`], with
//! the cluster centroid as the region's geographic anchor. All trend statistics are
//! computed against a reference date taken from the snapshot itself (the most recent
//! acquisition date), never the wall clock, so re-running an unchanged snapshot is
//! byte-identical.
use crate::analysis::{AnalysisError, Cancellation};
use crate::clustering::{GeoCluster, dominant_business_type};
use crate::config::AnalysisConfig;
use crate::geometry::{Coordinate, haversine_distance_km};
use crate::service_point::ServicePoint;
use chrono::{Datelike, Months, NaiveDate};
use itertools::Itertools;
use serde_string_enum::SerializeLabeledStringEnum;
use std::f64::consts::PI;

/// English month labels, indexed by month number minus one
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Deterministic classification of a region's growth rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum TrendClass {
    /// Growth above the surge threshold
    #[string = "surge"]
    Surge,
    /// Positive growth below the surge threshold
    #[string = "growing"]
    Growing,
    /// No change
    #[string = "stable"]
    Stable,
    /// Negative growth
    #[string = "declining"]
    Declining,
}

/// Growth projection and expansion scoring for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalForecast {
    /// Region ordinal; equals the underlying cluster ID
    pub region_id: u32,
    /// Human-readable region name
    pub region_name: String,
    /// Geographic anchor (the cluster centroid)
    pub center: Coordinate,
    /// Customers currently in the region
    pub current_customers: usize,
    /// Projected customer count one lookback window ahead
    pub predicted_customers: usize,
    /// Signed growth percentage over the lookback window
    pub growth_rate_pct: f64,
    /// Step-function classification of the growth rate
    pub trend: TrendClass,
    /// Composite expansion attractiveness, clamped to `[0, 100]`
    pub expansion_score: f64,
    /// Calendar months ranked best for expansion
    pub best_months: Vec<String>,
}

/// A top-ranked expansion candidate with explainable reasons
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionSuggestion {
    /// Region ordinal
    pub region_id: u32,
    /// Human-readable region name
    pub region_name: String,
    /// The region's expansion score
    pub expansion_score: f64,
    /// Signals that fed the score, strongest first
    pub reasons: Vec<String>,
}

/// Forecasts plus the ranked expansion suggestions derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutcome {
    /// One forecast per region
    pub forecasts: Vec<RegionalForecast>,
    /// Top regions by expansion score, with reasons
    pub suggestions: Vec<ExpansionSuggestion>,
}

/// The three signals feeding a region's expansion score, each normalised to `[0, 1]`
struct ScoreSignals {
    growth: f64,
    revenue_density: f64,
    coverage_gap: f64,
}

/// Forecast growth for each cluster-region and rank expansion candidates.
///
/// `service_points` and `radius_km` feed the coverage-gap signal of the expansion
/// score; they do not alter the growth statistics.
pub fn forecast(
    clusters: &[GeoCluster],
    service_points: &[ServicePoint],
    radius_km: f64,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<ForecastOutcome, AnalysisError> {
    if clusters.is_empty() {
        return Ok(ForecastOutcome {
            forecasts: Vec::new(),
            suggestions: Vec::new(),
        });
    }

    // Snapshot-derived "today"; keeps repeated runs identical
    let reference_date = clusters
        .iter()
        .flat_map(|cluster| cluster.customers.iter().map(|c| c.created_at))
        .max()
        .expect("clusters are non-empty");

    let population_months = month_counts(
        clusters
            .iter()
            .flat_map(|cluster| cluster.customers.iter()),
    );

    let revenue_densities = clusters
        .iter()
        .map(|cluster| revenue_density(cluster, config))
        .collect_vec();
    let max_revenue_density = revenue_densities.iter().copied().fold(0.0, f64::max);

    let mut forecasts = Vec::with_capacity(clusters.len());
    let mut signals = Vec::with_capacity(clusters.len());
    for (cluster, density) in clusters.iter().zip(&revenue_densities) {
        cancel.check()?;

        let growth_rate = growth_rate_pct(cluster, reference_date, config);
        let gap = coverage_gap(cluster, service_points, radius_km);
        let region_signals = ScoreSignals {
            growth: growth_rate.max(0.0) / config.max_growth_rate_pct,
            revenue_density: if max_revenue_density > 0.0 {
                density / max_revenue_density
            } else {
                0.0
            },
            coverage_gap: gap,
        };
        let score = expansion_score(&region_signals, config);

        let predicted =
            (cluster.customer_count as f64 * (1.0 + growth_rate / 100.0)).round().max(0.0);

        forecasts.push(RegionalForecast {
            region_id: cluster.id,
            region_name: region_name(cluster),
            center: cluster.centroid,
            current_customers: cluster.customer_count,
            predicted_customers: predicted as usize,
            growth_rate_pct: growth_rate,
            trend: classify_trend(growth_rate, config),
            expansion_score: score,
            best_months: best_months(cluster, &population_months, config),
        });
        signals.push(region_signals);
    }

    let suggestions = rank_suggestions(&forecasts, &signals, radius_km, config);

    Ok(ForecastOutcome {
        forecasts,
        suggestions,
    })
}

/// Region display name from the cluster ordinal and its dominant business type
fn region_name(cluster: &GeoCluster) -> String {
    match dominant_business_type(&cluster.customers) {
        Some(dominant) => format!("Region {} ({dominant})", cluster.id),
        None => format!("Region {}", cluster.id),
    }
}

/// Signed growth percentage from the acquisition history of a region.
///
/// Compares the customer count acquired in the most recent lookback window with the
/// window before it. A region with no activity in either window yields `0%`. The
/// result is clamped to `±max_growth_rate_pct`, and is monotonic in recent activity.
fn growth_rate_pct(cluster: &GeoCluster, reference_date: NaiveDate, config: &AnalysisConfig) -> f64 {
    let window = Months::new(config.lookback_months);
    let window_start = reference_date
        .checked_sub_months(window)
        .unwrap_or(NaiveDate::MIN);
    let previous_start = window_start
        .checked_sub_months(window)
        .unwrap_or(NaiveDate::MIN);

    let recent = cluster
        .customers
        .iter()
        .filter(|c| c.created_at > window_start && c.created_at <= reference_date)
        .count() as f64;
    let previous = cluster
        .customers
        .iter()
        .filter(|c| c.created_at > previous_start && c.created_at <= window_start)
        .count() as f64;

    let rate = (recent - previous) / previous.max(1.0) * 100.0;
    rate.clamp(-config.max_growth_rate_pct, config.max_growth_rate_pct)
}

/// Step function over the growth rate with configurable surge threshold
fn classify_trend(growth_rate_pct: f64, config: &AnalysisConfig) -> TrendClass {
    if growth_rate_pct > config.surge_threshold_pct {
        TrendClass::Surge
    } else if growth_rate_pct > 0.0 {
        TrendClass::Growing
    } else if growth_rate_pct < 0.0 {
        TrendClass::Declining
    } else {
        TrendClass::Stable
    }
}

/// Revenue per square kilometre within the cluster's bounding circle
fn revenue_density(cluster: &GeoCluster, config: &AnalysisConfig) -> f64 {
    let radius = cluster.radius_km.max(config.density_radius_floor_km);
    cluster.total_revenue / (PI * radius.powi(2))
}

/// Fraction of a region's customers outside `radius_km` of every service point.
///
/// With no service points every customer is unserved, so the gap is `1`.
fn coverage_gap(cluster: &GeoCluster, service_points: &[ServicePoint], radius_km: f64) -> f64 {
    if cluster.customers.is_empty() {
        return 0.0;
    }
    if service_points.is_empty() {
        return 1.0;
    }

    let uncovered = cluster
        .customers
        .iter()
        .filter(|customer| {
            service_points
                .iter()
                .all(|point| haversine_distance_km(customer.coordinate, point.coordinate) > radius_km)
        })
        .count();

    uncovered as f64 / cluster.customers.len() as f64
}

/// Weighted combination of the three signals, clamped to `[0, 100]`.
///
/// Monotonic in each signal: weights are non-negative and normalised by their sum.
fn expansion_score(signals: &ScoreSignals, config: &AnalysisConfig) -> f64 {
    let weight_sum = config.expansion_weight_growth
        + config.expansion_weight_revenue_density
        + config.expansion_weight_coverage_gap;
    let weighted = config.expansion_weight_growth * signals.growth
        + config.expansion_weight_revenue_density * signals.revenue_density
        + config.expansion_weight_coverage_gap * signals.coverage_gap;

    (100.0 * weighted / weight_sum).clamp(0.0, 100.0)
}

/// Month counts (January first) over an acquisition history
fn month_counts<'a>(customers: impl Iterator<Item = &'a crate::customer::CustomerLocation>) -> [usize; 12] {
    let mut counts = [0; 12];
    for customer in customers {
        counts[customer.created_at.month0() as usize] += 1;
    }
    counts
}

/// Top calendar months by acquisition count, calendar order breaking ties.
///
/// Regions with fewer samples than `min_seasonal_samples` fall back to the
/// population-wide counts.
fn best_months(
    cluster: &GeoCluster,
    population_months: &[usize; 12],
    config: &AnalysisConfig,
) -> Vec<String> {
    let own_counts = month_counts(cluster.customers.iter());
    let counts = if cluster.customers.len() >= config.min_seasonal_samples {
        own_counts
    } else {
        *population_months
    };

    (0..12)
        .filter(|month| counts[*month] > 0)
        .sorted_by_key(|month| (std::cmp::Reverse(counts[*month]), *month))
        .take(config.best_months_count)
        .map(|month| MONTH_NAMES[month].to_string())
        .collect()
}

/// Top regions by expansion score, each with ordered, explainable reasons
fn rank_suggestions(
    forecasts: &[RegionalForecast],
    signals: &[ScoreSignals],
    radius_km: f64,
    config: &AnalysisConfig,
) -> Vec<ExpansionSuggestion> {
    forecasts
        .iter()
        .zip(signals)
        .sorted_by(|(a, _), (b, _)| {
            b.expansion_score
                .total_cmp(&a.expansion_score)
                .then(a.region_id.cmp(&b.region_id))
        })
        .take(config.max_suggestions)
        .map(|(forecast, signals)| ExpansionSuggestion {
            region_id: forecast.region_id,
            region_name: forecast.region_name.clone(),
            expansion_score: forecast.expansion_score,
            reasons: reasons(forecast, signals, radius_km, config),
        })
        .collect()
}

/// The same signals that fed the score, phrased for the UI and ordered by their
/// weighted contribution
fn reasons(
    forecast: &RegionalForecast,
    signals: &ScoreSignals,
    radius_km: f64,
    config: &AnalysisConfig,
) -> Vec<String> {
    let contributions = [
        (
            config.expansion_weight_growth * signals.growth,
            format!(
                "{:.1}% customer growth over the last {} months",
                forecast.growth_rate_pct, config.lookback_months
            ),
        ),
        (
            config.expansion_weight_revenue_density * signals.revenue_density,
            format!(
                "revenue density at {:.0}% of the strongest region",
                signals.revenue_density * 100.0
            ),
        ),
        (
            config.expansion_weight_coverage_gap * signals.coverage_gap,
            format!(
                "{:.0}% of local customers are outside the {radius_km} km service radius",
                signals.coverage_gap * 100.0
            ),
        ),
    ];

    let ordered = contributions
        .into_iter()
        .filter(|(contribution, _)| *contribution > 0.0)
        .sorted_by(|(a, _), (b, _)| b.total_cmp(a))
        .map(|(_, reason)| reason)
        .collect_vec();

    if ordered.is_empty() {
        vec!["no strong expansion signals in this region".to_string()]
    } else {
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::cluster;
    use crate::fixture::{branch, config, customer};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// One single-region cluster from customers with the given acquisition dates
    fn region_from_dates(dates: &[&str], config: &AnalysisConfig) -> Vec<GeoCluster> {
        let customers: Vec<_> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| customer(&format!("C{i}"), 38.08, 46.29, 100.0, "restaurant", date))
            .collect();
        cluster(&customers, 1, config, &Cancellation::new()).unwrap()
    }

    #[rstest]
    fn test_forecast_empty(config: AnalysisConfig) {
        let outcome = forecast(&[], &[], 5.0, &config, &Cancellation::new()).unwrap();
        assert!(outcome.forecasts.is_empty());
        assert!(outcome.suggestions.is_empty());
    }

    /// A region with no acquisitions in either lookback window yields 0% growth.
    ///
    /// The reference date comes from the snapshot maximum, so the stale region sits
    /// alongside an active one.
    #[rstest]
    fn test_growth_rate_insufficient_history(config: AnalysisConfig) {
        let customers = vec![
            // Stale southern region
            customer("S1", 37.90, 46.30, 100.0, "grocery", "2020-01-01"),
            customer("S2", 37.90, 46.31, 100.0, "grocery", "2020-02-01"),
            // Active northern region anchoring the reference date
            customer("N1", 38.30, 46.30, 100.0, "restaurant", "2024-06-01"),
        ];
        let clusters = cluster(&customers, 2, &config, &Cancellation::new()).unwrap();
        let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();

        let stale = outcome
            .forecasts
            .iter()
            .find(|f| f.current_customers == 2)
            .unwrap();
        assert_approx_eq!(f64, stale.growth_rate_pct, 0.0);
        assert_eq!(stale.trend, TrendClass::Stable);
        assert_eq!(stale.predicted_customers, stale.current_customers);
    }

    #[rstest]
    fn test_growth_rate_monotonic_in_recent_activity(config: AnalysisConfig) {
        // Two in the previous window; increasingly many in the recent window
        let mut previous_rate = f64::NEG_INFINITY;
        for recent_count in 1..5 {
            let mut dates = vec!["2023-05-01", "2023-06-01"];
            let recent: Vec<String> = (0..recent_count).map(|i| format!("2024-0{}-15", i + 1)).collect();
            dates.extend(recent.iter().map(String::as_str));
            dates.push("2024-06-01");

            let clusters = region_from_dates(&dates, &config);
            let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();
            let rate = outcome.forecasts[0].growth_rate_pct;
            assert!(rate > previous_rate, "rate {rate} not above {previous_rate}");
            previous_rate = rate;
        }
    }

    #[rstest]
    fn test_growth_rate_decline(config: AnalysisConfig) {
        // Three in the previous window, one recent
        let clusters = region_from_dates(
            &["2022-07-01", "2022-08-01", "2022-09-01", "2024-06-01"],
            &config,
        );
        let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();
        let forecast = &outcome.forecasts[0];
        assert!(forecast.growth_rate_pct < 0.0);
        assert_eq!(forecast.trend, TrendClass::Declining);
    }

    #[rstest]
    #[case(20.0, TrendClass::Surge)]
    #[case(15.0, TrendClass::Growing)]
    #[case(5.0, TrendClass::Growing)]
    #[case(0.0, TrendClass::Stable)]
    #[case(-5.0, TrendClass::Declining)]
    fn test_classify_trend(
        config: AnalysisConfig,
        #[case] rate: f64,
        #[case] expected: TrendClass,
    ) {
        assert_eq!(classify_trend(rate, &config), expected);
    }

    #[rstest]
    fn test_expansion_score_clamped_and_monotonic(config: AnalysisConfig) {
        let low = ScoreSignals {
            growth: 0.0,
            revenue_density: 0.0,
            coverage_gap: 0.0,
        };
        let mid = ScoreSignals {
            growth: 0.5,
            revenue_density: 0.5,
            coverage_gap: 0.5,
        };
        let high = ScoreSignals {
            growth: 1.0,
            revenue_density: 1.0,
            coverage_gap: 1.0,
        };

        let scores = [
            expansion_score(&low, &config),
            expansion_score(&mid, &config),
            expansion_score(&high, &config),
        ];
        assert_approx_eq!(f64, scores[0], 0.0);
        assert!(scores[0] < scores[1] && scores[1] < scores[2]);
        assert_approx_eq!(f64, scores[2], 100.0);
    }

    #[rstest]
    fn test_coverage_gap_feeds_score(config: AnalysisConfig) {
        let clusters = region_from_dates(&["2024-01-01", "2024-02-01", "2024-03-01"], &config);

        // A branch right on top of the region closes the gap
        let near = vec![branch("B1", 38.08, 46.29)];
        let covered = forecast(&clusters, &near, 5.0, &config, &Cancellation::new()).unwrap();
        let uncovered = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();
        assert!(
            uncovered.forecasts[0].expansion_score > covered.forecasts[0].expansion_score
        );
    }

    #[rstest]
    fn test_best_months_ranking(config: AnalysisConfig) {
        let clusters = region_from_dates(
            &[
                "2024-03-01",
                "2024-03-10",
                "2024-03-20",
                "2024-05-02",
                "2024-05-12",
                "2024-01-07",
            ],
            &config,
        );
        let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();
        assert_eq!(
            outcome.forecasts[0].best_months,
            vec!["March", "May", "January"]
        );
    }

    #[rstest]
    fn test_best_months_fallback_to_population(config: AnalysisConfig) {
        // Two regions; the small one has fewer than min_seasonal_samples members
        let customers = vec![
            customer("C1", 38.30, 46.30, 100.0, "restaurant", "2024-04-01"),
            customer("C2", 38.30, 46.31, 100.0, "restaurant", "2024-04-10"),
            customer("C3", 38.31, 46.30, 100.0, "restaurant", "2024-04-20"),
            customer("C4", 37.90, 46.30, 100.0, "grocery", "2024-02-01"),
        ];
        let clusters = cluster(&customers, 2, &config, &Cancellation::new()).unwrap();
        let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();

        let small = outcome
            .forecasts
            .iter()
            .find(|f| f.current_customers == 1)
            .unwrap();
        // Population-wide ranking puts April first
        assert_eq!(small.best_months[0], "April");
    }

    #[rstest]
    fn test_suggestions_ranked_with_reasons(config: AnalysisConfig) {
        let mut customers = Vec::new();
        // Region with recent growth and no coverage
        for (i, date) in ["2024-04-01", "2024-05-01", "2024-06-01"].iter().enumerate() {
            customers.push(customer(
                &format!("G{i}"),
                38.30,
                46.30 + 0.001 * i as f64,
                500.0,
                "restaurant",
                date,
            ));
        }
        // Stagnant region
        for (i, date) in ["2020-01-01", "2020-02-01", "2020-03-01"].iter().enumerate() {
            customers.push(customer(
                &format!("S{i}"),
                37.90,
                46.30 + 0.001 * i as f64,
                50.0,
                "grocery",
                date,
            ));
        }

        let clusters = cluster(&customers, 2, &config, &Cancellation::new()).unwrap();
        let outcome = forecast(&clusters, &[], 5.0, &config, &Cancellation::new()).unwrap();

        assert_eq!(outcome.suggestions.len(), 2);
        assert!(
            outcome.suggestions[0].expansion_score >= outcome.suggestions[1].expansion_score
        );
        let growing = outcome
            .forecasts
            .iter()
            .find(|f| f.region_name.contains("restaurant"))
            .unwrap();
        assert_eq!(outcome.suggestions[0].region_id, growing.region_id);
        assert!(!outcome.suggestions[0].reasons.is_empty());
    }

    #[rstest]
    fn test_forecast_cancellation(config: AnalysisConfig) {
        let clusters = region_from_dates(&["2024-01-01"], &config);
        let cancel = Cancellation::new();
        cancel.cancel();
        let result = forecast(&clusters, &[], 5.0, &config, &cancel);
        assert_eq!(result.unwrap_err(), AnalysisError::Cancelled);
    }
}
