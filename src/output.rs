//! The module responsible for writing analysis results to disk.
use crate::analysis::AnalysisReport;
use crate::clustering::{GeoCluster, PotentialTier};
use crate::coverage::{ProposedSite, SitePriority};
use crate::customer::{CustomerID, CustomerLocation};
use crate::forecast::{ExpansionSuggestion, RegionalForecast, TrendClass};
use anyhow::{Context, Result, ensure};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which per-analysis output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "geolens_results";

/// The output file name for clusters
const CLUSTERS_FILE_NAME: &str = "clusters.csv";

/// The output file name for regional forecasts
const FORECASTS_FILE_NAME: &str = "forecasts.csv";

/// The output file name for expansion suggestions
const SUGGESTIONS_FILE_NAME: &str = "expansion_suggestions.csv";

/// The output file name for the coverage summary
const COVERAGE_FILE_NAME: &str = "coverage_summary.csv";

/// The output file name for uncovered customers
const UNCOVERED_FILE_NAME: &str = "uncovered_customers.csv";

/// The output file name for proposed sites
const PROPOSED_SITES_FILE_NAME: &str = "proposed_sites.csv";

/// The output file name for coverage recommendations
const RECOMMENDATIONS_FILE_NAME: &str = "recommendations.csv";

/// Get the output directory for the analysis at the specified directory path
pub fn get_output_dir(analysis_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let analysis_dir = analysis_dir
        .canonicalize()
        .context("Could not resolve path to analysis directory")?;

    let analysis_name = analysis_dir
        .file_name()
        .context("Analysis cannot be in root folder")?
        .to_str()
        .context("Invalid chars in analysis dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, analysis_name].iter().collect())
}

/// Create a new output directory, refusing to reuse a non-empty one unless
/// `overwrite` is set
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<()> {
    if output_dir.is_dir() {
        let occupied = fs::read_dir(output_dir)?.next().is_some();
        ensure!(
            overwrite || !occupied,
            "Output directory {} already contains results (set overwrite in settings.toml to replace them)",
            output_dir.display()
        );
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Used to represent clusters in the clusters output CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ClusterRow {
    id: u32,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    customer_count: usize,
    total_revenue: f64,
    density: f64,
    potential: PotentialTier,
    characteristics: String,
}

impl ClusterRow {
    fn new(cluster: &GeoCluster) -> Self {
        Self {
            id: cluster.id,
            latitude: cluster.centroid.lat,
            longitude: cluster.centroid.lng,
            radius_km: cluster.radius_km,
            customer_count: cluster.customer_count,
            total_revenue: cluster.total_revenue,
            density: cluster.density,
            potential: cluster.potential,
            characteristics: cluster.characteristics.join("; "),
        }
    }
}

/// Used to represent forecasts in the forecasts output CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ForecastRow {
    region_id: u32,
    region_name: String,
    latitude: f64,
    longitude: f64,
    current_customers: usize,
    predicted_customers: usize,
    growth_rate_pct: f64,
    trend: TrendClass,
    expansion_score: f64,
    best_months: String,
}

impl ForecastRow {
    fn new(forecast: &RegionalForecast) -> Self {
        Self {
            region_id: forecast.region_id,
            region_name: forecast.region_name.clone(),
            latitude: forecast.center.lat,
            longitude: forecast.center.lng,
            current_customers: forecast.current_customers,
            predicted_customers: forecast.predicted_customers,
            growth_rate_pct: forecast.growth_rate_pct,
            trend: forecast.trend,
            expansion_score: forecast.expansion_score,
            best_months: forecast.best_months.join("; "),
        }
    }
}

/// Used to represent expansion suggestions in their output CSV file
#[derive(Serialize, Debug, PartialEq)]
struct SuggestionRow {
    rank: usize,
    region_id: u32,
    region_name: String,
    expansion_score: f64,
    reasons: String,
}

impl SuggestionRow {
    fn new(rank: usize, suggestion: &ExpansionSuggestion) -> Self {
        Self {
            rank,
            region_id: suggestion.region_id,
            region_name: suggestion.region_name.clone(),
            expansion_score: suggestion.expansion_score,
            reasons: suggestion.reasons.join("; "),
        }
    }
}

/// The single-row coverage summary
#[derive(Serialize, Debug, PartialEq)]
struct CoverageSummaryRow {
    coverage_percentage: f64,
    covered_customers: usize,
    uncovered_customers: usize,
    avg_distance_to_service_km: f64,
    max_distance_to_service_km: f64,
    excluded_customers: usize,
    excluded_service_points: usize,
}

/// Used to represent uncovered customers in their output CSV file
#[derive(Serialize, Debug, PartialEq)]
struct UncoveredCustomerRow {
    id: CustomerID,
    shop_name: String,
    latitude: f64,
    longitude: f64,
    business_type: String,
    monthly_profit: f64,
}

impl UncoveredCustomerRow {
    fn new(customer: &CustomerLocation) -> Self {
        Self {
            id: customer.id.clone(),
            shop_name: customer.shop_name.clone(),
            latitude: customer.coordinate.lat,
            longitude: customer.coordinate.lng,
            business_type: customer.business_type.clone(),
            monthly_profit: customer.monthly_profit,
        }
    }
}

/// Used to represent proposed sites in their output CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ProposedSiteRow {
    latitude: f64,
    longitude: f64,
    potential_coverage: usize,
    priority: SitePriority,
    reason: String,
}

impl ProposedSiteRow {
    fn new(site: &ProposedSite) -> Self {
        Self {
            latitude: site.coordinate.lat,
            longitude: site.coordinate.lng,
            potential_coverage: site.potential_coverage,
            priority: site.priority,
            reason: site.reason.clone(),
        }
    }
}

/// A single recommendation line
#[derive(Serialize, Debug, PartialEq)]
struct RecommendationRow {
    recommendation: String,
}

/// Serialize rows to a CSV file in the output directory
fn write_csv<T: Serialize>(output_dir: &Path, file_name: &str, rows: &[T]) -> Result<()> {
    let file_path = output_dir.join(file_name);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the complete analysis report as CSV files in the output directory
pub fn write_analysis_report(output_dir: &Path, report: &AnalysisReport) -> Result<()> {
    let cluster_rows: Vec<_> = report.clusters.iter().map(ClusterRow::new).collect();
    write_csv(output_dir, CLUSTERS_FILE_NAME, &cluster_rows)?;

    let forecast_rows: Vec<_> = report.forecasts.iter().map(ForecastRow::new).collect();
    write_csv(output_dir, FORECASTS_FILE_NAME, &forecast_rows)?;

    let suggestion_rows: Vec<_> = report
        .suggestions
        .iter()
        .enumerate()
        .map(|(index, suggestion)| SuggestionRow::new(index + 1, suggestion))
        .collect();
    write_csv(output_dir, SUGGESTIONS_FILE_NAME, &suggestion_rows)?;

    let summary = CoverageSummaryRow {
        coverage_percentage: report.coverage.coverage_percentage,
        covered_customers: report.coverage.covered_customers,
        uncovered_customers: report.coverage.uncovered_customers.len(),
        avg_distance_to_service_km: report.coverage.avg_distance_to_service_km,
        max_distance_to_service_km: report.coverage.max_distance_to_service_km,
        excluded_customers: report.excluded_customers,
        excluded_service_points: report.excluded_service_points,
    };
    write_csv(output_dir, COVERAGE_FILE_NAME, &[summary])?;

    let uncovered_rows: Vec<_> = report
        .coverage
        .uncovered_customers
        .iter()
        .map(UncoveredCustomerRow::new)
        .collect();
    write_csv(output_dir, UNCOVERED_FILE_NAME, &uncovered_rows)?;

    let site_rows: Vec<_> = report
        .coverage
        .proposed_sites
        .iter()
        .map(ProposedSiteRow::new)
        .collect();
    write_csv(output_dir, PROPOSED_SITES_FILE_NAME, &site_rows)?;

    let recommendation_rows: Vec<_> = report
        .coverage
        .recommendations
        .iter()
        .map(|recommendation| RecommendationRow {
            recommendation: recommendation.clone(),
        })
        .collect();
    write_csv(output_dir, RECOMMENDATIONS_FILE_NAME, &recommendation_rows)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Cancellation, perform_full_analysis};
    use crate::fixture::{analysis_options, config, customer_record, service_point_record};
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory_refuses_occupied_dir() {
        let dir = tempdir().unwrap();
        create_output_directory(dir.path(), false).unwrap();

        fs::write(dir.path().join("clusters.csv"), "old").unwrap();
        assert!(create_output_directory(dir.path(), false).is_err());
        assert!(create_output_directory(dir.path(), true).is_ok());
    }

    #[rstest]
    fn test_write_analysis_report(config: crate::config::AnalysisConfig) {
        let customers = vec![
            customer_record("C1", "38.08", "46.29"),
            customer_record("C2", "38.26", "46.29"),
        ];
        let service_points = vec![service_point_record("B1", 38.08, 46.29)];
        let report = perform_full_analysis(
            &customers,
            &service_points,
            &analysis_options(),
            &config,
            &Cancellation::new(),
        )
        .unwrap();

        let dir = tempdir().unwrap();
        write_analysis_report(dir.path(), &report).unwrap();

        for file_name in [
            CLUSTERS_FILE_NAME,
            FORECASTS_FILE_NAME,
            SUGGESTIONS_FILE_NAME,
            COVERAGE_FILE_NAME,
            UNCOVERED_FILE_NAME,
            PROPOSED_SITES_FILE_NAME,
            RECOMMENDATIONS_FILE_NAME,
        ] {
            assert!(dir.path().join(file_name).is_file(), "missing {file_name}");
        }

        let coverage = fs::read_to_string(dir.path().join(COVERAGE_FILE_NAME)).unwrap();
        assert!(coverage.starts_with("coverage_percentage,"));
        let uncovered = fs::read_to_string(dir.path().join(UNCOVERED_FILE_NAME)).unwrap();
        assert!(uncovered.contains("C2"));
    }
}
