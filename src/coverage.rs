//! The coverage engine classifies customers as served or unserved by the existing
//! service-point network and proposes new sites for the gaps.
//!
//! Site proposal is greedy maximum coverage: repeatedly cluster the remaining
//! unserved customers, take the candidate centroid covering the most of them, then
//! remove the customers it would serve. A classic approximate set cover — bounded,
//! deterministic, and documented as such rather than an exact solver.
use crate::analysis::{AnalysisError, Cancellation};
use crate::clustering::cluster;
use crate::config::AnalysisConfig;
use crate::customer::CustomerLocation;
use crate::geometry::{Coordinate, haversine_distance_km};
use crate::service_point::ServicePoint;
use serde_string_enum::SerializeLabeledStringEnum;

/// Priority of a proposed site relative to the remaining unserved population
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum SitePriority {
    /// Covers a small share of the remaining unserved customers
    #[string = "low"]
    Low,
    /// Covers a moderate share
    #[string = "medium"]
    Medium,
    /// Covers a large share
    #[string = "high"]
    High,
}

/// A candidate location for a new service point
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedSite {
    /// Suggested coordinate for the new site
    pub coordinate: Coordinate,
    /// Number of currently unserved customers within the coverage radius
    pub potential_coverage: usize,
    /// Priority tier from the covered share of the remaining unserved population
    pub priority: SitePriority,
    /// Human-readable justification
    pub reason: String,
}

/// Service coverage statistics and proposals for one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    /// Percentage of eligible customers within the radius of some service point.
    /// `100` when there are no eligible customers (vacuously covered).
    pub coverage_percentage: f64,
    /// Number of covered customers
    pub covered_customers: usize,
    /// The unserved customers, full records in input order
    pub uncovered_customers: Vec<CustomerLocation>,
    /// Mean distance (km) from a customer to its nearest service point; `0` with no
    /// customers or no service points
    pub avg_distance_to_service_km: f64,
    /// Largest such distance; `0` with no customers or no service points
    pub max_distance_to_service_km: f64,
    /// Derived natural-language findings; never fed back into any computation
    pub recommendations: Vec<String>,
    /// Greedily selected new site candidates, best first
    pub proposed_sites: Vec<ProposedSite>,
}

/// Analyse service coverage of `customers` by `service_points` at `radius_km`.
///
/// Degenerate inputs have defined outputs rather than errors: zero customers is
/// vacuously 100% covered, and zero service points covers nobody.
pub fn coverage(
    customers: &[CustomerLocation],
    service_points: &[ServicePoint],
    radius_km: f64,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<CoverageReport, AnalysisError> {
    cancel.check()?;

    if customers.is_empty() {
        return Ok(CoverageReport {
            coverage_percentage: 100.0,
            covered_customers: 0,
            uncovered_customers: Vec::new(),
            avg_distance_to_service_km: 0.0,
            max_distance_to_service_km: 0.0,
            recommendations: vec![
                "No customers with usable coordinates; coverage is vacuously complete"
                    .to_string(),
            ],
            proposed_sites: Vec::new(),
        });
    }

    let (covered, uncovered, avg_distance, max_distance) =
        classify_customers(customers, service_points, radius_km);
    let coverage_percentage = covered as f64 / customers.len() as f64 * 100.0;

    let proposed_sites = propose_sites(&uncovered, radius_km, config, cancel)?;
    let recommendations = recommendations(
        customers.len(),
        coverage_percentage,
        &uncovered,
        max_distance,
        &proposed_sites,
        service_points,
        radius_km,
    );

    Ok(CoverageReport {
        coverage_percentage,
        covered_customers: covered,
        uncovered_customers: uncovered,
        avg_distance_to_service_km: avg_distance,
        max_distance_to_service_km: max_distance,
        recommendations,
        proposed_sites,
    })
}

/// Split customers into covered count and uncovered records, with distance stats.
///
/// With no service points every customer is uncovered and the distance statistics
/// are reported as zero.
fn classify_customers(
    customers: &[CustomerLocation],
    service_points: &[ServicePoint],
    radius_km: f64,
) -> (usize, Vec<CustomerLocation>, f64, f64) {
    if service_points.is_empty() {
        return (0, customers.to_vec(), 0.0, 0.0);
    }

    let mut covered = 0;
    let mut uncovered = Vec::new();
    let mut distance_sum = 0.0;
    let mut distance_max: f64 = 0.0;
    for customer in customers {
        let distance = min_distance_km(customer.coordinate, service_points);
        distance_sum += distance;
        distance_max = distance_max.max(distance);
        if distance <= radius_km {
            covered += 1;
        } else {
            uncovered.push(customer.clone());
        }
    }

    let avg = distance_sum / customers.len() as f64;
    (covered, uncovered, avg, distance_max)
}

/// Distance (km) to the nearest service point
fn min_distance_km(coordinate: Coordinate, service_points: &[ServicePoint]) -> f64 {
    service_points
        .iter()
        .map(|point| haversine_distance_km(coordinate, point.coordinate))
        .fold(f64::INFINITY, f64::min)
}

/// Greedy maximum-coverage selection of up to `config.max_proposed_sites` new sites
fn propose_sites(
    uncovered: &[CustomerLocation],
    radius_km: f64,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<Vec<ProposedSite>, AnalysisError> {
    let mut remaining = uncovered.to_vec();
    let mut sites = Vec::new();

    while sites.len() < config.max_proposed_sites && !remaining.is_empty() {
        cancel.check()?;

        // Candidate sites are the centroids of sub-clusters of what is still unserved
        let candidates = cluster(&remaining, config.candidate_clusters, config, cancel)?;

        let best = candidates
            .iter()
            .map(|candidate| {
                let count = remaining
                    .iter()
                    .filter(|customer| {
                        haversine_distance_km(customer.coordinate, candidate.centroid)
                            <= radius_km
                    })
                    .count();
                (candidate.centroid, count)
            })
            .max_by(|(_, a), (_, b)| a.cmp(b));

        let Some((centroid, count)) = best else {
            break;
        };
        // A candidate covering nobody means the remaining customers are too spread
        // out for this radius; further rounds cannot do better
        if count == 0 {
            break;
        }

        let share = count as f64 / remaining.len() as f64;
        let priority = if share >= config.high_priority_share {
            SitePriority::High
        } else if share >= config.medium_priority_share {
            SitePriority::Medium
        } else {
            SitePriority::Low
        };

        sites.push(ProposedSite {
            coordinate: centroid,
            potential_coverage: count,
            priority,
            reason: format!(
                "would serve {count} of the {} currently unserved customers",
                remaining.len()
            ),
        });

        remaining.retain(|customer| {
            haversine_distance_km(customer.coordinate, centroid) > radius_km
        });
    }

    Ok(sites)
}

/// Aggregate findings phrased for the dashboard
fn recommendations(
    eligible: usize,
    coverage_percentage: f64,
    uncovered: &[CustomerLocation],
    max_distance: f64,
    proposed_sites: &[ProposedSite],
    service_points: &[ServicePoint],
    radius_km: f64,
) -> Vec<String> {
    let mut result = Vec::new();

    if service_points.is_empty() {
        result.push(format!(
            "No service points in the network; all {eligible} customers are unserved"
        ));
    } else {
        result.push(format!(
            "{coverage_percentage:.1}% of customers are within {radius_km} km of a service point"
        ));
        if !uncovered.is_empty() {
            result.push(format!(
                "{} customers are outside the service radius; the farthest is {max_distance:.1} km from any service point",
                uncovered.len()
            ));
        }
    }

    if !proposed_sites.is_empty() {
        let reachable: usize = proposed_sites
            .iter()
            .map(|site| site.potential_coverage)
            .sum();
        result.push(format!(
            "Adding the {} proposed sites would reach {reachable} currently unserved customers",
            proposed_sites.len()
        ));
    }

    result
}
