//! The clustering engine partitions customer locations into spatial clusters and
//! scores each cluster's business potential.
//!
//! Clustering is k-means over raw `(lat, lng)` coordinates. Treating degrees as a
//! planar space is a deliberate simplification: at the metro-scale extents this
//! engine is run over, the distortion is far smaller than the cluster radii, and it
//! keeps the iteration cheap. Derived radii and distances always use the geodesic
//! routines from [`crate::geometry`].
//!
//! Every step is deterministic: seeding picks evenly spaced points along the
//! lexicographically sorted distinct coordinates, and assignment ties break towards
//! the lowest centroid index. Two runs over the same snapshot produce identical
//! clusters.
use crate::analysis::{AnalysisError, Cancellation};
use crate::config::AnalysisConfig;
use crate::customer::CustomerLocation;
use crate::geometry::{Coordinate, bounding_circle_radius_km};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use serde_string_enum::SerializeLabeledStringEnum;
use std::f64::consts::PI;

/// Qualitative tier summarising a cluster's business attractiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum)]
pub enum PotentialTier {
    /// Below the population on both density and revenue
    #[string = "low"]
    Low,
    /// In line with the population
    #[string = "medium"]
    Medium,
    /// Above the population on density and revenue
    #[string = "high"]
    High,
}

/// A spatial cluster of customers with derived metrics.
///
/// Ephemeral output: recomputed on every run, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCluster {
    /// Cluster ordinal, starting at 1
    pub id: u32,
    /// Mean coordinate of the members
    pub centroid: Coordinate,
    /// Smallest radius (km) from the centroid containing all members
    pub radius_km: f64,
    /// Number of member customers
    pub customer_count: usize,
    /// Sum of the members' monthly profit
    pub total_revenue: f64,
    /// Customers per square kilometre within the bounding circle
    pub density: f64,
    /// Business potential tier relative to the cluster population
    pub potential: PotentialTier,
    /// Up to three short descriptive strings
    pub characteristics: Vec<String>,
    /// Member customers in cluster-assignment order
    pub customers: Vec<CustomerLocation>,
}

impl GeoCluster {
    /// Mean monthly profit per member
    pub fn avg_revenue(&self) -> f64 {
        if self.customer_count == 0 {
            return 0.0;
        }
        self.total_revenue / self.customer_count as f64
    }
}

/// Partition `customers` into at most `requested_k` spatial clusters.
///
/// The effective cluster count is clamped to `[1, min(config.max_clusters, number of
/// distinct coordinates)]`, so requesting more clusters than there are distinct
/// locations cannot produce empty clusters. An empty input yields an empty vec.
///
/// Every customer appears in exactly one cluster; callers relying on the partition
/// can sum `customer_count` to recover the input size.
pub fn cluster(
    customers: &[CustomerLocation],
    requested_k: usize,
    config: &AnalysisConfig,
    cancel: &Cancellation,
) -> Result<Vec<GeoCluster>, AnalysisError> {
    if customers.is_empty() {
        return Ok(Vec::new());
    }
    cancel.check()?;

    let points = customers
        .iter()
        .map(|customer| customer.coordinate)
        .collect_vec();
    let distinct = distinct_points(&points);

    let k = requested_k.clamp(1, config.max_clusters.min(distinct.len()));
    if k < requested_k {
        info!("Clamped cluster count from {requested_k} to {k}");
    }

    let mut centroids = seed_centroids(&distinct, k);
    let mut assignments = assign_points(&points, &centroids);
    for iteration in 0..config.max_iterations {
        cancel.check()?;

        recompute_centroids(&points, &assignments, &mut centroids);
        let next = assign_points(&points, &centroids);
        if next == assignments {
            debug!("k-means converged after {iteration} iterations");
            break;
        }
        assignments = next;

        // Reaching the cap is documented termination, not a failure
        if iteration + 1 == config.max_iterations {
            debug!("k-means stopped at the iteration cap ({})", config.max_iterations);
        }
    }

    Ok(derive_clusters(customers, &assignments, k, config))
}

/// Sorted, deduplicated coordinates; the deterministic basis for seeding and clamping
fn distinct_points(points: &[Coordinate]) -> Vec<Coordinate> {
    let mut distinct = points.to_vec();
    distinct.sort_unstable_by(|a, b| a.lat.total_cmp(&b.lat).then(a.lng.total_cmp(&b.lng)));
    distinct.dedup();
    distinct
}

/// Pick `k` evenly spaced seeds along the sorted distinct coordinates.
///
/// For `k <= len` the floor of `i * (len - 1) / (k - 1)` is strictly increasing in
/// `i`, so seeds are always distinct points.
fn seed_centroids(distinct: &[Coordinate], k: usize) -> Vec<Coordinate> {
    if k == 1 {
        return vec![distinct[0]];
    }

    (0..k)
        .map(|i| distinct[i * (distinct.len() - 1) / (k - 1)])
        .collect()
}

/// Squared planar distance in degree space, used only for k-means assignment
fn sq_dist(a: Coordinate, b: Coordinate) -> f64 {
    (a.lat - b.lat).powi(2) + (a.lng - b.lng).powi(2)
}

/// Assign each point to its nearest centroid, ties towards the lowest index
fn assign_points(points: &[Coordinate], centroids: &[Coordinate]) -> Vec<usize> {
    points
        .iter()
        .map(|point| {
            let mut best = 0;
            let mut best_dist = sq_dist(*point, centroids[0]);
            for (index, centroid) in centroids.iter().enumerate().skip(1) {
                let dist = sq_dist(*point, *centroid);
                if dist < best_dist {
                    best = index;
                    best_dist = dist;
                }
            }
            best
        })
        .collect()
}

/// Move each centroid to the mean of its assigned points.
///
/// A centroid left without members is reseeded at the point farthest from its nearest
/// surviving centroid, so clusters are not silently lost mid-iteration.
fn recompute_centroids(
    points: &[Coordinate],
    assignments: &[usize],
    centroids: &mut [Coordinate],
) {
    let mut sums = vec![(0.0, 0.0, 0usize); centroids.len()];
    for (point, cluster) in points.iter().zip(assignments) {
        let entry = &mut sums[*cluster];
        entry.0 += point.lat;
        entry.1 += point.lng;
        entry.2 += 1;
    }

    let survivors = sums
        .iter()
        .enumerate()
        .filter(|(_, (_, _, count))| *count > 0)
        .map(|(index, _)| index)
        .collect_vec();

    for (index, (lat_sum, lng_sum, count)) in sums.iter().enumerate() {
        if *count > 0 {
            centroids[index] = Coordinate::new(
                lat_sum / *count as f64,
                lng_sum / *count as f64,
            );
        } else {
            centroids[index] = farthest_from_centroids(points, centroids, &survivors);
        }
    }
}

/// The point maximising the distance to its nearest centroid among `survivors`
fn farthest_from_centroids(
    points: &[Coordinate],
    centroids: &[Coordinate],
    survivors: &[usize],
) -> Coordinate {
    *points
        .iter()
        .max_by(|a, b| {
            let da = nearest_centroid_dist(**a, centroids, survivors);
            let db = nearest_centroid_dist(**b, centroids, survivors);
            da.total_cmp(&db)
        })
        .expect("points cannot be empty here")
}

fn nearest_centroid_dist(point: Coordinate, centroids: &[Coordinate], survivors: &[usize]) -> f64 {
    survivors
        .iter()
        .map(|index| sq_dist(point, centroids[*index]))
        .fold(f64::INFINITY, f64::min)
}

/// Interim per-cluster values before population-relative scoring
struct RawCluster {
    centroid: Coordinate,
    radius_km: f64,
    total_revenue: f64,
    density: f64,
    members: Vec<CustomerLocation>,
}

/// Build the final clusters with metrics, tiers and characteristics
fn derive_clusters(
    customers: &[CustomerLocation],
    assignments: &[usize],
    k: usize,
    config: &AnalysisConfig,
) -> Vec<GeoCluster> {
    let mut members: Vec<Vec<CustomerLocation>> = vec![Vec::new(); k];
    for (customer, cluster) in customers.iter().zip(assignments) {
        members[*cluster].push(customer.clone());
    }

    // Convergence can still leave a centroid empty when distinct points collapse
    // onto the same mean; drop those rather than emit zero-member clusters
    let raw = members
        .into_iter()
        .filter(|members| !members.is_empty())
        .map(|members| derive_raw_cluster(members, config))
        .collect_vec();

    let densities = raw.iter().map(|c| c.density).sorted_by(f64::total_cmp).collect_vec();
    let avg_revenues = raw
        .iter()
        .map(|c| c.total_revenue / c.members.len() as f64)
        .sorted_by(f64::total_cmp)
        .collect_vec();
    let density_high = quantile(&densities, config.potential_high_quantile);
    let density_low = quantile(&densities, config.potential_low_quantile);
    let density_median = quantile(&densities, 0.5);
    let revenue_high = quantile(&avg_revenues, config.potential_high_quantile);
    let revenue_low = quantile(&avg_revenues, config.potential_low_quantile);
    let revenue_median = quantile(&avg_revenues, 0.5);

    raw.into_iter()
        .enumerate()
        .map(|(index, cluster)| {
            let avg_revenue = cluster.total_revenue / cluster.members.len() as f64;
            let potential = potential_tier(
                tier_points(cluster.density, density_low, density_high)
                    + tier_points(avg_revenue, revenue_low, revenue_high),
            );
            let characteristics = characteristics(
                &cluster.members,
                avg_revenue,
                revenue_median,
                cluster.density,
                density_median,
            );

            GeoCluster {
                id: index as u32 + 1,
                centroid: cluster.centroid,
                radius_km: cluster.radius_km,
                customer_count: cluster.members.len(),
                total_revenue: cluster.total_revenue,
                density: cluster.density,
                potential,
                characteristics,
                customers: cluster.members,
            }
        })
        .collect()
}

fn derive_raw_cluster(members: Vec<CustomerLocation>, config: &AnalysisConfig) -> RawCluster {
    let count = members.len() as f64;
    let centroid = Coordinate::new(
        members.iter().map(|m| m.coordinate.lat).sum::<f64>() / count,
        members.iter().map(|m| m.coordinate.lng).sum::<f64>() / count,
    );
    let member_points = members.iter().map(|m| m.coordinate).collect_vec();
    let radius_km = bounding_circle_radius_km(centroid, &member_points);
    let total_revenue = members.iter().map(|m| m.monthly_profit).sum();

    // Single-point clusters have zero radius; the floor keeps density finite
    let effective_radius = radius_km.max(config.density_radius_floor_km);
    let density = count / (PI * effective_radius.powi(2));

    RawCluster {
        centroid,
        radius_km,
        total_revenue,
        density,
        members,
    }
}

/// 2 points for reaching the high quantile, 1 for the low quantile, 0 below it
fn tier_points(value: f64, low: f64, high: f64) -> u32 {
    if value >= high {
        2
    } else if value >= low {
        1
    } else {
        0
    }
}

/// Combined density + revenue points (0-4) mapped to a tier
fn potential_tier(points: u32) -> PotentialTier {
    match points {
        0 | 1 => PotentialTier::Low,
        2 => PotentialTier::Medium,
        _ => PotentialTier::High,
    }
}

/// Up to three short descriptive strings for a cluster
fn characteristics(
    members: &[CustomerLocation],
    avg_revenue: f64,
    revenue_median: f64,
    density: f64,
    density_median: f64,
) -> Vec<String> {
    let mut result = Vec::with_capacity(3);
    if let Some(dominant) = dominant_business_type(members) {
        result.push(format!("mostly {dominant}"));
    }
    result.push(
        if avg_revenue >= revenue_median {
            "above-median revenue"
        } else {
            "below-median revenue"
        }
        .to_string(),
    );
    result.push(
        if density >= density_median {
            "dense cluster"
        } else {
            "sparse cluster"
        }
        .to_string(),
    );

    result
}

/// The most common business type, ties broken by first appearance
pub(crate) fn dominant_business_type(members: &[CustomerLocation]) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for member in members {
        *counts.entry(member.business_type.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (business_type, count) in &counts {
        if best.is_none_or(|(_, best_count)| *count > best_count) {
            best = Some((business_type, *count));
        }
    }

    best.map(|(business_type, _)| business_type.to_string())
}

/// Linearly interpolated quantile over an already sorted, non-empty slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        return sorted[low];
    }

    let fraction = position - low as f64;
    sorted[low] * (1.0 - fraction) + sorted[high] * fraction
}
