//! Analysis options and policy configuration.
//!
//! [`AnalysisOptions`] are the per-run knobs exposed to the caller (cluster count,
//! coverage radius, grid resolution). [`AnalysisConfig`] holds every tunable policy
//! threshold the engines use — tier cut points, trend thresholds, score weights — so
//! that none of them is a magic number buried in engine code. All fields have
//! defaults and can be overridden from `analysis.toml`.
use anyhow::{Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const ANALYSIS_FILE_HEADER: &str = "# This file configures a geolens analysis run.
# Options are required; every [config] entry is optional and shown with its default.
";

/// Per-run analysis options supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Requested number of spatial clusters
    pub cluster_count: i64,
    /// Maximum distance (km) at which a service point serves a customer
    pub coverage_radius_km: f64,
    /// Optional override for the number of candidate sub-clusters used when
    /// proposing new sites
    #[serde(default)]
    pub grid_resolution: Option<i64>,
}

impl AnalysisOptions {
    /// Check the options before any computation starts.
    ///
    /// Rejecting here is a configuration error, distinct from the degenerate inputs
    /// (empty customer lists etc.) which produce defined results.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cluster_count >= 1,
            "cluster_count must be at least 1 (got {})",
            self.cluster_count
        );
        ensure!(
            self.coverage_radius_km.is_finite() && self.coverage_radius_km >= 0.0,
            "coverage_radius_km must be finite and non-negative (got {})",
            self.coverage_radius_km
        );
        if let Some(grid_resolution) = self.grid_resolution {
            ensure!(
                grid_resolution >= 1,
                "grid_resolution must be at least 1 (got {grid_resolution})"
            );
        }

        Ok(())
    }
}

macro_rules! default_fn {
    ($name:ident, $ty:ty, $value:expr) => {
        fn $name() -> $ty {
            $value
        }
    };
}

default_fn!(default_max_clusters, usize, 10);
default_fn!(default_max_iterations, u32, 100);
default_fn!(default_density_radius_floor_km, f64, 0.1);
default_fn!(default_potential_high_quantile, f64, 0.75);
default_fn!(default_potential_low_quantile, f64, 0.25);
default_fn!(default_lookback_months, u32, 12);
default_fn!(default_max_growth_rate_pct, f64, 200.0);
default_fn!(default_surge_threshold_pct, f64, 15.0);
default_fn!(default_expansion_weight_growth, f64, 0.4);
default_fn!(default_expansion_weight_revenue_density, f64, 0.3);
default_fn!(default_expansion_weight_coverage_gap, f64, 0.3);
default_fn!(default_best_months_count, usize, 3);
default_fn!(default_min_seasonal_samples, usize, 3);
default_fn!(default_max_proposed_sites, usize, 3);
default_fn!(default_candidate_clusters, usize, 4);
default_fn!(default_high_priority_share, f64, 0.5);
default_fn!(default_medium_priority_share, f64, 0.2);
default_fn!(default_max_suggestions, usize, 3);

/// Policy thresholds for the three engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, DocumentedFields)]
pub struct AnalysisConfig {
    /// Upper bound on the effective cluster count
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    /// Hard cap on k-means iterations; reaching it is documented termination, not an
    /// error
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Radius floor (km) used when computing density for single-point clusters
    #[serde(default = "default_density_radius_floor_km")]
    pub density_radius_floor_km: f64,
    /// Population quantile a cluster must reach on density to be tiered "high"
    #[serde(default = "default_potential_high_quantile")]
    pub potential_high_quantile: f64,
    /// Population quantile below which a cluster is tiered "low"
    #[serde(default = "default_potential_low_quantile")]
    pub potential_low_quantile: f64,
    /// Length (months) of the acquisition lookback window used for growth rates
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
    /// Clamp applied to growth rates, in signed percent
    #[serde(default = "default_max_growth_rate_pct")]
    pub max_growth_rate_pct: f64,
    /// Growth rate (percent) above which a region's trend is classified as a surge
    #[serde(default = "default_surge_threshold_pct")]
    pub surge_threshold_pct: f64,
    /// Expansion score weight for the growth signal
    #[serde(default = "default_expansion_weight_growth")]
    pub expansion_weight_growth: f64,
    /// Expansion score weight for the revenue density signal
    #[serde(default = "default_expansion_weight_revenue_density")]
    pub expansion_weight_revenue_density: f64,
    /// Expansion score weight for the coverage gap signal
    #[serde(default = "default_expansion_weight_coverage_gap")]
    pub expansion_weight_coverage_gap: f64,
    /// Number of calendar months reported as best for expansion
    #[serde(default = "default_best_months_count")]
    pub best_months_count: usize,
    /// Minimum acquisition samples a region needs before its own seasonality is used
    /// instead of the population-wide default
    #[serde(default = "default_min_seasonal_samples")]
    pub min_seasonal_samples: usize,
    /// Maximum number of new sites proposed by the coverage engine
    #[serde(default = "default_max_proposed_sites")]
    pub max_proposed_sites: usize,
    /// Number of sub-clusters of the uncovered population used as candidate sites
    #[serde(default = "default_candidate_clusters")]
    pub candidate_clusters: usize,
    /// Share of the remaining uncovered population a site must reach for high priority
    #[serde(default = "default_high_priority_share")]
    pub high_priority_share: f64,
    /// Share of the remaining uncovered population a site must reach for medium
    /// priority
    #[serde(default = "default_medium_priority_share")]
    pub medium_priority_share: f64,
    /// Number of top-scored regions surfaced as expansion suggestions
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_clusters: default_max_clusters(),
            max_iterations: default_max_iterations(),
            density_radius_floor_km: default_density_radius_floor_km(),
            potential_high_quantile: default_potential_high_quantile(),
            potential_low_quantile: default_potential_low_quantile(),
            lookback_months: default_lookback_months(),
            max_growth_rate_pct: default_max_growth_rate_pct(),
            surge_threshold_pct: default_surge_threshold_pct(),
            expansion_weight_growth: default_expansion_weight_growth(),
            expansion_weight_revenue_density: default_expansion_weight_revenue_density(),
            expansion_weight_coverage_gap: default_expansion_weight_coverage_gap(),
            best_months_count: default_best_months_count(),
            min_seasonal_samples: default_min_seasonal_samples(),
            max_proposed_sites: default_max_proposed_sites(),
            candidate_clusters: default_candidate_clusters(),
            high_priority_share: default_high_priority_share(),
            medium_priority_share: default_medium_priority_share(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl AnalysisConfig {
    /// Check that the configured thresholds are internally consistent
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_clusters >= 1, "max_clusters must be at least 1");
        ensure!(self.max_iterations >= 1, "max_iterations must be at least 1");
        ensure!(
            self.density_radius_floor_km > 0.0,
            "density_radius_floor_km must be positive"
        );
        for (name, quantile) in [
            ("potential_high_quantile", self.potential_high_quantile),
            ("potential_low_quantile", self.potential_low_quantile),
        ] {
            ensure!(
                (0.0..=1.0).contains(&quantile),
                "{name} must be between 0 and 1 (got {quantile})"
            );
        }
        ensure!(
            self.potential_low_quantile <= self.potential_high_quantile,
            "potential_low_quantile cannot exceed potential_high_quantile"
        );
        ensure!(self.lookback_months >= 1, "lookback_months must be at least 1");
        ensure!(
            self.max_growth_rate_pct > 0.0,
            "max_growth_rate_pct must be positive"
        );
        let weights = [
            self.expansion_weight_growth,
            self.expansion_weight_revenue_density,
            self.expansion_weight_coverage_gap,
        ];
        ensure!(
            weights.iter().all(|w| *w >= 0.0),
            "expansion score weights cannot be negative"
        );
        ensure!(
            weights.iter().sum::<f64>() > 0.0,
            "at least one expansion score weight must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&self.medium_priority_share)
                && (0.0..=1.0).contains(&self.high_priority_share),
            "priority shares must be between 0 and 1"
        );
        ensure!(
            self.medium_priority_share <= self.high_priority_share,
            "medium_priority_share cannot exceed high_priority_share"
        );
        ensure!(
            self.candidate_clusters >= 1,
            "candidate_clusters must be at least 1"
        );

        Ok(())
    }

    /// The contents of a fully commented default `analysis.toml` `[config]` section,
    /// generated from the field doc comments.
    pub fn default_file_contents() -> String {
        let config = AnalysisConfig::default();
        let config_raw =
            toml::to_string(&config).expect("Could not convert default config to TOML");

        let mut out = ANALYSIS_FILE_HEADER.to_string();
        out.push_str("\n[options]\ncluster_count = 5\ncoverage_radius_km = 5.0\n\n[config]\n");
        for line in config_raw.split('\n') {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();

                // Use doc comment to document parameter. All fields should have doc comments.
                let docs =
                    AnalysisConfig::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}

/// The contents of an `analysis.toml` file: required options plus optional policy
/// overrides
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisFile {
    /// Per-run options
    pub options: AnalysisOptions,
    /// Policy threshold overrides
    #[serde(default)]
    pub config: AnalysisConfig,
}
