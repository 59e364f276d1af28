//! Common routines for reading analysis input files.
//!
//! An analysis directory contains `customers.csv`, `service_points.csv` and
//! `analysis.toml`. Coordinate validation does not happen here — raw records go to
//! [`crate::analysis`] which excludes and counts the unusable ones — but referential
//! checks (customer → banking unit) do.
use crate::config::AnalysisFile;
use crate::customer::CustomerRecord;
use crate::id::IDCollection;
use crate::service_point::{ServicePointKind, ServicePointRecord};
use anyhow::{Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub mod customer;
pub mod service_point;
use customer::read_customers;
use service_point::read_service_points;

/// The analysis options/config file name
const ANALYSIS_FILE_NAME: &str = "analysis.toml";

/// Read a series of type `T`s from a CSV file into a `Vec<T>`.
///
/// A file with only a header row yields an empty vec; the engines give empty
/// populations a defined output, so this is not an error.
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T =
            result.with_context(|| format!("Error parsing {}", file_path.display()))?;
        records.push(record);
    }

    Ok(records)
}

/// Parse a TOML file into the specified type
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Error parsing {}", file_path.display()))
}

/// Load a complete analysis directory: customers, service points and options.
///
/// Customer `banking_unit_id` references are checked against the banking units that
/// were actually read; unknown references are logged and cleared rather than
/// rejected, matching how the engine treats other data-quality issues.
pub fn load_analysis(
    analysis_dir: &Path,
) -> Result<(Vec<CustomerRecord>, Vec<ServicePointRecord>, AnalysisFile)> {
    let analysis_file: AnalysisFile = read_toml(&analysis_dir.join(ANALYSIS_FILE_NAME))?;
    let service_points = read_service_points(analysis_dir)?;
    let mut customers = read_customers(analysis_dir)?;

    let banking_units: HashSet<_> = service_points
        .iter()
        .filter(|point| point.kind == ServicePointKind::BankingUnit)
        .map(|point| point.id.clone())
        .collect();
    for customer in &mut customers {
        let Some(unit_id) = customer.banking_unit_id.as_deref() else {
            continue;
        };
        if banking_units.get_id_by_str(unit_id).is_err() {
            warn!(
                "Customer {} references unknown banking unit {unit_id}; reference dropped",
                customer.id
            );
            customer.banking_unit_id = None;
        }
    }

    Ok((customers, service_points, analysis_file))
}
