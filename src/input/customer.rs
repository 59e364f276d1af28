//! Code for reading customer locations from CSV files.
use super::read_csv;
use crate::customer::CustomerRecord;
use anyhow::Result;
use std::path::Path;

/// The customers file name
pub const CUSTOMERS_FILE_NAME: &str = "customers.csv";

/// Read customer records from `customers.csv` in the analysis directory.
///
/// Coordinates stay unparsed strings here; exclusion of unusable records happens in
/// the orchestrator so the count can be reported.
pub fn read_customers(analysis_dir: &Path) -> Result<Vec<CustomerRecord>> {
    read_csv(&analysis_dir.join(CUSTOMERS_FILE_NAME))
}
