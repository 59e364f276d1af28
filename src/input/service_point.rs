//! Code for reading service points from CSV files.
use super::read_csv;
use crate::service_point::ServicePointRecord;
use anyhow::Result;
use std::path::Path;

/// The service points file name
pub const SERVICE_POINTS_FILE_NAME: &str = "service_points.csv";

/// Read branch and banking unit records from `service_points.csv` in the analysis
/// directory
pub fn read_service_points(analysis_dir: &Path) -> Result<Vec<ServicePointRecord>> {
    read_csv(&analysis_dir.join(SERVICE_POINTS_FILE_NAME))
}
