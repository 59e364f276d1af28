//! Fixtures for tests
use crate::config::{AnalysisConfig, AnalysisOptions};
use crate::customer::{CustomerLocation, CustomerRecord};
use crate::geometry::Coordinate;
use crate::service_point::{ServicePoint, ServicePointKind, ServicePointRecord};
use rstest::fixture;

/// The default policy configuration
#[fixture]
pub fn config() -> AnalysisConfig {
    AnalysisConfig::default()
}

/// Options for a typical metro-scale run
pub fn analysis_options() -> AnalysisOptions {
    AnalysisOptions {
        cluster_count: 3,
        coverage_radius_km: 5.0,
        grid_resolution: None,
    }
}

/// A validated customer at the given position
pub fn customer(
    id: &str,
    lat: f64,
    lng: f64,
    monthly_profit: f64,
    business_type: &str,
    created_at: &str,
) -> CustomerLocation {
    CustomerLocation {
        id: id.into(),
        shop_name: format!("Shop {id}"),
        coordinate: Coordinate::new(lat, lng),
        monthly_profit,
        business_type: business_type.to_string(),
        status: "active".to_string(),
        created_at: created_at.parse().unwrap(),
        banking_unit_id: None,
    }
}

/// A raw customer record with unparsed coordinates
pub fn customer_record(id: &str, latitude: &str, longitude: &str) -> CustomerRecord {
    CustomerRecord {
        id: id.into(),
        shop_name: format!("Shop {id}"),
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
        monthly_profit: 1000.0,
        business_type: "restaurant".to_string(),
        status: "active".to_string(),
        created_at: "2024-01-15".parse().unwrap(),
        banking_unit_id: None,
    }
}

/// A branch service point at the given position
pub fn branch(id: &str, lat: f64, lng: f64) -> ServicePoint {
    ServicePoint {
        id: id.into(),
        name: format!("Branch {id}"),
        coordinate: Coordinate::new(lat, lng),
        kind: ServicePointKind::Branch,
    }
}

/// A raw branch record
pub fn service_point_record(id: &str, latitude: f64, longitude: f64) -> ServicePointRecord {
    ServicePointRecord {
        id: id.into(),
        name: format!("Branch {id}"),
        latitude,
        longitude,
        kind: ServicePointKind::Branch,
    }
}

/// A small snapshot with three spatial groups of differing size and revenue
pub fn metro_customers() -> Vec<CustomerLocation> {
    let mut customers = Vec::new();
    for i in 0..5 {
        customers.push(customer(
            &format!("N{i}"),
            38.30 + 0.002 * i as f64,
            46.30,
            1500.0,
            "restaurant",
            "2024-05-01",
        ));
    }
    for i in 0..4 {
        customers.push(customer(
            &format!("E{i}"),
            38.08,
            46.50 + 0.002 * i as f64,
            600.0,
            "grocery",
            "2023-11-01",
        ));
    }
    for i in 0..3 {
        customers.push(customer(
            &format!("S{i}"),
            37.90 + 0.002 * i as f64,
            46.29,
            300.0,
            "pharmacy",
            "2022-06-01",
        ));
    }

    customers
}
