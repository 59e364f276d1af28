//! Service points are the existing network: branches and banking units that serve
//! customers within the coverage radius.
use crate::geometry::Coordinate;
use crate::id::define_id_type;
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

define_id_type! {ServicePointID}

/// The kind of service point
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum ServicePointKind {
    /// A full branch
    #[string = "branch"]
    Branch,
    /// A smaller banking unit
    #[string = "banking_unit"]
    BankingUnit,
}

/// A service point record as it arrives from the data layer
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServicePointRecord {
    /// A unique identifier for the service point
    pub id: ServicePointID,
    /// Human-readable name
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Whether this is a branch or a banking unit
    #[serde(rename = "type")]
    pub kind: ServicePointKind,
}

/// A validated service point. Immutable input to the coverage and forecasting engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicePoint {
    /// A unique identifier for the service point
    pub id: ServicePointID,
    /// Human-readable name
    pub name: String,
    /// Validated geographic position
    pub coordinate: Coordinate,
    /// Whether this is a branch or a banking unit
    pub kind: ServicePointKind,
}

impl ServicePoint {
    /// Validate a raw record, returning `None` when its coordinates are not finite
    /// numbers within the valid degree ranges.
    pub fn from_record(record: &ServicePointRecord) -> Option<Self> {
        let coordinate = Coordinate::new(record.latitude, record.longitude);
        if !coordinate.is_valid() {
            return None;
        }

        Some(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            coordinate,
            kind: record.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(lat: f64, lng: f64) -> ServicePointRecord {
        ServicePointRecord {
            id: "B1".into(),
            name: "Central branch".to_string(),
            latitude: lat,
            longitude: lng,
            kind: ServicePointKind::Branch,
        }
    }

    #[test]
    fn test_from_record_valid() {
        let point = ServicePoint::from_record(&record(38.08, 46.29)).unwrap();
        assert_eq!(point.coordinate, Coordinate::new(38.08, 46.29));
        assert_eq!(point.kind, ServicePointKind::Branch);
    }

    #[rstest]
    #[case(f64::NAN, 46.29)]
    #[case(38.08, f64::INFINITY)]
    #[case(-90.5, 46.29)]
    #[case(38.08, 200.0)]
    fn test_from_record_invalid(#[case] lat: f64, #[case] lng: f64) {
        assert!(ServicePoint::from_record(&record(lat, lng)).is_none());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ServicePointKind::Branch.to_string(), "branch");
        assert_eq!(ServicePointKind::BankingUnit.to_string(), "banking_unit");
    }
}
