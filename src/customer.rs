//! Customer locations are the analysed population: one record per shop with its
//! coordinates, revenue proxy and acquisition date.
use crate::geometry::{Coordinate, point_in_polygon};
use crate::id::define_id_type;
use crate::service_point::ServicePointID;
use chrono::NaiveDate;
use serde::Deserialize;

define_id_type! {CustomerID}

/// A customer record as it arrives from the data layer.
///
/// Latitude and longitude are strings at this boundary; records whose coordinates do
/// not parse are excluded from the analysed population (they are counted, never an
/// error). See [`CustomerLocation::from_record`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CustomerRecord {
    /// A unique identifier for the customer
    pub id: CustomerID,
    /// Name of the shop or owner
    pub shop_name: String,
    /// Latitude in decimal degrees, unparsed
    pub latitude: String,
    /// Longitude in decimal degrees, unparsed
    pub longitude: String,
    /// Monthly revenue proxy
    pub monthly_profit: f64,
    /// Business category label (e.g. "restaurant")
    pub business_type: String,
    /// Operational state label (e.g. "active")
    pub status: String,
    /// Date the customer was acquired
    pub created_at: NaiveDate,
    /// Banking unit this customer is attached to, if any
    pub banking_unit_id: Option<String>,
}

/// A validated customer location. Immutable input to all three engines.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerLocation {
    /// A unique identifier for the customer
    pub id: CustomerID,
    /// Name of the shop or owner
    pub shop_name: String,
    /// Validated geographic position
    pub coordinate: Coordinate,
    /// Monthly revenue proxy
    pub monthly_profit: f64,
    /// Business category label
    pub business_type: String,
    /// Operational state label
    pub status: String,
    /// Date the customer was acquired
    pub created_at: NaiveDate,
    /// Banking unit this customer is attached to, if any
    pub banking_unit_id: Option<ServicePointID>,
}

impl CustomerLocation {
    /// Validate a raw record into a `CustomerLocation`.
    ///
    /// Returns `None` when the latitude or longitude is missing, unparseable or out of
    /// range. The caller is responsible for counting exclusions; `banking_unit_id`
    /// resolution against known service points happens separately at the input layer.
    pub fn from_record(record: &CustomerRecord) -> Option<Self> {
        let coordinate = parse_coordinate(&record.latitude, &record.longitude)?;

        Some(Self {
            id: record.id.clone(),
            shop_name: record.shop_name.clone(),
            coordinate,
            monthly_profit: record.monthly_profit,
            business_type: record.business_type.clone(),
            status: record.status.clone(),
            created_at: record.created_at,
            banking_unit_id: record.banking_unit_id.as_deref().map(ServicePointID::new),
        })
    }
}

/// Parse a latitude/longitude string pair, returning `None` unless both are finite
/// numbers within the valid degree ranges.
pub fn parse_coordinate(latitude: &str, longitude: &str) -> Option<Coordinate> {
    let lat: f64 = latitude.trim().parse().ok()?;
    let lng: f64 = longitude.trim().parse().ok()?;
    let coordinate = Coordinate::new(lat, lng);

    coordinate.is_valid().then_some(coordinate)
}

/// Restrict a customer snapshot to those inside a territory polygon.
///
/// The ring follows the engine-wide `(lng, lat)` vertex convention. An empty or
/// degenerate ring selects nothing.
pub fn filter_in_territory(
    customers: &[CustomerLocation],
    ring: &[(f64, f64)],
) -> Vec<CustomerLocation> {
    customers
        .iter()
        .filter(|customer| point_in_polygon(customer.coordinate, ring))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{customer, customer_record};
    use rstest::rstest;

    #[test]
    fn test_from_record_valid() {
        let record = customer_record("C1", "38.08", "46.29");
        let location = CustomerLocation::from_record(&record).unwrap();
        assert_eq!(location.id, "C1".into());
        assert_eq!(location.coordinate, Coordinate::new(38.08, 46.29));
    }

    #[rstest]
    #[case("", "46.29")]
    #[case("not-a-number", "46.29")]
    #[case("38.08", "")]
    #[case("91.0", "46.29")]
    #[case("38.08", "181.0")]
    #[case("NaN", "46.29")]
    fn test_from_record_invalid_coordinates(#[case] lat: &str, #[case] lng: &str) {
        let record = customer_record("C1", lat, lng);
        assert!(CustomerLocation::from_record(&record).is_none());
    }

    #[test]
    fn test_parse_coordinate_trims_whitespace() {
        assert_eq!(
            parse_coordinate(" 38.08 ", " 46.29"),
            Some(Coordinate::new(38.08, 46.29))
        );
    }

    #[test]
    fn test_filter_in_territory() {
        let inside = customer("C1", 38.5, 46.5, 100.0, "restaurant", "2024-01-01");
        let outside = customer("C2", 40.0, 46.5, 100.0, "grocery", "2024-01-01");
        let ring = [(46.0, 38.0), (47.0, 38.0), (47.0, 39.0), (46.0, 39.0)];

        let kept = filter_in_territory(&[inside.clone(), outside], &ring);
        assert_eq!(kept, vec![inside]);
    }

    #[test]
    fn test_filter_in_territory_degenerate_ring() {
        let customer = customer("C1", 38.5, 46.5, 100.0, "restaurant", "2024-01-01");
        assert!(filter_in_territory(&[customer], &[]).is_empty());
    }
}
