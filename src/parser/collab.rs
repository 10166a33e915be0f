//! Narrow interfaces to the systems around the parser.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::{geo::GeoPoint, relation::Relation, way::Way, OsmId, Tags};

/// Routable values of the `highway` key used when nothing else is configured.
pub const DEFAULT_ROAD_VALUES: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "service",
    "road",
    "track",
    "pedestrian",
    "footway",
    "cycleway",
    "path",
    "steps",
];

/// Decides whether a way belongs to the routable road network.
pub trait RoadClassifier {
    fn is_road(&self, tags: &Tags) -> bool;
}

impl<F: Fn(&Tags) -> bool> RoadClassifier for F {
    fn is_road(&self, tags: &Tags) -> bool {
        self(tags)
    }
}

/// Classifies by the value of the `highway` tag.
#[derive(Debug, Clone)]
pub struct HighwayClassifier {
    values: HashSet<String>,
}

impl HighwayClassifier {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HighwayClassifier {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for HighwayClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ROAD_VALUES.iter().copied())
    }
}

impl RoadClassifier for HighwayClassifier {
    fn is_road(&self, tags: &Tags) -> bool {
        tags.get("highway").is_some_and(|value| self.values.contains(value))
    }
}

/// Receives every point with its tags while points are parsed.
pub trait AddressIndex {
    fn index_address(&mut self, id: OsmId, tags: &Tags, point: GeoPoint);
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAddressIndex;

impl AddressIndex for NoAddressIndex {
    fn index_address(&mut self, _id: OsmId, _tags: &Tags, _point: GeoPoint) { }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Address {
    pub id: OsmId,
    pub street: String,
    pub house_number: String,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub point: GeoPoint,
}

/// Collects the points that carry a street address.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct AddressBook {
    pub addresses: Vec<Address>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl AddressIndex for AddressBook {
    fn index_address(&mut self, id: OsmId, tags: &Tags, point: GeoPoint) {
        let (Some(street), Some(house_number)) = (tags.get("addr:street"), tags.get("addr:housenumber")) else {
            return;
        };
        self.addresses.push(Address {
            id,
            street: street.trim().to_string(),
            house_number: house_number.trim().to_string(),
            postcode: tags.get("addr:postcode").cloned(),
            city: tags.get("addr:city").cloned(),
            point,
        });
    }
}

/// Storage for finished geometries, such as a spatial index.
pub trait GeometrySink {
    fn insert_way(&mut self, id: OsmId, way: &Way);
    fn insert_relation(&mut self, id: OsmId, relation: &Relation);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn highway_values_decide_roads() {
        let classifier = HighwayClassifier::default();
        assert!(classifier.is_road(&tags(&[("highway", "residential")])));
        assert!(!classifier.is_road(&tags(&[("highway", "proposed")])));
        assert!(!classifier.is_road(&tags(&[("building", "yes")])));

        let narrow = HighwayClassifier::new(["motorway"]);
        assert!(!narrow.is_road(&tags(&[("highway", "residential")])));
    }

    #[test]
    fn closures_classify_too() {
        let everything = |_: &Tags| true;
        assert!(everything.is_road(&Tags::new()));
    }

    #[test]
    fn address_book_keeps_complete_addresses() {
        let mut book = AddressBook::new();
        let point = GeoPoint::new(55.0, 12.0);
        book.index_address(1, &tags(&[("addr:street", " Rued Langgaards Vej "), ("addr:housenumber", "7")]), point);
        book.index_address(2, &tags(&[("addr:street", "Nørregade")]), point);
        book.index_address(3, &tags(&[("amenity", "cafe")]), point);

        assert_eq!(book.len(), 1);
        assert_eq!(book.addresses[0].street, "Rued Langgaards Vej");
        assert_eq!(book.addresses[0].house_number, "7");
        assert_eq!(book.addresses[0].postcode, None);
    }
}
