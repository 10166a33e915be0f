use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize};

/// Horizontal scale of the map projection. Roughly cos(56°), which keeps
/// Scandinavian latitudes close to true proportions.
pub const LON_SCALE: f64 = 0.56;

const EARTH_DIAMETER_M: f64 = 6_371_000.0 * 2.0;

/// A coordinate as found in the map export, in degrees.
///
/// Equality and hashing are bit-exact on the stored floats, so `0.0` and
/// `-0.0` are different points and a NaN point equals itself.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, Clone, Copy)]
#[archive(check_bytes)]
pub struct GeoPoint {
    lat: f32,
    lon: f32,
}

impl GeoPoint {
    pub fn new(lat: f32, lon: f32) -> Self {
        GeoPoint { lat, lon }
    }

    pub fn lat(&self) -> f32 {
        self.lat
    }

    pub fn lon(&self) -> f32 {
        self.lon
    }

    pub fn project(&self) -> ProjectedPoint {
        ProjectedPoint {
            x: f64::from(self.lon) * LON_SCALE,
            y: -f64::from(self.lat),
        }
    }

    /// Great-circle distance in metres (haversine).
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let (lat1, lon1) = (f64::from(self.lat).to_radians(), f64::from(self.lon).to_radians());
        let (lat2, lon2) = (f64::from(other.lat).to_radians(), f64::from(other.lon).to_radians());

        let lat_term = ((lat2 - lat1) * 0.5).sin().powi(2);
        let lon_term = ((lon2 - lon1) * 0.5).sin().powi(2);
        EARTH_DIAMETER_M * (lat_term + lat1.cos() * lat2.cos() * lon_term).sqrt().asin()
    }

    /// FCC flat-earth approximation in metres. Cheaper than [`GeoPoint::distance_m`]
    /// and accurate for distances below roughly 475 km.
    pub fn distance_fcc_m(&self, other: &GeoPoint) -> f64 {
        let (lat1, lon1) = (f64::from(self.lat), f64::from(self.lon));
        let (lat2, lon2) = (f64::from(other.lat), f64::from(other.lon));
        let mean_lat = (lat1 + lat2) * 0.5;

        let km_per_deg_lat = 111.13209
            - 0.56605 * (2.0 * mean_lat).to_radians().cos()
            + 0.00120 * (4.0 * mean_lat).to_radians().cos();
        let km_per_deg_lon = 111.41513 * mean_lat.to_radians().cos()
            - 0.09455 * (3.0 * mean_lat).to_radians().cos()
            + 0.00012 * (5.0 * mean_lat).to_radians().cos();

        let north_south = km_per_deg_lat * (lat1 - lat2);
        let east_west = km_per_deg_lon * (lon1 - lon2);
        1000.0 * (north_south * north_south + east_west * east_west).sqrt()
    }
}

impl Hash for GeoPoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

impl Eq for GeoPoint { }

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lon.to_bits() == other.lon.to_bits()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}°, {}°)", self.lat, self.lon)
    }
}

/// A [`GeoPoint`] in map space: `x = lon * 0.56`, `y = -lat`.
///
/// Held in double precision so that [`ProjectedPoint::inverse`] gives back the
/// original single-precision point bit for bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ProjectedPoint { x, y }
    }

    pub fn inverse(&self) -> GeoPoint {
        GeoPoint {
            lat: (-self.y) as f32,
            lon: (self.x / LON_SCALE) as f32,
        }
    }
}

impl From<GeoPoint> for ProjectedPoint {
    fn from(value: GeoPoint) -> Self {
        value.project()
    }
}

impl From<ProjectedPoint> for GeoPoint {
    fn from(value: ProjectedPoint) -> Self {
        value.inverse()
    }
}

/// Geographic extent of a whole dataset. Min fields are never larger than max fields.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[archive(check_bytes)]
pub struct BoundingBox {
    min_lat: f32,
    min_lon: f32,
    max_lat: f32,
    max_lon: f32,
}

impl BoundingBox {
    pub fn new(min_lat: f32, min_lon: f32, max_lat: f32, max_lon: f32) -> Self {
        BoundingBox {
            min_lat: min_lat.min(max_lat),
            min_lon: min_lon.min(max_lon),
            max_lat: min_lat.max(max_lat),
            max_lon: min_lon.max(max_lon),
        }
    }

    pub fn min_lat(&self) -> f32 {
        self.min_lat
    }

    pub fn min_lon(&self) -> f32 {
        self.min_lon
    }

    pub fn max_lat(&self) -> f32 {
        self.max_lat
    }

    pub fn max_lon(&self) -> f32 {
        self.max_lon
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(lat, lon): ({}, {}), ({}, {})",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn projection_round_trips_bit_exactly() {
        let samples = [
            (55.0, 12.0),
            (55.001, 12.001),
            (-33.868_82, 151.209_29),
            (89.999_99, -179.999_99),
            (0.0, -0.0),
            (f32::MIN_POSITIVE, 1.785_714_3),
            (1.999_999_9, 1.999_999_9),
        ];
        for (lat, lon) in samples {
            let point = GeoPoint::new(lat, lon);
            assert_eq!(point.project().inverse(), point, "{}", point);
        }

        // Sweep a dense band of longitudes where single precision scaling would collide.
        let mut lon = 1.785_714_3_f32;
        while lon < 2.0 {
            let point = GeoPoint::new(55.0, lon);
            assert_eq!(point.project().inverse(), point);
            lon = f32::from_bits(lon.to_bits() + 977);
        }
    }

    #[test]
    fn projection_matches_linear_map() {
        let projected = GeoPoint::new(10.0, 100.0).project();
        assert!((projected.x - 56.0).abs() < 1e-4);
        assert_eq!(projected.y, -10.0);
    }

    #[test]
    fn equality_is_bitwise() {
        assert_ne!(GeoPoint::new(0.0, 1.0), GeoPoint::new(-0.0, 1.0));
        assert_eq!(GeoPoint::new(f32::NAN, 1.0), GeoPoint::new(f32::NAN, 1.0));

        let set: HashSet<GeoPoint> = [GeoPoint::new(1.0, 2.0), GeoPoint::new(1.0, 2.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn distances_agree_on_short_hops() {
        let a = GeoPoint::new(55.0, 12.0);
        let b = GeoPoint::new(55.001, 12.001);
        let haversine = a.distance_m(&b);
        let fcc = a.distance_fcc_m(&b);
        assert!(haversine > 120.0 && haversine < 135.0, "{}", haversine);
        assert!((haversine - fcc).abs() < 1.0, "{} vs {}", haversine, fcc);
        assert_eq!(a.distance_m(&a), 0.0);
    }

    #[test]
    fn bounding_box_normalizes_and_contains() {
        let bounds = BoundingBox::new(56.0, 13.0, 55.0, 12.0);
        assert_eq!(bounds.min_lat(), 55.0);
        assert_eq!(bounds.max_lon(), 13.0);
        assert!(bounds.contains(&GeoPoint::new(55.5, 12.5)));
        assert!(!bounds.contains(&GeoPoint::new(57.0, 12.5)));
    }
}
