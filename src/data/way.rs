use std::{hash::Hash, iter::FusedIterator};

use crate::errors::{Error, Result};

use super::geo::{GeoPoint, ProjectedPoint};

/// An ordered path of points, stored as a flat run of projected `x, y` pairs.
///
/// Tens of millions of points pass through here on a country-sized export,
/// so no per-point objects are kept. Points are rebuilt on access.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone)]
#[archive(check_bytes)]
pub struct Way {
    coords: Vec<f64>,
    is_road: bool,
}

impl Way {
    /// Builds a plain (non-road) way. Fails on fewer than two points.
    pub fn new(points: &[GeoPoint]) -> Result<Self> {
        Self::build(points, false)
    }

    /// Builds a way that belongs to the routable road network.
    pub fn road(points: &[GeoPoint]) -> Result<Self> {
        Self::build(points, true)
    }

    fn build(points: &[GeoPoint], is_road: bool) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::InvalidGeometry(format!(
                "a way needs at least 2 points, got {}",
                points.len()
            )));
        }
        let mut coords = Vec::with_capacity(points.len() * 2);
        for point in points {
            let projected = point.project();
            coords.push(projected.x);
            coords.push(projected.y);
        }
        Ok(Way { coords, is_road })
    }

    pub fn is_road(&self) -> bool {
        self.is_road
    }

    /// The road view of this way, if it was classified as one.
    pub fn as_road(&self) -> Option<Road<'_>> {
        self.is_road.then_some(Road { way: self })
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn push(&mut self, point: GeoPoint) {
        let projected = point.project();
        self.coords.push(projected.x);
        self.coords.push(projected.y);
    }

    pub fn get(&self, index: usize) -> Result<GeoPoint> {
        self.projected(index)
            .map(|projected| projected.inverse())
            .ok_or(Error::IndexOutOfRange { index, len: self.len() })
    }

    pub fn projected(&self, index: usize) -> Option<ProjectedPoint> {
        let x = *self.coords.get(index * 2)?;
        let y = *self.coords.get(index * 2 + 1)?;
        Some(ProjectedPoint::new(x, y))
    }

    pub fn first(&self) -> Option<GeoPoint> {
        self.get(0).ok()
    }

    pub fn last(&self) -> Option<GeoPoint> {
        self.len().checked_sub(1).and_then(|index| self.get(index).ok())
    }

    pub fn iter(&self) -> WayIter<'_> {
        WayIter { coords: &self.coords }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.iter().any(|candidate| candidate == *point)
    }

    /// Length along the path in metres.
    pub fn length_m(&self) -> f64 {
        self.iter()
            .zip(self.iter().skip(1))
            .map(|(a, b)| a.distance_m(&b))
            .sum()
    }
}

impl PartialEq for Way {
    fn eq(&self, other: &Self) -> bool {
        self.is_road == other.is_road
            && self.coords.len() == other.coords.len()
            && self.coords.iter().zip(&other.coords).all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Way { }

impl Hash for Way {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.is_road.hash(state);
        self.coords.len().hash(state);
        for coord in &self.coords {
            coord.to_bits().hash(state);
        }
    }
}

impl<'a> IntoIterator for &'a Way {
    type Item = GeoPoint;
    type IntoIter = WayIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazily rebuilds the points of a [`Way`] in order.
#[derive(Debug, Clone)]
pub struct WayIter<'a> {
    coords: &'a [f64],
}

impl Iterator for WayIter<'_> {
    type Item = GeoPoint;

    fn next(&mut self) -> Option<Self::Item> {
        match self.coords {
            [x, y, rest @ ..] => {
                let point = ProjectedPoint::new(*x, *y).inverse();
                self.coords = rest;
                Some(point)
            },
            _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.coords.len() / 2;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for WayIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self.coords {
            [rest @ .., x, y] => {
                let point = ProjectedPoint::new(*x, *y).inverse();
                self.coords = rest;
                Some(point)
            },
            _ => None,
        }
    }
}

impl ExactSizeIterator for WayIter<'_> { }

impl FusedIterator for WayIter<'_> { }

/// A [`Way`] known to be part of the road network.
#[derive(Debug, Clone, Copy)]
pub struct Road<'a> {
    way: &'a Way,
}

impl<'a> Road<'a> {
    pub fn way(&self) -> &'a Way {
        self.way
    }

    /// First and last point. These are always graph vertices.
    pub fn endpoints(&self) -> Option<(GeoPoint, GeoPoint)> {
        Some((self.way.first()?, self.way.last()?))
    }

    /// Every point except the two endpoints, in path order.
    pub fn interior(&self) -> impl Iterator<Item = GeoPoint> + 'a {
        let len = self.way.len();
        self.way.iter().skip(1).take(len.saturating_sub(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<GeoPoint> {
        (0..n).map(|i| GeoPoint::new(55.0 + i as f32 * 0.001, 12.0 + i as f32 * 0.002)).collect()
    }

    #[test]
    fn appended_points_come_back_in_order() {
        let input = points(5);
        let mut way = Way::new(&input[..2]).unwrap();
        for point in &input[2..] {
            way.push(*point);
        }

        assert_eq!(way.len(), 5);
        assert_eq!(way.iter().collect::<Vec<_>>(), input);
        assert_eq!(way.iter().len(), 5);
        // Restartable.
        assert_eq!(way.iter().count(), 5);
        assert_eq!(way.first(), Some(input[0]));
        assert_eq!(way.last(), Some(input[4]));
        assert_eq!(way.get(3).unwrap(), input[3]);
    }

    #[test]
    fn fewer_than_two_points_is_rejected() {
        assert!(matches!(Way::new(&[]), Err(Error::InvalidGeometry(_))));
        assert!(matches!(Way::road(&points(1)), Err(Error::InvalidGeometry(_))));
        assert!(Way::new(&points(2)).is_ok());
    }

    #[test]
    fn indexed_access_is_bounds_checked() {
        let way = Way::new(&points(3)).unwrap();
        assert!(matches!(way.get(3), Err(Error::IndexOutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn equality_follows_stored_coordinates() {
        let a = Way::new(&points(3)).unwrap();
        let b = Way::new(&points(3)).unwrap();
        let road = Way::road(&points(3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, road);
        assert_ne!(a, Way::new(&points(4)).unwrap());
    }

    #[test]
    fn road_view_only_exists_on_roads() {
        let input = points(5);
        assert!(Way::new(&input).unwrap().as_road().is_none());

        let way = Way::road(&input).unwrap();
        let road = way.as_road().unwrap();
        assert_eq!(road.endpoints(), Some((input[0], input[4])));
        assert_eq!(road.interior().collect::<Vec<_>>(), input[1..4].to_vec());
    }

    #[test]
    fn two_point_road_has_no_interior() {
        let way = Way::road(&points(2)).unwrap();
        assert_eq!(way.as_road().unwrap().interior().count(), 0);
    }

    #[test]
    fn length_sums_the_segments() {
        let input = points(4);
        let way = Way::new(&input).unwrap();
        let expected: f64 = input.windows(2).map(|pair| pair[0].distance_m(&pair[1])).sum();
        assert!((way.length_m() - expected).abs() < 1e-9);
        assert!(way.length_m() > 0.0);
    }

    #[test]
    fn reverse_iteration() {
        let input = points(4);
        let way = Way::new(&input).unwrap();
        let mut reversed: Vec<_> = way.iter().rev().collect();
        reversed.reverse();
        assert_eq!(reversed, input);
        assert!(way.contains(&input[2]));
        assert!(!way.contains(&GeoPoint::new(0.0, 0.0)));
    }
}
