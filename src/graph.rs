//! Reduction of the road network to the vertices a routing graph needs:
//! every road endpoint plus every interior point used more than once.

use std::collections::HashMap;

use crate::data::{geo::GeoPoint, way::Way, OsmId};

pub type VertexId = usize;

/// Points of the road graph, numbered densely from 0 in the order they were found.
/// An id is never reassigned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VertexMap {
    ids: HashMap<GeoPoint, VertexId>,
    points: Vec<GeoPoint>,
}

impl VertexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a map from points listed in id order.
    pub fn from_points(points: Vec<GeoPoint>) -> Self {
        let ids = points
            .iter()
            .enumerate()
            .map(|(id, point)| (*point, id))
            .collect();
        VertexMap { ids, points }
    }

    /// Returns the id of `point`, handing out the next one if it has none yet.
    pub fn assign(&mut self, point: GeoPoint) -> VertexId {
        let next = self.points.len();
        let id = *self.ids.entry(point).or_insert(next);
        if id == next {
            self.points.push(point);
        }
        id
    }

    pub fn get(&self, point: &GeoPoint) -> Option<VertexId> {
        self.ids.get(point).copied()
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.ids.contains_key(point)
    }

    pub fn point(&self, id: VertexId) -> Option<GeoPoint> {
        self.points.get(id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in id order.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, GeoPoint)> + '_ {
        self.points.iter().enumerate().map(|(id, point)| (id, *point))
    }
}

/// How many times each point occurs as an interior point of some road.
#[derive(Debug, Default, Clone)]
pub struct UsageCounter {
    counts: HashMap<GeoPoint, u32>,
}

impl UsageCounter {
    pub fn increment(&mut self, point: GeoPoint) {
        *self.counts.entry(point).or_insert(0) += 1;
    }

    pub fn count(&self, point: &GeoPoint) -> u32 {
        self.counts.get(point).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Builds a [`VertexMap`] while roads stream past, then sweeps for junctions.
///
/// Endpoints are numbered as each road is observed. Junction status is only
/// known after the last road, so [`VertexExtractor::finish`] must be given the
/// same roads again, in the same order, to number the junctions.
#[derive(Debug, Default)]
pub struct VertexExtractor {
    vertices: VertexMap,
    usage: UsageCounter,
}

impl VertexExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a road. Non-road ways are ignored.
    pub fn observe(&mut self, way: &Way) {
        let Some(road) = way.as_road() else {
            return;
        };
        let Some((first, last)) = road.endpoints() else {
            return;
        };
        self.vertices.assign(first);
        for point in road.interior() {
            self.usage.increment(point);
        }
        self.vertices.assign(last);
    }

    /// Numbers every interior point used at least twice and drops the usage counts.
    pub fn finish<'a>(self, roads: impl IntoIterator<Item = &'a Way>) -> VertexMap {
        let VertexExtractor { mut vertices, usage } = self;
        for road in roads.into_iter().filter_map(Way::as_road) {
            for point in road.interior() {
                if usage.count(&point) >= 2 && !vertices.contains(&point) {
                    vertices.assign(point);
                }
            }
        }
        vertices
    }
}

/// Both passes over an already collected road list.
pub fn extract_vertices<'a, I>(roads: I) -> VertexMap
where
    I: IntoIterator<Item = &'a Way>,
    I::IntoIter: Clone,
{
    let roads = roads.into_iter();
    let mut extractor = VertexExtractor::new();
    for road in roads.clone() {
        extractor.observe(road);
    }
    extractor.finish(roads)
}

/// A stretch of road between two consecutive graph vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadEdge {
    pub way: OsmId,
    pub from: VertexId,
    pub to: VertexId,
    pub length_m: f64,
}

/// Splits every road at the vertices it passes through.
///
/// Points of a road missing from `vertices` are folded into the length of the
/// edge they sit on.
pub fn road_edges<'a>(
    roads: impl IntoIterator<Item = (OsmId, &'a Way)>,
    vertices: &VertexMap,
) -> Vec<RoadEdge> {
    let mut edges = Vec::new();
    for (id, way) in roads {
        if !way.is_road() {
            continue;
        }
        let mut points = way.iter();
        let Some(mut previous) = points.next() else {
            continue;
        };
        let mut from = vertices.get(&previous);
        let mut length_m = 0.0;
        for point in points {
            length_m += previous.distance_m(&point);
            previous = point;
            let Some(to) = vertices.get(&point) else {
                continue;
            };
            if let Some(from) = from {
                edges.push(RoadEdge { way: id, from, to, length_m });
            }
            from = Some(to);
            length_m = 0.0;
        }
    }
    edges
}
