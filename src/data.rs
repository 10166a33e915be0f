use std::collections::{HashMap, HashSet};

use crate::graph::{self, RoadEdge, VertexMap};
use crate::parser::collab::GeometrySink;

use self::geo::{BoundingBox, GeoPoint};
use self::relation::Relation;
use self::way::Way;

pub mod geo;
pub mod relation;
pub mod way;

pub type OsmId = i64;

/// Key/value tags of one element.
pub type Tags = HashMap<String, String>;

/// Records keyed by source id, iterated in the order they were first inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    entries: Vec<(OsmId, T)>,
    index: HashMap<OsmId, usize>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`. A repeated id replaces the old value in place and
    /// keeps its original position.
    pub fn insert(&mut self, id: OsmId, value: T) -> Option<T> {
        match self.index.get(&id) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push((id, value));
                None
            },
        }
    }

    pub fn get(&self, id: OsmId) -> Option<&T> {
        self.index.get(&id).map(|&position| &self.entries[position].1)
    }

    pub fn contains(&self, id: OsmId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (OsmId, &T)> + ExactSizeIterator + Clone + '_ {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + Clone + '_ {
        self.entries.iter().map(|(_, value)| value)
    }
}

impl<T> FromIterator<(OsmId, T)> for Table<T> {
    fn from_iter<I: IntoIterator<Item = (OsmId, T)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (id, value) in iter {
            table.insert(id, value);
        }
        table
    }
}

/// Everything one parse produces.
///
/// Roads live in `ways` next to every other way and are told apart by
/// [`Way::is_road`]; [`MapData::roads`] and [`MapData::plain_ways`] are the two views.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapData {
    pub bounds: BoundingBox,
    pub vertices: VertexMap,
    pub ways: Table<Way>,
    pub relations: Table<Relation>,
}

impl MapData {
    pub fn roads(&self) -> impl Iterator<Item = (OsmId, &Way)> + Clone + '_ {
        self.ways.iter().filter(|(_, way)| way.is_road())
    }

    pub fn plain_ways(&self) -> impl Iterator<Item = (OsmId, &Way)> + Clone + '_ {
        self.ways.iter().filter(|(_, way)| !way.is_road())
    }

    pub fn road_count(&self) -> usize {
        self.roads().count()
    }

    pub fn road_edges(&self) -> Vec<RoadEdge> {
        graph::road_edges(self.roads(), &self.vertices)
    }

    /// All ways below `relation`, depth first in member order.
    ///
    /// Each member relation is entered once, so a hand-built table with a
    /// cycle still terminates.
    pub fn relation_geometry<'a>(&'a self, relation: &'a Relation) -> Vec<&'a Way> {
        let mut ways = Vec::new();
        self.collect_relation_ways(relation, &mut HashSet::new(), &mut ways);
        ways
    }

    fn collect_relation_ways<'a>(
        &'a self,
        relation: &'a Relation,
        visited: &mut HashSet<OsmId>,
        out: &mut Vec<&'a Way>,
    ) {
        out.extend(relation.ways().iter().filter_map(|id| self.ways.get(*id)));
        for id in relation.relations() {
            if !visited.insert(*id) {
                continue;
            }
            if let Some(child) = self.relations.get(*id) {
                self.collect_relation_ways(child, visited, out);
            }
        }
    }

    /// Hands every way (roads included) and then every relation to `sink`, once each.
    pub fn fill_index(&self, sink: &mut dyn GeometrySink) {
        for (id, way) in self.ways.iter() {
            sink.insert_way(id, way);
        }
        for (id, relation) in self.relations.iter() {
            sink.insert_relation(id, relation);
        }
    }

    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            bounds: self.bounds,
            vertices: self.vertices.points().to_vec(),
            ways: self
                .ways
                .iter()
                .map(|(id, way)| WayEntry { id, way: way.clone() })
                .collect(),
            relations: self
                .relations
                .iter()
                .map(|(id, relation)| RelationEntry { id, relation: relation.clone() })
                .collect(),
        }
    }
}

impl From<MapSnapshot> for MapData {
    fn from(value: MapSnapshot) -> Self {
        MapData {
            bounds: value.bounds,
            vertices: VertexMap::from_points(value.vertices),
            ways: value.ways.into_iter().map(|entry| (entry.id, entry.way)).collect(),
            relations: value
                .relations
                .into_iter()
                .map(|entry| (entry.id, entry.relation))
                .collect(),
        }
    }
}

/// Flat, archivable form of [`MapData`]. Vertices are listed in id order.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone)]
#[archive(check_bytes)]
pub struct MapSnapshot {
    pub bounds: BoundingBox,
    pub vertices: Vec<GeoPoint>,
    pub ways: Vec<WayEntry>,
    pub relations: Vec<RelationEntry>,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone)]
#[archive(check_bytes)]
pub struct WayEntry {
    pub id: OsmId,
    pub way: Way,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone)]
#[archive(check_bytes)]
pub struct RelationEntry {
    pub id: OsmId,
    pub relation: Relation,
}
