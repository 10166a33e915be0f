use super::OsmId;

/// A grouping of ways and earlier relations, members kept in input order.
///
/// Members are ids into the way and relation tables of the same
/// [`MapData`](super::MapData). The parser only links a relation to relations
/// kept before it and never replaces a kept one, so parsed maps hold no cycles.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
pub struct Relation {
    ways: Vec<OsmId>,
    relations: Vec<OsmId>,
}

impl Relation {
    pub fn new(ways: Vec<OsmId>, relations: Vec<OsmId>) -> Self {
        Relation { ways, relations }
    }

    pub fn ways(&self) -> &[OsmId] {
        &self.ways
    }

    pub fn relations(&self) -> &[OsmId] {
        &self.relations
    }

    pub fn member_count(&self) -> usize {
        self.ways.len() + self.relations.len()
    }
}
