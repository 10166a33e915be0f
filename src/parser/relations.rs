use serde::{Deserialize, Serialize};

use crate::data::{relation::Relation, OsmId, Tags};

/// A tag that is dropped on sight instead of being stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExcludedTag {
    pub key: String,
    pub value: String,
}

impl ExcludedTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ExcludedTag {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Exact key/value pairs known to be bogus in source data.
#[derive(Debug, Default, Clone)]
pub struct TagExclusions {
    pairs: Vec<ExcludedTag>,
}

impl TagExclusions {
    pub fn new(pairs: Vec<ExcludedTag>) -> Self {
        TagExclusions { pairs }
    }

    pub fn is_excluded(&self, key: &str, value: &str) -> bool {
        self.pairs.iter().any(|pair| pair.key == key && pair.value == value)
    }
}

/// Gathers the members and tags of the relation being read and decides
/// whether it is kept.
#[derive(Debug, Default)]
pub struct RelationAssembler {
    exclusions: TagExclusions,
    dropping_keys: Vec<String>,
    tags: Tags,
    ways: Vec<OsmId>,
    relations: Vec<OsmId>,
    dropped: usize,
}

impl RelationAssembler {
    /// `dropping_keys`: a relation carrying any of these tag keys is not kept.
    pub fn new(exclusions: TagExclusions, dropping_keys: Vec<String>) -> Self {
        RelationAssembler {
            exclusions,
            dropping_keys,
            ..Self::default()
        }
    }

    pub fn add_tag(&mut self, key: &str, value: &str) {
        if !self.exclusions.is_excluded(key, value) {
            self.tags.insert(key.to_string(), value.to_string());
        }
    }

    pub fn add_way(&mut self, id: OsmId) {
        self.ways.push(id);
    }

    pub fn add_relation(&mut self, id: OsmId) {
        self.relations.push(id);
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Builds the relation read so far and resets for the next one.
    /// `None` when its tags rule it out.
    pub fn finish(&mut self) -> Option<Relation> {
        let ways = std::mem::take(&mut self.ways);
        let relations = std::mem::take(&mut self.relations);
        let keep = !self.dropping_keys.iter().any(|key| self.tags.contains_key(key));
        self.tags.clear();
        if keep {
            Some(Relation::new(ways, relations))
        } else {
            self.dropped += 1;
            None
        }
    }

    /// Relations turned away by [`RelationAssembler::finish`] so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.tags.clear();
        self.ways.clear();
        self.relations.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> RelationAssembler {
        RelationAssembler::new(
            TagExclusions::new(vec![ExcludedTag::new("name", "Øer i det Danske Øpas")]),
            vec!["route".to_string()],
        )
    }

    #[test]
    fn members_keep_their_order() {
        let mut assembler = assembler();
        assembler.add_way(3);
        assembler.add_relation(9);
        assembler.add_way(1);
        let relation = assembler.finish().unwrap();
        assert_eq!(relation.ways(), &[3, 1]);
        assert_eq!(relation.relations(), &[9]);
        assert_eq!(relation.member_count(), 3);
    }

    #[test]
    fn route_relations_are_dropped() {
        let mut assembler = assembler();
        assembler.add_way(3);
        assembler.add_tag("route", "bus");
        assert!(assembler.finish().is_none());
        assert_eq!(assembler.dropped(), 1);

        // State does not leak into the next relation.
        assembler.add_way(4);
        assert_eq!(assembler.finish().unwrap().ways(), &[4]);
    }

    #[test]
    fn excluded_pairs_are_never_stored() {
        let mut assembler = assembler();
        assembler.add_tag("name", "Øer i det Danske Øpas");
        assembler.add_tag("name:en", "Øer i det Danske Øpas");
        assert!(!assembler.tags().contains_key("name"));
        assert!(assembler.tags().contains_key("name:en"));

        assembler.add_tag("name", "Fyn");
        assert_eq!(assembler.tags().get("name").map(String::as_str), Some("Fyn"));
    }
}
