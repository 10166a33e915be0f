//! Single forward pass from an OSM XML export to [`MapData`].
//!
//! The export must list all nodes, then all ways, then all relations. That
//! is how every mainstream producer writes them, and each phase relies on the
//! complete output of the one before. An element that shows up after its
//! phase has ended stops the parse with a warning.

use std::{collections::HashMap, fmt, io::BufRead, str::FromStr, time::Instant};

use log::{debug, error, info, warn};

use crate::config::ParserConfig;
use crate::data::{geo::{BoundingBox, GeoPoint}, way::Way, MapData, OsmId, Tags};
use crate::errors::{Error, Result};
use crate::graph::VertexExtractor;

use self::collab::{AddressIndex, HighwayClassifier, RoadClassifier};
use self::cursor::{TagCursor, TagKind, XmlTagCursor};
use self::relations::{RelationAssembler, TagExclusions};

pub mod collab;
pub mod cursor;
pub mod relations;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    ExpectRoot,
    ExpectBounds,
    ParsingPoints,
    ParsingPaths,
    ParsingRelations,
    Done,
}

impl ParseState {
    fn next(self) -> Self {
        match self {
            ParseState::ExpectRoot => ParseState::ExpectBounds,
            ParseState::ExpectBounds => ParseState::ParsingPoints,
            ParseState::ParsingPoints => ParseState::ParsingPaths,
            ParseState::ParsingPaths => ParseState::ParsingRelations,
            ParseState::ParsingRelations | ParseState::Done => ParseState::Done,
        }
    }
}

/// Counters from the last parse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub points: usize,
    pub ways: usize,
    pub roads: usize,
    /// Ways left with fewer than two known points.
    pub dropped_ways: usize,
    /// Node references to points that were never declared.
    pub missing_points: usize,
    pub vertices: usize,
    pub relations: usize,
    /// Relations left out because of their tags.
    pub dropped_relations: usize,
    /// Way or relation members that could not be resolved.
    pub missing_members: usize,
    /// Ways or relations whose id was already taken. The first one wins.
    pub duplicates: usize,
}

/// Streaming OSM XML parser. Reusable: every call to [`OsmParser::parse`]
/// starts from scratch. Not meant to be shared between concurrent parses.
pub struct OsmParser<K: RoadClassifier = HighwayClassifier> {
    classifier: K,
    assembler: RelationAssembler,
    state: ParseState,
    stats: ParseStats,
    points: HashMap<OsmId, GeoPoint>,
    tags: Tags,
    way_points: Vec<GeoPoint>,
}

impl OsmParser<HighwayClassifier> {
    pub fn new() -> Self {
        Self::from_config(&ParserConfig::default())
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        let classifier = HighwayClassifier::new(config.road_highway_values.iter().cloned());
        Self::with_classifier(config, classifier)
    }
}

impl Default for OsmParser<HighwayClassifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RoadClassifier> OsmParser<K> {
    pub fn with_classifier(config: &ParserConfig, classifier: K) -> Self {
        OsmParser {
            classifier,
            assembler: RelationAssembler::new(
                TagExclusions::new(config.excluded_tags.clone()),
                config.excluded_relation_keys.clone(),
            ),
            state: ParseState::ExpectRoot,
            stats: ParseStats::default(),
            points: HashMap::new(),
            tags: Tags::new(),
            way_points: Vec::new(),
        }
    }

    /// Where the last parse got to. `Done` after success.
    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn parse_reader<R: BufRead>(&mut self, source: R, addresses: &mut dyn AddressIndex) -> Result<MapData> {
        self.parse(XmlTagCursor::new(source), addresses)
    }

    /// Consumes `cursor` to the end. On error nothing of the output survives.
    pub fn parse<C: TagCursor>(&mut self, mut cursor: C, addresses: &mut dyn AddressIndex) -> Result<MapData> {
        let started = Instant::now();
        self.reset();
        info!(state = self.state.to_string().as_str(); "Starting parse");

        let outcome = self.run(&mut cursor, addresses);
        self.release_scratch();

        match outcome {
            Ok(map) => {
                info!(
                    points = self.stats.points,
                    ways = self.stats.ways,
                    roads = self.stats.roads,
                    vertices = self.stats.vertices,
                    relations = self.stats.relations,
                    elapsed_ms = started.elapsed().as_millis() as u64;
                    "Parse finished"
                );
                Ok(map)
            },
            Err(err) => {
                error!(state = self.state.to_string().as_str(), err = err.to_string().as_str(); "Parse failed");
                Err(err)
            },
        }
    }

    fn run<C: TagCursor>(&mut self, cursor: &mut C, addresses: &mut dyn AddressIndex) -> Result<MapData> {
        let mut map = MapData::default();
        while self.state != ParseState::Done {
            match self.state {
                ParseState::ExpectRoot => self.expect_root(cursor)?,
                ParseState::ExpectBounds => map.bounds = self.read_bounds(cursor)?,
                ParseState::ParsingPoints => self.parse_points(cursor, addresses)?,
                ParseState::ParsingPaths => self.parse_ways(cursor, &mut map)?,
                ParseState::ParsingRelations => self.parse_relations(cursor, &mut map)?,
                ParseState::Done => (),
            }
            self.state = self.state.next();
        }
        Ok(map)
    }

    fn reset(&mut self) {
        self.state = ParseState::ExpectRoot;
        self.stats = ParseStats::default();
        self.assembler.reset();
        self.release_scratch();
    }

    fn release_scratch(&mut self) {
        self.points = HashMap::new();
        self.tags.clear();
        self.way_points.clear();
    }

    fn expect_root<C: TagCursor>(&mut self, cursor: &mut C) -> Result<()> {
        match cursor.next_tag()? {
            Some(TagKind::Start) if cursor.name() == b"osm" => Ok(()),
            _ => Err(Error::Structural(
                "expected an <osm> root element, this is not a valid map export".to_string(),
            )),
        }
    }

    fn read_bounds<C: TagCursor>(&mut self, cursor: &mut C) -> Result<BoundingBox> {
        // Leading <note>, <meta> and anything else before <bounds> is skipped.
        loop {
            match cursor.next_tag()? {
                Some(TagKind::Start) if cursor.name() == b"bounds" => break,
                Some(TagKind::Start) => cursor.skip_element()?,
                Some(TagKind::End) => (),
                None => {
                    return Err(Error::Structural(
                        "missing <bounds> element, this is not a valid map export".to_string(),
                    ))
                },
            }
        }
        let bounds = BoundingBox::new(
            required_attr(cursor, "bounds", "minlat")?,
            required_attr(cursor, "bounds", "minlon")?,
            required_attr(cursor, "bounds", "maxlat")?,
            required_attr(cursor, "bounds", "maxlon")?,
        );
        cursor.skip_element()?;
        cursor.next_tag()?;
        debug!(bounds = bounds.to_string().as_str(); "Read bounds");
        Ok(bounds)
    }

    fn parse_points<C: TagCursor>(&mut self, cursor: &mut C, addresses: &mut dyn AddressIndex) -> Result<()> {
        while cursor.at_start(b"node") {
            let id: OsmId = required_attr(cursor, "node", "id")?;
            let point = GeoPoint::new(
                required_attr(cursor, "node", "lat")?,
                required_attr(cursor, "node", "lon")?,
            );
            while next_child(cursor, "node")? {
                if cursor.name() == b"tag" {
                    read_tag(cursor, &mut self.tags);
                }
                cursor.skip_element()?;
            }
            addresses.index_address(id, &self.tags, point);
            self.points.insert(id, point);
            self.tags.clear();
            cursor.next_tag()?;
        }
        self.stats.points = self.points.len();
        info!(points = self.stats.points; "Parsed points");
        Ok(())
    }

    fn parse_ways<C: TagCursor>(&mut self, cursor: &mut C, map: &mut MapData) -> Result<()> {
        let mut extractor = VertexExtractor::new();
        while cursor.at_start(b"way") {
            let id: OsmId = required_attr(cursor, "way", "id")?;
            while next_child(cursor, "way")? {
                if cursor.name() == b"nd" {
                    let reference: OsmId = required_attr(cursor, "nd", "ref")?;
                    match self.points.get(&reference) {
                        Some(point) => self.way_points.push(*point),
                        None => self.stats.missing_points += 1,
                    }
                } else if cursor.name() == b"tag" {
                    read_tag(cursor, &mut self.tags);
                } else {
                    let child = String::from_utf8_lossy(cursor.name());
                    debug!(way = id, child = &*child; "Skipping unknown child");
                }
                cursor.skip_element()?;
            }
            self.finish_way(id, map, &mut extractor)?;
            cursor.next_tag()?;
        }

        // Points are only ever looked up by ways.
        self.points = HashMap::new();
        map.vertices = extractor.finish(map.ways.values());

        self.stats.ways = map.ways.len();
        self.stats.vertices = map.vertices.len();
        info!(
            ways = self.stats.ways,
            roads = self.stats.roads,
            dropped_ways = self.stats.dropped_ways,
            missing_points = self.stats.missing_points,
            duplicates = self.stats.duplicates,
            vertices = self.stats.vertices;
            "Parsed ways"
        );
        Ok(())
    }

    fn finish_way(&mut self, id: OsmId, map: &mut MapData, extractor: &mut VertexExtractor) -> Result<()> {
        if map.ways.contains(id) {
            warn!(way = id; "Way id seen before, keeping the first");
            self.stats.duplicates += 1;
        } else if self.way_points.len() < 2 {
            debug!(way = id, points = self.way_points.len(); "Dropping way with fewer than 2 known points");
            self.stats.dropped_ways += 1;
        } else {
            let way = if self.classifier.is_road(&self.tags) {
                Way::road(&self.way_points)?
            } else {
                Way::new(&self.way_points)?
            };
            if way.is_road() {
                extractor.observe(&way);
                self.stats.roads += 1;
            }
            map.ways.insert(id, way);
        }
        self.way_points.clear();
        self.tags.clear();
        Ok(())
    }

    fn parse_relations<C: TagCursor>(&mut self, cursor: &mut C, map: &mut MapData) -> Result<()> {
        while cursor.at_start(b"relation") {
            let id: OsmId = required_attr(cursor, "relation", "id")?;
            while next_child(cursor, "relation")? {
                if cursor.name() == b"member" {
                    self.read_member(cursor, map)?;
                } else if cursor.name() == b"tag" {
                    if let (Some(key), Some(value)) = (cursor.attribute(b"k"), cursor.attribute(b"v")) {
                        self.assembler.add_tag(key, value);
                    }
                }
                cursor.skip_element()?;
            }
            let relation = self.assembler.finish();
            if map.relations.contains(id) {
                // Later relations may already point at the first one.
                warn!(relation = id; "Relation id seen before, keeping the first");
                self.stats.duplicates += 1;
            } else if let Some(relation) = relation {
                map.relations.insert(id, relation);
            }
            cursor.next_tag()?;
        }

        if cursor.current() == Some(TagKind::Start) {
            let element = String::from_utf8_lossy(cursor.name());
            warn!(element = &*element; "Element out of node, way, relation order, ignoring the rest of the stream");
        }

        self.stats.relations = map.relations.len();
        self.stats.dropped_relations = self.assembler.dropped();
        info!(
            relations = self.stats.relations,
            dropped_relations = self.stats.dropped_relations,
            missing_members = self.stats.missing_members,
            duplicates = self.stats.duplicates;
            "Parsed relations"
        );
        Ok(())
    }

    /// Relation members can only point back: at any way, or at a relation
    /// kept earlier in this phase. Anything else is dropped.
    fn read_member<C: TagCursor>(&mut self, cursor: &mut C, map: &MapData) -> Result<()> {
        match cursor.attribute(b"type") {
            Some("way") => {
                let reference: OsmId = required_attr(cursor, "member", "ref")?;
                if map.ways.contains(reference) {
                    self.assembler.add_way(reference);
                } else {
                    self.stats.missing_members += 1;
                }
            },
            Some("relation") => {
                let reference: OsmId = required_attr(cursor, "member", "ref")?;
                if map.relations.contains(reference) {
                    self.assembler.add_relation(reference);
                } else {
                    self.stats.missing_members += 1;
                }
            },
            // Node members carry no geometry of their own here.
            _ => (),
        }
        Ok(())
    }
}

impl fmt::Display for ParseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseState::ExpectRoot => "expect_root",
            ParseState::ExpectBounds => "expect_bounds",
            ParseState::ParsingPoints => "parsing_points",
            ParseState::ParsingPaths => "parsing_paths",
            ParseState::ParsingRelations => "parsing_relations",
            ParseState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Moves to the next child of the current element. `false` on the element's end tag.
fn next_child<C: TagCursor>(cursor: &mut C, parent: &str) -> Result<bool> {
    match cursor.next_tag()? {
        Some(TagKind::Start) => Ok(true),
        Some(TagKind::End) => Ok(false),
        None => Err(Error::Structural(format!("stream ended inside <{}>", parent))),
    }
}

fn required_attr<C, T>(cursor: &C, element: &str, key: &str) -> Result<T>
where
    C: TagCursor,
    T: FromStr,
    T::Err: fmt::Display,
{
    let value = cursor
        .attribute(key.as_bytes())
        .ok_or_else(|| Error::Format(format!("<{}> is missing attribute `{}`", element, key)))?;
    value
        .trim()
        .parse()
        .map_err(|err| Error::Format(format!("<{}> attribute `{}` = {:?}: {}", element, key, value, err)))
}

fn read_tag<C: TagCursor>(cursor: &C, tags: &mut Tags) {
    if let (Some(key), Some(value)) = (cursor.attribute(b"k"), cursor.attribute(b"v")) {
        tags.insert(key.to_string(), value.to_string());
    }
}
