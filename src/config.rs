use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::parser::collab::DEFAULT_ROAD_VALUES;
use crate::parser::relations::ExcludedTag;

/// Tag name value duplicated across a batch of Danish island relations.
pub const ANOMALOUS_NAME: &str = "Øer i det Danske Øpas";

#[derive(Deserialize, Debug, Clone)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub parser: ParserConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// `highway` values that make a way a road.
    pub road_highway_values: Vec<String>,
    /// Relation tags discarded while reading.
    pub excluded_tags: Vec<ExcludedTag>,
    /// Relations carrying any of these keys are left out of the output.
    pub excluded_relation_keys: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            road_highway_values: DEFAULT_ROAD_VALUES.iter().map(|value| value.to_string()).collect(),
            excluded_tags: vec![ExcludedTag::new("name", ANOMALOUS_NAME)],
            excluded_relation_keys: vec!["route".to_string()],
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)
        .map_err(|err| Error::Config(format!("could not open {}: {}", path.display(), err)))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
