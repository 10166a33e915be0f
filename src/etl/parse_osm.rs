use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::config::UserConfig;
use crate::data::{MapData, MapSnapshot};
use crate::errors::{Error, Result};
use crate::etl::Etl;
use crate::parser::OsmParser;
use crate::parser::collab::AddressBook;
use crate::source::open_source;

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "map_data.rkyv";
pub const ADDRESSES_FILE_NAME: &str = "addresses.json";

pub struct Output {
    pub map: MapData,
    pub addresses: AddressBook,
}

pub struct ParseOsmEtl<'a> {
    config: &'a UserConfig,
    parser: OsmParser,
}

impl ParseOsmEtl<'_> {
    pub fn new(config: &UserConfig) -> ParseOsmEtl {
        ParseOsmEtl {
            config,
            parser: OsmParser::from_config(&config.parser),
        }
    }

    pub fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn addresses_path(dir: &Path) -> PathBuf {
        dir.join(ADDRESSES_FILE_NAME)
    }

    /// Loads the map written by an earlier run.
    pub fn read_cached(dir: &Path) -> Result<MapData> {
        let bytes = fs::read(Self::output_path(dir))?;
        let snapshot: MapSnapshot = rkyv::from_bytes(&bytes)
            .map_err(|err| Error::Serialization(format!("could not read map cache: {:?}", err)))?;
        Ok(snapshot.into())
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Input = Box<dyn BufRead>;
    type Output = Output;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        for path in [Self::output_path(dir), Self::addresses_path(dir)] {
            if path.try_exists()? {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        open_source(Path::new(&self.config.data_path))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let mut addresses = AddressBook::new();
        let map = self.parser.parse_reader(input, &mut addresses)?;
        info!(addresses = addresses.len(); "Collected addresses");
        Ok(Output { map, addresses })
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        fs::create_dir_all(dir)?;

        let bytes = rkyv::to_bytes::<_, 256>(&output.map.snapshot())
            .map_err(|err| Error::Serialization(format!("could not archive map: {:?}", err)))?;
        let mut output_file = File::create(Self::output_path(dir))?;
        output_file.write_all(&bytes)?;

        let mut addresses_file = BufWriter::new(File::create(Self::addresses_path(dir))?);
        serde_json::to_writer(&mut addresses_file, &output.addresses)
            .map_err(|err| Error::Serialization(err.to_string()))?;
        addresses_file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ParserConfig;

    use super::*;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
 <bounds minlat="55.0" minlon="12.0" maxlat="55.1" maxlon="12.1"/>
 <node id="1" lat="55.0" lon="12.0">
  <tag k="addr:street" v="Havnegade"/>
  <tag k="addr:housenumber" v="1"/>
 </node>
 <node id="2" lat="55.001" lon="12.001"/>
 <way id="10">
  <nd ref="1"/>
  <nd ref="2"/>
  <tag k="highway" v="residential"/>
 </way>
</osm>"#;

    #[test]
    fn process_writes_a_readable_cache() {
        let dir = std::env::temp_dir().join(format!("osm_ingest_etl_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join("map.osm");
        fs::write(&data_path, MAP).unwrap();

        let config = UserConfig {
            data_path: data_path.to_string_lossy().into_owned(),
            dest_path: dir.to_string_lossy().into_owned(),
            log_level: "info".to_string(),
            parser: ParserConfig::default(),
        };
        let mut etl = ParseOsmEtl::new(&config);
        etl.rerun(&dir).unwrap();
        assert!(etl.is_cached(&dir).unwrap());

        let map = ParseOsmEtl::read_cached(&dir).unwrap();
        assert_eq!(map.road_count(), 1);
        assert_eq!(map.vertices.len(), 2);

        let addresses: AddressBook =
            serde_json::from_str(&fs::read_to_string(ParseOsmEtl::addresses_path(&dir)).unwrap()).unwrap();
        assert_eq!(addresses.addresses[0].street, "Havnegade");

        etl.clean(&dir).unwrap();
        assert!(!etl.is_cached(&dir).unwrap());
        fs::remove_dir_all(&dir).unwrap();
    }
}
