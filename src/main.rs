use std::env;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_ingest::config::{load_user_config, UserConfig};
use osm_ingest::errors::Result;
use osm_ingest::etl::parse_osm::ParseOsmEtl;
use osm_ingest::etl::Etl;

const DEFAULT_CONFIG_PATH: &str = "config.json";

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let input_fname = Path::new(&config.data_path)
        .file_name()
        .ok_or("Could not get input file name")?;
    let output_dir = Path::new(&config.dest_path).join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut force = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--force" => force = true,
            _ => config_path = arg,
        }
    }

    let user_config = load_user_config(Path::new(&config_path))?;
    setup_logging(&user_config.log_level);

    let output_dir = create_output_dir(&user_config)?;
    let mut etl = ParseOsmEtl::new(&user_config);
    if force {
        etl.rerun(&output_dir)?;
    } else {
        etl.process(&output_dir)?;
    }

    let map = ParseOsmEtl::read_cached(&output_dir)?;
    info!(
        vertices = map.vertices.len(),
        ways = map.ways.len(),
        roads = map.road_count(),
        relations = map.relations.len();
        "Read map from cache"
    );

    let mut network_m = 0.0;
    for edge in tqdm::tqdm(map.road_edges().into_iter()) {
        network_m += edge.length_m;
    }
    info!(network_km = network_m / 1000.0, bounds = map.bounds.to_string().as_str(); "Road network measured");

    Ok(())
}
