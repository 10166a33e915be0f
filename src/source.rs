use std::{fs::File, io::{BufRead, BufReader}, path::Path};

use flate2::bufread::MultiGzDecoder;
use log::info;
use xz::bufread::XzDecoder;

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Xz,
    Gzip,
}

impl Compression {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xz" => Some(Compression::Xz),
            "gz" | "gzip" => Some(Compression::Gzip),
            _ => None,
        }
    }

    /// Layers to peel off, outermost first. `map.osm.gz.xz` gives `[Xz, Gzip]`.
    pub fn layers(path: &Path) -> Vec<Self> {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        let extensions: Vec<&str> = name.split('.').skip(1).collect();
        extensions
            .into_iter()
            .rev()
            .map_while(Compression::from_extension)
            .collect()
    }
}

/// Opens `path` and decompresses it as its extensions say.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn BufRead> = Box::new(BufReader::new(file));
    for layer in Compression::layers(path) {
        info!(layer = format!("{:?}", layer).as_str(); "Unwrapping compression layer");
        reader = match layer {
            Compression::Xz => Box::new(BufReader::new(XzDecoder::new(reader))),
            Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(reader))),
        };
    }
    Ok(reader)
}
