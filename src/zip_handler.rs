use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::RasterConfig;
use crate::error::Result;
use crate::model::DemTile;
use crate::parser::parse_coverage;

/// One XML document read out of an archive.
#[derive(Debug, Clone)]
pub struct XmlEntry {
    pub name: String,
    pub content: Vec<u8>,
}

impl XmlEntry {
    /// `FG-GML-5339-DEM5A.xml` -> `FG-GML-5339-DEM5A.tif`
    pub fn output_file_name(&self) -> PathBuf {
        let file_name = Path::new(&self.name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.name));
        file_name.with_extension("tif")
    }
}

/// Conversion outcome for a single archive entry.
#[derive(Debug)]
pub struct EntryTile {
    pub entry_name: String,
    pub output_name: PathBuf,
    pub tile: Result<DemTile>,
}

pub struct ZipHandler {
    zip_path: PathBuf,
}

impl ZipHandler {
    pub fn new(zip_path: impl AsRef<Path>) -> Self {
        Self {
            zip_path: zip_path.as_ref().to_path_buf(),
        }
    }

    pub fn zip_path(&self) -> &Path {
        &self.zip_path
    }

    /// Reads every `*.xml` entry (case-insensitive) in archive order.
    pub fn xml_entries(&self) -> Result<Vec<XmlEntry>> {
        let file = File::open(&self.zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut entries = Vec::new();

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i)?;
            if zip_file.is_dir() || !zip_file.name().to_lowercase().ends_with(".xml") {
                continue;
            }
            let name = zip_file.name().to_string();
            let mut content = Vec::with_capacity(zip_file.size() as usize);
            zip_file.read_to_end(&mut content)?;
            entries.push(XmlEntry { name, content });
        }

        tracing::debug!(
            "Found {} XML entries in {:?}",
            entries.len(),
            self.zip_path
        );
        Ok(entries)
    }

    /// Parses and assembles every XML entry. Entries are independent, so they
    /// run on the rayon pool; a failing entry does not affect the others.
    pub fn process_all_tiles(&self, config: &RasterConfig) -> Result<Vec<EntryTile>> {
        let entries = self.xml_entries()?;

        let tiles = entries
            .par_iter()
            .map(|entry| EntryTile {
                entry_name: entry.name.clone(),
                output_name: entry.output_file_name(),
                tile: parse_coverage(entry.content.as_slice())
                    .and_then(|coverage| DemTile::from_coverage(&coverage, config)),
            })
            .collect();

        Ok(tiles)
    }
}
