use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::RasterConfig;
use crate::model::DemTile;
use crate::parser::parse_coverage;
use crate::writer::GeoTiffWriter;
use crate::zip_handler::ZipHandler;

/// What a batch produced. Failed documents are listed with their error text.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, String)>,
    claimed: HashSet<PathBuf>,
}

impl ConversionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, source: String, err: impl std::fmt::Display) {
        error!("Failed to convert {}: {}", source, err);
        self.failed.push((source, err.to_string()));
    }

    /// Each output path belongs to at most one document per batch.
    fn claim(&mut self, output_path: &Path) -> bool {
        self.claimed.insert(output_path.to_path_buf())
    }
}

/// Drives parse, assemble and write for files, archives and directories.
#[derive(Default)]
pub struct Converter {
    config: RasterConfig,
    writer: GeoTiffWriter,
}

impl Converter {
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            writer: GeoTiffWriter::new(),
        }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Converts a bare XML coverage to `<output_dir>/<stem>.tif`.
    pub fn convert_xml_file(&self, path: &Path, output_dir: &Path) -> Result<ConversionReport> {
        let Some(file_name) = path.file_name() else {
            bail!("Input path has no file name: {:?}", path);
        };
        fs::create_dir_all(output_dir)?;
        let mut report = ConversionReport::default();
        let output_path = output_dir.join(PathBuf::from(file_name).with_extension("tif"));

        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let tile = parse_coverage(BufReader::new(file))
            .and_then(|coverage| DemTile::from_coverage(&coverage, &self.config));

        match tile {
            Ok(tile) => self.write_tile(&tile, path.display().to_string(), output_path, &mut report),
            Err(e) => report.record_failure(path.display().to_string(), e),
        }
        Ok(report)
    }

    /// Converts every XML entry of one archive. An archive that cannot be
    /// opened is an error; individual entries only fail themselves.
    pub fn convert_zip(&self, zip_path: &Path, output_dir: &Path) -> Result<ConversionReport> {
        let mut report = ConversionReport::default();
        self.convert_zip_into(zip_path, output_dir, &mut report)?;
        Ok(report)
    }

    fn convert_zip_into(
        &self,
        zip_path: &Path,
        output_dir: &Path,
        report: &mut ConversionReport,
    ) -> Result<()> {
        info!("Processing {:?}", zip_path);
        fs::create_dir_all(output_dir)?;

        let handler = ZipHandler::new(zip_path);
        let tiles = handler
            .process_all_tiles(&self.config)
            .with_context(|| format!("Failed to read archive {:?}", zip_path))?;

        for entry in tiles {
            let source = format!("{}:{}", zip_path.display(), entry.entry_name);
            match entry.tile {
                Ok(tile) => self.write_tile(&tile, source, output_dir.join(&entry.output_name), report),
                Err(e) => report.record_failure(source, e),
            }
        }
        Ok(())
    }

    /// Converts every `*.zip` directly inside `input_dir`, in name order.
    pub fn convert_dir(&self, input_dir: &Path, output_dir: &Path) -> Result<ConversionReport> {
        fs::create_dir_all(output_dir)?;

        let mut zip_paths: Vec<PathBuf> = fs::read_dir(input_dir)
            .with_context(|| format!("Failed to read directory {:?}", input_dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|s| s.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
            })
            .collect();
        zip_paths.sort();
        info!("Found {} ZIP files in {:?}", zip_paths.len(), input_dir);

        let mut report = ConversionReport::default();
        for zip_path in zip_paths {
            if let Err(e) = self.convert_zip_into(&zip_path, output_dir, &mut report) {
                report.record_failure(zip_path.display().to_string(), format!("{:#}", e));
            }
        }
        Ok(report)
    }

    fn write_tile(
        &self,
        tile: &DemTile,
        source: String,
        output_path: PathBuf,
        report: &mut ConversionReport,
    ) {
        if !report.claim(&output_path) {
            report.record_failure(
                source,
                format!("output {:?} already written by another document", output_path),
            );
            return;
        }
        match self.writer.write(tile, &output_path) {
            Ok(()) => {
                info!("Written GeoTIFF: {:?}", output_path);
                report.written.push(output_path);
            }
            Err(e) => report.record_failure(source, format!("{:#}", e)),
        }
    }
}
