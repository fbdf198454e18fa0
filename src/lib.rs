pub mod assembler;
pub mod config;
pub mod converter;
pub mod error;
pub mod model;
pub mod parser;
pub mod writer;
pub mod zip_handler;

pub use assembler::assemble_raster;
pub use config::RasterConfig;
pub use converter::{ConversionReport, Converter};
pub use error::{DemError, Result};
pub use model::{CoordinatePair, Coverage, DemTile, GeoTransform, GridEnvelope, StartPoint};
pub use parser::{parse_coverage, parse_coverage_str};
pub use writer::GeoTiffWriter;
pub use zip_handler::{EntryTile, ZipHandler};
