use anyhow::Result;
use clap::Parser;
use gml_dem::config::{DEFAULT_EPSG, DEFAULT_NODATA_VALUE};
use gml_dem::{ConversionReport, Converter, RasterConfig};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print per-document coordinates and raster sizes
    #[arg(long)]
    verbose: bool,

    /// Directory of ZIP archives, a single ZIP archive, or a single XML coverage
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory for the GeoTIFF files
    #[arg(value_name = "OUTPUT_DIR")]
    output: PathBuf,

    /// Worker threads for parsing (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// NoData value written to empty cells
    #[arg(long, default_value_t = DEFAULT_NODATA_VALUE, allow_negative_numbers = true)]
    nodata: f32,

    /// EPSG code of the output spatial reference
    #[arg(long, default_value_t = DEFAULT_EPSG)]
    epsg: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(&args) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            error!("Failed to convert {} documents:", report.failed.len());
            for (source, err) in &report.failed {
                error!("  {}: {}", source, err);
            }
            ExitCode::from(EXIT_PARTIAL_FAILURE)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(args: &Args) -> Result<ConversionReport> {
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    }

    let config = RasterConfig::default()
        .with_nodata(args.nodata)
        .with_epsg(args.epsg);
    let converter = Converter::new(config);

    let report = if args.input.is_dir() {
        info!("Processing directory: {:?}", args.input);
        converter.convert_dir(&args.input, &args.output)?
    } else if args.input.is_file() {
        let ext = args
            .input
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "zip" => converter.convert_zip(&args.input, &args.output)?,
            "xml" => converter.convert_xml_file(&args.input, &args.output)?,
            _ => anyhow::bail!("Input file must be .xml or .zip: {:?}", args.input),
        }
    } else {
        anyhow::bail!("Input path must be a file or directory: {:?}", args.input);
    };

    info!(
        "Converted {} documents in {:?}",
        report.written.len(),
        start_time.elapsed()
    );
    Ok(report)
}
