use anyhow::{ensure, Context, Result};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use std::fs;
use std::path::Path;

use crate::model::DemTile;

/// Persists a [`DemTile`] as a single-band Float32 GeoTIFF.
#[derive(Default)]
pub struct GeoTiffWriter {}

impl GeoTiffWriter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn write(&self, dem_tile: &DemTile, output_path: &Path) -> Result<()> {
        let (rows, cols) = dem_tile.shape();
        ensure!(
            dem_tile.values.len() == rows * cols,
            "raster has {} values for a {}x{} grid",
            dem_tile.values.len(),
            cols,
            rows
        );

        tracing::debug!("TIF Path: {:?}", output_path);

        // GTiff create fails on some existing files
        if output_path.exists() {
            fs::remove_file(output_path)
                .with_context(|| format!("Failed to remove existing {:?}", output_path))?;
        }

        let driver =
            DriverManager::get_driver_by_name("GTiff").context("Failed to get GTiff driver")?;

        let mut dataset = driver
            .create_with_band_type::<f32, _>(output_path, cols, rows, 1)
            .context("Failed to create dataset")?;

        dataset
            .set_geo_transform(&dem_tile.geo_transform.as_array())
            .context("Failed to set geo transform")?;

        let srs = SpatialRef::from_epsg(dem_tile.epsg)
            .context(format!("Failed to create SpatialRef from EPSG:{}", dem_tile.epsg))?;
        let wkt = srs
            .to_wkt()
            .context("Failed to convert SpatialRef to WKT")?;
        dataset
            .set_projection(&wkt)
            .context("Failed to set projection")?;

        let mut band = dataset.rasterband(1).context("Failed to get raster band")?;

        // row-major
        let mut buffer = Buffer::new((cols, rows), dem_tile.values.clone());
        band.write((0, 0), (cols, rows), &mut buffer)
            .context("Failed to write raster data")?;

        band.set_no_data_value(Some(dem_tile.nodata_value as f64))
            .context("Failed to set no data value")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoTransform;
    use gdal::Dataset;
    use tempfile::TempDir;

    fn gtiff_available() -> bool {
        DriverManager::get_driver_by_name("GTiff").is_ok()
    }

    fn create_test_tile() -> DemTile {
        DemTile {
            width: 3,
            height: 2,
            values: vec![-9999.0, 101.0, 102.0, 103.0, 104.0, -9999.0],
            geo_transform: GeoTransform {
                origin_x: 135.0,
                pixel_width: 0.001,
                origin_y: 35.002,
                pixel_height: 0.001,
            },
            nodata_value: -9999.0,
            epsg: 6668,
        }
    }

    #[test]
    fn test_write_geotiff() {
        if !gtiff_available() {
            eprintln!("Skipping test: GTiff driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("test.tif");

        let dem_tile = create_test_tile();
        GeoTiffWriter::new().write(&dem_tile, &output_path).unwrap();
        assert!(output_path.exists());

        let dataset = Dataset::open(&output_path).unwrap();
        assert_eq!(dataset.raster_size(), (3, 2));
        assert_eq!(dataset.raster_count(), 1);

        let transform = dataset.geo_transform().unwrap();
        assert_eq!(transform, dem_tile.geo_transform.as_array());

        let band = dataset.rasterband(1).unwrap();
        assert_eq!(band.no_data_value(), Some(-9999.0));
    }

    #[test]
    fn test_round_trip_values() {
        if !gtiff_available() {
            eprintln!("Skipping test: GTiff driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("round_trip.tif");

        let dem_tile = create_test_tile();
        GeoTiffWriter::new().write(&dem_tile, &output_path).unwrap();

        let dataset = Dataset::open(&output_path).unwrap();
        let band = dataset.rasterband(1).unwrap();
        let buffer = band.read_as::<f32>((0, 0), (3, 2), (3, 2), None).unwrap();

        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(
                    buffer.data()[row * 3 + col],
                    dem_tile.value_at(col, row).unwrap(),
                    "mismatch at col={} row={}",
                    col,
                    row
                );
            }
        }
    }

    #[test]
    fn test_rewrite_is_identical() {
        if !gtiff_available() {
            eprintln!("Skipping test: GTiff driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("again.tif");

        let dem_tile = create_test_tile();
        let writer = GeoTiffWriter::new();

        writer.write(&dem_tile, &output_path).unwrap();
        let first = fs::read(&output_path).unwrap();
        writer.write(&dem_tile, &output_path).unwrap();
        let second = fs::read(&output_path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_short_raster() {
        let temp_dir = TempDir::new().unwrap();
        let mut dem_tile = create_test_tile();
        dem_tile.values.pop();

        let result = GeoTiffWriter::new().write(&dem_tile, &temp_dir.path().join("short.tif"));
        assert!(result.is_err());
    }
}
