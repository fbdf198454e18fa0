use crate::assembler::assemble_raster;
use crate::config::RasterConfig;
use crate::error::{DemError, Result};

/// A corner as written in the coverage: latitude first, then longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatePair {
    pub lat: f64,
    pub lon: f64,
}

impl CoordinatePair {
    /// Parses `"lat lon"` text. Exactly two numeric tokens are required.
    pub fn parse(text: &str, field: &'static str) -> Result<Self> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(DemError::malformed(format!(
                "{} must hold exactly 2 values, found {}",
                field,
                tokens.len()
            )));
        }
        let lat = tokens[0]
            .parse::<f64>()
            .map_err(|_| DemError::numeric(field, tokens[0]))?;
        let lon = tokens[1]
            .parse::<f64>()
            .map_err(|_| DemError::numeric(field, tokens[1]))?;
        Ok(Self { lat, lon })
    }

    /// Map axis order: `(x, y)` = `(lon, lat)`.
    pub fn to_xy(self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

/// Upper bound of the grid envelope. Inclusive, so the grid is one larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEnvelope {
    pub high_col: usize,
    pub high_row: usize,
}

impl GridEnvelope {
    pub fn width(&self) -> Result<usize> {
        self.high_col
            .checked_add(1)
            .ok_or_else(|| DemError::malformed(format!("grid column {} is too large", self.high_col)))
    }

    pub fn height(&self) -> Result<usize> {
        self.high_row
            .checked_add(1)
            .ok_or_else(|| DemError::malformed(format!("grid row {} is too large", self.high_row)))
    }
}

/// Grid index of the first tuple in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartPoint {
    pub col: usize,
    pub row: usize,
}

impl StartPoint {
    /// Number of cells preceding the start point in row-major order.
    pub fn leading_cells(&self, width: usize) -> Option<usize> {
        self.row.checked_mul(width)?.checked_add(self.col)
    }
}

/// Everything the parser extracts from one coverage document.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub lower_corner: CoordinatePair,
    pub upper_corner: CoordinatePair,
    pub envelope: GridEnvelope,
    pub start_point: StartPoint,
    pub tuple_list: String,
}

impl Coverage {
    pub fn width(&self) -> Result<usize> {
        self.envelope.width()
    }

    pub fn height(&self) -> Result<usize> {
        self.envelope.height()
    }
}

/// North-up affine transform in GDAL order:
/// `(origin_x, pixel_width, 0, origin_y, 0, -pixel_height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// The upper corner must lie strictly north-east of the lower corner, so
    /// both pixel sizes come out positive.
    pub fn from_bounds(
        min: CoordinatePair,
        max: CoordinatePair,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let (min_x, min_y) = min.to_xy();
        let (max_x, max_y) = max.to_xy();

        if !(max_x > min_x && max_y > min_y) {
            return Err(DemError::malformed(format!(
                "upperCorner {:?} is not north-east of lowerCorner {:?}",
                max, min
            )));
        }

        Ok(Self {
            origin_x: min_x,
            pixel_width: (max_x - min_x) / width as f64,
            origin_y: max_y,
            pixel_height: (max_y - min_y) / height as f64,
        })
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            -self.pixel_height,
        ]
    }

    /// World coordinate of the upper-left corner of a cell.
    pub fn pixel_to_world(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y - row as f64 * self.pixel_height,
        )
    }
}

/// A dense raster ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct DemTile {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
    pub geo_transform: GeoTransform,
    pub nodata_value: f32,
    pub epsg: u32,
}

impl DemTile {
    pub fn from_coverage(coverage: &Coverage, config: &RasterConfig) -> Result<Self> {
        let width = coverage.width()?;
        let height = coverage.height()?;
        let geo_transform = GeoTransform::from_bounds(
            coverage.lower_corner,
            coverage.upper_corner,
            width,
            height,
        )?;

        tracing::debug!("Min Coordinates: {:?}", coverage.lower_corner);
        tracing::debug!("Max Coordinates: {:?}", coverage.upper_corner);
        tracing::debug!("Raster Width: {}, Raster Height: {}", width, height);

        let values = assemble_raster(
            coverage.start_point,
            width,
            height,
            &coverage.tuple_list,
            config,
        )?;

        tracing::debug!(
            "Raster Data size: {}, Pixels: {}",
            values.len(),
            width * height
        );

        Ok(Self {
            width,
            height,
            values,
            geo_transform,
            nodata_value: config.nodata_value,
            epsg: config.epsg,
        })
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn value_at(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_coordinate_axis_order() {
        let pair = CoordinatePair::parse("35.5 139.25", "lowerCorner").unwrap();
        assert_eq!(pair.lat, 35.5);
        assert_eq!(pair.lon, 139.25);
        assert_eq!(pair.to_xy(), (139.25, 35.5));
    }

    #[test]
    fn test_coordinate_wrong_token_count() {
        let err = CoordinatePair::parse("35.5", "lowerCorner").unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));

        let err = CoordinatePair::parse("1 2 3", "upperCorner").unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));
    }

    #[test]
    fn test_coordinate_not_numeric() {
        let err = CoordinatePair::parse("35.5 east", "upperCorner").unwrap_err();
        match err {
            DemError::NumericParse { field, value } => {
                assert_eq!(field, "upperCorner");
                assert_eq!(value, "east");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_is_inclusive() {
        let envelope = GridEnvelope {
            high_col: 224,
            high_row: 149,
        };
        assert_eq!(envelope.width().unwrap(), 225);
        assert_eq!(envelope.height().unwrap(), 150);
    }

    #[test]
    fn test_envelope_at_usize_max_is_an_error() {
        let envelope = GridEnvelope {
            high_col: usize::MAX,
            high_row: 0,
        };
        assert!(matches!(
            envelope.width(),
            Err(DemError::MalformedDocument(_))
        ));
        assert_eq!(envelope.height().unwrap(), 1);
    }

    #[test]
    fn test_leading_cells() {
        let start = StartPoint { col: 2, row: 1 };
        assert_eq!(start.leading_cells(5), Some(7));
        assert_eq!(StartPoint::default().leading_cells(5), Some(0));
    }

    #[test]
    fn test_geotransform_scenario() {
        let min = CoordinatePair {
            lat: 30.0,
            lon: 130.0,
        };
        let max = CoordinatePair {
            lat: 31.0,
            lon: 131.0,
        };
        let gt = GeoTransform::from_bounds(min, max, 100, 100).unwrap();
        let arr = gt.as_array();

        assert!(approx(arr[0], 130.0));
        assert!(approx(arr[1], 0.01));
        assert_eq!(arr[2], 0.0);
        assert!(approx(arr[3], 31.0));
        assert_eq!(arr[4], 0.0);
        assert!(approx(arr[5], -0.01));
    }

    #[test]
    fn test_geotransform_non_square_pixels() {
        let min = CoordinatePair {
            lat: 35.0,
            lon: 139.0,
        };
        let max = CoordinatePair {
            lat: 35.5,
            lon: 140.0,
        };
        let gt = GeoTransform::from_bounds(min, max, 200, 100).unwrap();

        assert!(approx(gt.pixel_width, 0.005));
        assert!(approx(gt.pixel_height, 0.005));
        assert!(gt.pixel_height > 0.0);
        assert!(gt.as_array()[5] < 0.0);

        let (x, y) = gt.pixel_to_world(200, 100);
        assert!(approx(x, 140.0));
        assert!(approx(y, 35.0));
    }

    #[test]
    fn test_tile_from_coverage() {
        let coverage = Coverage {
            lower_corner: CoordinatePair {
                lat: 35.0,
                lon: 135.0,
            },
            upper_corner: CoordinatePair {
                lat: 35.002,
                lon: 135.003,
            },
            envelope: GridEnvelope {
                high_col: 2,
                high_row: 1,
            },
            start_point: StartPoint { col: 1, row: 0 },
            tuple_list: "地表面,100.5\n地表面,101.5\n".to_string(),
        };

        let tile = DemTile::from_coverage(&coverage, &RasterConfig::default()).unwrap();
        assert_eq!(tile.shape(), (2, 3));
        assert_eq!(
            tile.values,
            vec![-9999.0, 100.5, 101.5, -9999.0, -9999.0, -9999.0]
        );
        assert_eq!(tile.value_at(1, 0), Some(100.5));
        assert_eq!(tile.value_at(3, 0), None);
        assert_eq!(tile.epsg, 6668);
        assert!(approx(tile.geo_transform.origin_x, 135.0));
        assert!(approx(tile.geo_transform.origin_y, 35.002));
    }

    #[test]
    fn test_flipped_bounds_are_rejected() {
        let lower = CoordinatePair {
            lat: 31.0,
            lon: 131.0,
        };
        let upper = CoordinatePair {
            lat: 30.0,
            lon: 130.0,
        };
        let err = GeoTransform::from_bounds(lower, upper, 1, 1).unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));

        // only one axis flipped
        let upper = CoordinatePair {
            lat: 32.0,
            lon: 130.0,
        };
        assert!(GeoTransform::from_bounds(lower, upper, 1, 1).is_err());

        // zero extent
        assert!(GeoTransform::from_bounds(lower, lower, 1, 1).is_err());
    }

    #[test]
    fn test_oversized_envelope_is_an_error_not_a_panic() {
        let coverage = Coverage {
            lower_corner: CoordinatePair {
                lat: 35.0,
                lon: 135.0,
            },
            upper_corner: CoordinatePair {
                lat: 36.0,
                lon: 136.0,
            },
            envelope: GridEnvelope {
                high_col: usize::MAX,
                high_row: 0,
            },
            start_point: StartPoint::default(),
            tuple_list: String::new(),
        };
        let err = DemTile::from_coverage(&coverage, &RasterConfig::default()).unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));
    }
}
