pub const DEFAULT_NODATA_VALUE: f32 = -9999.0;

/// JGD2011 geographic.
pub const DEFAULT_EPSG: u32 = 6668;

/// Per-conversion raster settings, handed to the assembler and the writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterConfig {
    pub nodata_value: f32,
    pub epsg: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            nodata_value: DEFAULT_NODATA_VALUE,
            epsg: DEFAULT_EPSG,
        }
    }
}

impl RasterConfig {
    pub fn with_nodata(mut self, nodata_value: f32) -> Self {
        self.nodata_value = nodata_value;
        self
    }

    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = epsg;
        self
    }
}
