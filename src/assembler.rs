use crate::config::RasterConfig;
use crate::error::{DemError, Result};
use crate::model::StartPoint;

/// Rebuilds the dense row-major grid from a sparse tuple stream.
///
/// Cells before `start` are filled with the nodata value, then each record of
/// the form `flag,elevation` contributes one cell in stream order. Records with
/// any other field count are skipped without leaving a gap, so the shortfall
/// ends up in the trailing nodata fill. Trailing empty fields are ignored when
/// counting, so `flag,` is skipped and `flag,1,` yields `1`. A stream that
/// overshoots the grid is a [`DemError::GridSizeMismatch`].
pub fn assemble_raster(
    start: StartPoint,
    width: usize,
    height: usize,
    tuple_list: &str,
    config: &RasterConfig,
) -> Result<Vec<f32>> {
    let total = width.checked_mul(height).ok_or_else(|| {
        DemError::malformed(format!("grid {}x{} has too many cells", width, height))
    })?;
    let leading = start
        .leading_cells(width)
        .filter(|&n| n <= total)
        .ok_or(DemError::GridSizeMismatch {
            expected: total,
            actual: start.row.saturating_mul(width).saturating_add(start.col),
        })?;

    let mut values = Vec::new();
    values.try_reserve_exact(total).map_err(|_| {
        DemError::malformed(format!("grid {}x{} is too large to allocate", width, height))
    })?;
    values.resize(leading, config.nodata_value);

    let mut skipped = 0usize;
    for line in tuple_list.trim().lines() {
        // trailing empty fields do not count: `flag,` has one field, `flag,1,` two
        let fields: Vec<&str> = line.trim_end().trim_end_matches(',').split(',').collect();
        if fields.len() != 2 {
            skipped += 1;
            continue;
        }
        let raw = fields[1].trim();
        let elevation = raw
            .parse::<f32>()
            .map_err(|_| DemError::numeric("tupleList", raw))?;
        values.push(elevation);
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} tuple records without exactly two fields; they are absorbed by trailing nodata",
            skipped
        );
    }

    if values.len() > total {
        return Err(DemError::GridSizeMismatch {
            expected: total,
            actual: values.len(),
        });
    }
    values.resize(total, config.nodata_value);

    Ok(values)
}
