//! Polygon to raster conversion by boundary tracing and scan-line flooding
//!
//! Runs in two phases:
//! 1. **Boundary**: every ring of every polygon is traced with Bresenham
//!    lines and the touched cells are marked [`BOUNDARY_MARK`]. Each polygon
//!    feature gets the next dense key and one row in the output table.
//! 2. **Flood**: each row is split at its marked cells (plus the left and
//!    right grid edges). The centre of the middle cell of every run is
//!    resolved to its owning feature and the whole run gets that feature's
//!    key, or the undefined value when nothing owns it.
//!
//! The cost is the traced perimeter plus one pass per row, independent of
//! the number of polygons per pixel.

use super::bresenham::Bresenham;
use crate::maybe_rayon::*;
use geo::{Geometry, Polygon};
use geoseries_core::crs::check_compatible;
use geoseries_core::progress::{NoProgress, Progress};
use geoseries_core::raster::{Domain, GeoReference, NumericRange, Raster, RasterElement};
use geoseries_core::vector::{AttributeTable, AttributeValue, FeatureCollection};
use geoseries_core::{Algorithm, Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Cell value of a traced boundary before flooding
pub const BOUNDARY_MARK: i32 = -1;

/// Name of the key column added to the output table by default
pub const DEFAULT_KEY_COLUMN: &str = "coverage_key";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonRasterParams {
    /// Column of the output table that holds each row's key
    pub key_column: String,
}

impl Default for PolygonRasterParams {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
        }
    }
}

/// Output of [`polygon_to_raster`]
#[derive(Debug, Clone)]
pub struct PolygonRasterization {
    /// Feature key per cell; undefined where no polygon owns the cell
    pub raster: Raster<i32>,
    /// Input attribute columns plus the key column; row `k` belongs to key `k`
    pub attributes: AttributeTable,
    /// Feature id → key
    pub key_map: BTreeMap<u64, i32>,
}

impl PolygonRasterization {
    pub fn key_of(&self, feature_id: u64) -> Option<i32> {
        self.key_map.get(&feature_id).copied()
    }

    /// Attribute record of the feature rasterized at (col, row)
    pub fn record_at(&self, col: usize, row: usize) -> Option<&[AttributeValue]> {
        let key = self.raster.get(row, col).ok()?;
        if key.is_undefined() || key < 0 {
            return None;
        }
        self.attributes.record(key as usize)
    }

    /// Number of cells holding `key`
    pub fn cell_count(&self, key: i32) -> usize {
        self.raster.data().iter().filter(|&&v| v == key).count()
    }
}

/// Phase 1 state: boundary cells marked, keys assigned
struct BoundaryPhase<'a> {
    features: &'a FeatureCollection,
    georef: &'a GeoReference,
    grid: Array2<i32>,
    key_map: BTreeMap<u64, i32>,
    table: AttributeTable,
    key_column: usize,
}

impl<'a> BoundaryPhase<'a> {
    fn new(features: &'a FeatureCollection, georef: &'a GeoReference, params: &PolygonRasterParams) -> Self {
        let mut table = features.attributes().empty_like();
        let key_column = table.add_column(params.key_column.as_str());
        Self {
            features,
            georef,
            grid: Array2::from_elem((georef.rows, georef.cols), i32::undefined()),
            key_map: BTreeMap::new(),
            table,
            key_column,
        }
    }

    fn mark(mut self, progress: &dyn Progress) -> Result<FloodPhase<'a>> {
        let features = self.features;
        let tracer = Bresenham::new(self.georef);
        let input = features.attributes();
        progress.start(features.len() as u64);

        for (index, feature) in features.iter().enumerate() {
            if progress.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let polygons: Vec<&Polygon<f64>> = match feature.geometry() {
                Geometry::Polygon(p) => vec![p],
                Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
                _ => {
                    warn!(feature = feature.id(), "skipping non-polygon feature");
                    progress.update(1);
                    continue;
                }
            };

            for polygon in polygons {
                let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
                for ring in rings {
                    for (col, row) in tracer.rasterize_line(ring) {
                        self.grid[[row, col]] = BOUNDARY_MARK;
                    }
                }
            }

            let key = self.key_map.len() as i32;
            self.key_map.insert(feature.id(), key);

            let mut record: Vec<AttributeValue> = input
                .record(index)
                .map(<[AttributeValue]>::to_vec)
                .unwrap_or_default();
            record.resize(self.table.column_count(), AttributeValue::Null);
            record[self.key_column] = AttributeValue::Int(key as i64);
            self.table.push_record(record)?;

            progress.update(1);
        }

        Ok(FloodPhase {
            features,
            georef: self.georef,
            grid: self.grid,
            key_map: self.key_map,
            table: self.table,
        })
    }
}

/// Phase 2 state: boundaries fixed, rows ready to flood
struct FloodPhase<'a> {
    features: &'a FeatureCollection,
    georef: &'a GeoReference,
    grid: Array2<i32>,
    key_map: BTreeMap<u64, i32>,
    table: AttributeTable,
}

impl<'a> FloodPhase<'a> {
    /// Key of the feature owning the centre of pixel (col, row)
    fn resolve(&self, col: usize, row: usize) -> i32 {
        let (x, y) = self.georef.pixel_to_coord(col, row);
        self.features
            .coord_to_feature(x, y)
            .and_then(|(_, feature)| self.key_map.get(&feature.id()).copied())
            .unwrap_or_else(i32::undefined)
    }

    fn flood_row(&self, row: usize) -> Vec<i32> {
        let cols = self.georef.cols;
        let marks = self.grid.row(row);

        let mut borders = Vec::with_capacity(cols / 4 + 2);
        borders.push(0);
        borders.extend((0..cols).filter(|&c| marks[c] == BOUNDARY_MARK));
        borders.push(cols);

        let mut out = vec![i32::undefined(); cols];
        for run in borders.windows(2) {
            let (start, end) = (run[0], run[1]);
            if start >= end {
                continue;
            }
            let value = self.resolve((start + end) / 2, row);
            out[start..end].fill(value);
        }
        out
    }

    fn flood(self, progress: &dyn Progress) -> Result<PolygonRasterization> {
        let rows = self.georef.rows;
        progress.start(rows as u64);

        let flooded: Vec<Vec<i32>> = (0..rows)
            .into_par_iter()
            .map(|row| {
                if progress.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let values = self.flood_row(row);
                progress.update(1);
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut raster = Raster::<i32>::undefined_like(self.georef);
        let mut range: Option<(i32, i32)> = None;
        for (row, values) in flooded.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                if value.is_undefined() {
                    continue;
                }
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(value), hi.max(value)),
                    None => (value, value),
                });
                raster.data_mut()[[row, col]] = value;
            }
        }

        let (lo, hi) = range.unwrap_or((0, 0));
        raster.set_domain(Some(Domain::Numeric(NumericRange::count(lo as f64, hi as f64))));

        info!(
            rows,
            keys = self.key_map.len(),
            min_key = lo,
            max_key = hi,
            "polygon rasterization finished"
        );

        Ok(PolygonRasterization {
            raster,
            attributes: self.table,
            key_map: self.key_map,
        })
    }
}

fn validate(features: &FeatureCollection, georef: &GeoReference, params: &PolygonRasterParams) -> Result<()> {
    georef.validate()?;
    check_compatible(features.crs(), georef.crs.as_ref())?;
    features.check_unique_ids()?;
    if params.key_column.is_empty() {
        return Err(Error::InvalidParameter {
            name: "key_column",
            value: String::new(),
            reason: "column name must not be empty".into(),
        });
    }
    Ok(())
}

/// Rasterize the polygons of `features` onto the grid of `georef`.
///
/// Features and grid must share a coordinate system. Non-polygon features
/// are skipped.
pub fn polygon_to_raster(
    features: &FeatureCollection,
    georef: &GeoReference,
    params: &PolygonRasterParams,
) -> Result<PolygonRasterization> {
    polygon_to_raster_with_progress(features, georef, params, &NoProgress)
}

pub fn polygon_to_raster_with_progress(
    features: &FeatureCollection,
    georef: &GeoReference,
    params: &PolygonRasterParams,
    progress: &dyn Progress,
) -> Result<PolygonRasterization> {
    validate(features, georef, params)?;
    debug!(
        features = features.len(),
        polygons = features.polygon_count(),
        rows = georef.rows,
        cols = georef.cols,
        "polygon rasterization prepared"
    );

    progress.inform("tracing boundaries");
    let flood = BoundaryPhase::new(features, georef, params).mark(progress)?;
    progress.inform("flooding rows");
    flood.flood(progress)
}

/// Input of [`PolygonToRaster`]
#[derive(Debug, Clone)]
pub struct PolygonRasterInput {
    pub features: FeatureCollection,
    pub georef: GeoReference,
}

/// [`Algorithm`] wrapper around [`polygon_to_raster`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonToRaster;

impl Algorithm for PolygonToRaster {
    type Input = PolygonRasterInput;
    type Output = PolygonRasterization;
    type Params = PolygonRasterParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PolygonToRaster"
    }

    fn description(&self) -> &'static str {
        "Rasterize polygon features into a key raster with an attribute table"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        polygon_to_raster(&input.features, &input.georef, &params)
    }
}
