//! JSON documents read and written by the command line

use anyhow::{bail, Context, Result};
use geo_types::Geometry;
use geoseries_core::vector::{AttributeTable, AttributeValue, Feature, FeatureCollection};
use geoseries_core::{Crs, Domain, GeoReference, Raster, RasterElement, RasterStack};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Cell values with `null` for undefined cells
fn encode<T: RasterElement>(values: impl Iterator<Item = T>) -> Vec<Option<f64>> {
    values
        .map(|v| Some(v.to_f64()).filter(|x| !x.is_nan()))
        .collect()
}

/// Multi-band grid, band-major: all cells of band 0, then band 1, ...
#[derive(Debug, Serialize, Deserialize)]
pub struct StackDocument {
    pub georef: GeoReference,
    pub bands: usize,
    pub data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

impl StackDocument {
    pub fn into_stack(self) -> Result<RasterStack<f64>> {
        let (rows, cols) = (self.georef.rows, self.georef.cols);
        let expected = self.bands * rows * cols;
        if self.data.len() != expected {
            bail!(
                "Stack holds {} values, expected {} ({} bands x {} rows x {} cols)",
                self.data.len(),
                expected,
                self.bands,
                rows,
                cols
            );
        }
        let values = self.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let mut stack = RasterStack::from_vec(values, self.bands, rows, cols)?;
        stack.set_transform(self.georef.transform);
        stack.set_crs(self.georef.crs);
        stack.set_domain(self.domain);
        Ok(stack)
    }

    pub fn from_stack(stack: &RasterStack<f64>) -> Self {
        Self {
            georef: stack.georeference(),
            bands: stack.bands(),
            data: encode(stack.data().iter().copied()),
            domain: stack.domain().cloned(),
        }
    }
}

/// Single-band grid, row-major
#[derive(Debug, Serialize, Deserialize)]
pub struct RasterDocument {
    pub georef: GeoReference,
    pub data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
}

impl RasterDocument {
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        Self {
            georef: raster.georeference(),
            data: encode(raster.data().iter().copied()),
            domain: raster.domain().cloned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: u64,
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub attributes: Vec<AttributeValue>,
}

/// Polygon features with an attribute table
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureDocument {
    #[serde(default)]
    pub crs: Option<Crs>,
    #[serde(default)]
    pub columns: Vec<String>,
    pub features: Vec<FeatureRecord>,
}

impl FeatureDocument {
    pub fn into_collection(self) -> Result<FeatureCollection> {
        let mut collection = FeatureCollection::new(self.columns);
        if let Some(crs) = self.crs {
            collection = collection.with_crs(crs);
        }
        for record in self.features {
            let id = record.id;
            collection
                .push(Feature::new(id, record.geometry), record.attributes)
                .with_context(|| format!("Feature {} does not match the columns", id))?;
        }
        Ok(collection)
    }
}

/// Output of `polygon2raster`
#[derive(Debug, Serialize)]
pub struct RasterizationDocument {
    pub raster: RasterDocument,
    pub attributes: AttributeTable,
    pub key_map: BTreeMap<u64, i32>,
}

/// Output of `mann-kendall --statistics`
#[derive(Debug, Serialize)]
pub struct TrendStatisticsDocument {
    pub s: RasterDocument,
    pub var_s: RasterDocument,
    pub z: RasterDocument,
    pub probability: RasterDocument,
}
