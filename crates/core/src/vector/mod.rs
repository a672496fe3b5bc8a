//! Vector data structures: polygon features, collections and attribute tables

mod table;

pub use table::{AttributeTable, AttributeValue};

use crate::crs::Crs;
use crate::error::{Error, Result};
use geo::{BoundingRect, Contains};
use geo_types::{Geometry, Point, Rect};
use std::collections::{HashMap, HashSet};

/// Name of the feature-id entry in a record returned by
/// [`FeatureCollection::coord_to_record`].
pub const FEATURE_ID_COLUMN: &str = "feature_id";

/// A geographic feature with a stable identifier
#[derive(Debug, Clone)]
pub struct Feature {
    id: u64,
    geometry: Geometry<f64>,
    bbox: Option<Rect<f64>>,
}

impl Feature {
    pub fn new(id: u64, geometry: impl Into<Geometry<f64>>) -> Self {
        let geometry = geometry.into();
        let bbox = geometry.bounding_rect();
        Self { id, geometry, bbox }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    pub fn is_polygon(&self) -> bool {
        matches!(
            self.geometry,
            Geometry::Polygon(_) | Geometry::MultiPolygon(_)
        )
    }

    /// Whether the coordinate lies strictly inside a polygonal geometry.
    ///
    /// Points on a boundary are outside; non-polygon geometries contain nothing.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let Some(bbox) = self.bbox else {
            return false;
        };
        if x < bbox.min().x || x > bbox.max().x || y < bbox.min().y || y > bbox.max().y {
            return false;
        }
        let point = Point::new(x, y);
        match &self.geometry {
            Geometry::Polygon(p) => p.contains(&point),
            Geometry::MultiPolygon(mp) => mp.contains(&point),
            _ => false,
        }
    }
}

/// Features plus their attribute table; feature `i` owns table row `i`
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    features: Vec<Feature>,
    attributes: AttributeTable,
    crs: Option<Crs>,
}

impl FeatureCollection {
    /// Empty collection whose records have the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: Vec::new(),
            attributes: AttributeTable::new(columns),
            crs: None,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Add a feature with its attribute record
    pub fn push(&mut self, feature: Feature, record: Vec<AttributeValue>) -> Result<()> {
        self.attributes.push_record(record)?;
        self.features.push(feature);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Number of polygonal features
    pub fn polygon_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_polygon()).count()
    }

    /// Fail on the first feature id that occurs twice
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.features.len());
        for feature in &self.features {
            if !seen.insert(feature.id) {
                return Err(Error::DuplicateFeatureId(feature.id));
            }
        }
        Ok(())
    }

    /// Index and feature owning a coordinate; the first match wins
    pub fn coord_to_feature(&self, x: f64, y: f64) -> Option<(usize, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .find(|(_, f)| f.contains(x, y))
    }

    /// Attribute record of the feature owning a coordinate, keyed by column
    /// name, plus the feature id under [`FEATURE_ID_COLUMN`].
    pub fn coord_to_record(&self, x: f64, y: f64) -> Option<HashMap<String, AttributeValue>> {
        let (index, feature) = self.coord_to_feature(x, y)?;
        let mut map: HashMap<String, AttributeValue> = self
            .attributes
            .columns()
            .iter()
            .cloned()
            .zip(self.attributes.record(index)?.iter().cloned())
            .collect();
        map.insert(
            FEATURE_ID_COLUMN.to_string(),
            AttributeValue::Int(feature.id as i64),
        );
        Some(map)
    }
}
