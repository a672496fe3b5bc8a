//! Coordinate reference system identifiers
//!
//! Reprojection is not performed here; a [`Crs`] only lets operations refuse
//! inputs whose coordinates live in different systems.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system, identified by EPSG code or WKT text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    Epsg(u32),
    Wkt(String),
}

impl Crs {
    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Crs::Epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Wkt(_) => None,
        }
    }

    /// Whether two systems are known to be the same.
    ///
    /// WKT strings are compared after whitespace normalisation; an EPSG code
    /// and a WKT string are never considered equivalent.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        match (self, other) {
            (Crs::Epsg(a), Crs::Epsg(b)) => a == b,
            (Crs::Wkt(a), Crs::Wkt(b)) => {
                a.split_whitespace().eq(b.split_whitespace())
            }
            _ => false,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Wkt(wkt) => write!(f, "WKT:{}", wkt.chars().take(50).collect::<String>()),
        }
    }
}

/// Check that two optional systems are compatible.
///
/// Unknown systems on either side are accepted as-is.
pub fn check_compatible(a: Option<&Crs>, b: Option<&Crs>) -> crate::Result<()> {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            Err(crate::Error::CrsMismatch(a.to_string(), b.to_string()))
        }
        _ => Ok(()),
    }
}
