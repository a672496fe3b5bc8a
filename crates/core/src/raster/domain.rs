//! Value domains attached to raster outputs

use serde::{Deserialize, Serialize};

/// Numeric value range with a step size (`resolution == 0` means continuous)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64, resolution: f64) -> Self {
        Self { min, max, resolution }
    }

    /// Integer counting range `[min, max]`, the domain of key rasters
    pub fn count(min: f64, max: f64) -> Self {
        Self::new(min, max, 1.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Named classes; a raster cell stores the index of its item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDomain {
    items: Vec<String>,
}

impl ItemDomain {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i == name)
    }
}

/// The semantics of the values stored in a raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    Numeric(NumericRange),
    Item(ItemDomain),
}

impl Domain {
    pub fn kind(&self) -> &'static str {
        match self {
            Domain::Numeric(_) => "numeric",
            Domain::Item(_) => "item",
        }
    }

    pub fn as_item(&self) -> Option<&ItemDomain> {
        match self {
            Domain::Item(items) => Some(items),
            Domain::Numeric(_) => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericRange> {
        match self {
            Domain::Numeric(range) => Some(range),
            Domain::Item(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_lookup() {
        let d = ItemDomain::new(["no trend", "trend"]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.item(1), Some("trend"));
        assert_eq!(d.index_of("no trend"), Some(0));
        assert_eq!(d.item(2), None);
    }

    #[test]
    fn test_domain_kind() {
        let d = Domain::Numeric(NumericRange::count(0.0, 4.0));
        assert_eq!(d.kind(), "numeric");
        assert!(d.as_item().is_none());
        assert!(d.as_numeric().unwrap().contains(3.0));
    }
}
