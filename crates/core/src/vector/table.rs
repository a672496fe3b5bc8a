//! Attribute tables: named columns, rows addressed by index

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "?"),
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

/// A table of rows sharing one set of named columns.
///
/// Writing a cell beyond the last row grows the table with `Null` rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: Vec<Vec<AttributeValue>>,
}

impl AttributeTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Add a column filled with `Null`, returning its index.
    ///
    /// Adding a column that already exists returns the existing index.
    pub fn add_column(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(index) = self.column_index(&name) {
            return index;
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(AttributeValue::Null);
        }
        self.columns.len() - 1
    }

    /// Append a row; it must have one value per column
    pub fn push_record(&mut self, record: Vec<AttributeValue>) -> Result<usize> {
        if record.len() != self.columns.len() {
            return Err(Error::InvalidParameter {
                name: "record",
                value: format!("{} values", record.len()),
                reason: format!("table has {} columns", self.columns.len()),
            });
        }
        self.rows.push(record);
        Ok(self.rows.len() - 1)
    }

    pub fn record(&self, row: usize) -> Option<&[AttributeValue]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&AttributeValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Value of a named column in a row
    pub fn cell_by_name(&self, column: &str, row: usize) -> Option<&AttributeValue> {
        self.column_index(column).and_then(|c| self.cell(c, row))
    }

    pub fn set_cell(&mut self, column: usize, row: usize, value: AttributeValue) -> Result<()> {
        if column >= self.columns.len() {
            return Err(Error::UnknownColumn(format!("#{}", column)));
        }
        while self.rows.len() <= row {
            self.rows.push(vec![AttributeValue::Null; self.columns.len()]);
        }
        self.rows[row][column] = value;
        Ok(())
    }

    /// Copy of this table with the same columns and no rows
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }
}
