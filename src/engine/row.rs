//! Aggregated rows and the derived columns attached to them.

use crate::error::ContractError;
use crate::models::{DimValue, Dimension, Measure};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Reference to a numeric column of an [`AggregateRow`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// A summed dataset measure.
    Measure(Measure),
    /// A derived numeric column, by name.
    Derived(String),
}

impl Field {
    pub fn derived(name: &str) -> Self {
        Field::Derived(name.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Measure(m) => m.name(),
            Field::Derived(name) => name,
        }
    }
}

impl From<Measure> for Field {
    fn from(measure: Measure) -> Self {
        Field::Measure(measure)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Four-way bucket derived from two normalized scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    HighHigh,
    HighLow,
    LowHigh,
    LowLow,
}

impl Quadrant {
    /// Bucket a pair of scores. A score equal to `threshold` counts as high.
    pub fn classify(x: f64, y: f64, threshold: f64) -> Self {
        match (x >= threshold, y >= threshold) {
            (true, true) => Quadrant::HighHigh,
            (true, false) => Quadrant::HighLow,
            (false, true) => Quadrant::LowHigh,
            (false, false) => Quadrant::LowLow,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quadrant::HighHigh => "High-High",
            Quadrant::HighLow => "High-Low",
            Quadrant::LowHigh => "Low-High",
            Quadrant::LowLow => "Low-Low",
        };
        f.write_str(s)
    }
}

/// Value of a derived column. `None` marks an undefined cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DerivedValue {
    Number(Option<f64>),
    Category(Option<Quadrant>),
}

/// One output row of a grouped aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    dimensions: Vec<(Dimension, DimValue)>,
    measures: Vec<(Measure, f64)>,
    derived: Vec<(String, DerivedValue)>,
}

impl AggregateRow {
    pub fn new(dimensions: Vec<(Dimension, DimValue)>, measures: Vec<(Measure, f64)>) -> Self {
        Self {
            dimensions,
            measures,
            derived: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> &[(Dimension, DimValue)] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[(Measure, f64)] {
        &self.measures
    }

    pub fn derived(&self) -> &[(String, DerivedValue)] {
        &self.derived
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimValue> {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, v)| v)
    }

    pub fn measure(&self, measure: Measure) -> Option<f64> {
        self.measures
            .iter()
            .find(|(m, _)| *m == measure)
            .map(|(_, v)| *v)
    }

    pub fn derived_value(&self, name: &str) -> Option<DerivedValue> {
        self.derived
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Numeric value of a field. `Ok(None)` is an undefined cell.
    pub fn number(&self, field: &Field) -> Result<Option<f64>, ContractError> {
        match field {
            Field::Measure(m) => self
                .measure(*m)
                .map(Some)
                .ok_or_else(|| ContractError::MissingColumn {
                    column: m.name().to_string(),
                }),
            Field::Derived(name) => match self.derived_value(name) {
                Some(DerivedValue::Number(v)) => Ok(v),
                Some(DerivedValue::Category(_)) => Err(ContractError::NotNumeric {
                    column: name.clone(),
                }),
                None => Err(ContractError::MissingColumn {
                    column: name.clone(),
                }),
            },
        }
    }

    /// Copy of this row with one more derived column. An existing column of
    /// the same name is replaced.
    pub fn with_derived(&self, name: &str, value: DerivedValue) -> Self {
        let mut row = self.clone();
        match row.derived.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => row.derived.push((name.to_string(), value)),
        }
        row
    }
}

impl Serialize for AggregateRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.dimensions.len() + self.measures.len() + self.derived.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (dim, value) in &self.dimensions {
            map.serialize_entry(dim.name(), value)?;
        }
        for (measure, value) in &self.measures {
            map.serialize_entry(measure.name(), value)?;
        }
        for (name, value) in &self.derived {
            match value {
                DerivedValue::Number(v) => map.serialize_entry(name, v)?,
                DerivedValue::Category(q) => {
                    map.serialize_entry(name, &q.map(|q| q.to_string()))?
                }
            }
        }
        map.end()
    }
}

/// Sort direction for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}
