//! Error types for the aggregation engine.
//!
//! Contract violations and data access failures are the only errors.
//! Undefined derived values and empty results are ordinary data.

use crate::models::{Dataset, DimKind, Dimension, Measure};
use thiserror::Error;

/// A caller asked for something the dataset or row set does not support.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("group_by must name at least one dimension")]
    EmptyGroupBy,

    #[error("dimension `{dimension}` listed more than once")]
    DuplicateDimension { dimension: Dimension },

    #[error("dataset `{dataset}` has no dimension `{dimension}`")]
    UnknownDimension {
        dataset: Dataset,
        dimension: Dimension,
    },

    #[error("dataset `{dataset}` has no measure `{measure}`")]
    UnknownMeasure { dataset: Dataset, measure: Measure },

    #[error("filter on `{dimension}` expects a {expected:?} value")]
    FilterType {
        dimension: Dimension,
        expected: DimKind,
    },

    #[error("rows have no column `{column}`")]
    MissingColumn { column: String },

    #[error("column `{column}` is a category, not a number")]
    NotNumeric { column: String },

    #[error("period `{period}` appears twice in one partition of `{column}`")]
    DuplicatePeriod { column: String, period: String },
}

/// Failure of an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// The data source failed. Opaque to the engine and never retried.
    #[error("data access failed for `{dataset}`: {source}")]
    DataAccess {
        dataset: Dataset,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

/// A raw row carried a measure outside the accepted domain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{dataset}.{measure} must be finite and non-negative, got {value}")]
pub struct InvalidMeasure {
    pub dataset: Dataset,
    pub measure: Measure,
    pub value: f64,
}
