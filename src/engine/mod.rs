//! Aggregation engine.
//!
//! [`Engine`] turns raw rows from an injected [`DataSource`] into grouped
//! [`AggregateRow`]s. The pure operations over those rows (derived metrics,
//! ranking, slicing) live in the submodules and are re-exported here.

pub mod aggregator;
pub mod derived;
pub mod row;

pub use aggregator::{rank, slice};
pub use derived::{categorize_quadrant, compute_growth, compute_ratio, normalize};
pub use row::{AggregateRow, DerivedValue, Direction, Field, Quadrant};

use crate::error::{ContractError, EngineError};
use crate::models::{Dataset, DimValue, Dimension, Filters, Measure, RawRow};
use crate::source::DataSource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Aggregation engine over a data source.
pub struct Engine<S> {
    source: S,
}

impl<S: DataSource> Engine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Group the matching rows of `dataset` by `group_by`, summing every
    /// measure. Output is ascending by the group tuple.
    pub fn aggregate(
        &self,
        dataset: Dataset,
        group_by: &[Dimension],
        filters: &Filters,
    ) -> Result<Vec<AggregateRow>, EngineError> {
        self.aggregate_present(dataset, group_by, filters, &[])
    }

    /// Like [`Engine::aggregate`], but only rows where every measure in
    /// `present` is non-null take part. Used for measures that are summed as
    /// a pair, so a null on one side cannot skew the other.
    pub fn aggregate_present(
        &self,
        dataset: Dataset,
        group_by: &[Dimension],
        filters: &Filters,
        present: &[Measure],
    ) -> Result<Vec<AggregateRow>, EngineError> {
        validate_group_by(dataset, group_by)?;
        for &measure in present {
            if !dataset.measures().contains(&measure) {
                return Err(ContractError::UnknownMeasure { dataset, measure }.into());
            }
        }
        let mut rows = self.fetch(dataset, filters)?;
        rows.retain(|row| present.iter().all(|m| row.measure(*m).is_some()));
        let measures = dataset.measures();

        let mut groups: BTreeMap<Vec<DimValue>, Vec<f64>> = BTreeMap::new();
        for row in &rows {
            let key = group_key(row, group_by);
            let sums = groups
                .entry(key)
                .or_insert_with(|| vec![0.0; measures.len()]);
            accumulate(sums, row, measures);
        }

        debug!(
            "Aggregated {} rows of {} into {} groups",
            rows.len(),
            dataset,
            groups.len()
        );

        Ok(groups
            .into_iter()
            .map(|(key, sums)| {
                AggregateRow::new(
                    group_by.iter().copied().zip(key).collect(),
                    measures.iter().copied().zip(sums).collect(),
                )
            })
            .collect())
    }

    /// Grand totals of every measure over the matching rows. A dataset with
    /// no matching rows totals to zero.
    pub fn summarize(
        &self,
        dataset: Dataset,
        filters: &Filters,
    ) -> Result<AggregateRow, EngineError> {
        let rows = self.fetch(dataset, filters)?;
        let measures = dataset.measures();

        let mut sums = vec![0.0; measures.len()];
        for row in &rows {
            accumulate(&mut sums, row, measures);
        }

        Ok(AggregateRow::new(
            Vec::new(),
            measures.iter().copied().zip(sums).collect(),
        ))
    }

    /// Distinct values of one dimension across the matching rows, ascending.
    pub fn distinct_values(
        &self,
        dataset: Dataset,
        dimension: Dimension,
        filters: &Filters,
    ) -> Result<Vec<DimValue>, EngineError> {
        validate_group_by(dataset, &[dimension])?;
        let rows = self.fetch(dataset, filters)?;

        let values: BTreeSet<DimValue> = rows
            .iter()
            .filter_map(|row| row.dimension(dimension))
            .collect();

        Ok(values.into_iter().collect())
    }

    /// Validate filters, fetch, and re-apply the filters locally.
    fn fetch(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>, EngineError> {
        validate_filters(dataset, filters)?;

        let mut rows = self
            .source
            .fetch_raw(dataset, filters)
            .map_err(|e| EngineError::DataAccess {
                dataset,
                source: e.into(),
            })?;

        let before = rows.len();
        rows.retain(|row| row.dataset() == dataset && filters.matches(row));
        if rows.len() != before {
            debug!(
                "Source returned {} rows outside [{}] for {}",
                before - rows.len(),
                filters,
                dataset
            );
        }

        Ok(rows)
    }
}

fn group_key(row: &RawRow, group_by: &[Dimension]) -> Vec<DimValue> {
    group_by
        .iter()
        // Every dimension was checked against the dataset schema.
        .map(|d| row.dimension(*d).unwrap_or(DimValue::Int(0)))
        .collect()
}

/// Add a row's measures into running sums. Null contributes zero.
fn accumulate(sums: &mut [f64], row: &RawRow, measures: &[Measure]) {
    for (sum, measure) in sums.iter_mut().zip(measures) {
        *sum += row.measure(*measure).unwrap_or(0.0);
    }
}

fn validate_group_by(dataset: Dataset, group_by: &[Dimension]) -> Result<(), ContractError> {
    if group_by.is_empty() {
        return Err(ContractError::EmptyGroupBy);
    }

    let mut seen = BTreeSet::new();
    for &dimension in group_by {
        if !dataset.has_dimension(dimension) {
            return Err(ContractError::UnknownDimension { dataset, dimension });
        }
        if !seen.insert(dimension) {
            return Err(ContractError::DuplicateDimension { dimension });
        }
    }

    Ok(())
}

fn validate_filters(dataset: Dataset, filters: &Filters) -> Result<(), ContractError> {
    for (dimension, value) in filters.iter() {
        if !dataset.has_dimension(dimension) {
            return Err(ContractError::UnknownDimension { dataset, dimension });
        }
        if value.kind() != dimension.kind() {
            return Err(ContractError::FilterType {
                dimension,
                expected: dimension.kind(),
            });
        }
    }
    Ok(())
}
