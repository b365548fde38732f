//! Ranking and slicing of aggregated rows.

use super::row::{AggregateRow, Direction, Field};
use crate::error::ContractError;
use crate::models::Filters;
use std::cmp::Ordering;

/// Sort rows by `by` and keep the first `n`.
///
/// The sort is stable, so ties keep their input order. Rows whose value is
/// undefined take no part in the ranking and are dropped.
pub fn rank(
    rows: &[AggregateRow],
    by: &Field,
    n: usize,
    direction: Direction,
) -> Result<Vec<AggregateRow>, ContractError> {
    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(value) = row.number(by)? {
            keyed.push((value, row));
        }
    }

    keyed.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
    keyed.truncate(n);

    Ok(keyed.into_iter().map(|(_, row)| row.clone()).collect())
}

/// Keep the rows matching every filter.
///
/// Filtering on a dimension the rows were not grouped by is a contract error.
pub fn slice(rows: &[AggregateRow], filters: &Filters) -> Result<Vec<AggregateRow>, ContractError> {
    let mut out = Vec::new();
    for row in rows {
        let mut keep = true;
        for (dimension, value) in filters.iter() {
            match row.dimension(dimension) {
                Some(v) => keep &= v == value,
                None => {
                    return Err(ContractError::MissingColumn {
                        column: dimension.name().to_string(),
                    })
                }
            }
        }
        if keep {
            out.push(row.clone());
        }
    }
    Ok(out)
}
