//! Derived metrics over aggregated rows.
//!
//! Every function returns new rows carrying one extra column. Cells that
//! cannot be computed for a principled reason (zero or negative base, no
//! previous period, missing input) are undefined rather than zero or an
//! error.

use super::row::{AggregateRow, DerivedValue, Field, Quadrant};
use crate::error::ContractError;
use crate::models::{DimValue, Dimension};
use std::collections::BTreeMap;

/// Append `numerator / denominator` as column `name`.
///
/// Undefined where the denominator is zero, negative or undefined.
pub fn compute_ratio(
    rows: &[AggregateRow],
    numerator: &Field,
    denominator: &Field,
    name: &str,
) -> Result<Vec<AggregateRow>, ContractError> {
    rows.iter()
        .map(|row| {
            let num = row.number(numerator)?;
            let den = row.number(denominator)?;
            Ok(row.with_derived(name, DerivedValue::Number(ratio(num, den))))
        })
        .collect()
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Percentage change against the previous period.
///
/// Undefined when there is no previous value, or it is zero or negative.
pub fn pct_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) if p > 0.0 => Some((c - p) / p * 100.0),
        _ => None,
    }
}

/// Append period-over-period growth of `measure` as column `name`.
///
/// Rows are partitioned by `group_dims` and ordered by `period` within each
/// partition. The earliest period of every partition has undefined growth.
/// Rows come back in input order.
pub fn compute_growth(
    rows: &[AggregateRow],
    group_dims: &[Dimension],
    period: Dimension,
    measure: &Field,
    name: &str,
) -> Result<Vec<AggregateRow>, ContractError> {
    let missing = |d: Dimension| ContractError::MissingColumn {
        column: d.name().to_string(),
    };

    let mut values = Vec::with_capacity(rows.len());
    let mut partitions: BTreeMap<Vec<&DimValue>, Vec<(&DimValue, usize)>> = BTreeMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let key = group_dims
            .iter()
            .map(|d| row.dimension(*d).ok_or_else(|| missing(*d)))
            .collect::<Result<Vec<_>, _>>()?;
        let at = row.dimension(period).ok_or_else(|| missing(period))?;

        values.push(row.number(measure)?);
        partitions.entry(key).or_default().push((at, idx));
    }

    let mut growth = vec![None; rows.len()];
    for members in partitions.values_mut() {
        members.sort_by(|a, b| a.0.cmp(b.0));

        for pair in members.windows(2) {
            let (prev_period, prev_idx) = pair[0];
            let (cur_period, cur_idx) = pair[1];
            if prev_period == cur_period {
                return Err(ContractError::DuplicatePeriod {
                    column: measure.name().to_string(),
                    period: cur_period.to_string(),
                });
            }
            growth[cur_idx] = pct_change(values[prev_idx], values[cur_idx]);
        }
    }

    Ok(rows
        .iter()
        .zip(growth)
        .map(|(row, g)| row.with_derived(name, DerivedValue::Number(g)))
        .collect())
}

/// Append the min-max score of `field` as column `name`.
///
/// Min and max are taken over every defined value. When they are equal every
/// defined value scores 0.
pub fn normalize(
    rows: &[AggregateRow],
    field: &Field,
    name: &str,
) -> Result<Vec<AggregateRow>, ContractError> {
    let values = rows
        .iter()
        .map(|row| row.number(field))
        .collect::<Result<Vec<_>, _>>()?;

    let bounds = values.iter().flatten().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    });

    Ok(rows
        .iter()
        .zip(values)
        .map(|(row, value)| {
            let score = match (value, bounds) {
                (Some(_), Some((lo, hi))) if hi == lo => Some(0.0),
                (Some(v), Some((lo, hi))) => Some((v - lo) / (hi - lo)),
                _ => None,
            };
            row.with_derived(name, DerivedValue::Number(score))
        })
        .collect())
}

/// Append the quadrant of two score columns as column `name`.
///
/// Undefined when either score is undefined.
pub fn categorize_quadrant(
    rows: &[AggregateRow],
    score_x: &Field,
    score_y: &Field,
    threshold: f64,
    name: &str,
) -> Result<Vec<AggregateRow>, ContractError> {
    rows.iter()
        .map(|row| {
            let quadrant = match (row.number(score_x)?, row.number(score_y)?) {
                (Some(x), Some(y)) => Some(Quadrant::classify(x, y, threshold)),
                _ => None,
            };
            Ok(row.with_derived(name, DerivedValue::Category(quadrant)))
        })
        .collect()
}
