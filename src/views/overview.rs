//! Headline totals.

use super::{year_filter, Panel, ViewParams};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::models::{Dataset, Measure};
use crate::source::DataSource;

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let filters = year_filter(params);
    let txn = engine.summarize(Dataset::Transactions, &filters)?;
    let users = engine.summarize(Dataset::Users, &filters)?;

    let metric = |key: &str, measure: Measure, row| {
        Panel::metric(key, measure.label(), &measure.into(), row)
    };

    Ok(vec![
        metric("total_amount", Measure::TxnAmount, txn.clone()),
        metric("total_count", Measure::TxnCount, txn),
        metric("total_users", Measure::RegisteredUsers, users),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures;

    #[test]
    fn test_overview_totals() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].chart.rows[0].measure(Measure::TxnAmount), Some(9590.0));
        assert_eq!(panels[1].chart.rows[0].measure(Measure::TxnCount), Some(730.0));
        // The null registered-users row contributes nothing.
        assert_eq!(
            panels[2].chart.rows[0].measure(Measure::RegisteredUsers),
            Some(400.0)
        );
    }

    #[test]
    fn test_overview_respects_year() {
        let engine = fixtures::engine();
        let params = ViewParams {
            year: Some(2021),
            ..ViewParams::default()
        };
        let panels = build(&engine, &params).unwrap();
        assert_eq!(panels[0].chart.rows[0].measure(Measure::TxnAmount), Some(4000.0));
        assert_eq!(
            panels[2].chart.rows[0].measure(Measure::RegisteredUsers),
            Some(0.0)
        );
    }
}
