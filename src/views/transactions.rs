//! Transaction trends by year, payment type and state.

use super::{aggregate_for_year, resolve_year, titled, Panel, ViewParams};
use crate::engine::{rank, Direction, Engine, Field};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Filters, Measure};
use crate::source::DataSource;

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let amount: Field = Measure::TxnAmount.into();
    let count: Field = Measure::TxnCount.into();

    let yearly = engine.aggregate(Dataset::Transactions, &[Dimension::Year], &Filters::new())?;

    let by_type = engine.aggregate(
        Dataset::Transactions,
        &[Dimension::Year, Dimension::PaymentType],
        &Filters::new(),
    )?;

    let year = resolve_year(engine, Dataset::Transactions, params)?;
    let state_year = aggregate_for_year(
        engine,
        Dataset::Transactions,
        &[Dimension::State, Dimension::Year],
        year,
    )?;
    let top_states = rank(&state_year, &amount, params.state_top_n, Direction::Descending)?;

    Ok(vec![
        Panel::line(
            "txn_year_amount",
            "Total Transaction Amount by Year (All India)",
            Dimension::Year,
            &amount,
            None,
            yearly.clone(),
        ),
        Panel::line(
            "txn_year_count",
            "Total Transaction Count by Year (All India)",
            Dimension::Year,
            &count,
            None,
            yearly,
        ),
        Panel::line(
            "txn_type_line",
            "Transaction Amount Trend by Payment Type",
            Dimension::Year,
            &amount,
            Some(Dimension::PaymentType),
            by_type,
        ),
        Panel::bar(
            "txn_state_bar",
            titled(
                &format!("Top {} States by Transaction Amount", params.state_top_n),
                year,
            ),
            Dimension::State,
            &amount,
            None,
            top_states,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DimValue;
    use crate::views::fixtures;

    #[test]
    fn test_transaction_panels() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        let yearly = &panels[0].chart.rows;
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].measure(Measure::TxnAmount), Some(4000.0));
        assert_eq!(yearly[1].measure(Measure::TxnAmount), Some(5590.0));

        assert_eq!(panels[2].chart.color.as_deref(), Some("payment_type"));
        assert_eq!(panels[2].chart.rows.len(), 3);

        let states = &panels[3];
        assert_eq!(states.title, "Top 15 States by Transaction Amount - 2022");
        let order: Vec<_> = states
            .chart
            .rows
            .iter()
            .map(|r| r.dimension(Dimension::State).cloned())
            .collect();
        assert_eq!(
            order,
            vec![
                Some(DimValue::from("Bihar")),
                Some(DimValue::from("Assam")),
                Some(DimValue::from("Goa")),
            ]
        );
    }

    #[test]
    fn test_unknown_year_is_empty() {
        let engine = fixtures::engine();
        let params = ViewParams {
            year: Some(1999),
            ..ViewParams::default()
        };
        let panels = build(&engine, &params).unwrap();
        assert!(panels[3].is_empty());
        assert!(!panels[0].is_empty());
    }
}
