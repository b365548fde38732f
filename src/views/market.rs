//! Market expansion: growth leaders, market size and the growth-potential
//! matrix.

use super::{titled, Panel, ViewParams};
use crate::engine::{
    categorize_quadrant, compute_growth, normalize, rank, slice, Direction, Engine, Field,
};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Filters, Measure};
use crate::source::DataSource;

pub const TXN_GROWTH: &str = "txn_growth_pct";
pub const AMOUNT_GROWTH: &str = "amount_growth_pct";
pub const COUNT_NORM: &str = "count_norm";
pub const AMOUNT_NORM: &str = "amount_norm";
pub const CATEGORY: &str = "category";

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let count: Field = Measure::TxnCount.into();
    let amount: Field = Measure::TxnAmount.into();
    let growth = Field::derived(TXN_GROWTH);
    let n = params.top_n;

    // Growth needs every year of history before narrowing to one.
    let state_year = engine.aggregate(
        Dataset::Transactions,
        &[Dimension::State, Dimension::Year],
        &Filters::new(),
    )?;
    let by_state = [Dimension::State];
    let state_year = compute_growth(&state_year, &by_state, Dimension::Year, &count, TXN_GROWTH)?;
    let state_year =
        compute_growth(&state_year, &by_state, Dimension::Year, &amount, AMOUNT_GROWTH)?;

    let latest = params.year.or_else(|| {
        state_year
            .iter()
            .filter_map(|r| r.dimension(Dimension::Year).and_then(|y| y.as_int()))
            .max()
    });
    let fastest = match latest {
        Some(year) => {
            let rows = slice(&state_year, &Filters::new().year(year))?;
            rank(&rows, &growth, n, Direction::Descending)?
        }
        None => Vec::new(),
    };

    let market = engine.aggregate(Dataset::Transactions, &[Dimension::State], &Filters::new())?;
    let matrix = normalize(&market, &count, COUNT_NORM)?;
    let matrix = normalize(&matrix, &amount, AMOUNT_NORM)?;
    let matrix = categorize_quadrant(
        &matrix,
        &Field::derived(COUNT_NORM),
        &Field::derived(AMOUNT_NORM),
        params.quadrant_threshold,
        CATEGORY,
    )?;

    Ok(vec![
        Panel::bar(
            "market_growth",
            titled(&format!("Top {} Fastest Growing States", n), latest),
            Dimension::State,
            &growth,
            None,
            fastest,
        ),
        Panel::bar(
            "market_top",
            format!("Top {} States by Transaction Value", n),
            Dimension::State,
            &amount,
            None,
            rank(&market, &amount, n, Direction::Descending)?,
        ),
        Panel::bar(
            "market_bottom",
            format!("Bottom {} States by Transaction Value (Expansion Opportunities)", n),
            Dimension::State,
            &amount,
            None,
            rank(&market, &amount, n, Direction::Ascending)?,
        ),
        Panel::scatter(
            "market_matrix",
            "State Market Segmentation - Growth Potential Matrix",
            &count,
            &amount,
            CATEGORY,
            matrix,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DerivedValue, Quadrant};
    use crate::views::fixtures;

    fn states(panel: &Panel) -> Vec<String> {
        panel
            .chart
            .rows
            .iter()
            .map(|r| r.dimension(Dimension::State).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_fastest_growing_excludes_first_period() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        let growth = &panels[0];
        assert_eq!(growth.title, "Top 10 Fastest Growing States - 2022");
        // Assam 100 -> 200 (+100%), Bihar 200 -> 220 (+10%), Goa has no 2021.
        assert_eq!(states(growth), vec!["Assam", "Bihar"]);
        assert_eq!(
            growth.chart.rows[0].number(&Field::derived(TXN_GROWTH)),
            Ok(Some(100.0))
        );
    }

    #[test]
    fn test_market_size_rankings() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();
        assert_eq!(states(&panels[1]), vec!["Bihar", "Assam", "Goa"]);
        assert_eq!(states(&panels[2]), vec!["Goa", "Assam", "Bihar"]);
    }

    #[test]
    fn test_growth_potential_matrix() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();
        let matrix = &panels[3].chart.rows;

        let category = |state: &str| {
            matrix
                .iter()
                .find(|r| r.dimension(Dimension::State).unwrap().to_string() == state)
                .and_then(|r| r.derived_value(CATEGORY))
        };
        // Counts: Assam 300, Bihar 420, Goa 10. Amounts: 3000, 6500, 90.
        assert_eq!(
            category("Bihar"),
            Some(DerivedValue::Category(Some(Quadrant::HighHigh)))
        );
        assert_eq!(
            category("Assam"),
            Some(DerivedValue::Category(Some(Quadrant::HighLow)))
        );
        assert_eq!(
            category("Goa"),
            Some(DerivedValue::Category(Some(Quadrant::LowLow)))
        );
        assert_eq!(panels[3].chart.color.as_deref(), Some(CATEGORY));
    }

    #[test]
    fn test_selected_year_without_history() {
        let engine = fixtures::engine();
        let params = ViewParams {
            year: Some(2021),
            ..ViewParams::default()
        };
        let panels = build(&engine, &params).unwrap();
        assert!(panels[0].is_empty());
    }
}
