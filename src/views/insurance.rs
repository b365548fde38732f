//! Insurance adoption by year, state and district.

use super::{aggregate_for_year, resolve_year, titled, Panel, ViewParams};
use crate::engine::{rank, Direction, Engine, Field};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Filters, Measure};
use crate::source::DataSource;

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let value: Field = Measure::InsAmount.into();
    let policies: Field = Measure::InsCount.into();
    let n = params.top_n;

    let yearly = engine.aggregate(Dataset::Insurance, &[Dimension::Year], &Filters::new())?;

    let state_year = resolve_year(engine, Dataset::Insurance, params)?;
    let states = aggregate_for_year(
        engine,
        Dataset::Insurance,
        &[Dimension::State, Dimension::Year],
        state_year,
    )?;

    let district_year = resolve_year(engine, Dataset::InsuranceByDistrict, params)?;
    let districts = aggregate_for_year(
        engine,
        Dataset::InsuranceByDistrict,
        &[Dimension::State, Dimension::District, Dimension::Year],
        district_year,
    )?;

    Ok(vec![
        Panel::line(
            "ins_val",
            "Yearly Insurance Transaction Value (India)",
            Dimension::Year,
            &value,
            None,
            yearly.clone(),
        ),
        Panel::line(
            "ins_cnt",
            "Yearly Insurance Policy Count (India)",
            Dimension::Year,
            &policies,
            None,
            yearly,
        ),
        Panel::bar(
            "ins_top_states",
            titled(&format!("Top {} States by Insurance Value", n), state_year),
            Dimension::State,
            &value,
            None,
            rank(&states, &value, n, Direction::Descending)?,
        ),
        Panel::bar(
            "ins_bottom_states",
            titled(&format!("Bottom {} States by Insurance Value", n), state_year),
            Dimension::State,
            &value,
            None,
            rank(&states, &value, n, Direction::Ascending)?,
        ),
        Panel::bar(
            "ins_top_dist",
            titled(&format!("Top {} Districts by Insurance Value", n), district_year),
            Dimension::District,
            &value,
            Some(Dimension::State),
            rank(&districts, &value, n, Direction::Descending)?,
        ),
        Panel::bar(
            "ins_bottom_dist",
            titled(
                &format!("Bottom {} Districts by Insurance Value", n),
                district_year,
            ),
            Dimension::District,
            &value,
            Some(Dimension::State),
            rank(&districts, &value, n, Direction::Ascending)?,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures;

    #[test]
    fn test_insurance_panels() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        assert_eq!(panels.len(), 6);
        assert_eq!(panels[0].chart.rows.len(), 2);
        assert_eq!(panels[0].chart.rows[1].measure(Measure::InsAmount), Some(1200.0));

        let top = &panels[2].chart.rows;
        assert_eq!(top[0].measure(Measure::InsAmount), Some(900.0));
        let bottom = &panels[3].chart.rows;
        assert_eq!(bottom[0].measure(Measure::InsAmount), Some(300.0));

        assert_eq!(panels[4].chart.x.as_deref(), Some("district"));
        assert_eq!(panels[4].chart.color.as_deref(), Some("state"));
        assert_eq!(panels[4].title, "Top 10 Districts by Insurance Value - 2022");
    }

    #[test]
    fn test_top_n_limits_rows() {
        let engine = fixtures::engine();
        let params = ViewParams {
            top_n: 1,
            ..ViewParams::default()
        };
        let panels = build(&engine, &params).unwrap();
        assert!(panels[2..].iter().all(|p| p.chart.rows.len() == 1));
    }
}
