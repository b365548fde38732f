//! Registered users and app opens by state, district and pincode.

use super::{year_filter, Panel, ViewParams};
use crate::engine::{rank, Direction, Engine, Field};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Measure};
use crate::source::DataSource;

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let registered: Field = Measure::RegisteredUsers.into();
    let opens: Field = Measure::AppOpens.into();
    let n = params.top_n;
    let filters = year_filter(params);

    let by_state = engine.aggregate(Dataset::UsersByDistrict, &[Dimension::State], &filters)?;
    let by_district = engine.aggregate(
        Dataset::UsersByDistrict,
        &[Dimension::State, Dimension::District],
        &filters,
    )?;
    let pincodes = engine.aggregate(
        Dataset::TopRegistrations,
        &[Dimension::State, Dimension::Pincode],
        &filters,
    )?;

    Ok(vec![
        Panel::bar(
            "eng_reg_state",
            format!("Top {} States by Registered Users", n),
            Dimension::State,
            &registered,
            None,
            rank(&by_state, &registered, n, Direction::Descending)?,
        ),
        Panel::bar(
            "eng_app_state",
            format!("Top {} States by App Opens", n),
            Dimension::State,
            &opens,
            None,
            rank(&by_state, &opens, n, Direction::Descending)?,
        ),
        Panel::bar(
            "eng_reg_dist",
            format!("Top {} Districts by Registered Users", n),
            Dimension::District,
            &registered,
            Some(Dimension::State),
            rank(&by_district, &registered, n, Direction::Descending)?,
        ),
        Panel::bar(
            "eng_app_dist",
            format!("Top {} Districts by App Opens", n),
            Dimension::District,
            &opens,
            Some(Dimension::State),
            rank(&by_district, &opens, n, Direction::Descending)?,
        ),
        Panel::bar(
            "eng_top_pins",
            format!("Top {} Pincodes by User Registrations", n),
            Dimension::Pincode,
            &registered,
            Some(Dimension::State),
            rank(&pincodes, &registered, n, Direction::Descending)?,
        ),
    ])
}
