//! Device brand usage and engagement ratio.

use super::{resolve_state, resolve_year, titled, Panel, ViewParams};
use crate::engine::{compute_ratio, rank, Direction, Engine, Field};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Filters, Measure};
use crate::source::DataSource;

/// App opens per registered user.
pub const ENGAGEMENT_RATIO: &str = "engagement_ratio";

pub(super) fn build<S: DataSource>(
    engine: &Engine<S>,
    params: &ViewParams,
) -> Result<Vec<Panel>, EngineError> {
    let devices: Field = Measure::DeviceUserCount.into();
    let ratio = Field::derived(ENGAGEMENT_RATIO);

    let brand_trend = engine.aggregate(
        Dataset::Users,
        &[Dimension::Year, Dimension::DeviceBrand],
        &Filters::new(),
    )?;

    let year = resolve_year(engine, Dataset::Users, params)?;
    let state = resolve_state(engine, Dataset::Users, params)?;

    let state_brands = match (year, &state) {
        (Some(year), Some(state)) => {
            let rows = engine.aggregate(
                Dataset::Users,
                &[Dimension::State, Dimension::Year, Dimension::DeviceBrand],
                &Filters::new().year(year).state(state),
            )?;
            rank(&rows, &devices, rows.len(), Direction::Descending)?
        }
        _ => Vec::new(),
    };
    let brand_title = match (&state, year) {
        (Some(state), Some(year)) => format!("Device Brand Usage in {} - {}", state, year),
        _ => "Device Brand Usage".to_string(),
    };

    // Only rows reporting both registered users and app opens count.
    let paired = match year {
        Some(year) => engine.aggregate_present(
            Dataset::Users,
            &[Dimension::State, Dimension::Year],
            &Filters::new().year(year),
            &[Measure::RegisteredUsers, Measure::AppOpens],
        )?,
        None => Vec::new(),
    };
    let engagement = compute_ratio(
        &paired,
        &Measure::AppOpens.into(),
        &Measure::RegisteredUsers.into(),
        ENGAGEMENT_RATIO,
    )?;
    let top = rank(&engagement, &ratio, params.top_n, Direction::Descending)?;
    let bottom = rank(&engagement, &ratio, params.top_n, Direction::Ascending)?;

    Ok(vec![
        Panel::line(
            "device_brand_trend",
            "Mobile Brand Usage Trend Across Years",
            Dimension::Year,
            &devices,
            Some(Dimension::DeviceBrand),
            brand_trend,
        ),
        Panel::bar(
            "device_state_brand",
            brand_title,
            Dimension::DeviceBrand,
            &devices,
            None,
            state_brands,
        ),
        Panel::bar(
            "eng_top",
            titled(
                &format!("Top {} States by Engagement Ratio", params.top_n),
                year,
            ),
            Dimension::State,
            &ratio,
            None,
            top,
        ),
        Panel::bar(
            "eng_low",
            titled(
                &format!("Bottom {} States by Engagement Ratio", params.top_n),
                year,
            ),
            Dimension::State,
            &ratio,
            None,
            bottom,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DimValue;
    use crate::source::MemorySource;
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
    fn test_state_brand_breakdown_defaults() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        let breakdown = &panels[1];
        assert_eq!(breakdown.title, "Device Brand Usage in Assam - 2022");
        let brands: Vec<_> = breakdown
            .chart
            .rows
            .iter()
            .map(|r| r.dimension(Dimension::DeviceBrand).cloned())
            .collect();
        assert_eq!(
            brands,
            vec![Some(DimValue::from("Xiaomi")), Some(DimValue::from("Apple"))]
        );
    }

    #[test]
    fn test_state_without_data_is_empty() {
        let engine = fixtures::engine();
        let params = ViewParams {
            state: Some("Kerala".to_string()),
            ..ViewParams::default()
        };
        let panels = build(&engine, &params).unwrap();
        assert!(panels[1].is_empty());
    }

    #[test]
    fn test_engagement_ranking_skips_zero_base() {
        let engine = fixtures::engine();
        let panels = build(&engine, &ViewParams::default()).unwrap();

        // Assam 400/100 (the Xiaomi row has no registered users), Bihar
        // 600/300; Goa has no registered users.
        assert_eq!(states(&panels[2]), vec!["Assam", "Bihar"]);
        assert_eq!(states(&panels[3]), vec!["Bihar", "Assam"]);
        assert_eq!(
            panels[2].chart.rows[0].number(&Field::derived(ENGAGEMENT_RATIO)),
            Ok(Some(4.0))
        );
    }

    #[test]
    fn test_engagement_ignores_rows_missing_a_side() {
        let engine = Engine::new(
            MemorySource::new(vec![
                fixtures::user("A", 2022, "Apple", 1.0, Some(100.0), Some(400.0)),
                fixtures::user("A", 2022, "Xiaomi", 1.0, None, Some(100.0)),
                fixtures::user("B", 2022, "Apple", 1.0, Some(20.0), None),
            ])
            .unwrap(),
        );
        let panels = build(&engine, &ViewParams::default()).unwrap();

        assert_eq!(states(&panels[2]), vec!["A"]);
        assert_eq!(
            panels[2].chart.rows[0].number(&Field::derived(ENGAGEMENT_RATIO)),
            Ok(Some(4.0))
        );
    }
}
