//! Topical dashboard views.
//!
//! Each view composes engine operations into a list of chart panels. A
//! panel pairs a row set with the roles its columns play in the chart
//! (category axis, value axis, optional series split).

mod devices;
mod engagement;
mod insurance;
mod market;
mod overview;
mod transactions;

use crate::engine::{AggregateRow, Engine, Field};
use crate::error::EngineError;
use crate::models::{Dataset, Dimension, Filters};
use crate::source::DataSource;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// The dashboard tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Headline totals
    Overview,
    /// Transaction trends by year, payment type and state
    Transactions,
    /// Device brands and engagement ratio
    Devices,
    /// Insurance adoption by state and district
    Insurance,
    /// Growth and market-size segmentation
    Market,
    /// Registered users and app opens by region and pincode
    Engagement,
}

impl ViewKind {
    pub const ALL: [ViewKind; 6] = [
        ViewKind::Overview,
        ViewKind::Transactions,
        ViewKind::Devices,
        ViewKind::Insurance,
        ViewKind::Market,
        ViewKind::Engagement,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ViewKind::Overview => "Overview",
            ViewKind::Transactions => "Transaction Dynamics",
            ViewKind::Devices => "Device Dominance & User Engagement",
            ViewKind::Insurance => "Insurance Penetration & Growth Potential",
            ViewKind::Market => "Market Expansion",
            ViewKind::Engagement => "User Engagement & Growth Strategy",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// User selections shared by every view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    /// Selected year. Defaults to the latest year of each dataset.
    pub year: Option<i64>,
    /// Selected state for per-state breakdowns. Defaults to the first state.
    pub state: Option<String>,
    /// Rows in top/bottom rankings.
    pub top_n: usize,
    /// Rows in the state-wise transaction ranking.
    pub state_top_n: usize,
    /// Threshold separating high from low normalized scores.
    pub quadrant_threshold: f64,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            year: None,
            state: None,
            top_n: 10,
            state_top_n: 15,
            quadrant_threshold: 0.5,
        }
    }
}

/// How a panel should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
    /// A single headline number taken from the first row.
    Metric,
}

/// Row set plus column roles, handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub rows: Vec<AggregateRow>,
}

/// One chart of a view.
#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub key: String,
    pub title: String,
    pub chart: ChartSpec,
}

impl Panel {
    fn new(key: &str, title: impl Into<String>, chart: ChartSpec) -> Self {
        Self {
            key: key.to_string(),
            title: title.into(),
            chart,
        }
    }

    pub fn line(
        key: &str,
        title: impl Into<String>,
        x: Dimension,
        y: &Field,
        color: Option<Dimension>,
        rows: Vec<AggregateRow>,
    ) -> Self {
        Self::new(
            key,
            title,
            ChartSpec {
                kind: ChartKind::Line,
                x: Some(x.name().to_string()),
                y: y.name().to_string(),
                color: color.map(|c| c.name().to_string()),
                rows,
            },
        )
    }

    pub fn bar(
        key: &str,
        title: impl Into<String>,
        x: Dimension,
        y: &Field,
        color: Option<Dimension>,
        rows: Vec<AggregateRow>,
    ) -> Self {
        Self::new(
            key,
            title,
            ChartSpec {
                kind: ChartKind::Bar,
                x: Some(x.name().to_string()),
                y: y.name().to_string(),
                color: color.map(|c| c.name().to_string()),
                rows,
            },
        )
    }

    pub fn scatter(
        key: &str,
        title: impl Into<String>,
        x: &Field,
        y: &Field,
        color: &str,
        rows: Vec<AggregateRow>,
    ) -> Self {
        Self::new(
            key,
            title,
            ChartSpec {
                kind: ChartKind::Scatter,
                x: Some(x.name().to_string()),
                y: y.name().to_string(),
                color: Some(color.to_string()),
                rows,
            },
        )
    }

    pub fn metric(key: &str, title: impl Into<String>, y: &Field, row: AggregateRow) -> Self {
        Self::new(
            key,
            title,
            ChartSpec {
                kind: ChartKind::Metric,
                x: None,
                y: y.name().to_string(),
                color: None,
                rows: vec![row],
            },
        )
    }

    /// Whether the renderer should show a no-data state.
    pub fn is_empty(&self) -> bool {
        self.chart.rows.is_empty()
    }
}

/// A rendered tab.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub kind: ViewKind,
    pub title: String,
    pub panels: Vec<Panel>,
}

/// Build one view.
pub fn build_view<S: DataSource>(
    engine: &Engine<S>,
    kind: ViewKind,
    params: &ViewParams,
) -> Result<View, EngineError> {
    debug!("Building view: {}", kind);

    let panels = match kind {
        ViewKind::Overview => overview::build(engine, params)?,
        ViewKind::Transactions => transactions::build(engine, params)?,
        ViewKind::Devices => devices::build(engine, params)?,
        ViewKind::Insurance => insurance::build(engine, params)?,
        ViewKind::Market => market::build(engine, params)?,
        ViewKind::Engagement => engagement::build(engine, params)?,
    };

    Ok(View {
        kind,
        title: kind.title().to_string(),
        panels,
    })
}

/// The selected year, or the latest year the dataset holds.
fn resolve_year<S: DataSource>(
    engine: &Engine<S>,
    dataset: Dataset,
    params: &ViewParams,
) -> Result<Option<i64>, EngineError> {
    if params.year.is_some() {
        return Ok(params.year);
    }
    let years = engine.distinct_values(dataset, Dimension::Year, &Filters::new())?;
    Ok(years.last().and_then(|y| y.as_int()))
}

/// The selected state, or the first state the dataset holds.
fn resolve_state<S: DataSource>(
    engine: &Engine<S>,
    dataset: Dataset,
    params: &ViewParams,
) -> Result<Option<String>, EngineError> {
    if params.state.is_some() {
        return Ok(params.state.clone());
    }
    let states = engine.distinct_values(dataset, Dimension::State, &Filters::new())?;
    Ok(states.first().map(|s| s.to_string()))
}

/// Filters restricted to the selected year, when there is one.
fn year_filter(params: &ViewParams) -> Filters {
    match params.year {
        Some(year) => Filters::new().year(year),
        None => Filters::new(),
    }
}

/// Aggregate for one year; no year means no rows.
fn aggregate_for_year<S: DataSource>(
    engine: &Engine<S>,
    dataset: Dataset,
    group_by: &[Dimension],
    year: Option<i64>,
) -> Result<Vec<AggregateRow>, EngineError> {
    match year {
        Some(year) => engine.aggregate(dataset, group_by, &Filters::new().year(year)),
        None => Ok(Vec::new()),
    }
}

/// Suffix a title with the selected year.
fn titled(title: &str, year: Option<i64>) -> String {
    match year {
        Some(year) => format!("{} - {}", title, year),
        None => title.to_string(),
    }
}
