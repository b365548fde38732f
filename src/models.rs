//! Data models for the aggregation engine.
//!
//! This module describes the six logical datasets, their dimensions and
//! measures, the typed raw rows each dataset yields, and the exact-match
//! filters used to slice them.

use crate::error::InvalidMeasure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the six pre-aggregated sources in the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Transaction counts and amounts per state, quarter and payment type.
    Transactions,
    /// Device brand usage plus registered users and app opens per state.
    Users,
    /// Insurance policy counts and values per state.
    Insurance,
    /// Insurance policy counts and values per district.
    InsuranceByDistrict,
    /// Registered users and app opens per district.
    UsersByDistrict,
    /// Registered users for the top pincodes of each state.
    TopRegistrations,
}

impl Dataset {
    /// All datasets, in declaration order.
    pub const ALL: [Dataset; 6] = [
        Dataset::Transactions,
        Dataset::Users,
        Dataset::Insurance,
        Dataset::InsuranceByDistrict,
        Dataset::UsersByDistrict,
        Dataset::TopRegistrations,
    ];

    /// Name of the backing table in the relational store.
    pub fn table(&self) -> &'static str {
        match self {
            Dataset::Transactions => "aggregated_transaction",
            Dataset::Users => "aggregated_user",
            Dataset::Insurance => "aggregated_insurance",
            Dataset::InsuranceByDistrict => "map_insurance",
            Dataset::UsersByDistrict => "map_user",
            Dataset::TopRegistrations => "top_user",
        }
    }

    /// Dimensions a row of this dataset carries.
    pub fn dimensions(&self) -> &'static [Dimension] {
        use Dimension::*;
        match self {
            Dataset::Transactions => &[State, Year, Quarter, PaymentType],
            Dataset::Users => &[State, Year, Quarter, DeviceBrand],
            Dataset::Insurance => &[State, Year, Quarter],
            Dataset::InsuranceByDistrict => &[State, District, Year, Quarter],
            Dataset::UsersByDistrict => &[State, District, Year, Quarter],
            Dataset::TopRegistrations => &[State, Year, Quarter, EntityType, Pincode],
        }
    }

    /// Measures a row of this dataset carries, in output column order.
    pub fn measures(&self) -> &'static [Measure] {
        use Measure::*;
        match self {
            Dataset::Transactions => &[TxnCount, TxnAmount],
            Dataset::Users => &[DeviceUserCount, RegisteredUsers, AppOpens],
            Dataset::Insurance | Dataset::InsuranceByDistrict => &[InsCount, InsAmount],
            Dataset::UsersByDistrict => &[RegisteredUsers, AppOpens],
            Dataset::TopRegistrations => &[RegisteredUsers],
        }
    }

    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        self.dimensions().contains(&dimension)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A categorical field used for grouping and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    State,
    District,
    Year,
    Quarter,
    PaymentType,
    DeviceBrand,
    Pincode,
    EntityType,
}

/// Value type a dimension holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimKind {
    Int,
    Text,
}

impl Dimension {
    /// Column name used in output rows and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::State => "state",
            Dimension::District => "district",
            Dimension::Year => "year",
            Dimension::Quarter => "quarter",
            Dimension::PaymentType => "payment_type",
            Dimension::DeviceBrand => "device_brand",
            Dimension::Pincode => "pincode",
            Dimension::EntityType => "entity_type",
        }
    }

    pub fn kind(&self) -> DimKind {
        match self {
            Dimension::Year | Dimension::Quarter => DimKind::Int,
            _ => DimKind::Text,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric field that is summed during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    TxnCount,
    TxnAmount,
    DeviceUserCount,
    RegisteredUsers,
    AppOpens,
    InsCount,
    InsAmount,
}

impl Measure {
    /// Column name used in output rows and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Measure::TxnCount => "txn_count",
            Measure::TxnAmount => "txn_amount",
            Measure::DeviceUserCount => "device_user_count",
            Measure::RegisteredUsers => "registered_users",
            Measure::AppOpens => "app_opens",
            Measure::InsCount => "ins_count",
            Measure::InsAmount => "ins_amount",
        }
    }

    /// Human readable axis label.
    pub fn label(&self) -> &'static str {
        match self {
            Measure::TxnCount => "Total Transaction Count",
            Measure::TxnAmount => "Total Transaction Amount",
            Measure::DeviceUserCount => "Registered Users (by device)",
            Measure::RegisteredUsers => "Registered Users",
            Measure::AppOpens => "App Opens",
            Measure::InsCount => "Insurance Policies",
            Measure::InsAmount => "Insurance Value",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single dimension value.
///
/// Integer dimensions (year, quarter) order numerically, text dimensions
/// lexicographically. A given dimension only ever holds one variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimValue {
    Int(i64),
    Text(String),
}

impl DimValue {
    pub fn kind(&self) -> DimKind {
        match self {
            DimValue::Int(_) => DimKind::Int,
            DimValue::Text(_) => DimKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DimValue::Int(v) => Some(*v),
            DimValue::Text(_) => None,
        }
    }
}

impl fmt::Display for DimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimValue::Int(v) => write!(f, "{}", v),
            DimValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DimValue {
    fn from(v: i64) -> Self {
        DimValue::Int(v)
    }
}

impl From<&str> for DimValue {
    fn from(s: &str) -> Self {
        DimValue::Text(s.to_string())
    }
}

impl From<String> for DimValue {
    fn from(s: String) -> Self {
        DimValue::Text(s)
    }
}

/// Exact-match predicates keyed by dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filters(BTreeMap<Dimension, DimValue>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a predicate `dimension == value`.
    pub fn with(mut self, dimension: Dimension, value: impl Into<DimValue>) -> Self {
        self.0.insert(dimension, value.into());
        self
    }

    pub fn year(self, year: i64) -> Self {
        self.with(Dimension::Year, year)
    }

    pub fn state(self, state: &str) -> Self {
        self.with(Dimension::State, state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimValue)> {
        self.0.iter().map(|(d, v)| (*d, v))
    }

    /// Whether a raw row satisfies every predicate.
    pub fn matches(&self, row: &RawRow) -> bool {
        self.iter()
            .all(|(dim, value)| row.dimension(dim).as_ref() == Some(value))
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        let parts: Vec<String> = self.iter().map(|(d, v)| format!("{}={}", d, v)).collect();
        f.write_str(&parts.join(", "))
    }
}

/// A row of `aggregated_transaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub state: String,
    pub year: i64,
    pub quarter: i64,
    pub payment_type: String,
    pub txn_count: f64,
    pub txn_amount: f64,
}

/// A row of `aggregated_user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub state: String,
    pub year: i64,
    pub quarter: i64,
    pub device_brand: String,
    pub device_user_count: f64,
    /// Absent upstream for some quarters.
    #[serde(default)]
    pub registered_users: Option<f64>,
    /// Absent upstream for some quarters.
    #[serde(default)]
    pub app_opens: Option<f64>,
}

/// A row of `aggregated_insurance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRow {
    pub state: String,
    pub year: i64,
    pub quarter: i64,
    pub ins_count: f64,
    pub ins_amount: f64,
}

/// A row of `map_insurance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictInsuranceRow {
    pub state: String,
    pub district: String,
    pub year: i64,
    pub quarter: i64,
    pub ins_count: f64,
    pub ins_amount: f64,
}

/// A row of `map_user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictUserRow {
    pub state: String,
    pub district: String,
    pub year: i64,
    pub quarter: i64,
    pub registered_users: f64,
    pub app_opens: f64,
}

/// A pincode row of `top_user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PincodeRegistrationRow {
    pub state: String,
    pub year: i64,
    pub quarter: i64,
    pub pincode: String,
    pub registered_users: f64,
}

/// Entity type carried by every `TopRegistrations` row.
pub const PINCODE_ENTITY: &str = "pincode";

/// A typed raw row as returned by a data source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Transaction(TransactionRow),
    User(UserRow),
    Insurance(InsuranceRow),
    DistrictInsurance(DistrictInsuranceRow),
    DistrictUser(DistrictUserRow),
    PincodeRegistration(PincodeRegistrationRow),
}

impl RawRow {
    pub fn dataset(&self) -> Dataset {
        match self {
            RawRow::Transaction(_) => Dataset::Transactions,
            RawRow::User(_) => Dataset::Users,
            RawRow::Insurance(_) => Dataset::Insurance,
            RawRow::DistrictInsurance(_) => Dataset::InsuranceByDistrict,
            RawRow::DistrictUser(_) => Dataset::UsersByDistrict,
            RawRow::PincodeRegistration(_) => Dataset::TopRegistrations,
        }
    }

    /// Value of a dimension, or `None` if this dataset lacks it.
    pub fn dimension(&self, dimension: Dimension) -> Option<DimValue> {
        use Dimension::*;
        let text = |s: &String| Some(DimValue::Text(s.clone()));
        match (self, dimension) {
            (RawRow::Transaction(r), State) => text(&r.state),
            (RawRow::Transaction(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::Transaction(r), Quarter) => Some(DimValue::Int(r.quarter)),
            (RawRow::Transaction(r), PaymentType) => text(&r.payment_type),

            (RawRow::User(r), State) => text(&r.state),
            (RawRow::User(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::User(r), Quarter) => Some(DimValue::Int(r.quarter)),
            (RawRow::User(r), DeviceBrand) => text(&r.device_brand),

            (RawRow::Insurance(r), State) => text(&r.state),
            (RawRow::Insurance(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::Insurance(r), Quarter) => Some(DimValue::Int(r.quarter)),

            (RawRow::DistrictInsurance(r), State) => text(&r.state),
            (RawRow::DistrictInsurance(r), District) => text(&r.district),
            (RawRow::DistrictInsurance(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::DistrictInsurance(r), Quarter) => Some(DimValue::Int(r.quarter)),

            (RawRow::DistrictUser(r), State) => text(&r.state),
            (RawRow::DistrictUser(r), District) => text(&r.district),
            (RawRow::DistrictUser(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::DistrictUser(r), Quarter) => Some(DimValue::Int(r.quarter)),

            (RawRow::PincodeRegistration(r), State) => text(&r.state),
            (RawRow::PincodeRegistration(r), Year) => Some(DimValue::Int(r.year)),
            (RawRow::PincodeRegistration(r), Quarter) => Some(DimValue::Int(r.quarter)),
            (RawRow::PincodeRegistration(_), EntityType) => {
                Some(DimValue::Text(PINCODE_ENTITY.to_string()))
            }
            (RawRow::PincodeRegistration(r), Pincode) => text(&r.pincode),

            _ => None,
        }
    }

    /// Value of a measure. `None` means null upstream or not part of this dataset.
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        use Measure::*;
        match (self, measure) {
            (RawRow::Transaction(r), TxnCount) => Some(r.txn_count),
            (RawRow::Transaction(r), TxnAmount) => Some(r.txn_amount),

            (RawRow::User(r), DeviceUserCount) => Some(r.device_user_count),
            (RawRow::User(r), RegisteredUsers) => r.registered_users,
            (RawRow::User(r), AppOpens) => r.app_opens,

            (RawRow::Insurance(r), InsCount) => Some(r.ins_count),
            (RawRow::Insurance(r), InsAmount) => Some(r.ins_amount),

            (RawRow::DistrictInsurance(r), InsCount) => Some(r.ins_count),
            (RawRow::DistrictInsurance(r), InsAmount) => Some(r.ins_amount),

            (RawRow::DistrictUser(r), RegisteredUsers) => Some(r.registered_users),
            (RawRow::DistrictUser(r), AppOpens) => Some(r.app_opens),

            (RawRow::PincodeRegistration(r), RegisteredUsers) => Some(r.registered_users),

            _ => None,
        }
    }

    /// Check that every present measure is finite and non-negative.
    pub fn validate(&self) -> Result<(), InvalidMeasure> {
        let dataset = self.dataset();
        for &measure in dataset.measures() {
            if let Some(value) = self.measure(measure) {
                if !value.is_finite() || value < 0.0 {
                    return Err(InvalidMeasure {
                        dataset,
                        measure,
                        value,
                    });
                }
            }
        }
        Ok(())
    }
}
