//! In-memory data source backed by a JSON snapshot.

use super::DataSource;
use crate::models::{
    Dataset, DistrictInsuranceRow, DistrictUserRow, Filters, InsuranceRow,
    PincodeRegistrationRow, RawRow, TransactionRow, UserRow,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot file layout: one array per dataset, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub transactions: Vec<TransactionRow>,
    #[serde(default)]
    pub users: Vec<UserRow>,
    #[serde(default)]
    pub insurance: Vec<InsuranceRow>,
    #[serde(default)]
    pub insurance_by_district: Vec<DistrictInsuranceRow>,
    #[serde(default)]
    pub users_by_district: Vec<DistrictUserRow>,
    #[serde(default)]
    pub top_registrations: Vec<PincodeRegistrationRow>,
}

impl Snapshot {
    fn into_rows(self) -> Vec<RawRow> {
        let mut rows = Vec::new();
        rows.extend(self.transactions.into_iter().map(RawRow::Transaction));
        rows.extend(self.users.into_iter().map(RawRow::User));
        rows.extend(self.insurance.into_iter().map(RawRow::Insurance));
        rows.extend(
            self.insurance_by_district
                .into_iter()
                .map(RawRow::DistrictInsurance),
        );
        rows.extend(self.users_by_district.into_iter().map(RawRow::DistrictUser));
        rows.extend(
            self.top_registrations
                .into_iter()
                .map(RawRow::PincodeRegistration),
        );
        rows
    }
}

/// Rows held in memory.
pub struct MemorySource {
    rows: Vec<RawRow>,
    origin: Option<PathBuf>,
}

impl MemorySource {
    /// Build a source from rows, validating every measure.
    pub fn new(rows: Vec<RawRow>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            row.validate()
                .with_context(|| format!("Invalid row #{} in memory source", index))?;
        }
        Ok(Self { rows, origin: None })
    }

    /// Load a JSON snapshot file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

        let mut source = Self::new(snapshot.into_rows())
            .with_context(|| format!("Invalid data in snapshot: {}", path.display()))?;
        info!(
            "Loaded {} rows from snapshot {}",
            source.rows.len(),
            path.display()
        );
        source.origin = Some(path.to_path_buf());
        Ok(source)
    }
}

impl DataSource for MemorySource {
    fn fetch_raw(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.dataset() == dataset && filters.matches(row))
            .cloned()
            .collect())
    }

    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => format!("snapshot {}", path.display()),
            None => "in-memory rows".to_string(),
        }
    }
}
