//! Read-only SQLite data source.
//!
//! Each dataset maps onto one table of the pre-aggregated store. Filters are
//! pushed down as bound `WHERE col = ?` predicates.

use super::DataSource;
use crate::models::{
    Dataset, DimValue, Dimension, DistrictInsuranceRow, DistrictUserRow, Filters, InsuranceRow,
    PincodeRegistrationRow, RawRow, TransactionRow, UserRow, PINCODE_ENTITY,
};
use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Selected columns per dataset, in decode order.
fn select_columns(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Transactions => "state, year, quarter, txn_type, txn_count, txn_amount",
        Dataset::Users => {
            "state, year, quarter, device_brand, device_user_count, \
             total_registered_users, total_app_opens"
        }
        Dataset::Insurance => "state, year, quarter, ins_count, ins_amount",
        Dataset::InsuranceByDistrict => "state, district, year, quarter, ins_count, ins_amount",
        Dataset::UsersByDistrict => "state, district, year, quarter, registered_users, app_opens",
        Dataset::TopRegistrations => "parent_state, year, quarter, entity_name, registered_users",
    }
}

/// Column backing a dimension in a dataset's table.
fn dimension_column(dataset: Dataset, dimension: Dimension) -> Option<&'static str> {
    if !dataset.has_dimension(dimension) {
        return None;
    }
    let column = match (dataset, dimension) {
        (Dataset::TopRegistrations, Dimension::State) => "parent_state",
        (Dataset::TopRegistrations, Dimension::Pincode) => "entity_name",
        (_, Dimension::PaymentType) => "txn_type",
        (_, dim) => dim.name(),
    };
    Some(column)
}

/// Build the query and its bound parameters.
fn build_query(dataset: Dataset, filters: &Filters) -> Result<(String, Vec<Value>)> {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if dataset == Dataset::TopRegistrations {
        clauses.push("entity_type = ?".to_string());
        params.push(Value::Text(PINCODE_ENTITY.to_string()));
    }

    for (dimension, value) in filters.iter() {
        // Implied by the base predicate above.
        if dataset == Dataset::TopRegistrations && dimension == Dimension::EntityType {
            if value != &DimValue::from(PINCODE_ENTITY) {
                clauses.push("0".to_string());
            }
            continue;
        }
        let column = dimension_column(dataset, dimension).with_context(|| {
            format!("Table {} has no column for {}", dataset.table(), dimension)
        })?;
        clauses.push(format!("{} = ?", column));
        params.push(match value {
            DimValue::Int(v) => Value::Integer(*v),
            DimValue::Text(s) => Value::Text(s.clone()),
        });
    }

    let mut sql = format!("SELECT {} FROM {}", select_columns(dataset), dataset.table());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    Ok((sql, params))
}

/// Null measures in non-nullable columns contribute nothing to sums.
fn measure(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(0.0))
}

fn decode_row(dataset: Dataset, row: &Row<'_>) -> rusqlite::Result<RawRow> {
    let decoded = match dataset {
        Dataset::Transactions => RawRow::Transaction(TransactionRow {
            state: row.get(0)?,
            year: row.get(1)?,
            quarter: row.get(2)?,
            payment_type: row.get(3)?,
            txn_count: measure(row, 4)?,
            txn_amount: measure(row, 5)?,
        }),
        Dataset::Users => RawRow::User(UserRow {
            state: row.get(0)?,
            year: row.get(1)?,
            quarter: row.get(2)?,
            device_brand: row.get(3)?,
            device_user_count: measure(row, 4)?,
            registered_users: row.get(5)?,
            app_opens: row.get(6)?,
        }),
        Dataset::Insurance => RawRow::Insurance(InsuranceRow {
            state: row.get(0)?,
            year: row.get(1)?,
            quarter: row.get(2)?,
            ins_count: measure(row, 3)?,
            ins_amount: measure(row, 4)?,
        }),
        Dataset::InsuranceByDistrict => RawRow::DistrictInsurance(DistrictInsuranceRow {
            state: row.get(0)?,
            district: row.get(1)?,
            year: row.get(2)?,
            quarter: row.get(3)?,
            ins_count: measure(row, 4)?,
            ins_amount: measure(row, 5)?,
        }),
        Dataset::UsersByDistrict => RawRow::DistrictUser(DistrictUserRow {
            state: row.get(0)?,
            district: row.get(1)?,
            year: row.get(2)?,
            quarter: row.get(3)?,
            registered_users: measure(row, 4)?,
            app_opens: measure(row, 5)?,
        }),
        Dataset::TopRegistrations => RawRow::PincodeRegistration(PincodeRegistrationRow {
            state: row.get(0)?,
            year: row.get(1)?,
            quarter: row.get(2)?,
            pincode: row.get(3)?,
            registered_users: measure(row, 4)?,
        }),
    };
    Ok(decoded)
}

/// Data source over a SQLite database file.
pub struct SqliteSource {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSource {
    /// Open a database file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

        info!("Opened database {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an existing connection.
    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn, path: None }
    }
}

impl DataSource for SqliteSource {
    fn fetch_raw(&self, dataset: Dataset, filters: &Filters) -> Result<Vec<RawRow>> {
        let (sql, params) = build_query(dataset, filters)?;
        debug!("SQL: {} ({} params)", sql, params.len());

        let mut stmt = self
            .conn
            .prepare(&sql)
            .with_context(|| format!("Failed to prepare query on {}", dataset.table()))?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                decode_row(dataset, row)
            })
            .with_context(|| format!("Failed to query {}", dataset.table()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to decode rows of {}", dataset.table()))?;

        for row in &rows {
            row.validate()
                .with_context(|| format!("Invalid data in {}", dataset.table()))?;
        }

        Ok(rows)
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite {}", path.display()),
            None => "sqlite connection".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE aggregated_transaction (
                state TEXT, year INTEGER, quarter INTEGER, txn_type TEXT,
                txn_count INTEGER, txn_amount REAL);
             INSERT INTO aggregated_transaction VALUES
                ('A', 2021, 1, 'Recharge', 10, 100.0),
                ('A', 2022, 1, 'Recharge', 12, 150.0),
                ('B', 2022, 2, 'Merchant payments', 4, NULL);

             CREATE TABLE aggregated_user (
                state TEXT, year INTEGER, quarter INTEGER, device_brand TEXT,
                device_user_count INTEGER, total_registered_users INTEGER,
                total_app_opens INTEGER);
             INSERT INTO aggregated_user VALUES
                ('A', 2022, 1, 'Apple', 5, NULL, 40);

             CREATE TABLE top_user (
                parent_state TEXT, year INTEGER, quarter INTEGER,
                entity_type TEXT, entity_name TEXT, registered_users INTEGER);
             INSERT INTO top_user VALUES
                ('A', 2022, 1, 'pincode', '560001', 70),
                ('A', 2022, 1, 'district', 'bengaluru urban', 900);",
        )
        .unwrap();
        SqliteSource::from_connection(conn)
    }

    #[test]
    fn test_build_query_with_filters() {
        let (sql, params) =
            build_query(Dataset::Transactions, &Filters::new().year(2022).state("A")).unwrap();
        assert_eq!(
            sql,
            "SELECT state, year, quarter, txn_type, txn_count, txn_amount \
             FROM aggregated_transaction WHERE state = ? AND year = ?"
        );
        assert_eq!(
            params,
            vec![Value::Text("A".to_string()), Value::Integer(2022)]
        );
    }

    #[test]
    fn test_build_query_top_user_mapping() {
        let (sql, params) =
            build_query(Dataset::TopRegistrations, &Filters::new().state("A")).unwrap();
        assert!(sql.contains("FROM top_user WHERE entity_type = ? AND parent_state = ?"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_build_query_rejects_foreign_dimension() {
        let result = build_query(
            Dataset::Insurance,
            &Filters::new().with(Dimension::District, "X"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_transactions() {
        let source = seeded();

        let rows = source
            .fetch_raw(Dataset::Transactions, &Filters::new().year(2022))
            .unwrap();
        assert_eq!(rows.len(), 2);

        // NULL amount decodes as zero.
        let b = rows
            .iter()
            .find(|r| r.dimension(Dimension::State) == Some(DimValue::from("B")))
            .unwrap();
        assert_eq!(b.measure(crate::models::Measure::TxnAmount), Some(0.0));
    }

    #[test]
    fn test_fetch_users_keeps_nulls() {
        let source = seeded();
        let rows = source.fetch_raw(Dataset::Users, &Filters::new()).unwrap();
        match &rows[0] {
            RawRow::User(u) => {
                assert_eq!(u.registered_users, None);
                assert_eq!(u.app_opens, Some(40.0));
            }
            other => panic!("unexpected row {:?}", other),
        }
    }

    #[test]
    fn test_fetch_top_user_only_pincodes() {
        let source = seeded();
        let rows = source
            .fetch_raw(Dataset::TopRegistrations, &Filters::new())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].dimension(Dimension::Pincode),
            Some(DimValue::from("560001"))
        );
    }

    #[test]
    fn test_missing_table_is_error() {
        let source = seeded();
        assert!(source
            .fetch_raw(Dataset::Insurance, &Filters::new())
            .is_err());
    }
}
