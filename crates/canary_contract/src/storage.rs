//! Contract registry
//!
//! SQLite-backed, append-only store of approved contracts. One row per
//! (table, version); the whole contract is kept as JSON next to the indexed
//! identity columns. Supersession is never written: a stored contract reads
//! back as `Approved` when it is the newest version of its table and as
//! `Superseded` otherwise.

use crate::contract::{Contract, ContractStatus};
use crate::error::{ConcurrentModificationError, InvalidStateError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ConcurrentModification(#[from] ConcurrentModificationError),

    #[error("Only approved contracts can be recorded: {0}")]
    InvalidState(#[from] InvalidStateError),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Database-backed registry of approved contracts.
#[derive(Debug, Clone)]
pub struct ContractStorage {
    pool: SqlitePool,
}

impl ContractStorage {
    /// Open (or create) the registry database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        debug!(path = %path.display(), "Opened contract registry");
        Self::with_pool(pool).await
    }

    /// Create an in-memory registry (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        // A single connection that never expires keeps the database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let storage = Self { pool };
        storage.init_tables().await?;
        Ok(storage)
    }

    async fn init_tables(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contracts (
                table_name TEXT NOT NULL,
                version INTEGER NOT NULL,
                approved_by TEXT NOT NULL,
                approved_at TEXT NOT NULL,
                contract_json TEXT NOT NULL,
                recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (table_name, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a newly approved contract.
    ///
    /// Version N is accepted only while the stored latest version is exactly
    /// N - 1 (nothing stored for version 1); otherwise another approval got
    /// there first and [`StorageError::ConcurrentModification`] is returned.
    pub async fn record_approved(&self, contract: &Contract) -> Result<(), StorageError> {
        if contract.status() != ContractStatus::Approved {
            return Err(InvalidStateError {
                expected: ContractStatus::Approved,
                found: contract.status(),
            }
            .into());
        }

        let table_name = contract.table_name();
        let version = contract.version();
        let expected = version.checked_sub(1).filter(|v| *v > 0);
        let contract_json = serde_json::to_string(contract)?;
        let approved_by = contract.identity.approved_by.clone().unwrap_or_default();
        let approved_at = contract
            .identity
            .approved_at
            .unwrap_or(contract.identity.updated_at)
            .to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let found: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM contracts WHERE table_name = ?")
                .bind(table_name)
                .fetch_one(&mut *tx)
                .await?;
        let found = found.map(|v| v as u32);
        if found != expected {
            return Err(ConcurrentModificationError {
                table_name: table_name.to_string(),
                expected,
                found,
            }
            .into());
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO contracts (table_name, version, approved_by, approved_at, contract_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(table_name)
        .bind(version as i64)
        .bind(&approved_by)
        .bind(&approved_at)
        .bind(&contract_json)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(ConcurrentModificationError {
                    table_name: table_name.to_string(),
                    expected,
                    found: Some(version),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await?;
        info!(table = %table_name, version, approved_by = %approved_by, "Recorded approved contract");
        Ok(())
    }

    /// Newest version number recorded for `table_name`.
    pub async fn latest_version(&self, table_name: &str) -> Result<Option<u32>, StorageError> {
        let latest: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM contracts WHERE table_name = ?")
                .bind(table_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(latest.map(|v| v as u32))
    }

    /// The current contract for `table_name`, if any version was approved.
    pub async fn latest_approved(&self, table_name: &str) -> Result<Option<Contract>, StorageError> {
        let row = sqlx::query(
            "SELECT contract_json FROM contracts WHERE table_name = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(table_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| read_contract(&row, ContractStatus::Approved))
            .transpose()
    }

    pub async fn get(&self, table_name: &str, version: u32) -> Result<Option<Contract>, StorageError> {
        let latest = self.latest_version(table_name).await?;
        let row = sqlx::query("SELECT contract_json FROM contracts WHERE table_name = ? AND version = ?")
            .bind(table_name)
            .bind(version as i64)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| read_contract(&row, status_for(version, latest)))
            .transpose()
    }

    /// Every recorded version of `table_name`, oldest first.
    pub async fn history(&self, table_name: &str) -> Result<Vec<Contract>, StorageError> {
        let rows = sqlx::query(
            "SELECT version, contract_json FROM contracts WHERE table_name = ? ORDER BY version ASC",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        let latest = match rows.last() {
            Some(row) => Some(row.try_get::<i64, _>("version")? as u32),
            None => None,
        };
        rows.iter()
            .map(|row| -> Result<Contract, StorageError> {
                let version = row.try_get::<i64, _>("version")? as u32;
                read_contract(row, status_for(version, latest))
            })
            .collect()
    }

    /// Names of all tables with at least one approved contract, sorted.
    pub async fn tables(&self) -> Result<Vec<String>, StorageError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT table_name FROM contracts ORDER BY table_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }
}

fn status_for(version: u32, latest: Option<u32>) -> ContractStatus {
    if Some(version) == latest {
        ContractStatus::Approved
    } else {
        ContractStatus::Superseded
    }
}

fn read_contract(row: &SqliteRow, status: ContractStatus) -> Result<Contract, StorageError> {
    let json: String = row.try_get("contract_json")?;
    let mut contract: Contract = serde_json::from_str(&json)?;
    contract.set_status(status);
    Ok(contract)
}
