//! Persistence for findings and the typology catalogue.
//!
//! The pipeline only talks to the [`FindingStore`] and [`TypologyStore`]
//! traits; [`SqliteStorage`] is the bundled implementation of both.

mod sqlite;

pub use sqlite::{DEFAULT_DB_PATH, SqliteStorage};

use crate::core::{Finding, FindingFilter, StoredFinding, Typology};
use crate::credentials::CallerKey;
use crate::error::StorageError;

/// Write side of finding persistence.
///
/// Implementations must attribute every write to its caller and tolerate
/// concurrent writers from independent pipeline runs.
pub trait FindingStore: Send + Sync {
    /// Persists a finding mined from `source`, returning its identifier.
    fn save_finding(
        &self,
        caller: &CallerKey,
        source: &str,
        finding: &Finding,
    ) -> Result<i64, StorageError>;

    /// Lists stored findings, most severe first, then newest first.
    fn list_findings(&self, filter: &FindingFilter) -> Result<Vec<StoredFinding>, StorageError>;

    /// Fetches one stored finding.
    fn get_finding(&self, id: i64) -> Result<Option<StoredFinding>, StorageError>;
}

/// Read-only access to the typology catalogue.
pub trait TypologyStore: Send + Sync {
    /// Returns every known typology, ordered by name.
    fn list_typologies(&self) -> Result<Vec<Typology>, StorageError>;

    /// Looks up a typology by name (case-insensitive).
    fn get_typology(&self, name: &str) -> Result<Option<Typology>, StorageError>;
}
