//! `SQLite` storage backend.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{FindingStore, TypologyStore};
use crate::core::{Finding, FindingFilter, FindingKind, StoredFinding, Typology};
use crate::credentials::CallerKey;
use crate::error::StorageError;

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".script-lens/script-lens.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS findings (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    caller_key      TEXT NOT NULL,
    source          TEXT NOT NULL,
    kind            TEXT NOT NULL CHECK (kind IN ('danger', 'warning', 'info')),
    severity_rank   INTEGER NOT NULL,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL,
    matched_pattern TEXT,
    created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_findings_caller ON findings(caller_key);
CREATE INDEX IF NOT EXISTS idx_findings_source ON findings(source);

CREATE TABLE IF NOT EXISTS typologies (
    name_key    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    body        TEXT NOT NULL
);
";

/// `SQLite`-backed finding and typology store.
///
/// The connection sits behind a mutex so writes from concurrent runs are
/// serialized.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) a database file and its parent directory.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        debug!(path = %path.display(), "opened sqlite storage");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database with the schema already created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.init()?;
        Ok(storage)
    }

    /// Creates the schema if it does not exist. Safe to call repeatedly.
    pub fn init(&self) -> Result<(), StorageError> {
        self.lock()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Inserts or replaces a typology, keyed by its lowercased name.
    pub fn upsert_typology(&self, typology: &Typology) -> Result<(), StorageError> {
        let name = typology.name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidRecord(
                "typology name is empty".to_string(),
            ));
        }
        let body = serde_json::to_string(typology)?;
        self.lock()?.execute(
            "INSERT INTO typologies (name_key, name, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(name_key) DO UPDATE SET name = excluded.name, body = excluded.body",
            params![name.to_lowercase(), name, body],
        )?;
        Ok(())
    }

    /// Imports a JSON array of typologies, returning how many were written.
    pub fn import_typologies(&self, json: &str) -> Result<usize, StorageError> {
        let typologies: Vec<Typology> = serde_json::from_str(json)?;
        for typology in &typologies {
            self.upsert_typology(typology)?;
        }
        Ok(typologies.len())
    }

    /// Reads a JSON typology file and imports it.
    pub fn import_typologies_file(&self, path: &Path) -> Result<usize, StorageError> {
        let json = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_typologies(&json)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn row_to_finding(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredFinding> {
        let kind: String = row.get(3)?;
        Ok(StoredFinding {
            id: row.get(0)?,
            caller_key: row.get(1)?,
            source: row.get(2)?,
            finding: Finding {
                kind: FindingKind::parse(&kind).unwrap_or(FindingKind::Info),
                title: row.get(4)?,
                description: row.get(5)?,
                matched_pattern: row.get(6)?,
            },
            created_at: row.get(7)?,
        })
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

impl FindingStore for SqliteStorage {
    fn save_finding(
        &self,
        caller: &CallerKey,
        source: &str,
        finding: &Finding,
    ) -> Result<i64, StorageError> {
        let finding = finding
            .clone()
            .normalized()
            .map_err(StorageError::InvalidRecord)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO findings
                (caller_key, source, kind, severity_rank, title, description, matched_pattern)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                caller.as_str(),
                source,
                finding.kind.as_str(),
                finding.kind as u8,
                finding.title,
                finding.description,
                finding.matched_pattern,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, caller = caller.as_str(), kind = %finding.kind, "finding saved");
        Ok(id)
    }

    fn list_findings(&self, filter: &FindingFilter) -> Result<Vec<StoredFinding>, StorageError> {
        let limit = if filter.limit == 0 {
            -1
        } else {
            i64::try_from(filter.limit).unwrap_or(i64::MAX)
        };
        let max_rank = filter.min_kind.map_or(FindingKind::Info as u8, |k| k as u8);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, caller_key, source, kind, title, description, matched_pattern, created_at
             FROM findings
             WHERE (?1 IS NULL OR caller_key = ?1)
               AND (?2 IS NULL OR source = ?2)
               AND severity_rank <= ?3
             ORDER BY severity_rank ASC, id DESC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![filter.caller_key, filter.source, max_rank, limit],
            Self::row_to_finding,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn get_finding(&self, id: i64) -> Result<Option<StoredFinding>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, caller_key, source, kind, title, description, matched_pattern, created_at
             FROM findings WHERE id = ?1",
            params![id],
            Self::row_to_finding,
        )
        .optional()
        .map_err(Into::into)
    }
}

impl TypologyStore for SqliteStorage {
    fn list_typologies(&self) -> Result<Vec<Typology>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT body FROM typologies ORDER BY name_key")?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|b| serde_json::from_str::<Typology>(b).map_err(StorageError::from))
            .collect()
    }

    fn get_typology(&self, name: &str) -> Result<Option<Typology>, StorageError> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM typologies WHERE name_key = ?1",
                params![name.trim().to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str::<Typology>(&b).map_err(StorageError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().unwrap_or_else(|e| unreachable!("{e}"));
        storage.init().unwrap_or_else(|e| unreachable!("{e}"));
        storage
    }

    fn caller(name: &str) -> CallerKey {
        CallerKey::new(name)
    }

    fn typology(name: &str) -> Typology {
        Typology {
            name: name.to_string(),
            description: format!("{name} description"),
            core_tactics: vec!["tactic".to_string()],
            red_flags: Vec::new(),
            opposites: Vec::new(),
            examples: Vec::new(),
            reference_url: None,
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let storage = setup();
        assert!(storage.init().is_ok());
    }

    #[test]
    fn test_save_and_get_finding() {
        let storage = setup();
        let finding = Finding::new(FindingKind::Danger, "Threats", "He threatens her")
            .with_pattern("The Intimidator");
        let id = storage
            .save_finding(&caller("a"), "https://example.com/s.html", &finding)
            .unwrap_or_else(|e| unreachable!("{e}"));

        let stored = storage
            .get_finding(id)
            .unwrap_or_else(|e| unreachable!("{e}"))
            .unwrap_or_else(|| unreachable!());
        assert_eq!(stored.finding, finding);
        assert_eq!(stored.caller_key, "a");
        assert_eq!(stored.source, "https://example.com/s.html");
        assert!(!stored.created_at.is_empty());
    }

    #[test]
    fn test_get_missing_finding() {
        let storage = setup();
        let found = storage.get_finding(99).unwrap_or_else(|e| unreachable!("{e}"));
        assert!(found.is_none());
    }

    #[test]
    fn test_save_rejects_empty_title() {
        let storage = setup();
        let result = storage.save_finding(
            &caller("a"),
            "src",
            &Finding::new(FindingKind::Info, "", "desc"),
        );
        assert!(matches!(result, Err(StorageError::InvalidRecord(_))));
    }

    #[test]
    fn test_list_findings_filters_and_orders() {
        let storage = setup();
        let a = caller("a");
        let b = caller("b");
        for (who, kind, title) in [
            (&a, FindingKind::Info, "i1"),
            (&a, FindingKind::Danger, "d1"),
            (&a, FindingKind::Warning, "w1"),
            (&b, FindingKind::Danger, "d2"),
        ] {
            storage
                .save_finding(who, "src", &Finding::new(kind, title, "desc"))
                .unwrap_or_else(|e| unreachable!("{e}"));
        }

        let all_a = storage
            .list_findings(&FindingFilter {
                caller_key: Some("a".to_string()),
                ..FindingFilter::default()
            })
            .unwrap_or_default();
        let titles: Vec<&str> = all_a.iter().map(|f| f.finding.title.as_str()).collect();
        assert_eq!(titles, vec!["d1", "w1", "i1"]);

        let severe = storage
            .list_findings(&FindingFilter {
                min_kind: Some(FindingKind::Warning),
                limit: 2,
                ..FindingFilter::default()
            })
            .unwrap_or_default();
        assert_eq!(severe.len(), 2);
        assert!(
            severe
                .iter()
                .all(|f| f.finding.kind.meets_threshold(FindingKind::Warning))
        );
    }

    #[test]
    fn test_typology_lookup_is_case_insensitive() {
        let storage = setup();
        storage
            .upsert_typology(&typology("Mr. Always Right"))
            .unwrap_or_else(|e| unreachable!("{e}"));
        let found = storage
            .get_typology("mr. always right")
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(found.map(|t| t.name), Some("Mr. Always Right".to_string()));
        assert!(
            storage
                .get_typology("Nobody")
                .unwrap_or_else(|e| unreachable!("{e}"))
                .is_none()
        );
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let storage = setup();
        storage
            .upsert_typology(&typology("The Isolator"))
            .unwrap_or_else(|e| unreachable!("{e}"));
        let mut updated = typology("the isolator");
        updated.description = "updated".to_string();
        storage
            .upsert_typology(&updated)
            .unwrap_or_else(|e| unreachable!("{e}"));
        let all = storage.list_typologies().unwrap_or_default();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "updated");
    }

    #[test]
    fn test_import_typologies() {
        let storage = setup();
        let json = r#"[
            {"player_type": "B pattern", "description": "b"},
            {"name": "A pattern", "description": "a", "red_flags": ["x"]}
        ]"#;
        let count = storage
            .import_typologies(json)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(count, 2);
        let names: Vec<String> = storage
            .list_typologies()
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["A pattern", "B pattern"]);
    }

    #[test]
    fn test_import_invalid_json() {
        let storage = setup();
        assert!(matches!(
            storage.import_typologies("{not json"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap_or_else(|e| unreachable!("{e}"));
        let path = dir.path().join("nested/db/findings.db");
        let storage = SqliteStorage::open(&path).unwrap_or_else(|e| unreachable!("{e}"));
        storage.init().unwrap_or_else(|e| unreachable!("{e}"));
        assert!(path.exists());
    }
}
