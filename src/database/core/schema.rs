//! Database schema management

use anyhow::{anyhow, Result};
use rusqlite::Connection;

/// Current schema version
/// Increment this when making breaking schema changes
pub const SCHEMA_VERSION: u32 = 1;

const META_TABLE_NAME: &str = "asnwatch_meta";

/// Table definitions
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS asnwatch_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// One row per observed client address
    pub const TOKEN_HITS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS token_hits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT NOT NULL,
            ip TEXT NOT NULL,
            asn INTEGER,
            as_name TEXT,
            prefix TEXT,
            user_agent TEXT,
            created_at INTEGER NOT NULL
        );
    "#;

    /// The unique index on `ip` is what makes ingestion idempotent
    pub const TOKEN_HITS_INDEXES: &'static [&'static str] = &[
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_token_hits_ip ON token_hits(ip)",
        "CREATE INDEX IF NOT EXISTS idx_token_hits_token ON token_hits(token)",
        "CREATE INDEX IF NOT EXISTS idx_token_hits_asn ON token_hits(asn)",
        "CREATE INDEX IF NOT EXISTS idx_token_hits_created ON token_hits(created_at DESC)",
    ];

    pub const REQUIRED_TABLES: &'static [&'static str] = &[META_TABLE_NAME, "token_hits"];

    pub const REQUIRED_INDEXES: &'static [&'static str] = &["uq_token_hits_ip"];
}

/// Creates and checks the schema on one connection
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create every table and index that does not exist yet and stamp the version
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::META_TABLE, [])
            .map_err(|e| anyhow!("Failed to create meta table: {}", e))?;

        self.set_meta("schema_version", &SCHEMA_VERSION.to_string())?;

        self.conn
            .execute(SchemaDefinitions::TOKEN_HITS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create token_hits table: {}", e))?;

        for index_sql in SchemaDefinitions::TOKEN_HITS_INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create token_hits index: {}", e))?;
        }

        Ok(())
    }

    pub fn check_status(&self) -> Result<SchemaStatus> {
        if !self.table_exists(META_TABLE_NAME)? {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = self.get_schema_version()?;

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    fn get_schema_version(&self) -> Result<u32> {
        self.get_meta("schema_version")?
            .unwrap_or_else(|| "0".to_string())
            .parse()
            .map_err(|e| anyhow!("Invalid schema version: {}", e))
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.object_exists("table", table)
    }

    fn object_exists(&self, kind: &str, name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type=?1 AND name=?2",
                [kind, name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to inspect schema: {}", e))?;
        Ok(count > 0)
    }

    fn verify_integrity(&self) -> Result<bool> {
        for table in SchemaDefinitions::REQUIRED_TABLES {
            if !self.table_exists(table)? {
                return Ok(false);
            }
        }
        for index in SchemaDefinitions::REQUIRED_INDEXES {
            if !self.object_exists("index", index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO asnwatch_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let result: Result<String, _> = self.conn.query_row(
            "SELECT value FROM asnwatch_meta WHERE key = ?1",
            [key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to get meta value: {}", e)),
        }
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    NotInitialized,
    Current,
    NeedsMigration { from: u32, to: u32 },
    /// Written by a newer asnwatch
    Incompatible {
        database_version: u32,
        required_version: u32,
    },
    /// Version stamp present but tables or the unique index missing
    Corrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_and_status() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );

        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.get_schema_version().unwrap(), SCHEMA_VERSION);

        // idempotent
        manager.initialize().unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
    }

    #[test]
    fn test_unique_ip_index() {
        let conn = Connection::open_in_memory().unwrap();
        SchemaManager::new(&conn).initialize().unwrap();

        let insert = "INSERT INTO token_hits (token, ip, created_at) VALUES (?1, ?2, 0)";
        conn.execute(insert, ["a", "192.0.2.1"]).unwrap();
        let err = conn.execute(insert, ["b", "192.0.2.1"]).unwrap_err();
        assert_eq!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
    }

    #[test]
    fn test_status_variants() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        conn.execute("DROP INDEX uq_token_hits_ip", []).unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Corrupted);

        conn.execute("DROP TABLE token_hits", []).unwrap();
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Corrupted);

        manager.set_meta("schema_version", "99").unwrap();
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::Incompatible {
                database_version: 99,
                required_version: SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn test_meta_values() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        manager.set_meta("last_clear", "1700000000").unwrap();
        assert_eq!(
            manager.get_meta("last_clear").unwrap(),
            Some("1700000000".to_string())
        );
        assert_eq!(manager.get_meta("missing").unwrap(), None);
    }
}
