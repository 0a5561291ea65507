use anyhow::{anyhow, Result};
use config::Config;
use ipnet::IpNet;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::lens::whois::{CYMRU_WHOIS_SERVER, RADB_WHOIS_SERVER, WHOIS_PORT};

/// Prefixes watched by `asnwatch filter` when none are configured
pub const DEFAULT_WATCH_PREFIXES: &[&str] = &[
    "193.232.147.0/24",
    "193.232.253.0/24",
    "195.208.4.0/24",
    "195.208.5.0/24",
    "195.208.6.0/24",
    "195.208.7.0/24",
    "193.223.132.0/24",
];

pub struct AsnwatchConfig {
    /// Path to the directory holding asnwatch's database
    pub data_dir: String,

    /// Deadline for one WHOIS exchange, in seconds
    pub whois_timeout_secs: u64,

    pub cymru_host: String,
    pub radb_host: String,
    pub whois_port: u16,

    /// Address the HTTP API binds to
    pub server_address: String,
    pub server_port: u16,

    pub watch_prefixes: Vec<IpNet>,
}

const EMPTY_CONFIG: &str = r#"### asnwatch configuration file

### directory for the observation database
# data_dir = "~/.asnwatch"

### WHOIS servers and per-query timeout (in seconds)
# cymru_host = "whois.cymru.com"
# radb_host = "whois.radb.net"
# whois_port = 43
# whois_timeout_secs = 6

### HTTP API
# server_address = "127.0.0.1"
# server_port = 8000

### comma-separated prefixes reported by `asnwatch filter`
# watch_prefixes = "193.232.147.0/24,193.232.253.0/24"
"#;

fn default_data_dir() -> String {
    let home_dir = dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());
    format!("{}/.asnwatch", home_dir)
}

fn default_watch_prefixes() -> Vec<IpNet> {
    DEFAULT_WATCH_PREFIXES
        .iter()
        .filter_map(|p| p.parse().ok())
        .collect()
}

impl Default for AsnwatchConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            whois_timeout_secs: 6,
            cymru_host: CYMRU_WHOIS_SERVER.to_string(),
            radb_host: RADB_WHOIS_SERVER.to_string(),
            whois_port: WHOIS_PORT,
            server_address: "127.0.0.1".to_string(),
            server_port: 8000,
            watch_prefixes: default_watch_prefixes(),
        }
    }
}

impl AsnwatchConfig {
    /// Build the configuration from the config file and `ASNWATCH_*` environment variables
    ///
    /// Without an explicit path, `$HOME/.asnwatch/asnwatch.toml` is used and
    /// created from a commented template when missing.
    pub fn new(path: &Option<String>) -> Result<AsnwatchConfig> {
        let mut builder = Config::builder();

        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();
        let asnwatch_dir = format!("{}/.asnwatch", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(asnwatch_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create asnwatch directory: {}", e))?;
                let p = format!("{}/asnwatch.toml", asnwatch_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // e.g. `ASNWATCH_WHOIS_TIMEOUT_SECS=3 asnwatch resolve 8.8.8.8`
        builder = builder.add_source(config::Environment::with_prefix("ASNWATCH"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_values(&values)
    }

    /// Build the configuration from flat key/value settings, defaulting missing keys
    pub fn from_values(values: &HashMap<String, String>) -> Result<AsnwatchConfig> {
        let defaults = AsnwatchConfig::default();

        let data_dir = match values.get("data_dir") {
            Some(dir) => expand_home(dir),
            None => defaults.data_dir,
        };

        let whois_timeout_secs =
            parse_or(values, "whois_timeout_secs", defaults.whois_timeout_secs)?;
        if whois_timeout_secs == 0 {
            return Err(anyhow!("whois_timeout_secs must be greater than zero"));
        }

        let watch_prefixes = match values.get("watch_prefixes") {
            Some(list) => parse_prefix_list(list)?,
            None => defaults.watch_prefixes,
        };

        Ok(AsnwatchConfig {
            data_dir,
            whois_timeout_secs,
            cymru_host: values.get("cymru_host").cloned().unwrap_or(defaults.cymru_host),
            radb_host: values.get("radb_host").cloned().unwrap_or(defaults.radb_host),
            whois_port: parse_or(values, "whois_port", defaults.whois_port)?,
            server_address: values
                .get("server_address")
                .cloned()
                .unwrap_or(defaults.server_address),
            server_port: parse_or(values, "server_port", defaults.server_port)?,
            watch_prefixes,
        })
    }

    /// Path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, crate::database::DATABASE_FILE_NAME)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_secs)
    }

    pub fn watch_networks(&self) -> &[IpNet] {
        &self.watch_prefixes
    }

    pub fn summary(&self) -> String {
        let prefixes = self
            .watch_prefixes
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Cymru Server:       {}:{}", self.cymru_host, self.whois_port),
            format!("RADb Server:        {}:{}", self.radb_host, self.whois_port),
            format!("WHOIS Timeout:      {} seconds", self.whois_timeout_secs),
            format!("API Listen:         {}:{}", self.server_address, self.server_port),
            format!("Watched Prefixes:   {}", prefixes),
        ]
        .join("\n")
    }

    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.asnwatch/asnwatch.toml", home_dir)
    }
}

fn parse_or<T: std::str::FromStr>(
    values: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T> {
    match values.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn parse_prefix_list(list: &str) -> Result<Vec<IpNet>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpNet>()
                .map(|net| net.trunc())
                .map_err(|e| anyhow!("Invalid watch prefix {:?}: {}", s, e))
        })
        .collect()
}

fn expand_home(dir: &str) -> String {
    match (dir.strip_prefix("~"), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{}", home.to_string_lossy(), rest),
        _ => dir.to_string(),
    }
}

// =============================================================================
// Database info (used by the config command)
// =============================================================================

/// Information about the SQLite database
#[derive(Debug, Serialize, Clone)]
pub struct SqliteDatabaseInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub schema_initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_count: Option<u64>,
}

/// Inspect the database without creating or modifying its schema
pub fn get_sqlite_info(config: &AsnwatchConfig) -> SqliteDatabaseInfo {
    use crate::database::{
        DatabaseConn, ObservationRepository, SchemaManager, SchemaStatus, SCHEMA_VERSION,
    };

    let path = config.sqlite_path();
    let exists = Path::new(&path).exists();
    let size_bytes = if exists {
        std::fs::metadata(&path).ok().map(|m| m.len())
    } else {
        None
    };

    let mut info = SqliteDatabaseInfo {
        path,
        exists,
        size_bytes,
        schema_initialized: false,
        schema_version: None,
        observation_count: None,
    };
    if !exists {
        return info;
    }

    if let Ok(db) = DatabaseConn::open_path(&info.path) {
        let (initialized, version) = match SchemaManager::new(&db.conn).check_status() {
            Ok(SchemaStatus::Current) => (true, Some(SCHEMA_VERSION)),
            Ok(SchemaStatus::NeedsMigration { from, .. }) => (true, Some(from)),
            Ok(SchemaStatus::Incompatible {
                database_version, ..
            }) => (true, Some(database_version)),
            Ok(SchemaStatus::NotInitialized) | Ok(SchemaStatus::Corrupted) | Err(_) => {
                (false, None)
            }
        };
        info.schema_initialized = initialized;
        info.schema_version = version;
        if initialized && db.table_exists("token_hits").unwrap_or(false) {
            info.observation_count = ObservationRepository::new(&db.conn).count().ok();
        }
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = AsnwatchConfig::default();
        assert_eq!(config.whois_timeout(), Duration::from_secs(6));
        assert_eq!(config.cymru_host, "whois.cymru.com");
        assert_eq!(config.radb_host, "whois.radb.net");
        assert_eq!(config.whois_port, 43);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.watch_networks().len(), DEFAULT_WATCH_PREFIXES.len());
    }

    #[test]
    fn test_from_values() {
        let config = AsnwatchConfig::from_values(&values(&[
            ("data_dir", "/srv/asnwatch/"),
            ("whois_timeout_secs", "3"),
            ("cymru_host", "127.0.0.1"),
            ("whois_port", "4343"),
            ("server_port", "9000"),
            ("watch_prefixes", "10.0.0.0/8, 2001:db8::1/32,"),
        ]))
        .unwrap();

        assert_eq!(config.sqlite_path(), "/srv/asnwatch/asnwatch.sqlite3");
        assert_eq!(config.whois_timeout(), Duration::from_secs(3));
        assert_eq!(config.cymru_host, "127.0.0.1");
        assert_eq!(config.radb_host, "whois.radb.net");
        assert_eq!(config.whois_port, 4343);
        assert_eq!(config.server_port, 9000);

        let prefixes: Vec<String> = config
            .watch_networks()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(prefixes, vec!["10.0.0.0/8", "2001:db8::/32"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(AsnwatchConfig::from_values(&values(&[("whois_port", "http")])).is_err());
        assert!(AsnwatchConfig::from_values(&values(&[("whois_timeout_secs", "0")])).is_err());
        assert!(
            AsnwatchConfig::from_values(&values(&[("watch_prefixes", "10.0.0.0/33")])).is_err()
        );
    }

    #[test]
    fn test_summary_mentions_servers() {
        let summary = AsnwatchConfig::default().summary();
        assert!(summary.contains("whois.cymru.com:43"));
        assert!(summary.contains("193.232.147.0/24"));
    }

    #[test]
    fn test_sqlite_info_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = AsnwatchConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let info = get_sqlite_info(&config);
        assert!(!info.exists);
        assert!(!info.schema_initialized);

        crate::database::AsnwatchDatabase::open_in_dir(&config.data_dir).unwrap();
        let info = get_sqlite_info(&config);
        assert!(info.exists);
        assert_eq!(info.observation_count, Some(0));
    }

    #[test]
    fn test_sqlite_info_leaves_newer_schema_untouched() {
        use crate::database::{AsnwatchDatabase, NewObservation, SchemaManager};

        let dir = tempfile::tempdir().unwrap();
        let config = AsnwatchConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        {
            let db = AsnwatchDatabase::open_in_dir(&config.data_dir).unwrap();
            db.observations()
                .record_if_absent(&NewObservation::new("t", "192.0.2.1"))
                .unwrap();
            SchemaManager::new(db.connection())
                .set_meta("schema_version", "2")
                .unwrap();
        }

        let info = get_sqlite_info(&config);
        assert!(info.schema_initialized);
        assert_eq!(info.schema_version, Some(2));
        assert_eq!(info.observation_count, Some(1));

        let info = get_sqlite_info(&config);
        assert_eq!(info.observation_count, Some(1));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
