use super::print_json;
use asnwatch::config::{format_size, get_sqlite_info, SqliteDatabaseInfo};
use asnwatch::lens::utils::OutputFormat;
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Also list the watched prefixes one per line
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    cymru_server: String,
    radb_server: String,
    whois_timeout_secs: u64,
    api_listen: String,
    watch_prefixes: Vec<String>,
    database: SqliteDatabaseInfo,
}

pub fn run(config: &AsnwatchConfig, args: ConfigArgs, output_format: OutputFormat) {
    let ConfigArgs { verbose } = args;

    let info = ConfigInfo {
        config_file: AsnwatchConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        cymru_server: format!("{}:{}", config.cymru_host, config.whois_port),
        radb_server: format!("{}:{}", config.radb_host, config.whois_port),
        whois_timeout_secs: config.whois_timeout_secs,
        api_listen: format!("{}:{}", config.server_address, config.server_port),
        watch_prefixes: config
            .watch_networks()
            .iter()
            .map(|p| p.to_string())
            .collect(),
        database: get_sqlite_info(config),
    };

    if output_format.is_json() {
        print_json(&info, output_format);
        return;
    }

    println!("asnwatch Configuration");
    println!("======================\n");
    println!("Config file:        {}", info.config_file);
    println!("{}", config.summary());
    println!();

    let db = &info.database;
    println!("SQLite Database:");
    println!("  Path:           {}", db.path);
    println!(
        "  Status:         {}",
        if db.exists { "exists" } else { "not created" }
    );
    if let Some(size) = db.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    match db.schema_version {
        Some(v) if db.schema_initialized => println!("  Schema:         v{}", v),
        _ => println!("  Schema:         not initialized"),
    }
    if let Some(count) = db.observation_count {
        println!("  Observations:   {}", count);
    }

    if verbose {
        println!();
        println!("Watched Prefixes:");
        for prefix in &info.watch_prefixes {
            println!("  {}", prefix);
        }
    }
}
