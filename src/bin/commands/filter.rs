use asnwatch::lens::querylog::{read_log_lines, QueryLogLens};
use asnwatch::lens::whois::WhoisLens;
use asnwatch::AsnwatchConfig;
use clap::Args;
use ipnet::IpNet;
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the Filter command
#[derive(Args)]
pub struct FilterArgs {
    /// BIND query log file
    pub log_file: PathBuf,

    /// Prefix to watch instead of the configured list (repeatable)
    #[clap(short, long)]
    pub prefix: Vec<IpNet>,
}

pub fn run(config: &AsnwatchConfig, args: FilterArgs) {
    let FilterArgs { log_file, prefix } = args;

    let networks: Vec<IpNet> = if prefix.is_empty() {
        config.watch_networks().to_vec()
    } else {
        prefix.iter().map(IpNet::trunc).collect()
    };

    let lines = match read_log_lines(&log_file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let lens = match QueryLogLens::new(WhoisLens::from_config(config)) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout();
    for line in lens.filter(&lines, &networks) {
        if let Err(e) = writeln!(stdout, "{}", line) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("{e}");
            }
            std::process::exit(1);
        }
    }
}
