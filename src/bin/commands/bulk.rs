use super::{or_dash, print_json, print_rows};
use asnwatch::lens::utils::{display_asn, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use asnwatch::lens::whois::WhoisLens;
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// Arguments for the Bulk command
#[derive(Args)]
pub struct BulkArgs {
    /// IP addresses to look up
    pub ips: Vec<String>,

    /// Read additional addresses from a file, one per line
    #[clap(short, long)]
    pub input: Option<PathBuf>,
}

#[derive(Tabled, Serialize)]
struct BulkRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "ASN")]
    asn: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "CC")]
    country: String,
    #[tabled(rename = "Registry")]
    registry: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
}

pub async fn run(config: &AsnwatchConfig, args: BulkArgs, output_format: OutputFormat) {
    let BulkArgs { mut ips, input } = args;

    if let Some(path) = input {
        match std::fs::read_to_string(&path) {
            Ok(content) => ips.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string),
            ),
            Err(e) => {
                eprintln!("ERROR: unable to read {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    if ips.is_empty() {
        eprintln!("ERROR: no addresses given");
        std::process::exit(1);
    }

    let lens = WhoisLens::from_config(config);
    let lookup = match lens.bulk_lookup(&ips).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: bulk lookup failed: {}", e);
            std::process::exit(1);
        }
    };

    for rejected in &lookup.rejected {
        eprintln!("WARNING: skipped invalid address {:?}", rejected);
    }

    if output_format.is_json() {
        print_json(&lookup, output_format);
        return;
    }

    let rows: Vec<BulkRow> = lookup
        .answers
        .values()
        .map(|a| BulkRow {
            ip: a.ip.clone(),
            asn: display_asn(a.asn),
            prefix: or_dash(a.prefix.as_deref()),
            country: or_dash(a.country.as_deref()),
            registry: or_dash(a.registry.as_deref()),
            as_name: truncate_name(a.as_name.as_deref().unwrap_or("-"), DEFAULT_NAME_MAX_LEN),
        })
        .collect();
    print_rows(&rows, output_format);
}
