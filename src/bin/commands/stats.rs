use super::{print_json, print_rows};
use asnwatch::lens::observe::ObserveLens;
use asnwatch::lens::utils::{display_asn, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the Stats command
#[derive(Args)]
pub struct StatsArgs {
    /// Number of origin ASes to list
    #[clap(short, long, default_value_t = 5)]
    pub top: usize,
}

#[derive(Tabled, Serialize)]
struct AsnRow {
    #[tabled(rename = "ASN")]
    asn: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
    #[tabled(rename = "Hits")]
    count: u64,
}

pub async fn run(config: &AsnwatchConfig, args: StatsArgs, output_format: OutputFormat) {
    let lens = match ObserveLens::from_config(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let stats = match lens.stats(args.top).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: unable to read observations: {}", e);
            std::process::exit(1);
        }
    };

    if output_format.is_json() {
        print_json(&stats, output_format);
        return;
    }

    eprintln!(
        "{} hits from {} unique addresses",
        stats.total_hits, stats.unique_ips
    );
    let rows: Vec<AsnRow> = stats
        .top
        .into_iter()
        .map(|c| AsnRow {
            asn: display_asn(c.asn),
            as_name: truncate_name(c.as_name.as_deref().unwrap_or("-"), DEFAULT_NAME_MAX_LEN),
            count: c.count,
        })
        .collect();
    print_rows(&rows, output_format);
}
