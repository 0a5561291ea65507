use super::{print_json, print_rows};
use asnwatch::lens::querylog::{read_log_lines, QueryLogLens};
use asnwatch::lens::utils::{display_asn, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use asnwatch::lens::whois::WhoisLens;
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// Arguments for the Analyze command
#[derive(Args)]
pub struct AnalyzeArgs {
    /// BIND query log file
    pub log_file: PathBuf,

    /// Number of resolvers to report
    #[clap(short, long, default_value_t = 15)]
    pub top: usize,
}

#[derive(Tabled, Serialize)]
struct ResolverRow {
    #[tabled(rename = "Resolver")]
    ip: String,
    #[tabled(rename = "Queries")]
    count: u64,
    #[tabled(rename = "ASN")]
    asn: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
}

pub async fn run(config: &AsnwatchConfig, args: AnalyzeArgs, output_format: OutputFormat) {
    let AnalyzeArgs { log_file, top } = args;

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

    let report = lens.analyze(&lines, top).await;

    if output_format.is_json() {
        print_json(&report, output_format);
        return;
    }

    if let Some(err) = &report.lookup_error {
        eprintln!("WARNING: AS lookup failed, resolvers are not annotated: {}", err);
    }
    eprintln!(
        "{} queries from {} resolvers",
        report.total_queries, report.unique_resolvers
    );

    let rows: Vec<ResolverRow> = report
        .top
        .into_iter()
        .map(|r| ResolverRow {
            ip: r.ip,
            count: r.count,
            asn: display_asn(r.asn),
            as_name: truncate_name(r.as_name.as_deref().unwrap_or("-"), DEFAULT_NAME_MAX_LEN),
        })
        .collect();
    print_rows(&rows, output_format);
}
