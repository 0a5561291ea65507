use super::{or_dash, print_json_list, print_rows};
use asnwatch::lens::utils::{display_asn, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use asnwatch::lens::whois::{ResolutionResult, SourceOutcome, WhoisLens};
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the Resolve command
#[derive(Args)]
pub struct ResolveArgs {
    /// IP addresses to resolve
    #[clap(required = true)]
    pub ips: Vec<String>,

    /// Show the outcome of every source that was queried
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Tabled, Serialize)]
struct ResolveRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "ASN")]
    asn: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled, Serialize)]
struct SourceRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "ASN")]
    asn: String,
}

impl From<&ResolutionResult> for ResolveRow {
    fn from(result: &ResolutionResult) -> Self {
        ResolveRow {
            ip: result.ip.clone(),
            asn: display_asn(result.asn()),
            as_name: truncate_name(
                result.as_name().unwrap_or("-"),
                DEFAULT_NAME_MAX_LEN,
            ),
            prefix: or_dash(result.prefix()),
            source: or_dash(result.best.as_ref().map(|b| b.source.name())),
        }
    }
}

fn source_rows(result: &ResolutionResult) -> Vec<SourceRow> {
    result
        .sources
        .iter()
        .map(|report| {
            let (outcome, asn) = match &report.outcome {
                SourceOutcome::Answered(answer) => ("answered".to_string(), answer.asn),
                SourceOutcome::Empty => ("empty".to_string(), None),
                SourceOutcome::Failed(e) => (format!("failed: {}", e), None),
            };
            SourceRow {
                ip: result.ip.clone(),
                source: report.source.name().to_string(),
                server: report.server.clone(),
                outcome,
                asn: display_asn(asn),
            }
        })
        .collect()
}

pub async fn run(config: &AsnwatchConfig, args: ResolveArgs, output_format: OutputFormat) {
    let ResolveArgs { ips, verbose } = args;

    let lens = WhoisLens::from_config(config);
    let mut results = Vec::with_capacity(ips.len());
    for (input, result) in ips.iter().zip(lens.resolve_many(&ips).await) {
        match result {
            Ok(r) => results.push(r),
            Err(e) => eprintln!("ERROR: {}: {}", input, e),
        }
    }

    if results.is_empty() {
        std::process::exit(1);
    }

    if output_format.is_json() {
        print_json_list(&results, output_format);
    } else if verbose {
        let rows: Vec<SourceRow> = results.iter().flat_map(source_rows).collect();
        print_rows(&rows, output_format);
    } else {
        let rows: Vec<ResolveRow> = results.iter().map(ResolveRow::from).collect();
        print_rows(&rows, output_format);
    }
}
