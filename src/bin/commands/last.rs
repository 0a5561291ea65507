use super::{or_dash, print_json_list, print_rows};
use asnwatch::lens::observe::ObserveLens;
use asnwatch::lens::utils::{display_asn, truncate_name, OutputFormat, DEFAULT_NAME_MAX_LEN};
use asnwatch::AsnwatchConfig;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

/// Arguments for the Last command
#[derive(Args)]
pub struct LastArgs {
    /// Number of observations to show
    #[clap(short, long, default_value_t = 100)]
    pub limit: usize,
}

#[derive(Tabled, Serialize)]
struct LastRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "ASN")]
    asn: String,
    #[tabled(rename = "AS Name")]
    as_name: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
}

pub async fn run(config: &AsnwatchConfig, args: LastArgs, output_format: OutputFormat) {
    let lens = match ObserveLens::from_config(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let entries = match lens.last(args.limit).await {
        Ok(e) => e,
        Err(e) => {
            eprintln!("ERROR: unable to read observations: {}", e);
            std::process::exit(1);
        }
    };

    if output_format.is_json() {
        print_json_list(&entries, output_format);
        return;
    }

    let rows: Vec<LastRow> = entries
        .into_iter()
        .map(|e| LastRow {
            when: e.when,
            token: e.token,
            ip: e.ip,
            asn: display_asn(e.asn),
            as_name: truncate_name(e.as_name.as_deref().unwrap_or("-"), DEFAULT_NAME_MAX_LEN),
            prefix: or_dash(e.prefix.as_deref()),
        })
        .collect();
    print_rows(&rows, output_format);
}
