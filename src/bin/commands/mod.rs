pub mod analyze;
pub mod bulk;
pub mod config;
pub mod filter;
pub mod last;
pub mod resolve;
pub mod serve;
pub mod stats;

use asnwatch::lens::utils::{render_rows, OutputFormat};
use serde::Serialize;
use tabled::Tabled;

/// Print table rows, exiting on a rendering failure
pub(crate) fn print_rows<T: Serialize + Tabled>(rows: &[T], format: OutputFormat) {
    match render_rows(rows, format) {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("ERROR: unable to render output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a serializable value as JSON
pub(crate) fn print_json<T: Serialize>(value: &T, format: OutputFormat) {
    let rendered = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value),
        _ => serde_json::to_string(value),
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("ERROR: unable to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a list as JSON; `json-line` puts each item on its own line
pub(crate) fn print_json_list<T: Serialize>(items: &[T], format: OutputFormat) {
    if format == OutputFormat::JsonLine {
        for item in items {
            print_json(item, format);
        }
    } else {
        print_json(&items, format);
    }
}

pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
