//! Output helpers shared by lenses and the CLI

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum AS name width in table output
pub const DEFAULT_NAME_MAX_LEN: usize = 32;

/// Output format accepted by every asnwatch command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Rounded table (default)
    #[default]
    Table,
    Markdown,
    /// Single-line JSON array
    Json,
    JsonPretty,
    /// One JSON object per line
    JsonLine,
    /// Pipe-separated values with a header line
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "json-line", "psv"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::JsonLine => "json-line",
            Self::Psv => "psv",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Shorten `name` to at most `max_len` characters, marking the cut with "..."
pub fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let kept: String = name.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Display an optional AS number the way tables show it
pub fn display_asn(asn: Option<u32>) -> String {
    asn.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render rows in the requested format
///
/// JSON variants use the serde representation; table variants and PSV use the
/// `Tabled` columns.
#[cfg(feature = "display")]
pub fn render_rows<T>(rows: &[T], format: OutputFormat) -> anyhow::Result<String>
where
    T: Serialize + tabled::Tabled,
{
    use tabled::settings::Style;
    use tabled::Table;

    let rendered = match format {
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Markdown => Table::new(rows).with(Style::markdown()).to_string(),
        OutputFormat::Json => serde_json::to_string(rows)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(rows)?,
        OutputFormat::JsonLine => rows
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
        OutputFormat::Psv => {
            let mut lines = vec![T::headers().join("|")];
            lines.extend(rows.iter().map(|row| row.fields().join("|")));
            lines.join("\n")
        }
    };
    Ok(rendered)
}
