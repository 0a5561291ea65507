use asnwatch::lens::utils::OutputFormat;
use asnwatch::AsnwatchConfig;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;

use commands::analyze::AnalyzeArgs;
use commands::bulk::BulkArgs;
use commands::config::ConfigArgs;
use commands::filter::FilterArgs;
use commands::last::LastArgs;
use commands::resolve::ResolveArgs;
use commands::serve::ServeArgs;
use commands::stats::StatsArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.asnwatch/asnwatch.toml is used
    #[clap(short, long, global = true)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve IP addresses to their origin AS (Team Cymru, then RADb)
    Resolve(ResolveArgs),

    /// Look up many addresses in one Team Cymru bulk exchange
    Bulk(BulkArgs),

    /// Rank the resolvers found in a BIND query log
    Analyze(AnalyzeArgs),

    /// Print query-log lines coming from watched prefixes
    Filter(FilterArgs),

    /// Show observation totals and top origin ASes
    Stats(StatsArgs),

    /// Show the latest observations
    Last(LastArgs),

    /// Run the HTTP API
    Serve(ServeArgs),

    /// Show configuration and database status
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AsnwatchConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if cli.debug {
        tracing_subscriber::fmt()
            // INFO and above
            .with_max_level(Level::INFO)
            .init();
    }

    let format = cli.format;
    match cli.command {
        Commands::Resolve(args) => commands::resolve::run(&config, args, format).await,
        Commands::Bulk(args) => commands::bulk::run(&config, args, format).await,
        Commands::Analyze(args) => commands::analyze::run(&config, args, format).await,
        Commands::Filter(args) => commands::filter::run(&config, args),
        Commands::Stats(args) => commands::stats::run(&config, args, format).await,
        Commands::Last(args) => commands::last::run(&config, args, format).await,
        Commands::Serve(args) => commands::serve::run(&config, args).await,
        Commands::Config(args) => commands::config::run(&config, args, format),
    }
}
