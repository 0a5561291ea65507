use asnwatch::lens::observe::ObserveLens;
use asnwatch::server::{start_server, ServerConfig, ServerState};
use asnwatch::AsnwatchConfig;
use clap::Args;

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind to (default: from configuration)
    #[clap(long)]
    pub address: Option<String>,

    /// Port to listen on (default: from configuration)
    #[clap(long)]
    pub port: Option<u16>,
}

pub async fn run(config: &AsnwatchConfig, args: ServeArgs) {
    let ServeArgs { address, port } = args;

    let mut server_config = ServerConfig::from_config(config);
    if let Some(address) = address {
        server_config = server_config.with_address(address);
    }
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }

    let lens = match ObserveLens::from_config(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Listening on http://{}", server_config.bind_address());
    if let Err(e) = start_server(ServerState::new(lens), server_config).await {
        eprintln!("ERROR: server stopped: {}", e);
        std::process::exit(1);
    }
}
