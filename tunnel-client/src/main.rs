use clap::{Arg, Command};
use tracing::error;
use tunnel_client::config::TunnelConfig;

fn validate_port_value(value: &str) -> Result<u16, String> {
    value.parse::<u16>().map_err(|_| "Invalid port number".to_owned())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("Tunnel Client")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exposes a local HTTP server through a public tunnel gateway")
        .arg(
            Arg::new("tunnel_host")
                .help("Hostname of the tunnel gateway")
                .long("tunnel-host")
                .value_parser(clap::value_parser!(String))
                .default_value("localhost"),
        )
        .arg(
            Arg::new("tunnel_port")
                .help("Control-plane port of the tunnel gateway")
                .long("tunnel-port")
                .value_parser(validate_port_value)
                .default_value("5500"),
        )
        .arg(
            Arg::new("local_port")
                .help("Port of the local server to expose")
                .long("local-port")
                .value_parser(validate_port_value)
                .default_value("3000"),
        )
        .get_matches();

    let config = TunnelConfig {
        tunnel_host: matches
            .get_one::<String>("tunnel_host")
            .expect("tunnel_host has a default")
            .clone(),
        tunnel_port: *matches.get_one::<u16>("tunnel_port").expect("tunnel_port has a default"),
        local_port: *matches.get_one::<u16>("local_port").expect("local_port has a default"),
    };

    if let Err(err) = tunnel_client::tunnel::run(config).await {
        error!(%err, "tunnel session ended");
        std::process::exit(1);
    }
}
