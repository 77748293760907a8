use clap::Parser;
use littlehttpd::config::{Cli, ServerConfig};
use littlehttpd::{logging, server};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = ServerConfig::from_cli(cli)?;

    server::run(config).await
}
