//! Broker process.
//!
//! Usage: `server <port>`. Binds TCP and UDP on the same port and runs until
//! `exit` is typed on stdin.

use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing::error;

use postbox::config::load_config;
use postbox::transport::Server;
use postbox::utils::{Result, logging};

#[derive(Parser)]
#[command(name = "server", about = "UDP to TCP topic broker")]
struct Args {
    /// Port for both the TCP listener and the UDP socket
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            eprintln!("server: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config()?;
    logging::init(&config.logging.level);

    let addr = config.server.bind_addr(Some(args.port))?;
    let server = Server::bind(addr, config.server.tcp_nodelay).await?;
    server.run(BufReader::new(tokio::io::stdin())).await
}
