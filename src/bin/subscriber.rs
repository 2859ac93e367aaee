//! Consumer process.
//!
//! Usage: `subscriber <id> <ip> <port>`. Logs in to the broker and reads
//! `subscribe`, `unsubscribe` and `exit` commands from stdin.

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing::error;

use postbox::config::load_config;
use postbox::consumer;
use postbox::transport::message::MAX_IDENTITY_LEN;
use postbox::utils::{Result, logging};

#[derive(Parser)]
#[command(name = "subscriber", about = "Topic consumer for the broker")]
struct Args {
    /// Identity to log in with
    id: String,
    /// Broker address
    ip: IpAddr,
    /// Broker port
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.id.len() > MAX_IDENTITY_LEN {
        eprintln!("User IDs can have at most {MAX_IDENTITY_LEN} characters");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Subscriber failed: {}", e);
            eprintln!("subscriber: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config()?;
    logging::init(&config.logging.level);

    let server = SocketAddr::new(args.ip, args.port);
    consumer::run(
        server,
        &args.id,
        config.server.tcp_nodelay,
        BufReader::new(tokio::io::stdin()),
    )
    .await
}
