use clap::Parser;
use tracing_subscriber::EnvFilter;

use teleop_twist_keyboard::config::Args;

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug). Stderr keeps stdout free
    // for the key help and speed status lines.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = teleop_twist_keyboard::runtime::start(Args::parse()).await {
        eprintln!("Teleop error: {}", e);
        std::process::exit(1);
    }
}
