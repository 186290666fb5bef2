// Command echo: subscribes to the teleop topic and logs every command
//
// Usage: cargo run --example cmd_echo -- [topic]
// Run the teleop binary in another terminal to see its output here.
use teleop_twist_keyboard::config::DEFAULT_TOPIC;
use teleop_twist_keyboard::messages::OutgoingCommand;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let topic = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let subscriber = session.declare_subscriber(topic.clone()).await?;
    info!("Subscribed to: {}", topic);

    while let Ok(sample) = subscriber.recv_async().await {
        let payload = sample.payload().to_bytes();
        match serde_json::from_slice::<OutgoingCommand>(&payload) {
            Ok(cmd) => {
                let twist = cmd.twist();
                let frame = cmd.header().map(|h| h.frame_id.as_str()).unwrap_or("-");
                info!(
                    "linear=({:.2}, {:.2}, {:.2}) angular.z={:.2} frame={}",
                    twist.linear.x, twist.linear.y, twist.linear.z, twist.angular.z, frame
                );
            }
            Err(e) => warn!("Failed to parse command: {}", e),
        }
    }

    Ok(())
}
