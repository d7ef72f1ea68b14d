//! CLI for the pub/sub client
//!
//! Subcommands:
//! - `listen`: subscribe to channels and print every delivery until Ctrl-C
//! - `publish`: publish one JSON payload and exit once it has been sent

use std::time::Duration;

use clap::Parser;
use pubsub_client::utils::logging;
use pubsub_client::{Handler, PubSubClient, load_config};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "pubsub_client")]
enum Command {
    /// Subscribe to one or more channels and print deliveries
    Listen {
        /// Channel to subscribe to (repeatable)
        #[arg(long = "channel", required = true)]
        channels: Vec<String>,
    },
    /// Publish a JSON payload to a channel
    Publish {
        #[arg(long)]
        channel: String,
        /// JSON payload; plain text is sent as a JSON string
        #[arg(long)]
        data: String,
        /// Seconds to wait for the connection before giving up
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&settings.client.log_level);

    let client = match PubSubClient::from_settings(&settings) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to start client: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cmd {
        Command::Listen { channels } => run_listen(&client, &channels).await,
        Command::Publish {
            channel,
            data,
            timeout,
        } => run_publish(&client, &channel, &data, Duration::from_secs(timeout)).await,
    };

    client.close();
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_listen(
    client: &PubSubClient,
    channels: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    for channel in channels {
        client.subscribe(
            channel,
            Handler::new(|channel: &str, data: &Value| {
                println!("[{channel}] {data}");
            }),
        )?;
    }
    info!("Listening on {} channel(s), press Ctrl-C to stop", channels.len());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully.");
    Ok(())
}

async fn run_publish(
    client: &PubSubClient,
    channel: &str,
    data: &str,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()));
    client.publish(channel, payload)?;

    let flushed = tokio::time::timeout(timeout, async {
        while !(client.is_connected() && client.queued_messages().is_empty()) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    if flushed.is_err() {
        warn!(
            "Gave up after {:?}; {} message(s) still queued",
            timeout,
            client.queued_messages().len()
        );
        return Err("timed out waiting for the connection".into());
    }

    // give the I/O task a moment to write the frame before closing
    tokio::time::sleep(Duration::from_millis(200)).await;
    info!("Published to {channel}");
    Ok(())
}
