//! Tag announcer
//!
//! Publishes the current tag list to the multicast group so bridges can
//! pick it up with `poll`.
//!
//! Usage: `announce [--group <ip>] [--port <n>] [--interval-ms <ms>] <tag>...`

use anyhow::{bail, Context, Result};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_osc_bridge::{
    codec::OscEncoder,
    constants::*,
    network::create_multicast_sender,
    OscMessage,
};

/// Address announcements are published on
const TAGS_ADDRESS: &str = "/tags";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut group = DEFAULT_MULTICAST_GROUP;
    let mut port = DEFAULT_MULTICAST_PORT;
    let mut interval = Duration::from_secs(1);
    let mut tags = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--group" => {
                group = args
                    .next()
                    .context("--group needs an address")?
                    .parse::<Ipv4Addr>()
                    .context("Invalid group address")?;
            }
            "--port" => {
                port = args.next().context("--port needs a value")?.parse().context("Invalid port")?;
            }
            "--interval-ms" => {
                let ms: u64 = args
                    .next()
                    .context("--interval-ms needs a value")?
                    .parse()
                    .context("Invalid interval")?;
                interval = Duration::from_millis(ms.max(1));
            }
            _ => tags.push(arg),
        }
    }

    if !group.is_multicast() {
        bail!("{} is not a multicast address", group);
    }
    if tags.is_empty() {
        tags.push(DEFAULT_TAG.to_string());
    }

    let socket = create_multicast_sender(1, true)?;
    let target = SocketAddrV4::new(group, port);

    let mut message = OscMessage::new(TAGS_ADDRESS);
    for tag in &tags {
        message.push(tag.as_str());
    }

    let packet = OscEncoder::new().encode(&message);

    tracing::info!("Announcing {:?} to {} every {:?}", tags, target, interval);

    let mut ticker = tokio::time::interval(interval);
    let mut sent = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match socket.send_to(&packet, target) {
                    Ok(_) => sent += 1,
                    Err(e) => tracing::warn!("Failed to announce tags: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Stopped after {} announcements", sent);
    Ok(())
}
