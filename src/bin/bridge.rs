//! Bridge host
//!
//! Stands in for the plugin host: reads MIDI events and settings commands
//! from stdin and drives an `OscBridge`.
//!
//! Usage: `bridge [--config <path>] [--poll-ms <ms>]`

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_osc_bridge::{config::BridgeConfig, MidiEvent, OscBridge, OscValue};

const HELP: &str = "\
commands:
  on <note> <velocity>     note on
  off <note>               note off
  cc <controller> <value>  control change
  raw <hex bytes>          raw MIDI message, e.g. `raw 90 3c 64`
  tags <a,b,c>             replace the tag list (empty clears it)
  poll                     drain the multicast group and print the latest tags
  host <ip> | port <n>     change destination (applied on reconnect)
  reconnect                reconnect to the configured destination
  state                    print persisted state as JSON
  save                     write the current settings to the config file
  stats                    print counters
  quit";

struct Args {
    config_path: Option<PathBuf>,
    poll_interval: Option<Duration>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: BridgeConfig::default_path(),
        poll_interval: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config_path = Some(iter.next().context("--config needs a path")?.into());
            }
            "--poll-ms" => {
                let ms: u64 = iter
                    .next()
                    .context("--poll-ms needs a value")?
                    .parse()
                    .context("Invalid --poll-ms value")?;
                args.poll_interval = Some(Duration::from_millis(ms.max(1)));
            }
            other => bail!("Unknown argument: {}\n\n{}", other, HELP),
        }
    }
    Ok(args)
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    match path {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = BridgeConfig::from_toml_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        _ => Ok(BridgeConfig::default()),
    }
}

fn save_config(bridge: &OscBridge, base: &BridgeConfig, path: Option<&PathBuf>) -> Result<()> {
    let path = path.context("No config location available")?;
    let state = bridge.state();

    let mut config = base.clone();
    config.sender.host = state.ip_address;
    config.sender.port = state.port;
    config.tags = state.tags;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, config.to_toml_string()?)?;
    println!("saved {}", path.display());
    Ok(())
}

fn parse_u7(value: Option<&str>, what: &str) -> Result<u8> {
    let n: u8 = value
        .with_context(|| format!("missing {}", what))?
        .parse()
        .with_context(|| format!("invalid {}", what))?;
    if n > 127 {
        bail!("{} must be 0-127", what);
    }
    Ok(n)
}

fn join_args(args: &[OscValue]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns false when the session should end
fn run_command(
    bridge: &OscBridge,
    config: &BridgeConfig,
    config_path: Option<&PathBuf>,
    line: &str,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };

    let event = match command {
        "on" => Some(MidiEvent::note_on(
            parse_u7(parts.next(), "note")?,
            parse_u7(parts.next(), "velocity")?,
        )),
        "off" => Some(MidiEvent::note_off(parse_u7(parts.next(), "note")?)),
        "cc" => Some(MidiEvent::control_change(
            parse_u7(parts.next(), "controller")?,
            parse_u7(parts.next(), "value")?,
        )),
        "raw" => {
            let bytes = parts
                .by_ref()
                .map(|b| u8::from_str_radix(b, 16))
                .collect::<std::result::Result<Vec<u8>, _>>()
                .context("invalid hex byte")?;
            Some(MidiEvent::from_bytes(&bytes, 0.0).context("incomplete MIDI message")?)
        }
        _ => None,
    };

    if let Some(event) = event {
        let report = bridge.process_block(&[event]);
        println!(
            "sent {} skipped {} failed {} ignored {}",
            report.sent, report.skipped, report.failed, report.ignored
        );
        return Ok(true);
    }

    match command {
        "tags" => {
            let list = parts.collect::<Vec<_>>().join(" ");
            bridge.set_tags_text(&list.replace(',', "\n"));
            println!("tags: {:?}", bridge.tags().as_slice());
        }
        "poll" => println!("latest: [{}]", join_args(&bridge.poll_tags())),
        "host" => {
            bridge.set_ip_address(parts.next().context("missing host")?);
            println!("destination {} (reconnect to apply)", bridge.endpoint());
        }
        "port" => {
            let port: u16 = parts.next().context("missing port")?.parse().context("invalid port")?;
            bridge.set_port(port);
            println!("destination {} (reconnect to apply)", bridge.endpoint());
        }
        "reconnect" => match bridge.reconnect() {
            Ok(()) => println!("connected to {}", bridge.endpoint()),
            Err(e) => println!("connect failed: {}", e),
        },
        "state" => println!("{}", serde_json::to_string_pretty(&bridge.state())?),
        "save" => save_config(bridge, config, config_path)?,
        "stats" => {
            let stats = bridge.stats();
            println!(
                "sent {} messages ({} bytes), {} failures",
                stats.sender.messages_sent, stats.sender.bytes_sent, stats.sender.send_failures
            );
            match stats.receiver {
                Some(r) => println!(
                    "received {} datagrams, {} discarded, {} decoded, {} malformed",
                    r.datagrams_received, r.datagrams_discarded, r.messages_decoded, r.decode_failures
                ),
                None => println!("multicast receiver unavailable"),
            }
        }
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(false),
        other => println!("unknown command: {} (try `help`)", other),
    }
    Ok(true)
}

/// Resolves on the next poll tick, or never when polling is off
async fn next_tick(timer: &mut Option<tokio::time::Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting MIDI OSC bridge");

    let args = parse_args()?;
    let config = load_config(args.config_path.as_ref())?;
    let bridge = OscBridge::new(&config);

    tracing::info!(
        "Sending to {}, listening on {}:{}, tags {:?}",
        bridge.endpoint(),
        config.receiver.group,
        config.receiver.port,
        bridge.tags().as_slice()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll_timer = args.poll_interval.map(tokio::time::interval);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match run_command(&bridge, &config, args.config_path.as_ref(), line.trim()) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("error: {:#}", e),
                }
            }
            _ = next_tick(&mut poll_timer) => {
                let latest = bridge.poll_tags();
                if !latest.is_empty() {
                    tracing::info!("Latest tags: [{}]", join_args(&latest));
                }
            }
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
