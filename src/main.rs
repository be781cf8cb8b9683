use clap::Parser;
use plantlink::dispatch::keymap::Keymap;
use plantlink::hardware::{open_transport, InterfaceType, LinkConfig, DEFAULT_BAUD_RATE};
use plantlink::sensors::SensorReadings;
use plantlink::{CommandKind, ConfigurationManager, ProtocolEngine, TerminatorPolicy};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Send keyboard-bound commands to a plant-care unit
#[derive(Debug, Parser)]
#[command(name = "plantlink", version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port path; overrides the configured link
    #[arg(short, long)]
    device: Option<String>,

    /// Line rate for --device
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Bound each reply byte wait (milliseconds)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Reject replies whose last byte is not 0x7F
    #[arg(long)]
    strict: bool,

    /// Print the key bindings and exit
    #[arg(long)]
    list: bool,

    /// Keys to send, in order (e.g. "ps")
    keys: Option<String>,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut manager = match &cli.config {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new(),
    };

    if let Some(device) = &cli.device {
        manager.set_link(LinkConfig::serial(device.clone(), cli.baud))?;
    }
    if cli.timeout_ms.is_some() {
        manager.set_receive_timeout(cli.timeout_ms)?;
    }
    if cli.strict {
        manager.set_terminator_policy(TerminatorPolicy::Strict);
    }

    let config = manager.config().clone();
    init_logging(config.debug_logging);

    let keymap = Keymap::new(config.protocol_version);
    if cli.list {
        for binding in keymap.bindings() {
            println!("{}  {}", binding.symbol, binding.description);
        }
        return Ok(());
    }

    if config.link.interface == InterfaceType::Loopback {
        info!("no device configured; using loopback link");
    }

    let transport = open_transport(&config.link)?;
    let mut engine = ProtocolEngine::from_config(transport, &config);

    for symbol in cli.keys.unwrap_or_default().chars() {
        let Some(frame) = keymap.frame_for(symbol)? else {
            warn!(%symbol, "no command bound to key");
            continue;
        };

        match engine.send_command(&frame)? {
            Some(reply) if reply.kind() == CommandKind::RequestSensorData => {
                match SensorReadings::from_payload(reply.payload()) {
                    Some(readings) => info!(?readings, "sensor readings"),
                    None => info!(%reply, "sensor reply"),
                }
            }
            Some(reply) => info!(%reply, "reply"),
            None => info!(%frame, "sent"),
        }
    }

    let stats = engine.stats();
    info!(
        frames_sent = stats.frames_sent,
        frames_received = stats.frames_received,
        noise_discarded = stats.noise_discarded,
        "done"
    );
    Ok(())
}
