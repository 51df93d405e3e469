//! Relay viewer -- entry point.
//!
//! ```text
//! relay-viewer                    Connect with defaults
//! relay-viewer --host <addr>      Override the host control address
//! relay-viewer --config <path>    Use a custom config TOML
//! relay-viewer --gen-config       Print the default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_core::quantise::{PaletteCache, PaletteQuantiser};
use relay_core::{Compressor, DecoderSession, Quantiser, RelayError, ShutdownFlag};

use relay_viewer::config::{QuantiserKind, ViewerConfig};
use relay_viewer::renderer::{run_render_loop, MailboxRenderer};

#[derive(Parser, Debug)]
#[command(name = "relay-viewer", about = "Relay desktop viewer client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "relay-viewer.toml")]
    config: PathBuf,

    /// Host control address (overrides config). Example: 192.168.1.100:7332
    #[arg(long)]
    host: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn build_quantiser(kind: QuantiserKind, k: u16, palette_cache_dir: &str) -> Result<Quantiser, RelayError> {
    match kind {
        QuantiserKind::Greyscale => Quantiser::greyscale(k),
        QuantiserKind::RgbPalette => {
            let cache = PaletteCache::new(palette_cache_dir);
            Ok(Quantiser::RgbPalette(PaletteQuantiser::from_cache(k, &cache)?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(addr) = cli.host {
        config.network.host_address = addr;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("relay-viewer v{}", env!("CARGO_PKG_VERSION"));
    info!("connecting to host at {}", config.network.host_address);

    let stream = TcpStream::connect(&config.network.host_address).await?;
    let compressor = Compressor::new(config.session.compression_level);
    let quantiser = build_quantiser(
        config.session.quantiser,
        config.session.k,
        &config.session.palette_cache_dir,
    )?;
    let (mailbox_tx, mailbox_rx) = relay_core::frame_mailbox();
    let renderer = MailboxRenderer::new(mailbox_tx);
    let render_task = tokio::spawn(run_render_loop(mailbox_rx));

    let mut session = DecoderSession::handshake(
        stream,
        renderer,
        config.session.k,
        config.session.scale_percent,
        quantiser,
        compressor,
    )
    .await?;

    let shutdown = ShutdownFlag::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received -- shutting down");
        shutdown_clone.signal();
    });

    let result = session.run(&shutdown).await;
    drop(session);
    let _ = render_task.await;
    result?;

    info!("session ended");
    Ok(())
}
