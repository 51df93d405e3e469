//! Relay host -- entry point.
//!
//! ```text
//! relay-host                  Run as console (foreground)
//! relay-host --install        Install as Windows service
//! relay-host --uninstall      Remove Windows service
//! relay-host --config <path>  Load a custom config TOML
//! relay-host --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_host::config::HostConfig;
use relay_host::service::HostService;

#[derive(Parser, Debug)]
#[command(name = "relay-host", about = "Relay screen-capture and streaming host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "relay-host.toml")]
    config: PathBuf,

    /// Install as a Windows service.
    #[arg(long)]
    install: bool,

    /// Uninstall the Windows service.
    #[arg(long)]
    uninstall: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    #[cfg(target_os = "windows")]
    {
        if cli.install {
            relay_host::win_service::install_service()?;
            println!("Service installed.");
            return Ok(());
        }
        if cli.uninstall {
            relay_host::win_service::uninstall_service()?;
            println!("Service uninstalled.");
            return Ok(());
        }
    }
    #[cfg(not(target_os = "windows"))]
    {
        if cli.install || cli.uninstall {
            eprintln!("Windows service management is only available on Windows.");
            std::process::exit(1);
        }
    }

    let config = HostConfig::load(&cli.config);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("relay-host v{}", env!("CARGO_PKG_VERSION"));
    info!("control port: {}", config.network.control_port);
    info!("monitor: {}", config.session.monitor_index);

    let service = HostService::new(config);
    let stop = service.stop_handle();

    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received -- shutting down");
        stop_clone.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
