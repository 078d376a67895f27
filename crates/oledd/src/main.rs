//! oledd daemon
//!
//! Drives an SSD1306 or SH1106 OLED panel from MQTT control messages and host
//! telemetry.
//!
//! Startup:
//! 1. Load configuration and environment overrides
//! 2. Open the panel (fatal on failure) and encode the QR link
//! 3. Start the render thread
//! 4. Start the supervised MQTT ingress
//!
//! SIGINT or SIGTERM stops the render thread, blanks and powers off the
//! panel, and publishes `offline` before exiting.

use anyhow::{Context, Result};
use clap::Parser;
use oledd_config::{DaemonConfig, DisplayConfig};
use oledd_display::{DisplayLoop, QrBitmap, Scheduler, SharedScheduler};
use oledd_hal::Panel;
use oledd_hal::mock::MockPanel;
use oledd_mqtt::{MqttIngress, Supervisor};
use oledd_telemetry::{HostTelemetry, TelemetrySource};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Time allowed for the ingress to publish `offline` on shutdown
const INGRESS_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "oledd")]
#[command(about = "MQTT-controlled OLED status display", version)]
struct Args {
    /// Configuration file (defaults to /etc/oledd/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Render to an in-memory panel instead of I2C
    #[arg(long)]
    dry_run: bool,

    /// Log filter, overrides RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.log_level.as_deref());

    info!("oledd {} starting", env!("CARGO_PKG_VERSION"));

    let config = DaemonConfig::resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    let scheduler = Scheduler::from_config(
        &config.schedule,
        config.display.brightness,
        Instant::now(),
    )
    .context("Invalid schedule configuration")?;
    let scheduler = SharedScheduler::new(scheduler);

    let panel = open_panel(&config.display, args.dry_run)?;
    let telemetry: Box<dyn TelemetrySource> = Box::new(HostTelemetry::cached(&config.telemetry));
    let qr = QrBitmap::new(&config.qr.link, config.display.width, config.display.height);

    let mut display = DisplayLoop::new(panel, telemetry, scheduler.clone(), qr)
        .with_tick(Duration::from_millis(config.schedule.tick_ms))
        .with_marquee_speed(config.schedule.marquee_px_per_sec);

    // Render thread
    let running = Arc::new(AtomicBool::new(true));
    let render = {
        let running = Arc::clone(&running);
        thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                display.run(&running);
                display.frames_drawn()
            })
            .context("Failed to start render thread")?
    };

    // MQTT ingress
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor = Supervisor::new(
        "MQTT ingress",
        Duration::from_secs(config.mqtt.reconnect_delay_secs),
        shutdown_rx.clone(),
    );
    let health = supervisor.health();
    let ingress = supervisor.spawn({
        let mqtt = config.mqtt.clone();
        let scheduler = scheduler.clone();
        move || MqttIngress::new(mqtt.clone(), scheduler.clone()).run(shutdown_rx.clone())
    });

    info!("oledd running, initial mode {}", scheduler.status().mode);
    wait_for_signal().await?;

    info!("Shutting down");
    running.store(false, Ordering::SeqCst);
    shutdown_tx.send_replace(true);

    match tokio::task::spawn_blocking(move || render.join()).await {
        Ok(Ok(frames)) => info!("Render thread stopped after {} frames", frames),
        Ok(Err(_)) => warn!("Render thread panicked"),
        Err(e) => warn!("Failed to join render thread: {}", e),
    }

    match tokio::time::timeout(INGRESS_STOP_TIMEOUT, ingress).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("MQTT supervisor failed: {}", e),
        Err(_) => warn!("MQTT ingress did not stop in time"),
    }
    if health.restarts() > 0 {
        info!("MQTT ingress was restarted {} times", health.restarts());
    }

    info!("oledd stopped");
    Ok(())
}

/// Setup logging to the console, for capture by the supervisor
fn setup_logging(level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();
}

fn open_panel(display: &DisplayConfig, dry_run: bool) -> Result<Box<dyn Panel>> {
    if dry_run {
        let (width, height) = (display.width, display.height);
        info!(
            "Dry run, rendering to a {}x{} in-memory panel",
            width, height
        );
        return Ok(Box::new(MockPanel::new(display.width, display.height)));
    }
    open_i2c_panel(display)
}

#[cfg(target_os = "linux")]
fn open_i2c_panel(display: &DisplayConfig) -> Result<Box<dyn Panel>> {
    use oledd_hal::{PanelConfig, PanelKind, Sh1106Panel, Ssd1306Panel};

    let kind = PanelKind::from_name(&display.display_type)?;
    let config = PanelConfig {
        i2c_bus: PanelConfig::bus_path(display.i2c_port),
        address: display.i2c_address,
        width: display.width,
        height: display.height,
        contrast: display.brightness,
    };
    let location = format!("{:#04x} on {}", config.address, config.i2c_bus.display());

    let opened: oledd_hal::Result<Box<dyn Panel>> = match kind {
        PanelKind::Ssd1306 => Ssd1306Panel::open(config).map(|p| Box::new(p) as Box<dyn Panel>),
        PanelKind::Sh1106 => Sh1106Panel::open(config).map(|p| Box::new(p) as Box<dyn Panel>),
    };
    let panel = opened
        .with_context(|| format!("Failed to open {} panel at {}", kind.name(), location))?;
    info!("Opened {} panel at {}", kind.name(), location);
    Ok(panel)
}

#[cfg(not(target_os = "linux"))]
fn open_i2c_panel(_display: &DisplayConfig) -> Result<Box<dyn Panel>> {
    anyhow::bail!("I2C panels are only supported on Linux, use --dry-run")
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for SIGINT")?;
            info!("Received SIGINT");
        }
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Received Ctrl-C");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_flags() {
        let args = Args::parse_from(["oledd", "--config", "/tmp/oledd.toml", "--dry-run"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/oledd.toml")));
        assert!(args.dry_run);
        assert!(args.log_level.is_none());
    }

    #[test]
    fn test_dry_run_panel_matches_geometry() {
        let panel = open_panel(&DisplayConfig::default(), true).unwrap();
        assert_eq!(panel.size(), (128, 64));
    }
}
