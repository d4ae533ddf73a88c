//! touch-relay entry point.
//!
//! ```text
//! touch-relay [CONFIG] [--list | --print-config | --demo]
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- TOML, defaults when absent
//!  └─ setup()                    -- probe, create virtual twin, start threads
//!  └─ optional demo gesture      -- tap + swipe through the injector
//!  └─ wait for Ctrl-C or reader exit
//!  └─ TouchRelaySession::stop()  -- lift, join, destroy, release
//! ```
//!
//! Device setup and the injector block, so they run on Tokio's blocking pool
//! rather than on the async executor.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use touch_relay::infrastructure::config::render_config;
use touch_relay::infrastructure::device::evdev::list_touch_devices;
use touch_relay::{load_config, setup, RelayConfig, TouchRelaySession};

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Command {
    #[default]
    Relay,
    Demo,
    List,
    PrintConfig,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    config: Option<PathBuf>,
    command: Command,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        for arg in args {
            match arg.as_str() {
                "--list" => parsed.command = Command::List,
                "--demo" => parsed.command = Command::Demo,
                "--print-config" => parsed.command = Command::PrintConfig,
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                path => {
                    if parsed.config.is_some() {
                        bail!("more than one config path given");
                    }
                    parsed.config = Some(PathBuf::from(path));
                }
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let config = load_config(args.config.as_deref()).context("loading configuration")?;

    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    match args.command {
        Command::PrintConfig => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
        Command::List => list_devices().await,
        Command::Relay => run(config, false).await,
        Command::Demo => run(config, true).await,
    }
}

async fn list_devices() -> anyhow::Result<()> {
    let devices = tokio::task::spawn_blocking(list_touch_devices).await??;
    for device in devices {
        println!(
            "{}\t{}\tslots={}\tx={}\ty={}",
            device.path.display(),
            device.name,
            device.slot_count(),
            device.x_axis().maximum,
            device.y_axis().maximum,
        );
    }
    Ok(())
}

async fn run(config: RelayConfig, demo: bool) -> anyhow::Result<()> {
    info!("touch-relay starting");

    let display = (config.display.width, config.display.height);
    let mut session = tokio::task::spawn_blocking(move || setup(&config))
        .await?
        .context("starting touch relay")?;

    if demo {
        session = tokio::task::spawn_blocking(move || {
            if let Err(e) = demo_gesture(&mut session, display) {
                warn!("demo gesture failed: {e}");
            }
            session
        })
        .await?;
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("touch-relay ready");
    while running.load(Ordering::Relaxed) && session.is_running() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if running.load(Ordering::Relaxed) {
        warn!("touch screen stopped delivering events");
    }

    tokio::task::spawn_blocking(move || session.stop()).await?;
    info!("touch-relay stopped");
    Ok(())
}

/// Taps the display center, then swipes across the middle.
fn demo_gesture(
    session: &mut TouchRelaySession,
    (width, height): (u32, u32),
) -> Result<(), touch_relay::RelayError> {
    let w = i32::try_from(width).unwrap_or(i32::MAX);
    let h = i32::try_from(height).unwrap_or(i32::MAX);
    session.tap(w / 2, h / 2)?;
    session.swipe(w / 4, h / 2, w * 3 / 4, h / 2)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
