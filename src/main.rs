//! # Joystick Control
//!
//! Drive the car from a USB joystick, Bluetooth gamepad or keyboard.
//!
//! Reads the selected input device on a dedicated thread and publishes the
//! normalized control axes at a fixed rate over MQTT.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse the command line and set up logging
//!    - Load configuration (built-in defaults without `--config`)
//!    - Check the vehicle is offroad, then enable joystick debug mode
//!
//! 2. **Main Loop**
//!    - Input polling thread updates the latest snapshot on every event
//!    - Publisher sends the latest snapshot at `rate_hz` (100Hz default)
//!    - Ctrl+C or the keyboard quit key ends both loops
//!
//! 3. **Graceful Shutdown**
//!    - Clear joystick debug mode
//!    - Restore the terminal in keyboard mode
//!
//! # Examples
//!
//! ```bash
//! joystick-control                      # USB joystick
//! joystick-control --keyboard
//! joystick-control --bluetooth --config config/joystick.toml
//! ```

use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::{oneshot, watch};
use tracing::{error, info};

use joystick_control::config::{Config, JoystickLayout};
use joystick_control::controller::joystick::UsbJoystick;
use joystick_control::controller::keyboard::Keyboard;
use joystick_control::controller::{bluetooth, ControlSnapshot, InputSource};
use joystick_control::logging;
use joystick_control::params::{self, FileParams, ParamStore, JOYSTICK_DEBUG_MODE};
use joystick_control::polling::{self, SourceFactory};
use joystick_control::publisher::sink::MqttSink;
use joystick_control::publisher::Publisher;

/// Publishes events from your joystick to control your car.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Use your keyboard instead of a joystick
    #[arg(long, conflicts_with = "bluetooth")]
    keyboard: bool,

    /// Use a Bluetooth gamepad (PS4/PS5 controller)
    #[arg(long)]
    bluetooth: bool,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Keyboard,
    Bluetooth,
    Joystick,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.keyboard {
            Mode::Keyboard
        } else if self.bluetooth {
            Mode::Bluetooth
        } else {
            Mode::Joystick
        }
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load config from {}", path)),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn log_usage(mode: Mode, config: &Config) {
    match mode {
        Mode::Keyboard => {
            info!("Gas/brake control: `W` and `S` keys");
            info!("Steering control: `A` and `D` keys");
            info!("Buttons");
            info!("- `R`: Resets axes");
            info!("- `C`: Cancel cruise control");
            info!("- `Ctrl+C`: Quit");
        }
        Mode::Bluetooth => {
            info!("Using Bluetooth gamepad (PS4/PS5 controller)");
            info!("Gas control: R2 trigger");
            info!("Brake control: L2 trigger");
            info!("Steering control: Left joystick");
            info!("Speed modes: D-pad Up/Down");
            info!("Cancel: Triangle button");
            info!("Before running, make sure to:");
            info!("1. sudo hciattach /dev/ttyHS1 any 115200 flow");
            info!("2. Pair controller via bluetoothctl");
        }
        Mode::Joystick => {
            info!("Using USB joystick, make sure to run the messaging bridge on your device if running over the network!");
            if config.joystick.layout == JoystickLayout::Desktop {
                info!("Using the desktop axis layout; set joystick.layout = \"onboard\" when running on the car");
            }
        }
    }
}

fn source_factory(mode: Mode, config: &Config) -> SourceFactory {
    match mode {
        Mode::Keyboard => Box::new(open_keyboard),
        Mode::Bluetooth => {
            let bluetooth = config.bluetooth.clone();
            Box::new(move || -> joystick_control::error::Result<Box<dyn InputSource>> {
                Ok(Box::new(bluetooth::open(&bluetooth)?))
            })
        }
        Mode::Joystick => {
            let joystick = config.joystick.clone();
            Box::new(move || -> joystick_control::error::Result<Box<dyn InputSource>> {
                Ok(Box::new(UsbJoystick::new(&joystick)))
            })
        }
    }
}

fn open_keyboard() -> joystick_control::error::Result<Box<dyn InputSource>> {
    Ok(Box::new(Keyboard::open()?))
}

fn polling_outcome(joined: thread::Result<joystick_control::error::Result<()>>) -> Result<()> {
    match joined {
        Ok(result) => result.context("Input source failed"),
        Err(_) => Err(anyhow!("Input polling thread panicked")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = cli.mode();

    let config = load_config(cli.config.as_deref())?;
    let _log_guard = logging::init(&cli.log_level, &config.logging, mode == Mode::Keyboard);

    info!("Joystick Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let params = FileParams::new(&config.params.dir);
    params::check_offroad(&params, &config.params)?;
    params
        .put_bool(JOYSTICK_DEBUG_MODE, true)
        .context("Failed to enable joystick debug mode")?;

    log_usage(mode, &config);

    let result = run(mode, &config).await;

    if let Err(e) = params.put_bool(JOYSTICK_DEBUG_MODE, false) {
        error!("Failed to clear joystick debug mode: {}", e);
    }
    if mode == Mode::Keyboard {
        let _ = crossterm::terminal::disable_raw_mode();
    }

    result
}

async fn run(mode: Mode, config: &Config) -> Result<()> {
    let sink = MqttSink::connect(&config.mqtt);

    let (snapshot_tx, snapshot_rx) = watch::channel(ControlSnapshot::default());
    let (ready_tx, ready_rx) = oneshot::channel();
    let poller = polling::spawn(source_factory(mode, config), snapshot_tx, ready_tx)?;

    let axes = tokio::select! {
        ready = ready_rx => ready.context("Input thread exited during startup")??,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C during startup, shutting down...");
            return Ok(());
        }
    };
    info!("Input ready, axes: {}", axes.join(", "));

    let publisher = Publisher::new(sink, snapshot_rx, &config.publisher);

    tokio::select! {
        stats = publisher.run() => {
            let stats = stats?;
            info!(
                "Publisher stopped: {} frames, {} published, {} failed",
                stats.frames, stats.published, stats.failed
            );

            // Publisher only stops once the polling thread has exited
            let joined = tokio::task::spawn_blocking(move || poller.join()).await?;
            polling_outcome(joined)?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
