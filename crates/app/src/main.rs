use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use led_visualiser_core::{DeviceOutput, Frame, MemoryDrivers, Settings, Transport};
use tracing_subscriber::EnvFilter;

fn main() -> led_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::StrandTest {
            config,
            interval,
            cycles,
        } => run_strand_test(&config, interval, cycles),
        Commands::Validate { config } => run_validate(&config),
    }
}

/// Scrolls a red, a green and a blue pixel along every configured strip.
/// If the wiring and addressing are right, the three pixels chase each other
/// continuously.
fn run_strand_test(
    config: &PathBuf,
    interval: f32,
    cycles: Option<u64>,
) -> led_visualiser_core::Result<()> {
    let settings = Settings::load(config)?;
    let gamma = settings.load_gamma()?;
    let mut drivers = MemoryDrivers;

    let mut outputs = Vec::new();
    for (name, board) in &settings.devices {
        let output = DeviceOutput::from_settings(name, board, gamma.clone(), &mut drivers)?;
        outputs.push((board.led_count, output));
    }

    tracing::info!(boards = outputs.len(), "starting LED strand test");

    let mut offset: u64 = 0;
    loop {
        if let Some(limit) = cycles {
            if offset >= limit {
                return Ok(());
            }
        }
        for (led_count, output) in &mut outputs {
            let mut frame = Frame::new(*led_count);
            let base = (offset as usize) % *led_count;
            frame.set(base, 255.0, 0.0, 0.0);
            frame.set((base + 1) % *led_count, 0.0, 255.0, 0.0);
            frame.set((base + 2) % *led_count, 0.0, 0.0, 255.0);
            output.send(&frame);
        }
        offset += 1;
        thread::sleep(Duration::from_secs_f32(interval));
    }
}

/// Loads the settings and gamma table, opens every device output, and
/// reports what would drive each board. Surfaces the startup-fatal class of
/// errors without touching any LEDs.
fn run_validate(config: &PathBuf) -> led_visualiser_core::Result<()> {
    let settings = Settings::load(config)?;
    let gamma = settings.load_gamma()?;
    let mut drivers = MemoryDrivers;

    for (name, board) in &settings.devices {
        let _ = DeviceOutput::from_settings(name, board, gamma.clone(), &mut drivers)?;
        tracing::info!(
            board = %name,
            transport = transport_kind(&board.transport),
            led_count = board.led_count,
            gamma = board.gamma_correction,
            "board configured"
        );
    }

    tracing::info!(
        sync = settings.sync,
        brightness = settings.brightness,
        "configuration OK"
    );
    Ok(())
}

fn transport_kind(transport: &Transport) -> &'static str {
    match transport {
        Transport::Udp { .. } => "udp",
        Transport::Ws281x { .. } => "ws281x",
        Transport::Blinkstick { .. } => "blinkstick",
        Transport::Stripless => "stripless",
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive LED strip driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scroll a red/green/blue pixel test pattern across every strip.
    StrandTest {
        /// Path to the settings file.
        config: PathBuf,
        /// Seconds between scroll steps.
        #[arg(short, long, default_value_t = 0.1)]
        interval: f32,
        /// Stop after this many steps instead of running forever.
        #[arg(short, long)]
        cycles: Option<u64>,
    },
    /// Load the settings and gamma table and open every output.
    Validate {
        /// Path to the settings file.
        config: PathBuf,
    },
}
