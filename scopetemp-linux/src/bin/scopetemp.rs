use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scopetemp_linux::{
    DEFAULT_LOG_FILE, DEFAULT_LOG_INTERVAL, DeviceIdentity, Direction, FanCommand, Guider,
    LogLine, RusbBackend, ScopeTemp,
};
use scopetemp_protocol::{PRODUCT_ID, VENDOR_ID};
use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

/// Talk to a ScopeTemp accessory over USB.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Control transfer timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout: u64,

    /// USB vendor id, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_id, default_value_t = VENDOR_ID)]
    vendor_id: u16,

    /// USB product id, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_id, default_value_t = PRODUCT_ID)]
    product_id: u16,

    /// Manufacturer string to match
    #[arg(long)]
    manufacturer: Option<String>,

    /// Product string to match
    #[arg(long)]
    product: Option<String>,

    /// How the board drives its fans
    #[arg(long, value_enum, default_value = "pwm")]
    fans: FanKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FanKind {
    Pwm,
    Switched,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GuideDirection {
    North,
    South,
    West,
    East,
}

impl From<GuideDirection> for Direction {
    fn from(value: GuideDirection) -> Self {
        match value {
            GuideDirection::North => Direction::North,
            GuideDirection::South => Direction::South,
            GuideDirection::West => Direction::West,
            GuideDirection::East => Direction::East,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the four temperatures once
    Temps,
    /// Append a line to the log file at a fixed interval
    ///
    /// The two fan columns show what this invocation set with --fan1/--fan2 and read 0
    /// for a fan it left alone, whatever that fan is actually doing.
    Log {
        /// Seconds between lines
        #[arg(short, long, default_value_t = DEFAULT_LOG_INTERVAL.as_secs())]
        interval: u64,
        /// Log file
        #[arg(short, long, default_value = DEFAULT_LOG_FILE)]
        file: PathBuf,
        /// Stop after this many lines
        #[arg(short, long)]
        count: Option<usize>,
        /// Set fan 1 before logging (duty, or non-zero for on)
        #[arg(long)]
        fan1: Option<u16>,
        /// Set fan 2 before logging (duty, or non-zero for on)
        #[arg(long)]
        fan2: Option<u16>,
    },
    /// Set both fans (duty, or non-zero for on)
    Fans { fan1: u16, fan2: u16 },
    /// Set the guide outputs; opposite directions cancel out
    Guide {
        #[arg(short, long)]
        north: bool,
        #[arg(short, long)]
        south: bool,
        #[arg(short, long)]
        west: bool,
        #[arg(short, long)]
        east: bool,
    },
    /// Guide in one direction for a number of milliseconds
    Pulse {
        #[arg(value_enum)]
        direction: GuideDirection,
        duration_ms: u64,
    },
}

fn parse_id(s: &str) -> Result<u16, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn fan_command(kind: FanKind, fan1: u16, fan2: u16) -> FanCommand {
    match kind {
        FanKind::Pwm => FanCommand::Duty { fan1, fan2 },
        FanKind::Switched => FanCommand::Switched {
            fan1: fan1 != 0,
            fan2: fan2 != 0,
        },
    }
}

/// Whether the log loop owes another line.
fn lines_left(count: Option<usize>, written: usize) -> bool {
    count.is_none_or(|n| written < n)
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();

    let backend = RusbBackend::new()
        .context("failed to initialise libusb")?
        .with_timeout(Duration::from_millis(args.timeout));
    let mut identity = DeviceIdentity::default().with_ids(args.vendor_id, args.product_id);
    if let Some(manufacturer) = &args.manufacturer {
        identity = identity.with_manufacturer(manufacturer.as_str());
    }
    if let Some(product) = &args.product {
        identity = identity.with_product(product.as_str());
    }
    let mut device = ScopeTemp::new(backend).with_identity(identity);
    device.connect().context("failed to connect")?;

    match args.command {
        Command::Temps => {
            let temps = device.get_temperatures().context("failed to read temperatures")?;
            for (channel, t) in temps.iter().enumerate() {
                match t {
                    Some(t) => println!("t{}: {t:.3} °C", channel + 1),
                    None => println!("t{}: no reading", channel + 1),
                }
            }
        }
        Command::Log {
            interval,
            file,
            count,
            fan1,
            fan2,
        } => {
            let fans = (fan1.unwrap_or(0), fan2.unwrap_or(0));
            if fan1.is_some() || fan2.is_some() {
                device
                    .set_fan_outputs(fan_command(args.fans, fans.0, fans.1))
                    .context("failed to set fans")?;
            }
            let mut written = 0;
            while lines_left(count, written) {
                match device.get_temperatures() {
                    Ok(temps) => {
                        let line = LogLine::now(temps, (fans.0 != 0, fans.1 != 0));
                        let mut out = OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(&file)
                            .with_context(|| format!("failed to open {}", file.display()))?;
                        writeln!(out, "{line}")
                            .with_context(|| format!("failed to write {}", file.display()))?;
                        log::info!("{line}");
                        written += 1;
                    }
                    Err(e) => log::warn!("temperature readout failed: {e}"),
                }
                if lines_left(count, written) {
                    thread::sleep(Duration::from_secs(interval));
                }
            }
        }
        Command::Fans { fan1, fan2 } => {
            device
                .set_fan_outputs(fan_command(args.fans, fan1, fan2))
                .context("failed to set fans")?;
        }
        Command::Guide {
            north,
            south,
            west,
            east,
        } => {
            Guider::new()
                .manual(&mut device, north, south, west, east)
                .context("failed to set guide outputs")?;
        }
        Command::Pulse {
            direction,
            duration_ms,
        } => {
            let mut guider = Guider::new();
            guider
                .pulse(
                    &mut device,
                    direction.into(),
                    Duration::from_millis(duration_ms),
                    Instant::now(),
                )
                .context("failed to start pulse")?;
            while let Some(deadline) = guider.next_deadline() {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                guider
                    .poll(&mut device, Instant::now())
                    .context("failed to stop pulse")?;
            }
        }
    }

    device.disconnect();
    Ok(())
}
