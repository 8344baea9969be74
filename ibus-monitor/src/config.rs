use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use ibus::{device::DeviceTable, emulator::TunerState};

/// Watch, decode and take part in IBus traffic.
#[derive(Debug, Parser)]
#[command(name = "ibus-monitor", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every packet seen on the bus.
    Watch(SerialArgs),
    /// Answer the radio as a satellite tuner (SDRS) would.
    Emulate(EmulateArgs),
    /// Decode a recorded log instead of a live bus.
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
pub struct SerialArgs {
    /// Serial device the bus interface is attached to.
    #[arg(long, env = "IBUS_PORT")]
    pub port: String,

    #[arg(long, env = "IBUS_BAUD", default_value_t = 9600)]
    pub baud: u32,

    /// Give up on a single read after this many milliseconds.
    #[arg(long = "read-timeout", default_value_t = 250)]
    pub read_timeout_ms: u64,

    #[command(flatten)]
    pub devices: DeviceArgs,
}

impl SerialArgs {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Args)]
pub struct EmulateArgs {
    #[command(flatten)]
    pub serial: SerialArgs,

    /// Repeat the startup announce every this many seconds.
    #[arg(long = "announce-interval")]
    pub announce_interval_secs: Option<u64>,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub channel: i32,

    #[arg(long, default_value_t = 1)]
    pub band: u8,

    #[arg(long, default_value_t = 1)]
    pub preset: u8,
}

impl EmulateArgs {
    pub fn announce_interval(&self) -> Option<Duration> {
        self.announce_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn tuner_state(&self) -> TunerState {
        TunerState {
            channel: self.channel,
            band: self.band,
            preset: self.preset,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Log to decode; standard input when left out.
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub devices: DeviceArgs,
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Name an extra device, as CODE=NAME with CODE in hex (e.g. A8=Unknown).
    /// Packets from devices missing from the table are discarded as noise.
    #[arg(long = "device", value_parser = parse_device)]
    pub extra: Vec<(u8, String)>,
}

impl DeviceArgs {
    /// Extend `base` with the devices given on the command line.
    pub fn table(&self, mut base: DeviceTable) -> DeviceTable {
        for (code, name) in &self.extra {
            base.insert(*code, name.clone());
        }
        base
    }
}

fn parse_device(arg: &str) -> std::result::Result<(u8, String), String> {
    let (code, name) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=NAME, got {arg:?}"))?;
    let code = code.trim();
    let digits = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);
    let code = u8::from_str_radix(digits, 16)
        .map_err(|e| format!("bad device code {code:?}: {e}"))?;
    Ok((code, name.trim().to_string()))
}
