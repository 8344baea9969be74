use std::{
    fs::File,
    io::{self, BufReader},
};

use anyhow::Context;
use clap::Parser;
use ibus::{device::DeviceTable, payload::CommandDecoder, replay::Replayer};
use ibus_monitor::{
    bus_thread::{BusOptions, Mode, run_bus},
    config::{Cli, Command, ReplayArgs, SerialArgs},
    replay::replay,
    serial,
};
use log::{info, warn};
use tokio::sync::mpsc;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Watch(args) => run_serial(&args, Mode::Watch),
        Command::Emulate(args) => {
            let mode = Mode::Emulate {
                tuner: args.tuner_state(),
                announce_interval: args.announce_interval(),
            };
            run_serial(&args.serial, mode)
        }
        Command::Replay(args) => run_replay(&args),
    }
}

fn run_serial(args: &SerialArgs, mode: Mode) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("couldn't start the runtime")?;

    rt.block_on(async {
        let port = serial::open(args)?;
        let (stop_tx, stop_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("stopping");
                    let _ = stop_tx.send(()).await;
                }
                Err(e) => warn!("couldn't listen for ctrl-c: {e}"),
            }
        });

        let options = BusOptions {
            devices: args.devices.table(DeviceTable::ibus()),
            read_timeout: args.read_timeout(),
            mode,
        };
        let stats = run_bus(port, options, stop_rx).await?;
        info!(
            "{} packets, {} bytes dropped, {} replies, {} unhandled",
            stats.packets, stats.dropped, stats.replies, stats.unhandled
        );
        Ok::<_, anyhow::Error>(())
    })
}

fn run_replay(args: &ReplayArgs) -> anyhow::Result<()> {
    let replayer = Replayer::new(CommandDecoder::new(args.devices.table(DeviceTable::sdrs())));
    let stdout = io::stdout().lock();
    let stats = match &args.file {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("couldn't open {}", path.display()))?;
            replay(BufReader::new(file), stdout, replayer)?
        }
        None => replay(io::stdin().lock(), stdout, replayer)?,
    };
    info!(
        "{} lines decoded, {} skipped, {} not decodable",
        stats.decoded, stats.skipped, stats.bad
    );
    Ok(())
}
