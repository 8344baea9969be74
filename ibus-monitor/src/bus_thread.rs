use std::time::Duration;

use anyhow::Context;
use futures::pin_mut;
use ibus::{
    device::DeviceTable,
    emulator::{Emulator, Response, TunerState},
    frame_parser::{DropReason, FrameParser},
    hex_string,
    payload::CommandDecoder,
};
use log::{debug, info, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    time::{Instant, interval_at},
};

pub enum Mode {
    /// Only listen.
    Watch,
    /// Answer commands addressed to the satellite tuner.
    Emulate {
        tuner: TunerState,
        announce_interval: Option<Duration>,
    },
}

pub struct BusOptions {
    pub devices: DeviceTable,
    pub read_timeout: Duration,
    pub mode: Mode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    pub packets: usize,
    pub dropped: usize,
    pub replies: usize,
    pub unhandled: usize,
}

/// Run the poll loop until `stop_rx` fires or the stream ends.
/// A closed stop channel is not a stop signal.
///
/// Every packet is printed to stdout. Only transport errors end the loop early.
pub async fn run_bus(
    stream: impl AsyncRead + AsyncWrite,
    options: BusOptions,
    mut stop_rx: mpsc::Receiver<()>,
) -> anyhow::Result<BusStats> {
    let mut frame_parser = FrameParser::new(options.devices.clone());
    let decoder = CommandDecoder::new(options.devices);
    let (mut emulator, announce_interval) = match options.mode {
        Mode::Watch => (None, None),
        Mode::Emulate {
            tuner,
            announce_interval,
        } => (Some(Emulator::new(tuner)), announce_interval),
    };
    let mut announce_timer =
        announce_interval.map(|period| interval_at(Instant::now() + period, period));
    let mut stats = BusStats::default();
    let mut buffer = [0u8; 64];
    pin_mut!(stream);

    if let Some(emulator) = &emulator {
        info!("sending sat radio announce");
        let announce = emulator.announce()?;
        stream
            .write_all(&announce)
            .await
            .context("writing announce to the bus")?;
    }

    loop {
        tokio::select! {
            Some(()) = stop_rx.recv() => {
                debug!("bus loop received stop");
                break;
            }

            Some(_) = async { Some(announce_timer.as_mut()?.tick().await) }, if announce_timer.is_some() => {
                if let Some(emulator) = &emulator {
                    debug!("sending sat radio announce");
                    stream
                        .write_all(&emulator.announce()?)
                        .await
                        .context("writing announce to the bus")?;
                }
            }

            read = tokio::time::timeout(options.read_timeout, stream.read(&mut buffer)) => {
                let n = match read {
                    Err(_) => {
                        if !frame_parser.pending().is_empty() {
                            trace!("read timed out, waiting on: {}", hex_string(frame_parser.pending()));
                        }
                        continue;
                    }
                    Ok(read) => read.context("reading from the bus")?,
                };
                if n == 0 {
                    debug!("bus stream closed");
                    break;
                }

                let outcome = frame_parser.feed(&buffer[..n]);
                if !outcome.dropped.is_empty() {
                    stats.dropped += outcome.dropped.len();
                    let bytes: Vec<u8> = outcome.dropped.iter().map(|d| d.byte).collect();
                    let bad_checksums = outcome
                        .dropped
                        .iter()
                        .filter(|d| d.reason == DropReason::ChecksumMismatch)
                        .count();
                    warn!(
                        "dropped data ({} failed checksums): {}",
                        bad_checksums,
                        hex_string(&bytes)
                    );
                }

                for packet in outcome.packets {
                    stats.packets += 1;
                    let description = decoder.decode(&packet);
                    println!(
                        "{:02x} [{:<10}] -> {:02x} [{:<10}]: {} | {}",
                        packet.source(),
                        description.src_name,
                        packet.destination(),
                        description.dst_name,
                        hex_string(packet.as_bytes()),
                        description.payload
                    );

                    let Some(emulator) = emulator.as_mut() else {
                        continue;
                    };
                    match emulator.handle(&packet)? {
                        Response::Reply { inbound, packet: reply } => {
                            debug!("responding to {inbound:?}: {}", hex_string(&reply));
                            stream
                                .write_all(&reply)
                                .await
                                .context("writing reply to the bus")?;
                            stats.replies += 1;
                        }
                        Response::Unhandled { .. } => stats.unhandled += 1,
                        Response::Ignored => {}
                    }
                }
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use ibus::command::{RadioCommand, build_packet};
    use ibus::device::{RAD, SDRS};

    fn options(mode: Mode) -> BusOptions {
        BusOptions {
            devices: DeviceTable::ibus(),
            read_timeout: Duration::from_millis(50),
            mode,
        }
    }

    fn emulate() -> Mode {
        Mode::Emulate {
            tuner: TunerState::default(),
            announce_interval: None,
        }
    }

    #[tokio::test]
    async fn watch_counts_packets_and_noise() {
        let (mut client, server) = tokio::io::duplex(256);
        let (_stop_tx, stop_rx) = mpsc::channel(1);
        let bus = tokio::spawn(run_bus(server, options(Mode::Watch), stop_rx));

        client.write_all(&[0x01, 0x02]).await.unwrap();
        client
            .write_all(&[0x68, 0x03, 0x73, 0x01, 0x19])
            .await
            .unwrap();
        drop(client);

        let stats = bus.await.unwrap().unwrap();
        assert_eq!(
            stats,
            BusStats {
                packets: 1,
                dropped: 2,
                replies: 0,
                unhandled: 0
            }
        );
    }

    #[tokio::test]
    async fn emulator_announces_and_answers() {
        let (mut client, server) = tokio::io::duplex(256);
        let (_stop_tx, stop_rx) = mpsc::channel(1);
        let bus = tokio::spawn(run_bus(server, options(emulate()), stop_rx));

        let mut announce = [0u8; 6];
        client.read_exact(&mut announce).await.unwrap();
        assert_eq!(announce, [0x73, 0x04, 0xFF, 0x02, 0x01, 0x8B]);

        let up = build_packet(RAD, SDRS, &RadioCommand::ChannelUp.to_bytes(), "").unwrap();
        client.write_all(&up).await.unwrap();
        let mut reply = [0u8; 18];
        client.read_exact(&mut reply).await.unwrap();
        let mut frame_parser = FrameParser::default();
        let outcome = frame_parser.feed(&reply);
        assert_eq!(outcome.packets.len(), 1);
        assert_eq!(outcome.packets[0].payload()[3], 2);

        // preset recall has no answer
        let recall =
            build_packet(RAD, SDRS, &RadioCommand::RecallPreset(2).to_bytes(), "").unwrap();
        client.write_all(&recall).await.unwrap();
        drop(client);

        let stats = bus.await.unwrap().unwrap();
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.replies, 1);
        assert_eq!(stats.unhandled, 1);
    }

    #[tokio::test]
    async fn stop_signal_ends_the_loop() {
        let (_client, server) = tokio::io::duplex(256);
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let bus = tokio::spawn(run_bus(server, options(Mode::Watch), stop_rx));
        stop_tx.send(()).await.unwrap();
        assert_eq!(bus.await.unwrap().unwrap(), BusStats::default());
    }
}
