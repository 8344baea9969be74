use std::io::{BufRead, Write};

use anyhow::Context;
use ibus::replay::Replayer;
use log::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub decoded: usize,
    pub skipped: usize,
    pub bad: usize,
}

/// Decode every line of `input` into `output`.
///
/// Lines that cannot be decoded are reported and copied through unchanged.
pub fn replay(
    input: impl BufRead,
    mut output: impl Write,
    mut replayer: Replayer,
) -> anyhow::Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("reading log")?;
        match replayer.process(&line) {
            Ok(Some(record)) => {
                stats.decoded += 1;
                writeln!(output, "{record}")?;
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                stats.bad += 1;
                warn!("line {}: {e}", idx + 1);
                writeln!(output, "{line}")?;
            }
        }
    }
    output.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use ibus::{device::DeviceTable, payload::CommandDecoder};

    const LOG: &str = "\
2010-10-14 21:04:11.532144  68 03 73 01 19
2010-10-14 21:04:11.552144  ! radio powered on
2010-10-14 21:04:11.600144  73 04 68 02 00 1D
garbage
2010-10-14 21:04:12.600144  68 05 73 3D 03 00 20
";

    #[test]
    fn decodes_a_log() {
        let mut output = Vec::new();
        let replayer = Replayer::new(CommandDecoder::new(DeviceTable::sdrs()));
        let stats = replay(LOG.as_bytes(), &mut output, replayer).unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                decoded: 3,
                skipped: 1,
                bad: 1
            }
        );

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("    0ms:  RAD  --> SDRS"));
        assert!(lines[0].ends_with("Device status request"));
        assert!(lines[1].starts_with("   68ms:  SDRS --> RAD "));
        assert!(lines[1].ends_with("Device status ready"));
        assert_eq!(lines[2], "garbage");
        assert!(lines[3].starts_with(" 1000ms:"));
        assert!(lines[3].ends_with("channel up"));
    }
}
