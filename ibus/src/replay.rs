//! Decoding of recorded bus logs.
//!
//! Each line holds one already framed packet:
//!
//! ```text
//! 2010-10-14 21:04:11.532144  68 05 73 3D 03 00 20
//! ```
//!
//! Lines whose first token after the timestamp is `!` are annotations and are skipped.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::{
    Packet, PacketError,
    payload::{CommandDecoder, Description},
};

/// `YYYY-MM-DD HH:MM:SS.ffffff`
pub const TIMESTAMP_LEN: usize = 26;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const COMMENT: &str = "!";

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("line is too short to start with a timestamp")]
    MissingTimestamp,
    #[error("bad timestamp {timestamp:?}: {source}")]
    BadTimestamp {
        timestamp: String,
        source: chrono::ParseError,
    },
    #[error("{token:?} is not a hex byte")]
    BadToken { token: String },
    #[error("invalid packet: {0}")]
    Packet(#[from] PacketError),
}

/// One decoded log line.
#[derive(Debug)]
pub struct ReplayRecord {
    pub timestamp: NaiveDateTime,
    /// Milliseconds since the previous decoded line, 0 for the first one.
    pub delta_ms: i64,
    pub packet: Packet,
    pub description: Description,
}

impl std::fmt::Display for ReplayRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:5}ms:  {}", self.delta_ms, self.description)
    }
}

/// Decodes log lines in order, keeping track of time between them.
pub struct Replayer {
    decoder: CommandDecoder,
    last_timestamp: Option<NaiveDateTime>,
}

impl Replayer {
    pub fn new(decoder: CommandDecoder) -> Self {
        Self {
            decoder,
            last_timestamp: None,
        }
    }

    /// Decode one line. Blank and annotation lines give `Ok(None)`.
    ///
    /// A line that fails does not move the reference point for the next delta.
    pub fn process(
        &mut self,
        line: &str,
    ) -> std::result::Result<Option<ReplayRecord>, ReplayError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some((timestamp, rest)) = line
            .get(..TIMESTAMP_LEN)
            .zip(line.get(TIMESTAMP_LEN..))
        else {
            return Err(ReplayError::MissingTimestamp);
        };
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(
            |source| ReplayError::BadTimestamp {
                timestamp: timestamp.to_string(),
                source,
            },
        )?;

        let mut tokens = rest.split_whitespace().peekable();
        if tokens.peek() == Some(&COMMENT) {
            return Ok(None);
        }
        let bytes = tokens
            .map(|token| {
                u8::from_str_radix(token, 16).map_err(|_| ReplayError::BadToken {
                    token: token.to_string(),
                })
            })
            .collect::<std::result::Result<Vec<u8>, _>>()?;
        let packet = Packet::from_frame(&bytes)?;

        let delta_ms = self
            .last_timestamp
            .map_or(0, |last| (timestamp - last).num_milliseconds());
        self.last_timestamp = Some(timestamp);
        let description = self.decoder.decode(&packet);
        Ok(Some(ReplayRecord {
            timestamp,
            delta_ms,
            packet,
            description,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{command::RadioCommand, device::DeviceTable, payload::Payload};

    fn replayer() -> Replayer {
        Replayer::new(CommandDecoder::new(DeviceTable::sdrs()))
    }

    #[test]
    fn deltas_between_lines() {
        let mut replayer = replayer();
        let first = replayer
            .process("2010-10-14 21:04:11.532144  68 03 73 01 19")
            .unwrap()
            .unwrap();
        assert_eq!(first.delta_ms, 0);
        assert_eq!(first.description.payload, Payload::Handshake("Device status request"));

        let second = replayer
            .process("2010-10-14 21:04:12.782644  68 05 73 3D 03 00 20\n")
            .unwrap()
            .unwrap();
        assert_eq!(second.delta_ms, 1250);
        assert_eq!(second.description.payload, Payload::Radio(RadioCommand::ChannelUp));
        assert!(second.to_string().starts_with(" 1250ms:  RAD  --> SDRS: <3D 03 00"));
    }

    #[test]
    fn annotations_and_blank_lines_are_skipped() {
        let mut replayer = replayer();
        assert!(replayer.process("2010-10-14 21:04:11.532144  ! pressed SAT").unwrap().is_none());
        assert!(replayer.process("   ").unwrap().is_none());
        let record = replayer
            .process("2010-10-14 21:04:13.000000  68 05 73 3D 15 00 36")
            .unwrap()
            .unwrap();
        assert_eq!(record.delta_ms, 0);
    }

    #[test]
    fn bad_lines_do_not_move_the_clock() {
        let mut replayer = replayer();
        replayer
            .process("2010-10-14 21:04:11.000000  68 03 73 01 19")
            .unwrap();
        assert!(matches!(
            replayer.process("2010-10-14 21:04:11.500000  68 03 73 01 18"),
            Err(ReplayError::Packet(PacketError::ChecksumMismatch { .. }))
        ));
        assert!(matches!(
            replayer.process("2010-10-14 21:04:11.600000  68 03 73 0G 19"),
            Err(ReplayError::BadToken { .. })
        ));
        assert!(matches!(
            replayer.process("yesterday at noon, roughly  68 03 73 01 19"),
            Err(ReplayError::BadTimestamp { .. })
        ));
        assert!(matches!(
            replayer.process("2010-10-14"),
            Err(ReplayError::MissingTimestamp)
        ));
        let record = replayer
            .process("2010-10-14 21:04:12.000000  68 03 73 01 19")
            .unwrap()
            .unwrap();
        assert_eq!(record.delta_ms, 1000);
    }
}
