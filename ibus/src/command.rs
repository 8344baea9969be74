use thiserror::Error;

use crate::{MAX_PACKET_LEN, checksum};

/// Device status request, sent by the radio to poll a device.
pub const STATUS_REQUEST: u8 = 0x01;
/// Device status ready, the answer to a poll or an unsolicited announce.
pub const STATUS_READY: u8 = 0x02;
/// Command byte of every radio -> satellite tuner command.
pub const RAD_COMMAND: u8 = 0x3D;
/// Command byte of every satellite tuner -> radio status/text record.
pub const SDRS_COMMAND: u8 = 0x3E;

/// What the radio asks the satellite tuner to do.
///
/// Always sent as `RAD_COMMAND` followed by two bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioCommand {
    Power,
    Mode,
    Now,
    ChannelUp,
    ChannelDown,
    HoldChannelUp,
    HoldChannelDown,
    HoldM,
    RecallPreset(u8),
    SetPreset(u8),
    M,
    Info1,
    Info2,
    HoldSat,
    Sat,
}

struct RadioCommandEntry {
    bytes: [u8; 2],
    command: RadioCommand,
    alias: &'static str,
    description: &'static str,
}

macro_rules! radio_commands {
    ($([$a:literal, $b:literal] => $command:expr, $alias:literal, $description:literal;)*) => {
        &[$(RadioCommandEntry {
            bytes: [$a, $b],
            command: $command,
            alias: $alias,
            description: $description,
        }),*]
    };
}

const RADIO_COMMANDS: &[RadioCommandEntry] = radio_commands! {
    [0x00, 0x00] => RadioCommand::Power, "sPower", "power";
    [0x01, 0x00] => RadioCommand::Mode, "sMode", "turn off, or mode (deactivate?)";
    [0x02, 0x00] => RadioCommand::Now, "sNow", "Request status update ('now')";
    [0x03, 0x00] => RadioCommand::ChannelUp, "sUp", "channel up";
    [0x04, 0x00] => RadioCommand::ChannelDown, "sDown", "channel down";
    [0x05, 0x00] => RadioCommand::HoldChannelUp, "sUpH", "hold channel up";
    [0x06, 0x00] => RadioCommand::HoldChannelDown, "sDownH", "hold channel down";
    [0x07, 0x00] => RadioCommand::HoldM, "sMH", "hold \"M\"";
    [0x08, 0x01] => RadioCommand::RecallPreset(1), "sPre1", "recall preset 1";
    [0x08, 0x02] => RadioCommand::RecallPreset(2), "sPre2", "recall preset 2";
    [0x08, 0x03] => RadioCommand::RecallPreset(3), "sPre3", "recall preset 3";
    [0x08, 0x04] => RadioCommand::RecallPreset(4), "sPre4", "recall preset 4";
    [0x08, 0x05] => RadioCommand::RecallPreset(5), "sPre5", "recall preset 5";
    [0x08, 0x06] => RadioCommand::RecallPreset(6), "sPre6", "recall preset 6";
    [0x09, 0x01] => RadioCommand::SetPreset(1), "sPreH1", "set preset 1";
    [0x09, 0x02] => RadioCommand::SetPreset(2), "sPreH2", "set preset 2";
    [0x09, 0x03] => RadioCommand::SetPreset(3), "sPreH3", "set preset 3";
    [0x09, 0x04] => RadioCommand::SetPreset(4), "sPreH4", "set preset 4";
    [0x09, 0x05] => RadioCommand::SetPreset(5), "sPreH5", "set preset 5";
    [0x09, 0x06] => RadioCommand::SetPreset(6), "sPreH6", "set preset 6";
    [0x0D, 0x00] => RadioCommand::M, "sM", "\"M\"";
    [0x0E, 0x00] => RadioCommand::Info1, "sInf1", "inf, 1st press (artist)";
    [0x0F, 0x00] => RadioCommand::Info2, "sInf2", "inf, 2nd press (song)";
    [0x14, 0x00] => RadioCommand::HoldSat, "sSat2", "hold SAT (ESN request)";
    [0x15, 0x00] => RadioCommand::Sat, "sSat", "SAT";
};

impl RadioCommand {
    /// Look up the two bytes following `RAD_COMMAND`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::entry_for_bytes(bytes).map(|entry| entry.command)
    }

    /// Look up a whole payload, `RAD_COMMAND` included.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [RAD_COMMAND, rest @ ..] => Self::from_bytes(rest),
            _ => None,
        }
    }

    fn entry_for_bytes(bytes: &[u8]) -> Option<&'static RadioCommandEntry> {
        RADIO_COMMANDS.iter().find(|entry| entry.bytes == bytes)
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        let [a, b] = match self {
            Self::Power => [0x00, 0x00],
            Self::Mode => [0x01, 0x00],
            Self::Now => [0x02, 0x00],
            Self::ChannelUp => [0x03, 0x00],
            Self::ChannelDown => [0x04, 0x00],
            Self::HoldChannelUp => [0x05, 0x00],
            Self::HoldChannelDown => [0x06, 0x00],
            Self::HoldM => [0x07, 0x00],
            Self::RecallPreset(n) => [0x08, *n],
            Self::SetPreset(n) => [0x09, *n],
            Self::M => [0x0D, 0x00],
            Self::Info1 => [0x0E, 0x00],
            Self::Info2 => [0x0F, 0x00],
            Self::HoldSat => [0x14, 0x00],
            Self::Sat => [0x15, 0x00],
        };
        [RAD_COMMAND, a, b]
    }

    /// Short name used in logs.
    pub fn alias(&self) -> &'static str {
        Self::entry_for_bytes(&self.to_bytes()[1..]).map_or("s?", |entry| entry.alias)
    }

    pub fn description(&self) -> &'static str {
        Self::entry_for_bytes(&self.to_bytes()[1..])
            .map_or("<unknown>", |entry| entry.description)
    }
}

/// Kind of a satellite tuner status/text record, the byte after `SDRS_COMMAND`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatUpdate {
    /// Sent in answer to power and mode; has no name on the radio side.
    Status,
    Text { scan: bool },
    StatusUpdate { scan: bool },
    ChannelDownAck,
    HoldChannelUp,
    HoldChannelDown,
}

impl SatUpdate {
    const SCAN: u8 = 0x10;

    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::Status,
            0x01 | 0x11 => Self::Text {
                scan: byte & Self::SCAN != 0,
            },
            0x02 | 0x12 => Self::StatusUpdate {
                scan: byte & Self::SCAN != 0,
            },
            0x03 => Self::ChannelDownAck,
            0x04 => Self::HoldChannelUp,
            0x05 => Self::HoldChannelDown,
            _ => return None,
        })
    }

    pub fn to_byte(&self) -> u8 {
        match self {
            Self::Status => 0x00,
            Self::Text { scan } => 0x01 | if *scan { Self::SCAN } else { 0 },
            Self::StatusUpdate { scan } => 0x02 | if *scan { Self::SCAN } else { 0 },
            Self::ChannelDownAck => 0x03,
            Self::HoldChannelUp => 0x04,
            Self::HoldChannelDown => 0x05,
        }
    }

    pub fn is_scan(&self) -> bool {
        matches!(
            self,
            Self::Text { scan: true } | Self::StatusUpdate { scan: true }
        )
    }
}

/// Which text a `SatUpdate::Text` record carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextKind {
    Channel,
    Info1,
    Info2,
    Esn,
    Unknown(u8),
}

impl TextKind {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Channel,
            0x06 => Self::Info1,
            0x07 => Self::Info2,
            0x0C => Self::Esn,
            other => Self::Unknown(other),
        }
    }

    pub fn to_byte(&self) -> u8 {
        match self {
            Self::Channel => 0x00,
            Self::Info1 => 0x06,
            Self::Info2 => 0x07,
            Self::Esn => 0x0C,
            Self::Unknown(byte) => *byte,
        }
    }
}

/// Pack a preset bank and number into one byte, bank in the high nibble.
pub fn pack_preset(bank: u8, number: u8) -> u8 {
    ((bank & 0x0F) << 4) | (number & 0x0F)
}

/// Split a packed preset byte into (bank, number).
pub fn unpack_preset(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0F)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{len} payload bytes do not fit in a packet (at most {max})")]
    PayloadTooLong { len: usize, max: usize },
}

/// Build a packet ready to be written to the bus.
///
/// `text` is appended verbatim after `command`; the length and checksum bytes are
/// computed here.
pub fn build_packet(
    source: u8,
    destination: u8,
    command: &[u8],
    text: &str,
) -> std::result::Result<Vec<u8>, EncodeError> {
    let payload_len = command.len() + text.len();
    // destination and checksum are counted by the length byte too
    let len = payload_len + 2;
    if len > u8::MAX as usize {
        return Err(EncodeError::PayloadTooLong {
            len: payload_len,
            max: MAX_PACKET_LEN - 4,
        });
    }
    let mut buf = Vec::with_capacity(len + 2);
    buf.push(source);
    buf.push(len as u8);
    buf.push(destination);
    buf.extend_from_slice(command);
    buf.extend_from_slice(text.as_bytes());
    buf.push(checksum(&buf));
    Ok(buf)
}
