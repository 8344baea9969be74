use crate::{
    Packet,
    command::{
        RAD_COMMAND, RadioCommand, SDRS_COMMAND, STATUS_READY, STATUS_REQUEST, SatUpdate,
        TextKind, unpack_preset,
    },
    device::{BROADCAST, DeviceTable, RAD, SDRS},
    hex_string, printable,
};

/// Exchanges recognised by their (source, destination, command byte) alone.
const HANDSHAKES: &[(u8, u8, u8, &str)] = &[
    (RAD, BROADCAST, STATUS_READY, "Device status ready Bit2"),
    (RAD, SDRS, STATUS_REQUEST, "Device status request"),
    (SDRS, RAD, STATUS_READY, "Device status ready"),
];

/// Decoder for the command set of one role.
struct RoleDecoder {
    source: u8,
    command: u8,
    /// Gets the payload without the command byte.
    decode: fn(&[u8]) -> Option<Payload>,
}

const ROLE_DECODERS: &[RoleDecoder] = &[
    RoleDecoder {
        source: RAD,
        command: RAD_COMMAND,
        decode: decode_radio_command,
    },
    RoleDecoder {
        source: SDRS,
        command: SDRS_COMMAND,
        decode: decode_sat_record,
    },
];

/// A status or text record sent by the satellite tuner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SatRecord {
    pub update: SatUpdate,
    /// Only set for `SatUpdate::Text`.
    pub text_kind: Option<TextKind>,
    pub channel: u8,
    pub preset_bank: u8,
    pub preset_number: u8,
    pub text: String,
}

impl SatRecord {
    pub fn name(&self) -> &'static str {
        match (self.update, self.text_kind) {
            (SatUpdate::Text { .. }, Some(TextKind::Channel)) => "Chan text update",
            (SatUpdate::Text { .. }, Some(TextKind::Info1)) => "INF1 text update",
            (SatUpdate::Text { .. }, Some(TextKind::Info2)) => "INF2 text update",
            (SatUpdate::Text { .. }, Some(TextKind::Esn)) => "ESN text update",
            (SatUpdate::Text { .. }, _) => "UNKN text update",
            (SatUpdate::StatusUpdate { .. }, _) => "Status update",
            (SatUpdate::Status, _) => "Status",
            (SatUpdate::ChannelDownAck, _) => "Chan DN ACK",
            (SatUpdate::HoldChannelUp, _) => "hold Chan UP update",
            (SatUpdate::HoldChannelDown, _) => "hold Chan DN update",
        }
    }
}

impl std::fmt::Display for SatRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:4} {:>19}: channel {}, preset bank {}, preset num {} | {}",
            if self.update.is_scan() { "[SC]" } else { "" },
            self.name(),
            self.channel,
            self.preset_bank,
            self.preset_number,
            self.text
        )
    }
}

/// What a packet's payload means.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Handshake(&'static str),
    Radio(RadioCommand),
    Sat(SatRecord),
    /// Nothing matched; the printable part of the payload after its command byte.
    Unknown(String),
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Handshake(desc) => f.write_str(desc),
            Self::Radio(command) => f.write_str(command.description()),
            Self::Sat(record) => write!(f, "{record}"),
            Self::Unknown(text) => write!(f, "\"{text}\""),
        }
    }
}

/// Human readable view of one packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Description {
    pub src_name: String,
    pub dst_name: String,
    /// Payload as hex.
    pub raw_payload_text: String,
    /// The byte selecting the command within its set, when there is one.
    pub command_id: Option<u8>,
    pub payload: Payload,
}

impl Description {
    pub fn command_description(&self) -> String {
        self.payload.to_string()
    }
}

impl std::fmt::Display for Description {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let command_id = match self.command_id {
            Some(id) => format!("{id:02X}"),
            None => "??".to_string(),
        };
        write!(
            f,
            "{:<4} --> {:<4}: <{:<77}> [{}] {}",
            self.src_name, self.dst_name, self.raw_payload_text, command_id, self.payload
        )
    }
}

/// Turns packets into [`Description`]s. Never fails: anything unrecognised
/// comes out as [`Payload::Unknown`].
#[derive(Clone, Debug, Default)]
pub struct CommandDecoder {
    devices: DeviceTable,
}

impl CommandDecoder {
    pub fn new(devices: DeviceTable) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    pub fn decode(&self, packet: &Packet) -> Description {
        let (command_id, payload) = parse_payload(packet);
        Description {
            src_name: self.devices.name_or_unknown(packet.source()).to_string(),
            dst_name: self.devices.name_or_unknown(packet.destination()).to_string(),
            raw_payload_text: hex_string(packet.payload()),
            command_id,
            payload,
        }
    }
}

/// Decode a packet's payload, returning the command id alongside it.
pub fn parse_payload(packet: &Packet) -> (Option<u8>, Payload) {
    let Some(command) = packet.command() else {
        return (None, Payload::Unknown(String::new()));
    };
    let data = &packet.payload()[1..];

    let key = (packet.source(), packet.destination(), command);
    if let Some(&(.., desc)) = HANDSHAKES
        .iter()
        .find(|&&(src, dst, cmd, _)| (src, dst, cmd) == key)
    {
        return (None, Payload::Handshake(desc));
    }

    if let Some(role) = ROLE_DECODERS
        .iter()
        .find(|role| role.source == packet.source() && role.command == command)
    {
        let command_id = data.first().copied();
        let payload = (role.decode)(data).unwrap_or_else(|| Payload::Unknown(printable(data)));
        return (command_id, payload);
    }

    (None, Payload::Unknown(printable(data)))
}

fn decode_radio_command(data: &[u8]) -> Option<Payload> {
    RadioCommand::from_bytes(data).map(Payload::Radio)
}

// 3E 01 00 18 12 04 4C 69 74 68 69 75 6D 20 52
//    01                                         -- update kind
//       00                                      -- text kind
//          18                                   -- channel
//             12                                -- preset bank, number
//                04                             -- always 04
//                   4C 69 74 68 69 75 6D 20 52  -- text
fn decode_sat_record(data: &[u8]) -> Option<Payload> {
    let [kind, text_kind, channel, preset, _, text @ ..] = data else {
        return None;
    };
    let update = SatUpdate::from_byte(*kind)?;
    let (preset_bank, preset_number) = unpack_preset(*preset);
    Some(Payload::Sat(SatRecord {
        update,
        text_kind: matches!(update, SatUpdate::Text { .. })
            .then(|| TextKind::from_byte(*text_kind)),
        channel: *channel,
        preset_bank,
        preset_number,
        text: printable(text),
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::build_packet;

    fn packet(src: u8, dst: u8, command: &[u8], text: &str) -> Packet {
        Packet::from_frame(&build_packet(src, dst, command, text).unwrap()).unwrap()
    }

    #[test]
    fn handshakes() {
        let decoder = CommandDecoder::new(DeviceTable::sdrs());
        let desc = decoder.decode(&packet(RAD, SDRS, &[STATUS_REQUEST], ""));
        assert_eq!(desc.payload, Payload::Handshake("Device status request"));
        assert_eq!(desc.src_name, "RAD");
        assert_eq!(desc.dst_name, "SDRS");

        let desc = decoder.decode(&packet(RAD, BROADCAST, &[STATUS_READY, 0x04], ""));
        assert_eq!(desc.command_description(), "Device status ready Bit2");

        let desc = decoder.decode(&packet(SDRS, RAD, &[STATUS_READY, 0x00], ""));
        assert_eq!(desc.command_description(), "Device status ready");
    }

    #[test]
    fn radio_commands() {
        let decoder = CommandDecoder::default();
        let desc = decoder.decode(&packet(RAD, SDRS, &RadioCommand::ChannelUp.to_bytes(), ""));
        assert_eq!(desc.payload, Payload::Radio(RadioCommand::ChannelUp));
        assert_eq!(desc.command_id, Some(0x03));
        assert_eq!(desc.raw_payload_text, "3D 03 00");
        assert_eq!(desc.command_description(), "channel up");
    }

    #[test]
    fn unknown_radio_command_is_dumped() {
        let desc =
            CommandDecoder::default().decode(&packet(RAD, SDRS, &[RAD_COMMAND, 0x15, 0x01], ""));
        assert_eq!(desc.payload, Payload::Unknown("..".to_string()));
        assert_eq!(desc.command_id, Some(0x15));
    }

    #[test]
    fn sat_text_update() {
        // taken from a bus log
        let desc = CommandDecoder::default().decode(&packet(
            SDRS,
            RAD,
            &[SDRS_COMMAND, 0x01, 0x00, 0x18, 0x12, 0x04],
            "Lithium R",
        ));
        let Payload::Sat(record) = &desc.payload else {
            panic!("not a sat record: {:?}", desc.payload);
        };
        assert_eq!(record.update, SatUpdate::Text { scan: false });
        assert_eq!(record.text_kind, Some(TextKind::Channel));
        assert_eq!(record.channel, 24);
        assert_eq!((record.preset_bank, record.preset_number), (1, 2));
        assert_eq!(record.text, "Lithium R");
        assert_eq!(desc.command_id, Some(0x01));
        assert_eq!(
            desc.command_description(),
            "        Chan text update: channel 24, preset bank 1, preset num 2 | Lithium R"
        );
    }

    #[test]
    fn sat_scan_status() {
        let desc = CommandDecoder::default().decode(&packet(
            SDRS,
            RAD,
            &[SDRS_COMMAND, 0x12, 0x00, 0x05, 0x23, 0x04],
            "",
        ));
        let Payload::Sat(record) = &desc.payload else {
            panic!("not a sat record: {:?}", desc.payload);
        };
        assert_eq!(record.update, SatUpdate::StatusUpdate { scan: true });
        assert_eq!(record.text_kind, None);
        assert!(desc.command_description().starts_with("[SC]       Status update"));
    }

    #[test]
    fn truncated_sat_record_is_dumped() {
        let desc =
            CommandDecoder::default().decode(&packet(SDRS, RAD, &[SDRS_COMMAND, 0x02, 0x00], ""));
        assert_eq!(desc.payload, Payload::Unknown("..".to_string()));
    }

    #[test]
    fn other_devices_fall_back() {
        // steering wheel <next> press
        let desc = CommandDecoder::default().decode(&packet(0x50, RAD, &[0x3B, 0x01], ""));
        assert_eq!(desc.payload, Payload::Unknown(".".to_string()));
        assert_eq!(desc.command_id, None);
        assert_eq!(desc.src_name, "MFL Multi Functional Steering Wheel Buttons");
    }

    #[test]
    fn empty_payload() {
        let desc = CommandDecoder::default().decode(&packet(RAD, SDRS, &[], ""));
        assert_eq!(desc.payload, Payload::Unknown(String::new()));
        assert_eq!(desc.raw_payload_text, "");
    }

    #[test]
    fn display_line() {
        let desc = CommandDecoder::new(DeviceTable::sdrs())
            .decode(&packet(RAD, SDRS, &RadioCommand::Sat.to_bytes(), ""));
        let line = desc.to_string();
        assert!(line.starts_with("RAD  --> SDRS: <3D 15 00 "));
        assert!(line.ends_with("> [15] SAT"));
    }
}
