pub mod command;
pub mod device;
pub mod emulator;
pub mod frame_parser;
pub mod payload;
pub mod replay;

use thiserror::Error;

/// Smallest possible frame: source, length, destination, checksum.
pub const MIN_PACKET_LEN: usize = 4;
/// Largest possible frame: the length byte counts up to 255 bytes after itself.
pub const MAX_PACKET_LEN: usize = u8::MAX as usize + 2;

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ *b)
}

/// One checksum-validated frame off the bus.
///
/// Wire layout:
/// - Source device
/// - Length - number of bytes following this one, checksum included
/// - Destination device
/// - `length - 2` bytes of payload (first one being the command byte)
/// - Checksum - XOR of every preceding byte
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    raw: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("A packet has at least {MIN_PACKET_LEN} bytes, got {len}")]
    TooShort { len: usize },
    #[error("The length field is zero")]
    ZeroLength,
    #[error("Length field says {declared} bytes follow it, but {actual} do")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("checksum failed, got: 0x{got:02x}, expected: 0x{expected:02x}")]
    ChecksumMismatch { got: u8, expected: u8 },
}

impl Packet {
    /// Validate a complete frame and wrap it.
    pub fn from_frame(bytes: &[u8]) -> std::result::Result<Self, PacketError> {
        if bytes.len() < MIN_PACKET_LEN {
            return Err(PacketError::TooShort { len: bytes.len() });
        }
        let declared = bytes[1] as usize;
        if declared == 0 {
            return Err(PacketError::ZeroLength);
        }
        if declared + 2 != bytes.len() {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: bytes.len() - 2,
            });
        }
        let (body, tail) = bytes.split_at(bytes.len() - 1);
        let expected = checksum(body);
        if tail[0] != expected {
            return Err(PacketError::ChecksumMismatch {
                got: tail[0],
                expected,
            });
        }
        Ok(Self {
            raw: bytes.to_vec(),
        })
    }

    pub fn source(&self) -> u8 {
        self.raw[0]
    }

    pub fn length(&self) -> u8 {
        self.raw[1]
    }

    pub fn destination(&self) -> u8 {
        self.raw[2]
    }

    /// Everything between the destination and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.raw[3..self.raw.len() - 1]
    }

    /// First payload byte, if the payload is not empty.
    pub fn command(&self) -> Option<u8> {
        self.payload().first().copied()
    }

    pub fn checksum(&self) -> u8 {
        self.raw[self.raw.len() - 1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Packet[{}]", hex_string(&self.raw))
    }
}

/// Render bytes as space separated upper case hex pairs.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render bytes as text, replacing anything unprintable with `.`.
pub fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_status_request() {
        // RAD -> SDRS device status request
        let packet = Packet::from_frame(&[0x68, 0x03, 0x73, 0x01, 0x19]).unwrap();
        assert_eq!(packet.source(), 0x68);
        assert_eq!(packet.length(), 3);
        assert_eq!(packet.destination(), 0x73);
        assert_eq!(packet.payload(), [0x01]);
        assert_eq!(packet.command(), Some(0x01));
        assert_eq!(packet.checksum(), 0x19);
    }

    #[test]
    fn checksum_covers_every_byte_before_it() {
        let packet = Packet::from_frame(&[0x68, 0x05, 0x73, 0x3D, 0x00, 0x00, 0x23]).unwrap();
        let body = &packet.as_bytes()[..packet.as_bytes().len() - 1];
        assert_eq!(checksum(body), packet.checksum());
    }

    #[test]
    fn rejects_bad_frames() {
        assert_eq!(
            Packet::from_frame(&[0x68, 0x03, 0x73]),
            Err(PacketError::TooShort { len: 3 })
        );
        assert_eq!(
            Packet::from_frame(&[0x68, 0x00, 0x73, 0x1B]),
            Err(PacketError::ZeroLength)
        );
        assert_eq!(
            Packet::from_frame(&[0x68, 0x04, 0x73, 0x01, 0x19]),
            Err(PacketError::LengthMismatch {
                declared: 4,
                actual: 3
            })
        );
        assert_eq!(
            Packet::from_frame(&[0x68, 0x03, 0x73, 0x01, 0x18]),
            Err(PacketError::ChecksumMismatch {
                got: 0x18,
                expected: 0x19
            })
        );
    }

    #[test]
    fn printable_masks_control_bytes() {
        assert_eq!(printable(b"Li\x00th\xffium "), "Li.th.ium ");
        assert_eq!(hex_string(&[0x3e, 0x02, 0x00]), "3E 02 00");
    }
}
