use log::{debug, trace};

use crate::{Packet, PacketError, device::DeviceTable};

/// Recovers packets from a raw bus byte stream.
///
/// Bytes may arrive in arbitrary chunks and contain noise. Whenever the head of the
/// buffer cannot start a valid packet, exactly one byte is dropped and scanning
/// starts over, so every step either extracts a packet, drops a byte or waits.
pub struct FrameParser {
    devices: DeviceTable,
    buf: Vec<u8>,
}

/// Why a byte was thrown away while resynchronizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The byte after it, read as a length, was zero.
    ZeroLength,
    /// Not a device code from the device table.
    ///
    /// This is a heuristic: a real but unlisted device is dropped the same way
    /// as a corrupted source byte. Add such devices to the table.
    UnknownSource,
    /// The frame starting here failed its checksum.
    ChecksumMismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DroppedByte {
    pub byte: u8,
    pub reason: DropReason,
}

/// One step of the resynchronization state machine.
#[derive(Debug, PartialEq, Eq)]
pub enum FramerStep {
    /// The buffer holds no complete packet yet. Feed more bytes.
    AwaitingBytes,
    /// A packet was removed from the front of the buffer.
    ExtractedPacket(Packet),
    /// The front byte was dropped.
    Resyncing(DroppedByte),
}

/// Everything a call to [`FrameParser::feed`] produced, in stream order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedOutcome {
    pub packets: Vec<Packet>,
    pub dropped: Vec<DroppedByte>,
}

impl FrameParser {
    pub fn new(devices: DeviceTable) -> Self {
        Self {
            devices,
            buf: Vec::new(),
        }
    }

    /// Queue `bytes` and extract as many packets as possible.
    pub fn feed(&mut self, bytes: &[u8]) -> FeedOutcome {
        self.buf.extend_from_slice(bytes);
        let mut outcome = FeedOutcome::default();
        loop {
            match self.step() {
                FramerStep::AwaitingBytes => break,
                FramerStep::ExtractedPacket(packet) => outcome.packets.push(packet),
                FramerStep::Resyncing(dropped) => outcome.dropped.push(dropped),
            }
        }
        outcome
    }

    /// Advance the state machine by one transition on the buffered bytes.
    pub fn step(&mut self) -> FramerStep {
        if self.buf.len() < 2 {
            return FramerStep::AwaitingBytes;
        }
        let len = self.buf[1] as usize;
        if len == 0 {
            return self.drop_front(DropReason::ZeroLength);
        }
        if !self.devices.contains(self.buf[0]) {
            return self.drop_front(DropReason::UnknownSource);
        }
        if self.buf.len() < len + 2 {
            trace!("have {} of {} bytes", self.buf.len(), len + 2);
            return FramerStep::AwaitingBytes;
        }
        match Packet::from_frame(&self.buf[..len + 2]) {
            Ok(packet) => {
                self.buf.drain(..len + 2);
                debug!("framed {packet:?}");
                FramerStep::ExtractedPacket(packet)
            }
            Err(PacketError::ChecksumMismatch { got, expected }) => {
                trace!("checksum mismatch, got: 0x{got:02x}, expected: 0x{expected:02x}");
                self.drop_front(DropReason::ChecksumMismatch)
            }
            // The slice length always matches the length byte, so this is
            // unreachable; resync anyway rather than stall.
            Err(err) => {
                debug!("unexpected framing error: {err}");
                self.drop_front(DropReason::ChecksumMismatch)
            }
        }
    }

    fn drop_front(&mut self, reason: DropReason) -> FramerStep {
        let byte = self.buf.remove(0);
        trace!("dropping 0x{byte:02x}: {reason:?}");
        FramerStep::Resyncing(DroppedByte { byte, reason })
    }

    /// Bytes received but not yet framed or dropped.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(DeviceTable::default())
    }
}
