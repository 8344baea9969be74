use log::{debug, warn};

use crate::{
    Packet,
    command::{
        EncodeError, RadioCommand, SDRS_COMMAND, STATUS_READY, STATUS_REQUEST, SatUpdate,
        build_packet, pack_preset,
    },
    device::{BROADCAST, RAD, SDRS},
};

/// Text sent along with the answer to the SAT button.
pub const SAT_TEXT: &str = "What??";
/// Blank text sent with channel changes and explicit status requests.
pub const BLANK_TEXT: &str = "        ";

/// Tuning state of the emulated satellite tuner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunerState {
    /// Not bounded: the radio decides which channels exist, and it is unknown
    /// whether real tuners wrap. Only the low byte goes on the wire.
    pub channel: i32,
    pub band: u8,
    pub preset: u8,
}

impl Default for TunerState {
    fn default() -> Self {
        Self {
            channel: 1,
            band: 1,
            preset: 1,
        }
    }
}

/// What an inbound packet asked the emulated tuner to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    Poll,
    Radio(RadioCommand),
}

impl Inbound {
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [STATUS_REQUEST] => Some(Self::Poll),
            _ => RadioCommand::from_payload(payload).map(Self::Radio),
        }
    }
}

/// Result of handing a packet to the [`Emulator`].
#[derive(Debug, PartialEq, Eq)]
pub enum Response {
    /// Not addressed to the tuner.
    Ignored,
    /// Addressed to the tuner, but it has no answer for it.
    Unhandled { payload: Vec<u8> },
    /// Write `packet` to the bus.
    Reply { inbound: Inbound, packet: Vec<u8> },
}

/// Impersonates the satellite tuner (SDRS) on the bus.
pub struct Emulator {
    state: TunerState,
}

impl Emulator {
    pub fn new(state: TunerState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    /// The unsolicited "status ready" broadcast a tuner sends when it comes up.
    pub fn announce(&self) -> std::result::Result<Vec<u8>, EncodeError> {
        build_packet(SDRS, BROADCAST, &[STATUS_READY, 0x01], "")
    }

    pub fn handle(&mut self, packet: &Packet) -> std::result::Result<Response, EncodeError> {
        if packet.destination() != SDRS {
            return Ok(Response::Ignored);
        }
        let Some(inbound) = Inbound::from_payload(packet.payload()) else {
            warn!("unhandled satrad command {packet:?}");
            return Ok(Response::Unhandled {
                payload: packet.payload().to_vec(),
            });
        };
        let reply = match inbound {
            Inbound::Poll => {
                debug!("responding to poll");
                build_packet(SDRS, BROADCAST, &[STATUS_READY, 0x00], "")?
            }
            Inbound::Radio(command) => match self.respond(command)? {
                Some(reply) => reply,
                None => {
                    warn!("unhandled satrad command {}", command.alias());
                    return Ok(Response::Unhandled {
                        payload: packet.payload().to_vec(),
                    });
                }
            },
        };
        Ok(Response::Reply {
            inbound,
            packet: reply,
        })
    }

    fn respond(
        &mut self,
        command: RadioCommand,
    ) -> std::result::Result<Option<Vec<u8>>, EncodeError> {
        let (update, text) = match command {
            RadioCommand::Power | RadioCommand::Mode => (SatUpdate::Status, ""),
            RadioCommand::Now => (SatUpdate::StatusUpdate { scan: false }, BLANK_TEXT),
            RadioCommand::ChannelUp => {
                self.state.channel = self.state.channel.wrapping_add(1);
                (SatUpdate::StatusUpdate { scan: false }, BLANK_TEXT)
            }
            RadioCommand::ChannelDown => {
                self.state.channel = self.state.channel.wrapping_sub(1);
                (SatUpdate::StatusUpdate { scan: false }, BLANK_TEXT)
            }
            RadioCommand::Sat => (SatUpdate::Text { scan: false }, SAT_TEXT),
            _ => return Ok(None),
        };
        debug!("responding to {} with {:?}", command.alias(), self.state);
        self.status(update, text).map(Some)
    }

    /// A status record for the current tuning state.
    pub fn status(
        &self,
        update: SatUpdate,
        text: &str,
    ) -> std::result::Result<Vec<u8>, EncodeError> {
        let command = [
            SDRS_COMMAND,
            update.to_byte(),
            0x00,
            self.state.channel as u8,
            pack_preset(self.state.band, self.state.preset),
            0x04,
        ];
        build_packet(SDRS, RAD, &command, text)
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(TunerState::default())
    }
}
