use std::collections::BTreeMap;

/// CD changer.
pub const CDC: u8 = 0x18;
/// Radio head unit.
pub const RAD: u8 = 0x68;
/// Satellite radio tuner (SDRS).
pub const SDRS: u8 = 0x73;
pub const BROADCAST: u8 = 0xFF;

// Sources:
// http://ibus.stuge.se/IBus_Devices
// http://www.alextronic.de/bmw/projects_bmw_info_ibus.html
const IBUS_DEVICES: &[(u8, &str)] = &[
    (0x00, "Broadcast"),
    (CDC, "CDW - CDC CD-Player"),
    (0x30, "SES (voice)"),
    (0x3B, "NAV/GT Navigation/Videomodule"),
    (0x3F, "DIS (ext. diagnostic system)"),
    (0x43, "MenuScreen"),
    (0x44, "?????"),
    (0x50, "MFL Multi Functional Steering Wheel Buttons"),
    (0x5B, "IHK Integrated heating, A/C"),
    (0x60, "PDC Park Distance Control"),
    (RAD, "RAD Radio"),
    (0x6A, "DSP Digital Sound Processor"),
    (SDRS, "SDRS"),
    (0x7F, "GPS"),
    (0x80, "IKE Instrument Kombi Electronics"),
    (0xA4, "ABM Airbag"),
    (0xBB, "TV Module"),
    (0xBF, "GLO global broadcast"),
    (0xC0, "MID Multi-Information Display Buttons"),
    (0xC8, "TEL Telephone"),
    (0xD0, "Navigation Location/Data"),
    (0xE7, "OBC TextBar"),
    (0xED, "Lights, Wipers, Seat Memory"),
    (0xF0, "BMB Board Monitor Buttons"),
    (BROADCAST, "Broadcast"),
];

/// Short tags for the devices the satellite radio conversation involves.
const SHORT_NAMES: &[(u8, &str)] = &[(RAD, "RAD"), (SDRS, "SDRS"), (BROADCAST, "BCST")];

/// Maps a device code to a human readable name.
///
/// The framer also uses it to decide whether a leading byte can start a packet,
/// so a device missing from the table will never be framed.
#[derive(Clone, Debug)]
pub struct DeviceTable {
    names: BTreeMap<u8, String>,
}

impl DeviceTable {
    pub fn empty() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Every device code known to appear on the bus.
    pub fn ibus() -> Self {
        IBUS_DEVICES.iter().copied().collect()
    }

    /// The three devices of the satellite radio conversation, with short names.
    pub fn sdrs() -> Self {
        SHORT_NAMES.iter().copied().collect()
    }

    pub fn insert(&mut self, code: u8, name: impl Into<String>) {
        self.names.insert(code, name.into());
    }

    pub fn contains(&self, code: u8) -> bool {
        self.names.contains_key(&code)
    }

    pub fn name(&self, code: u8) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    /// Like [`DeviceTable::name`], with a placeholder for unknown codes.
    pub fn name_or_unknown(&self, code: u8) -> &str {
        self.name(code).unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::ibus()
    }
}

impl<S: Into<String>> FromIterator<(u8, S)> for DeviceTable {
    fn from_iter<I: IntoIterator<Item = (u8, S)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(code, name)| (code, name.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn knows_the_satellite_radio_conversation() {
        let table = DeviceTable::ibus();
        for code in [RAD, SDRS, BROADCAST] {
            assert!(table.contains(code));
        }
        assert_eq!(table.name(RAD), Some("RAD Radio"));
        assert!(!table.contains(0xA8));
        assert_eq!(table.name_or_unknown(0xA8), "<unknown>");
    }

    #[test]
    fn extra_devices_can_be_added() {
        let mut table = DeviceTable::sdrs();
        assert_eq!(table.len(), 3);
        table.insert(0xA8, "mystery");
        assert_eq!(table.name(0xA8), Some("mystery"));
        assert_eq!(table.name(BROADCAST), Some("BCST"));
    }
}
