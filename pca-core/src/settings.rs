//! Settings-Ansicht für das Host-Framework
//!
//! Eingelesen werden OE-Pin, Exponential-Modus und Enable pro Slot.
//! Zurückgeschrieben wird zusätzlich Adresse und Typ pro Slot (nur Anzeige).
//!
//! Form (unterhalb von [`ROOT_KEY`]):
//!
//! ```text
//! {
//!   "Output Enable": { "pin": 2 },
//!   "Exponential brightness": false,
//!   "Device 0": { "Activate": true, "Addr": "0x60", "Type": "PCA9955B" },
//!   "Device 1": { "Activate": false, "Addr": "(n/c)", "Type": "(n/c)" },
//!   ...
//! }
//! ```

use core::fmt::Write;

use heapless::String;

use crate::types::MAX_DEVICES;

pub const ROOT_KEY: &str = "PCA9xxx Status";
pub const OUTPUT_ENABLE_KEY: &str = "Output Enable";
pub const EXPONENTIAL_KEY: &str = "Exponential brightness";
pub const DEVICE_KEY_PREFIX: &str = "Device ";
pub const ACTIVATE_KEY: &str = "Activate";
pub const ADDR_KEY: &str = "Addr";
pub const TYPE_KEY: &str = "Type";

/// Platzhalter für leere Slots
pub const NOT_CONNECTED: &str = "(n/c)";

/// Default OE-Pin (GPIO2)
pub const DEFAULT_OUTPUT_ENABLE_PIN: i8 = 2;

/// Vom Host gesetzte Einstellungen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PcaSettings {
    /// GPIO der Output-Enable-Leitung, negativ = keine Leitung
    pub output_enable_pin: i8,
    pub exponential: bool,
    pub activate: [bool; MAX_DEVICES],
}

impl Default for PcaSettings {
    fn default() -> Self {
        Self {
            output_enable_pin: DEFAULT_OUTPUT_ENABLE_PIN,
            exponential: false,
            activate: [false; MAX_DEVICES],
        }
    }
}

/// Diagnose-Eintrag pro Slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    pub activate: bool,
    pub address: Option<u8>,
    pub type_name: Option<&'static str>,
}

impl DeviceStatus {
    /// Adresse als `0x..` bzw. `(n/c)`
    pub fn address_label(&self) -> String<8> {
        let mut label = String::new();
        match self.address {
            Some(address) => {
                let _ = write!(label, "0x{:x}", address);
            }
            None => {
                let _ = label.push_str(NOT_CONNECTED);
            }
        }
        label
    }

    pub fn type_label(&self) -> &'static str {
        self.type_name.unwrap_or(NOT_CONNECTED)
    }
}

/// Komplette Rückschreib-Ansicht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusView {
    pub output_enable_pin: i8,
    pub exponential: bool,
    pub devices: [DeviceStatus; MAX_DEVICES],
}

/// Schlüssel eines Slots, z.B. "Device 0"
pub fn device_label(index: usize) -> String<12> {
    let mut label = String::new();
    let _ = write!(label, "{}{}", DEVICE_KEY_PREFIX, index);
    label
}

/// Umkehrung von [`device_label`]
pub fn parse_device_label(key: &str) -> Option<usize> {
    key.strip_prefix(DEVICE_KEY_PREFIX)?
        .parse::<usize>()
        .ok()
        .filter(|&index| index < MAX_DEVICES)
}

/// Eingelesene Einstellungen plus Vollständigkeit
///
/// Fehlende Werte werden mit Defaults aufgefüllt, `complete` ist dann `false`
/// und der Host sollte die Konfiguration neu schreiben.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsDocument {
    pub settings: PcaSettings,
    pub complete: bool,
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::de::{IgnoredAny, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::*;

    #[derive(Serialize)]
    struct OutputEnableOut {
        pin: i8,
    }

    #[derive(Serialize)]
    struct DeviceOut<'a> {
        #[serde(rename = "Activate")]
        activate: bool,
        #[serde(rename = "Addr")]
        addr: &'a str,
        #[serde(rename = "Type")]
        type_name: &'a str,
    }

    #[derive(Deserialize)]
    struct OutputEnableIn {
        #[serde(default)]
        pin: Option<i8>,
    }

    #[derive(Deserialize)]
    struct DeviceIn {
        #[serde(rename = "Activate", default)]
        activate: Option<bool>,
    }

    impl Serialize for StatusView {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(2 + MAX_DEVICES))?;
            map.serialize_entry(
                OUTPUT_ENABLE_KEY,
                &OutputEnableOut {
                    pin: self.output_enable_pin,
                },
            )?;
            map.serialize_entry(EXPONENTIAL_KEY, &self.exponential)?;
            for (index, device) in self.devices.iter().enumerate() {
                let addr = device.address_label();
                map.serialize_entry(
                    device_label(index).as_str(),
                    &DeviceOut {
                        activate: device.activate,
                        addr: addr.as_str(),
                        type_name: device.type_label(),
                    },
                )?;
            }
            map.end()
        }
    }

    struct SettingsVisitor;

    impl<'de> Visitor<'de> for SettingsVisitor {
        type Value = SettingsDocument;

        fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str("a PCA9xxx settings object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut settings = PcaSettings::default();
            let mut pin_seen = false;
            let mut exponential_seen = false;
            let mut activate_seen = [false; MAX_DEVICES];

            while let Some(key) = map.next_key::<&'de str>()? {
                if key == OUTPUT_ENABLE_KEY {
                    let oe: Option<OutputEnableIn> = map.next_value()?;
                    if let Some(pin) = oe.and_then(|oe| oe.pin) {
                        settings.output_enable_pin = pin;
                        pin_seen = true;
                    }
                } else if key == EXPONENTIAL_KEY {
                    if let Some(exponential) = map.next_value::<Option<bool>>()? {
                        settings.exponential = exponential;
                        exponential_seen = true;
                    }
                } else if let Some(index) = parse_device_label(key) {
                    let device: Option<DeviceIn> = map.next_value()?;
                    if let Some(activate) = device.and_then(|d| d.activate) {
                        settings.activate[index] = activate;
                        activate_seen[index] = true;
                    }
                } else {
                    map.next_value::<IgnoredAny>()?;
                }
            }

            Ok(SettingsDocument {
                settings,
                complete: pin_seen && exponential_seen && activate_seen.iter().all(|&seen| seen),
            })
        }
    }

    impl<'de> Deserialize<'de> for SettingsDocument {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(SettingsVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_label() {
        assert_eq!(device_label(3).as_str(), "Device 3");
    }

    #[test]
    fn test_parse_device_label() {
        assert_eq!(parse_device_label("Device 2"), Some(2));
        assert_eq!(parse_device_label("Device 9"), None);
        assert_eq!(parse_device_label("Output Enable"), None);
    }

    #[test]
    fn test_address_label() {
        let status = DeviceStatus {
            activate: true,
            address: Some(0x60),
            type_name: Some("PCA9955B"),
        };
        assert_eq!(status.address_label().as_str(), "0x60");
        assert_eq!(status.type_label(), "PCA9955B");
    }

    #[test]
    fn test_address_label_not_connected() {
        let status = DeviceStatus {
            activate: false,
            address: None,
            type_name: None,
        };
        assert_eq!(status.address_label().as_str(), NOT_CONNECTED);
        assert_eq!(status.type_label(), NOT_CONNECTED);
    }
}
