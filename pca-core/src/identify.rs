//! Chip-Erkennung beim Bus-Scan
//!
//! Aus MODE2 und ggf. PRE_SCALE wird die Chip-Familie bestimmt. Alles, was
//! keiner Signatur entspricht, bleibt unangetastet (z.B. EEPROMs am selben Bus).

/// Unterstützte Chip-Familien
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipKind {
    Pca9955b,
    Pca9685,
}

/// PCA9955B: MODE2[1:0] sind read-only und lesen immer 0b01
const PCA9955B_MODE2_MASK: u8 = 0x03;
const PCA9955B_MODE2_BITS: u8 = 0x01;

/// PCA9685: MODE2[7:5] sind reserviert und lesen 0
const PCA9685_MODE2_RESERVED: u8 = 0xE0;
/// PRE_SCALE nach Power-On bzw. Software-Reset (200 Hz)
pub const PCA9685_PRESCALE_POWER_ON: u8 = 0x1E;

pub fn is_pca9955b(mode2: u8) -> bool {
    mode2 & PCA9955B_MODE2_MASK == PCA9955B_MODE2_BITS
}

/// PCA9685-Signatur: reservierte MODE2-Bits leer, PRE_SCALE auf dem
/// Power-On-Wert oder dem Wert, den `begin()` programmiert
pub fn is_pca9685(mode2: u8, prescale: u8, configured_prescale: u8) -> bool {
    mode2 & PCA9685_MODE2_RESERVED == 0
        && !is_pca9955b(mode2)
        && (prescale == PCA9685_PRESCALE_POWER_ON || prescale == configured_prescale)
}

/// Bestimmt die Chip-Familie
///
/// `read_prescale` wird nur aufgerufen, wenn MODE2 nicht schon auf einen
/// PCA9955B passt.
pub fn identify<F>(mode2: u8, read_prescale: F, configured_prescale: u8) -> Option<ChipKind>
where
    F: FnOnce() -> Option<u8>,
{
    if is_pca9955b(mode2) {
        return Some(ChipKind::Pca9955b);
    }
    let prescale = read_prescale()?;
    is_pca9685(mode2, prescale, configured_prescale).then_some(ChipKind::Pca9685)
}
