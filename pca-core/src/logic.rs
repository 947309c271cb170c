//! Pure Business Logic Functions
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use crate::traits::ResponseCurve;
use crate::types::FaultPolicy;

/// Unterhalb dieses Anteils wird der Duty-Wert auf exakt 0 gesetzt
pub const MIN_DUTY: f32 = 0.005;

/// Stützstellen der Exponential-Kennlinie `(e^(4.6x) - 1) / (e^4.6 - 1)`, x = i/16
const EXPONENTIAL_TABLE: [f32; 17] = [
    0.00000, 0.00338, 0.00789, 0.01390, 0.02191, 0.03260, 0.04684, 0.06582, 0.09112, 0.12486,
    0.16983, 0.22978, 0.30970, 0.41624, 0.55826, 0.74760, 1.00000,
];

/// Wandelt die globale Helligkeit (0-255) in einen normierten Duty-Wert
///
/// # Beispiele
///
/// ```
/// # use pca_core::normalize_brightness;
/// assert_eq!(normalize_brightness(0), 0.0);
/// assert_eq!(normalize_brightness(1), 0.0); // 1/255 < 0.005
/// assert_eq!(normalize_brightness(255), 1.0);
/// ```
pub fn normalize_brightness(brightness: u8) -> f32 {
    let value = (f32::from(brightness) / 255.0).clamp(0.0, 1.0);
    if value < MIN_DUTY { 0.0 } else { value }
}

/// Wendet die Kennlinie auf einen linearen Duty-Wert an
///
/// Deterministisch: gleicher Eingang + gleiche Kennlinie ergibt immer denselben Ausgang.
pub fn apply_curve(value: f32, curve: ResponseCurve) -> f32 {
    let value = value.clamp(0.0, 1.0);
    match curve {
        ResponseCurve::Linear => value,
        ResponseCurve::Exponential => {
            let scaled = value * 16.0;
            // floor für nicht-negative Werte ohne std
            let index = (scaled as usize).min(15);
            let fraction = scaled - index as f32;
            let low = EXPONENTIAL_TABLE[index];
            let high = EXPONENTIAL_TABLE[index + 1];
            low + (high - low) * fraction
        }
    }
}

/// Schwelle, ab der ein Kurzschluss-Flag ernst genommen wird
pub fn short_circuit_threshold(policy: &FaultPolicy, curve: ResponseCurve) -> f32 {
    match curve {
        ResponseCurve::Linear => policy.short_threshold_linear,
        ResponseCurve::Exponential => policy.short_threshold_exponential,
    }
}

/// Aggregierte EFLAG-Auswertung über alle LED-Gruppen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags {
    pub open_circuit: bool,
    pub short_circuit: bool,
}

/// Dekodiert die vier EFLAG-Bytes
///
/// Pro LED zwei Bits: `01` = Kurzschluss, `10` = offener Kreis.
pub fn decode_error_flags(eflags: &[u8]) -> ErrorFlags {
    eflags.iter().fold(ErrorFlags::default(), |acc, &byte| ErrorFlags {
        open_circuit: acc.open_circuit || byte & 0xAA != 0,
        short_circuit: acc.short_circuit || byte & 0x55 != 0,
    })
}

/// Duty-Wert auf ein 8-Bit PWM-Register abbilden (gerundet)
pub fn duty_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Duty-Wert auf einen 12-Bit Zähler abbilden (gerundet)
pub fn duty_to_u12(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 4095.0 + 0.5) as u16
}
