//! Brightness / Output Mapper
//!
//! Zwei Phasen pro Durchlauf:
//! 1. Duty-Wert pro Slot berechnen und nur bei Änderung schreiben (Debounce)
//! 2. Output-Enable-Leitung einmal aus dem ODER aller Slots setzen

use embedded_hal::digital::OutputPin;

use crate::traits::{Channel, PwmDevice};
use crate::types::{DeviceSlot, SlotState};

/// Ergebnis eines Mapper-Durchlaufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapperPass {
    /// Anzahl `set_duty`-Aufrufe in diesem Durchlauf
    pub writes: usize,
    /// Mindestens ein Slot treibt einen Wert > 0
    pub any_nonzero: bool,
}

/// Phase 1: Duty-Werte schreiben
///
/// Geschrieben wird nur bei `Active`-Slots und nur wenn sich die globale
/// Helligkeit oder der Enable-Zustand des Slots geändert hat.
pub fn apply_duties<D: PwmDevice>(
    slots: &mut [DeviceSlot<D>],
    normalized: f32,
    brightness_changed: bool,
) -> MapperPass {
    let mut pass = MapperPass::default();

    for slot in slots.iter_mut() {
        if slot.state != SlotState::Active {
            continue;
        }
        let changed = brightness_changed || slot.enabled_previous != Some(slot.enabled);
        if !changed {
            continue;
        }
        let Some(device) = slot.handle.as_mut() else {
            continue;
        };

        let duty = if slot.enabled { normalized } else { 0.0 };
        match device.set_duty(Channel::All, duty) {
            Ok(()) => {
                slot.applied_duty = duty;
                slot.enabled_previous = Some(slot.enabled);
            }
            Err(_e) => {
                // Beim nächsten Durchlauf erneut versuchen
                slot.enabled_previous = None;
                #[cfg(feature = "defmt")]
                defmt::warn!("Slot {}: duty write failed: {}", slot.index, _e);
            }
        }
        pass.writes += 1;
    }

    pass.any_nonzero = any_nonzero(slots);
    pass
}

/// ODER über alle Slots: treibt irgendein Chip einen Wert > 0?
pub fn any_nonzero<D>(slots: &[DeviceSlot<D>]) -> bool {
    slots
        .iter()
        .any(|slot| slot.is_occupied() && slot.applied_duty > 0.0)
}

/// Gemeinsame Output-Enable-Leitung (low-aktiv)
///
/// Ohne Pin (`None`) wird nur der logische Zustand geführt.
pub struct OutputEnableLine<P> {
    pin: Option<P>,
    asserted: Option<bool>,
}

impl<P: OutputPin> OutputEnableLine<P> {
    pub fn new(pin: Option<P>) -> Self {
        Self {
            pin,
            asserted: None,
        }
    }

    /// Phase 2: Leitung setzen, Hardware-Zugriff nur bei Zustandswechsel
    pub fn drive(&mut self, assert: bool) {
        if self.asserted == Some(assert) {
            return;
        }
        if let Some(pin) = self.pin.as_mut() {
            let result = if assert { pin.set_low() } else { pin.set_high() };
            if result.is_err() {
                #[cfg(feature = "defmt")]
                defmt::error!("Failed to drive output enable line");
                return;
            }
        }
        self.asserted = Some(assert);
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted == Some(true)
    }

    /// Tauscht den Pin aus und gibt den alten zurück
    ///
    /// Der neue Pin wird beim nächsten `drive()` gesetzt.
    pub fn replace(&mut self, pin: Option<P>) -> Option<P> {
        self.asserted = None;
        core::mem::replace(&mut self.pin, pin)
    }
}
