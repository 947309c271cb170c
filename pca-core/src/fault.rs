//! Fault Monitor
//!
//! Liest die Status-Register fehlerfähiger Chips, klassifiziert Fehler,
//! unterdrückt unzuverlässige Kurzschluss-Meldungen bei geringer Helligkeit
//! und versucht einmal Clear-and-Retry.

use embedded_hal::delay::DelayNs;

use crate::lifecycle::LifecycleEvent;
use crate::logic::{ErrorFlags, decode_error_flags, short_circuit_threshold};
use crate::traits::{Channel, DeviceError, FaultRegisters, PwmDevice, ResponseCurve};
use crate::types::{DeviceSlot, FaultKind, FaultPolicy, SlotError, SlotState};

/// Rohdaten einer Register-Prüfung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Inspection {
    pub overtemperature: bool,
    /// `Some` wenn das ERROR-Bit gesetzt war (EFLAG-Auswertung)
    pub flags: Option<ErrorFlags>,
    /// ERROR-Bit auch nach Clear-and-Retry noch gesetzt
    pub error_persisted: bool,
}

/// Ergebnis der Bewertung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultVerdict {
    Clear,
    /// Kurzschluss-Flag unterhalb der Helligkeits-Schwelle ignoriert
    Suppressed,
    Fault(FaultKind),
}

/// Liest MODE2 und ggf. EFLAG0..3, führt die Clear-Sequenz aus
///
/// Die einzige blockierende Wartezeit der Engine (`settle_us`) liegt zwischen
/// den beiden CLRERR-Schreibzugriffen.
pub fn inspect<R, DL>(regs: &mut R, delay: &mut DL, settle_us: u32) -> Result<Inspection, DeviceError>
where
    R: FaultRegisters + ?Sized,
    DL: DelayNs,
{
    let map = regs.register_map();
    let mode2 = regs.read_register(map.mode2)?;

    if mode2 & map.overtemp_mask != 0 {
        return Ok(Inspection {
            overtemperature: true,
            ..Inspection::default()
        });
    }
    if mode2 & map.error_mask == 0 {
        return Ok(Inspection::default());
    }

    let mut eflags = [0u8; 4];
    for (value, register) in eflags.iter_mut().zip(map.eflags) {
        *value = regs.read_register(register)?;
    }
    let flags = decode_error_flags(&eflags);

    // Nur beschreibbare Bits zurückschreiben, OVERTEMP/ERROR sind read-only
    let clear = (mode2 & !(map.overtemp_mask | map.error_mask)) | map.clear_error_mask;
    regs.write_register(map.mode2, clear)?;
    delay.delay_us(settle_us);
    regs.write_register(map.mode2, clear)?;
    let after = regs.read_register(map.mode2)?;

    Ok(Inspection {
        overtemperature: false,
        flags: Some(flags),
        error_persisted: after & map.error_mask != 0,
    })
}

/// Bewertet eine Inspektion inkl. Kurzschluss-Unterdrückung
pub fn classify(
    inspection: &Inspection,
    normalized: f32,
    curve: ResponseCurve,
    policy: &FaultPolicy,
) -> FaultVerdict {
    if inspection.overtemperature {
        return FaultVerdict::Fault(FaultKind::Overtemperature);
    }
    let Some(flags) = inspection.flags else {
        return FaultVerdict::Clear;
    };
    if !inspection.error_persisted {
        return FaultVerdict::Clear;
    }

    if flags.open_circuit {
        FaultVerdict::Fault(FaultKind::OpenCircuit)
    } else if flags.short_circuit {
        if normalized > short_circuit_threshold(policy, curve) {
            FaultVerdict::Fault(FaultKind::ShortCircuit)
        } else {
            FaultVerdict::Suppressed
        }
    } else {
        FaultVerdict::Clear
    }
}

fn force_off<D: PwmDevice>(slot: &mut DeviceSlot<D>) {
    if let Some(device) = slot.handle.as_mut() {
        if let Err(_e) = device.set_duty(Channel::All, 0.0) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Slot {}: failed to switch off: {}", slot.index, _e);
        }
    }
    slot.applied_duty = 0.0;
    slot.enabled_previous = None;
}

/// Prüft einen Slot und führt die Lifecycle-Übergänge aus
///
/// Geprüft werden `Active`-Slots sowie Slots mit Übertemperatur (Neubewertung).
/// Chips ohne Fehler-Register und Bus-Fehler ergeben `None`.
pub fn check_slot<D, DL>(
    slot: &mut DeviceSlot<D>,
    delay: &mut DL,
    normalized: f32,
    curve: ResponseCurve,
    policy: &FaultPolicy,
    settle_us: u32,
) -> Option<FaultVerdict>
where
    D: PwmDevice,
    DL: DelayNs,
{
    let overheated = slot.state == SlotState::Faulted(FaultKind::Overtemperature);
    if slot.state != SlotState::Active && !overheated {
        return None;
    }

    let inspection = {
        let regs = slot.handle.as_mut()?.fault_registers()?;
        match inspect(regs, delay, settle_us) {
            Ok(inspection) => inspection,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Slot {}: status read failed: {}", slot.index, _e);
                return None;
            }
        }
    };

    if overheated {
        if inspection.overtemperature {
            return Some(FaultVerdict::Fault(FaultKind::Overtemperature));
        }
        slot.apply(LifecycleEvent::FaultCleared);
        slot.enabled_previous = None;
        slot.last_error = None;
        #[cfg(feature = "defmt")]
        defmt::info!("Slot {}: temperature back to normal", slot.index);
    }

    let verdict = classify(&inspection, normalized, curve, policy);

    if inspection.overtemperature {
        slot.apply(LifecycleEvent::FaultReported(FaultKind::Overtemperature));
        slot.last_error = Some(SlotError::Overtemperature);
        force_off(slot);
        #[cfg(feature = "defmt")]
        defmt::error!("Slot {}: overtemperature", slot.index);
        return Some(verdict);
    }

    if let Some(flags) = inspection.flags {
        let reported = if flags.open_circuit {
            FaultKind::OpenCircuit
        } else {
            FaultKind::ShortCircuit
        };
        slot.apply(LifecycleEvent::FaultReported(reported));
        slot.apply(LifecycleEvent::ClearAttempted);

        match verdict {
            FaultVerdict::Fault(kind) => {
                slot.apply(LifecycleEvent::FaultPersisted(kind));
                slot.enabled = false;
                slot.last_error = Some(SlotError::from(kind));
                force_off(slot);
                #[cfg(feature = "defmt")]
                defmt::error!("Slot {}: {} persists, slot disabled", slot.index, kind);
            }
            FaultVerdict::Suppressed | FaultVerdict::Clear => {
                slot.apply(LifecycleEvent::FaultCleared);
                #[cfg(feature = "defmt")]
                defmt::debug!("Slot {}: error flag handled ({})", slot.index, verdict);
            }
        }
    }

    Some(verdict)
}
