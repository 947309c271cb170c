//! Lifecycle Controller
//!
//! Zustandsmaschine pro Slot:
//! `Unoccupied → Detected → Initializing → Active`,
//! `Active → Faulted → Recovering → Active | Disabled`.
//!
//! Jeder Slot läuft unabhängig, ein Fehler in einem Slot blockiert keinen anderen.

use crate::traits::{PwmDevice, ResponseCurve};
use crate::types::{DeviceSlot, FaultKind, SlotError, SlotState};

/// Ereignisse, die einen Slot-Übergang auslösen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleEvent {
    /// Scanner hat einen Chip in den Slot gelegt
    Populated,
    /// Chip meldet elektrische Verbindung, `begin()` startet
    Connected,
    BeginSucceeded,
    BeginFailed,
    FaultReported(FaultKind),
    ClearAttempted,
    FaultCleared,
    FaultPersisted(FaultKind),
    /// Chip antwortet noch, hat aber seine Konfiguration verloren (Power-On-Reset)
    PowerLost,
    Removed,
}

/// Reine Übergangsfunktion, unbekannte Kombinationen lassen den Zustand unverändert
pub fn transition(state: SlotState, event: LifecycleEvent) -> SlotState {
    use LifecycleEvent as E;
    use SlotState as S;

    match (state, event) {
        (_, E::Removed) => S::Unoccupied,
        (_, E::Populated) => S::Detected,
        (S::Detected, E::Connected) => S::Initializing,
        (S::Initializing, E::BeginSucceeded) => S::Active,
        (S::Initializing, E::BeginFailed) => S::Detected,
        (S::Active, E::FaultReported(kind)) => S::Faulted(kind),
        (S::Faulted(_), E::ClearAttempted) => S::Recovering,
        (S::Recovering, E::FaultCleared) => S::Active,
        (S::Recovering, E::FaultPersisted(kind)) => S::Disabled(kind),
        // Übertemperatur wird ohne Clear-Sequenz beim nächsten Check neu bewertet
        (S::Faulted(FaultKind::Overtemperature), E::FaultCleared) => S::Active,
        (S::Active | S::Faulted(_) | S::Recovering, E::PowerLost) => S::Detected,
        (state, _) => state,
    }
}

impl<D> DeviceSlot<D> {
    pub(crate) fn apply(&mut self, event: LifecycleEvent) -> SlotState {
        self.state = transition(self.state, event);
        self.state
    }
}

/// Initialisiert einen `Detected`-Slot
///
/// `begin()` darf einmal fehlschlagen: danach `reset()` und genau ein weiterer
/// Versuch. Scheitert auch der, bleibt der Slot `Detected` und wird erst beim
/// nächsten Scan-Durchlauf erneut versucht.
pub fn initialize<D: PwmDevice>(
    slot: &mut DeviceSlot<D>,
    curve: ResponseCurve,
) -> Result<(), SlotError> {
    if slot.state != SlotState::Detected {
        return Ok(());
    }
    let Some(device) = slot.handle.as_mut() else {
        return Err(SlotError::NotPresent);
    };

    if !device.is_connected() {
        return Err(SlotError::NotPresent);
    }
    slot.state = transition(slot.state, LifecycleEvent::Connected);

    let mut result = device.begin();
    if result.is_err() {
        #[cfg(feature = "defmt")]
        defmt::warn!("Slot {}: begin failed, attempt to reset", slot.index);
        if let Err(_e) = device.reset() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Slot {}: reset failed: {}", slot.index, _e);
        }
        result = device.begin();
    }

    if result.is_err() {
        slot.state = transition(slot.state, LifecycleEvent::BeginFailed);
        slot.last_error = Some(SlotError::BeginFailed);
        #[cfg(feature = "defmt")]
        defmt::error!("Slot {}: begin failed after retry", slot.index);
        return Err(SlotError::BeginFailed);
    }

    if let Err(_e) = device.set_response_curve(curve) {
        #[cfg(feature = "defmt")]
        defmt::warn!("Slot {}: response curve not applied: {}", slot.index, _e);
    }

    slot.state = transition(slot.state, LifecycleEvent::BeginSucceeded);
    // Nächster Mapper-Durchlauf schreibt den Duty-Wert unbedingt neu
    slot.enabled_previous = None;
    slot.last_error = None;
    #[cfg(feature = "defmt")]
    defmt::info!(
        "Slot {}: {} @ {:#x} active",
        slot.index,
        device.type_name(),
        device.address()
    );
    Ok(())
}
