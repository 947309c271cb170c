//! Device Registry / Scanner
//!
//! Gleicht das Ergebnis des Bus-Scans mit dem Slot-Array ab.
//! Ein fehlender Chip ist kein Fehler, der Slot wird einfach als leer markiert.

use heapless::Vec;

use crate::lifecycle::LifecycleEvent;
use crate::traits::{BusScanner, PwmDevice};
use crate::types::{DeviceSlot, MAX_DEVICES, SlotState};

/// Ergebnis eines Scan-Durchlaufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanReport {
    pub occupied: usize,
    /// Slots, die in diesem Durchlauf neu belegt wurden
    pub appeared: [bool; MAX_DEVICES],
    /// Slots, deren Chip verschwunden ist
    pub vanished: [bool; MAX_DEVICES],
    /// Slots, deren Chip seit dem letzten Scan einen Power-On-Reset hatte
    pub power_lost: [bool; MAX_DEVICES],
}

/// Führt einen Scan-Durchlauf aus
///
/// - **Full-Rescan:** alle Slots werden geleert und ab Index 0 neu belegt.
/// - **Inkrementell:** jeder belegte Slot prüft seinen eigenen Chip. Noch
///   vorhandene Chips behalten Slot, Handle und Zustand; hat der Chip seine
///   Konfiguration verloren, geht der Slot zurück nach `Detected`.
///   Verschwundene Chips geben ihren Slot frei. Der Bus-Scan sucht nur nach
///   unbekannten Adressen und füllt damit die freien Slots von unten.
pub fn scan<S: BusScanner>(
    scanner: &mut S,
    slots: &mut [DeviceSlot<S::Device>; MAX_DEVICES],
    full_rescan: bool,
) -> ScanReport {
    let mut report = ScanReport::default();

    for slot in slots.iter_mut().filter(|slot| slot.is_occupied()) {
        if full_rescan {
            slot.apply(LifecycleEvent::Removed);
            slot.vacate();
            report.vanished[slot.index] = true;
            continue;
        }
        check_occupied(slot, &mut report);
    }

    let mapped: Vec<u8, MAX_DEVICES> = slots
        .iter()
        .filter_map(|slot| slot.device())
        .map(|device| device.address())
        .collect();
    let free = MAX_DEVICES - mapped.len();
    if free == 0 {
        report.occupied = MAX_DEVICES;
        return report;
    }

    for device in scanner.scan_bus(&mapped, free, full_rescan) {
        if mapped.contains(&device.address()) {
            continue;
        }

        match slots.iter_mut().find(|slot| !slot.is_occupied()) {
            Some(slot) => {
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "Slot {}: found {} @ {:#x}",
                    slot.index,
                    device.type_name(),
                    device.address()
                );
                slot.occupy(device);
                slot.apply(LifecycleEvent::Populated);
                report.appeared[slot.index] = true;
                // Beim Full-Rescan ist ein wiedergefundener Chip kein "verschwundener"
                report.vanished[slot.index] = false;
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No free slot for device @ {:#x}", device.address());
            }
        }
    }

    report.occupied = slots.iter().filter(|slot| slot.is_occupied()).count();
    report
}

/// Inkrementelle Prüfung eines belegten Slots über sein eigenes Handle
fn check_occupied<D: PwmDevice>(slot: &mut DeviceSlot<D>, report: &mut ScanReport) {
    let Some(device) = slot.handle.as_mut() else {
        return;
    };

    if !device.is_connected() {
        #[cfg(feature = "defmt")]
        defmt::info!("Slot {}: device removed", slot.index);
        slot.apply(LifecycleEvent::Removed);
        slot.vacate();
        report.vanished[slot.index] = true;
        return;
    }

    // Disabled bleibt bis zum Full-Rescan liegen
    let configured = matches!(slot.state, SlotState::Disabled(_))
        || !slot.state.has_begun()
        || device.has_begun();
    if !configured {
        #[cfg(feature = "defmt")]
        defmt::warn!("Slot {}: device lost its configuration", slot.index);
        slot.apply(LifecycleEvent::PowerLost);
        // Nach dem Power-On-Reset sind alle Ausgänge aus
        slot.applied_duty = 0.0;
        slot.enabled_previous = None;
        report.power_lost[slot.index] = true;
    }
}

/// Round-Robin-Cursor über einen Adressbereich
///
/// Inkrementelle Scans proben pro Durchlauf nur ein kurzes Fenster, damit
/// `tick()` nicht über den ganzen Bus blockiert. Der Iterator ist endlos und
/// läuft am Bereichsende auf den Anfang zurück.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressWindow {
    first: u8,
    last: u8,
    next: u8,
}

impl AddressWindow {
    pub const fn new(first: u8, last: u8) -> Self {
        Self {
            first,
            last,
            next: first,
        }
    }

    pub fn range(&self) -> core::ops::RangeInclusive<u8> {
        self.first..=self.last
    }

    pub fn next_address(&mut self) -> u8 {
        let address = self.next;
        self.next = if address >= self.last {
            self.first
        } else {
            address + 1
        };
        address
    }
}

impl Iterator for AddressWindow {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_address())
    }
}
