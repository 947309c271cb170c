//! PCA9xxx Controller - periodischer Einstiegspunkt
//!
//! Der Host ruft [`PcaController::tick`] zyklisch auf (mindestens alle 100 ms).
//! Jeder Aufruf aktualisiert Helligkeit und Output-Enable, Scanner und Fault
//! Monitor laufen mit eigenem, langsamerem Takt.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::fault::{self, FaultVerdict};
use crate::lifecycle;
use crate::logic::normalize_brightness;
use crate::mapper::{self, MapperPass, OutputEnableLine};
use crate::registry::{self, ScanReport};
use crate::settings::{DeviceStatus, PcaSettings, StatusView};
use crate::traits::{BusScanner, Clock, DeviceError, PwmDevice, ResponseCurve};
use crate::types::{DeviceSlot, EngineConfig, MAX_DEVICES};

/// Engine für bis zu [`MAX_DEVICES`] PWM-Chips an einem Bus
///
/// # Generische Parameter
/// - `S`: Bus-Scanner der Treiber-Schicht (liefert die Device-Handles)
/// - `P`: Output-Enable-Pin (low-aktiv)
/// - `DL`: Delay für die Settle-Zeit der Fehler-Löschung
/// - `C`: monotone Millisekunden-Uhr
pub struct PcaController<S, P, DL, C>
where
    S: BusScanner,
{
    scanner: S,
    slots: [DeviceSlot<S::Device>; MAX_DEVICES],
    output_enable: OutputEnableLine<P>,
    output_enable_pin: i8,
    delay: DL,
    clock: C,
    config: EngineConfig,
    brightness_target: u8,
    brightness_previous: Option<u8>,
    curve: ResponseCurve,
    /// `None` bis der Boot-Scan gelaufen ist
    last_scan_ms: Option<u64>,
    last_fault_check_ms: u64,
}

impl<S, P, DL, C> PcaController<S, P, DL, C>
where
    S: BusScanner,
    P: OutputPin,
    DL: DelayNs,
    C: Clock,
{
    pub fn new(
        scanner: S,
        output_enable: Option<P>,
        delay: DL,
        clock: C,
        config: EngineConfig,
    ) -> Self {
        Self {
            scanner,
            slots: core::array::from_fn(DeviceSlot::new),
            output_enable: OutputEnableLine::new(output_enable),
            output_enable_pin: -1,
            delay,
            clock,
            config,
            brightness_target: 0,
            brightness_previous: None,
            curve: ResponseCurve::Linear,
            last_scan_ms: None,
            last_fault_check_ms: 0,
        }
    }

    /// Periodischer Einstiegspunkt, blockiert höchstens für die Settle-Zeit
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        if self.last_scan_ms.is_none() {
            self.rescan(true, now);
        }

        self.update_outputs();

        let last_scan = self.last_scan_ms.unwrap_or(now);
        if now.saturating_sub(last_scan) >= self.config.scan_interval_ms {
            self.rescan(false, now);
        }

        if now.saturating_sub(self.last_fault_check_ms) >= self.config.fault_check_interval_ms {
            self.last_fault_check_ms = now;
            self.check_faults();
        }
    }

    /// Full-Rescan: alle Slots werden neu erkannt und initialisiert
    ///
    /// Einziger Weg, einen `Disabled`-Slot wieder in Betrieb zu nehmen.
    pub fn full_rescan(&mut self) -> ScanReport {
        let now = self.clock.now_ms();
        self.rescan(true, now)
    }

    fn rescan(&mut self, full_rescan: bool, now: u64) -> ScanReport {
        self.last_scan_ms = Some(now);
        let report = registry::scan(&mut self.scanner, &mut self.slots, full_rescan);

        for slot in self.slots.iter_mut() {
            // Fehler sind im Slot vermerkt, nächster Versuch beim nächsten Scan
            let _ = lifecycle::initialize(slot, self.curve);
        }
        report
    }

    /// Mapper-Durchlauf: Duty-Werte schreiben, dann OE-Leitung einmal setzen
    pub fn update_outputs(&mut self) -> MapperPass {
        let normalized = self.normalized_brightness();
        let brightness_changed = self.brightness_previous != Some(self.brightness_target);

        let pass = mapper::apply_duties(&mut self.slots, normalized, brightness_changed);
        self.brightness_previous = Some(self.brightness_target);
        self.output_enable.drive(pass.any_nonzero);
        pass
    }

    fn check_faults(&mut self) {
        let normalized = self.normalized_brightness();
        let policy = self.config.fault_policy;
        let mut forced_off = false;

        for slot in self.slots.iter_mut() {
            let verdict = fault::check_slot(
                slot,
                &mut self.delay,
                normalized,
                self.curve,
                &policy,
                self.config.clear_settle_us,
            );
            forced_off |= matches!(verdict, Some(FaultVerdict::Fault(_)));
        }

        if forced_off {
            self.output_enable.drive(mapper::any_nonzero(&self.slots));
        }
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness_target = brightness;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness_target
    }

    pub fn normalized_brightness(&self) -> f32 {
        normalize_brightness(self.brightness_target)
    }

    /// Schaltet die Exponential-Kennlinie um
    ///
    /// Gleicher Modus = keine Aktion. Bei einem Wechsel bekommt jeder
    /// initialisierte Chip die neue Kennlinie und den Duty-Wert neu geschrieben.
    pub fn set_exponential(&mut self, exponential: bool) {
        let curve = ResponseCurve::from_exponential(exponential);
        if curve == self.curve {
            return;
        }
        self.curve = curve;

        for slot in self.slots.iter_mut().filter(|slot| slot.has_begun()) {
            if let Some(device) = slot.handle.as_mut() {
                if let Err(_e) = device.set_response_curve(curve) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Slot {}: response curve not applied: {}", slot.index, _e);
                }
            }
        }
        self.brightness_previous = None;
    }

    pub fn is_exponential(&self) -> bool {
        self.curve.is_exponential()
    }

    pub fn set_slot_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.enabled = enabled;
        }
    }

    /// Übernimmt Exponential-Modus, Enable-Flags und OE-Pin-Nummer
    ///
    /// Der Pin selbst wird über [`Self::replace_output_enable`] getauscht.
    pub fn apply_settings(&mut self, settings: &PcaSettings) {
        self.set_exponential(settings.exponential);
        for (index, &enabled) in settings.activate.iter().enumerate() {
            self.set_slot_enabled(index, enabled);
        }
        self.output_enable_pin = settings.output_enable_pin;
    }

    /// Tauscht die OE-Leitung, der alte Pin geht an den Aufrufer zurück
    ///
    /// Der Aufrufer gibt den alten Pin frei (Input mit Pull-up, Ausgänge damit aus).
    pub fn replace_output_enable(&mut self, pin: Option<P>, pin_number: i8) -> Option<P> {
        self.output_enable_pin = pin_number;
        let old = self.output_enable.replace(pin);
        self.output_enable.drive(mapper::any_nonzero(&self.slots));
        old
    }

    pub fn is_output_enabled(&self) -> bool {
        self.output_enable.is_asserted()
    }

    pub fn slots(&self) -> &[DeviceSlot<S::Device>; MAX_DEVICES] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&DeviceSlot<S::Device>> {
        self.slots.get(index)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }

    /// Stromrückmeldung eines Kanals (nur fehlerfähige Chips)
    pub fn channel_current(&mut self, index: usize, channel: u8) -> Result<u8, DeviceError> {
        let device = self
            .slots
            .get_mut(index)
            .and_then(|slot| slot.device_mut())
            .ok_or(DeviceError::NotConnected)?;
        if channel >= device.channel_count() {
            return Err(DeviceError::InvalidChannel(channel));
        }
        device
            .fault_registers()
            .ok_or(DeviceError::Unsupported)?
            .channel_current(channel)
    }

    /// Diagnose-Ansicht zum Zurückschreiben in die Host-Konfiguration
    pub fn status_view(&self) -> StatusView {
        StatusView {
            output_enable_pin: self.output_enable_pin,
            exponential: self.is_exponential(),
            devices: core::array::from_fn(|index| {
                let slot = &self.slots[index];
                DeviceStatus {
                    activate: slot.is_enabled(),
                    address: slot.device().map(|d| d.address()),
                    type_name: slot.device().map(|d| d.type_name()),
                }
            }),
        }
    }
}
