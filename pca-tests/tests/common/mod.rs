//! Mock-Hardware für die Host-Tests
//!
//! Ein `Chip` ist das simulierte Bauteil am Bus. Der `MockBus` erzeugt bei
//! jedem Scan frische `MockDevice`-Handles, die auf denselben Chip zeigen,
//! damit Tests nach dem Verschieben in den Controller noch Zugriff haben.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use pca_core::{
    BusScanner, Channel, Clock, DeviceError, EngineConfig, FaultRegisters, MAX_DEVICES,
    PcaController, PwmDevice, ResponseCurve,
};

pub const MODE2_OVERTEMP: u8 = 1 << 7;
pub const MODE2_ERROR: u8 = 1 << 6;
pub const MODE2_CLRERR: u8 = 1 << 4;
/// MODE2 im Normalbetrieb (ohne Status-Bits)
pub const MODE2_RESERVED: u8 = 0x05;

// ============================================================================
// Simulierter Chip
// ============================================================================

pub struct Chip {
    pub address: u8,
    pub type_name: &'static str,
    pub channels: u8,
    pub fault_capable: bool,
    pub present: bool,
    /// Anzahl `begin()`-Aufrufe, die noch fehlschlagen
    pub begin_failures: usize,
    pub begin_calls: usize,
    pub reset_calls: usize,
    pub duty_writes: Vec<f32>,
    pub curve_writes: Vec<ResponseCurve>,
    pub mode2: u8,
    pub eflags: [u8; 4],
    /// Fehler lässt sich per CLRERR nicht löschen
    pub error_sticky: bool,
    pub register_reads: usize,
    pub register_writes: Vec<(u8, u8)>,
    pub current: u8,
    /// Konfiguration aus `begin()` noch vorhanden (false nach Power-On-Reset)
    pub configured: bool,
    /// Nächster `set_duty()`-Aufruf schlägt fehl
    pub fail_next_duty: bool,
}

pub type ChipRef = Rc<RefCell<Chip>>;

impl Chip {
    fn new(address: u8, type_name: &'static str, fault_capable: bool) -> ChipRef {
        Rc::new(RefCell::new(Self {
            address,
            type_name,
            channels: 16,
            fault_capable,
            present: true,
            begin_failures: 0,
            begin_calls: 0,
            reset_calls: 0,
            duty_writes: Vec::new(),
            curve_writes: Vec::new(),
            mode2: MODE2_RESERVED,
            eflags: [0; 4],
            error_sticky: false,
            register_reads: 0,
            register_writes: Vec::new(),
            current: 0x80,
            configured: false,
            fail_next_duty: false,
        }))
    }

    /// Fehlerfähiger Chip (Status- und EFLAG-Register)
    pub fn pca9955b(address: u8) -> ChipRef {
        Chip::new(address, "PCA9955B", true)
    }

    /// Chip ohne Fehler-Register
    pub fn pca9685(address: u8) -> ChipRef {
        Chip::new(address, "PCA9685", false)
    }

    pub fn last_duty(&self) -> Option<f32> {
        self.duty_writes.last().copied()
    }

    /// Brown-out: Chip bleibt am Bus, verliert aber seine Konfiguration
    pub fn power_cycle(&mut self) {
        self.configured = false;
    }

    /// Setzt ERROR und die EFLAG-Bytes
    pub fn raise_error(&mut self, eflags: [u8; 4], sticky: bool) {
        self.mode2 |= MODE2_ERROR;
        self.eflags = eflags;
        self.error_sticky = sticky;
    }
}

// ============================================================================
// Mock Device Handle
// ============================================================================

pub struct MockDevice {
    chip: ChipRef,
    address: u8,
    type_name: &'static str,
    begun: bool,
}

impl PwmDevice for MockDevice {
    fn address(&self) -> u8 {
        self.address
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn channel_count(&self) -> u8 {
        self.chip.borrow().channels
    }

    fn is_connected(&mut self) -> bool {
        let chip = self.chip.borrow();
        if !chip.configured {
            self.begun = false;
        }
        chip.present
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        let mut chip = self.chip.borrow_mut();
        chip.begin_calls += 1;
        if !chip.present {
            return Err(DeviceError::NotConnected);
        }
        if chip.begin_failures > 0 {
            chip.begin_failures -= 1;
            return Err(DeviceError::Bus);
        }
        chip.configured = true;
        self.begun = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        let mut chip = self.chip.borrow_mut();
        chip.reset_calls += 1;
        chip.configured = false;
        self.begun = false;
        Ok(())
    }

    fn has_begun(&self) -> bool {
        self.begun
    }

    fn set_duty(&mut self, channel: Channel, value: f32) -> Result<(), DeviceError> {
        let mut chip = self.chip.borrow_mut();
        if !chip.present {
            return Err(DeviceError::Bus);
        }
        if chip.fail_next_duty {
            chip.fail_next_duty = false;
            return Err(DeviceError::Bus);
        }
        if let Channel::Index(ch) = channel {
            if ch >= chip.channels {
                return Err(DeviceError::InvalidChannel(ch));
            }
        }
        chip.duty_writes.push(value);
        Ok(())
    }

    fn set_response_curve(&mut self, curve: ResponseCurve) -> Result<(), DeviceError> {
        self.chip.borrow_mut().curve_writes.push(curve);
        Ok(())
    }

    fn fault_registers(&mut self) -> Option<&mut dyn FaultRegisters> {
        if self.chip.borrow().fault_capable {
            Some(self)
        } else {
            None
        }
    }
}

impl FaultRegisters for MockDevice {
    fn read_register(&mut self, register: u8) -> Result<u8, DeviceError> {
        let mut chip = self.chip.borrow_mut();
        if !chip.present {
            return Err(DeviceError::Bus);
        }
        chip.register_reads += 1;
        match register {
            0x01 => Ok(chip.mode2),
            0x46..=0x49 => Ok(chip.eflags[usize::from(register - 0x46)]),
            _ => Ok(0),
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), DeviceError> {
        let mut chip = self.chip.borrow_mut();
        if !chip.present {
            return Err(DeviceError::Bus);
        }
        chip.register_writes.push((register, value));
        if register == 0x01 && value & MODE2_CLRERR != 0 && !chip.error_sticky {
            chip.mode2 &= !MODE2_ERROR;
            chip.eflags = [0; 4];
        }
        Ok(())
    }

    fn channel_current(&mut self, _channel: u8) -> Result<u8, DeviceError> {
        Ok(self.chip.borrow().current)
    }
}

// ============================================================================
// Mock Bus Scanner
// ============================================================================

#[derive(Default)]
pub struct MockBus {
    chips: Rc<RefCell<Vec<ChipRef>>>,
    scans: Rc<RefCell<Vec<bool>>>,
    probed: Rc<RefCell<Vec<u8>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zweites Handle auf denselben Bus (für die Test-Seite)
    pub fn handle(&self) -> Self {
        Self {
            chips: Rc::clone(&self.chips),
            scans: Rc::clone(&self.scans),
            probed: Rc::clone(&self.probed),
        }
    }

    pub fn attach(&self, chip: &ChipRef) {
        self.chips.borrow_mut().push(Rc::clone(chip));
    }

    /// Liste der bisherigen Scans (`true` = Full-Rescan)
    pub fn scans(&self) -> Vec<bool> {
        self.scans.borrow().clone()
    }

    /// Adressen, die der Scanner bisher geprobt hat
    pub fn probed(&self) -> Vec<u8> {
        self.probed.borrow().clone()
    }
}

impl BusScanner for MockBus {
    type Device = MockDevice;

    fn scan_bus(
        &mut self,
        mapped: &[u8],
        max_devices: usize,
        full_rescan: bool,
    ) -> heapless::Vec<MockDevice, MAX_DEVICES> {
        self.scans.borrow_mut().push(full_rescan);

        let mut present: Vec<ChipRef> = self
            .chips
            .borrow()
            .iter()
            .filter(|chip| !mapped.contains(&chip.borrow().address))
            .inspect(|chip| self.probed.borrow_mut().push(chip.borrow().address))
            .filter(|chip| chip.borrow().present)
            .cloned()
            .collect();
        present.sort_by_key(|chip| chip.borrow().address);

        let mut devices = heapless::Vec::new();
        for chip in present.into_iter().take(max_devices) {
            let (address, type_name) = {
                let c = chip.borrow();
                (c.address, c.type_name)
            };
            let _ = devices.push(MockDevice {
                chip,
                address,
                type_name,
                begun: false,
            });
        }
        devices
    }
}

// ============================================================================
// Mock Pin, Delay, Clock
// ============================================================================

#[derive(Clone, Default)]
pub struct MockPin {
    /// `Some(false)` = low (OE aktiv), `Some(true)` = high
    pub level: Rc<Cell<Option<bool>>>,
    pub writes: Rc<Cell<usize>>,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(Some(false));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(Some(true));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

impl MockPin {
    pub fn is_low(&self) -> bool {
        self.level.get() == Some(false)
    }

    pub fn is_high(&self) -> bool {
        self.level.get() == Some(true)
    }
}

#[derive(Clone, Default)]
pub struct MockDelay {
    pub total_ns: Rc<Cell<u64>>,
    pub calls: Rc<Cell<usize>>,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
        self.calls.set(self.calls.get() + 1);
    }
}

#[derive(Clone, Default)]
pub struct MockClock {
    pub now: Rc<Cell<u64>>,
}

impl MockClock {
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ============================================================================
// Test-Aufbau
// ============================================================================

pub type TestController = PcaController<MockBus, MockPin, MockDelay, MockClock>;

pub struct Rig {
    pub controller: TestController,
    pub bus: MockBus,
    pub pin: MockPin,
    pub delay: MockDelay,
    pub clock: MockClock,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let bus = MockBus::new();
        let pin = MockPin::default();
        let delay = MockDelay::default();
        let clock = MockClock::default();
        let controller = PcaController::new(
            bus.handle(),
            Some(pin.clone()),
            delay.clone(),
            clock.clone(),
            config,
        );
        Self {
            controller,
            bus,
            pin,
            delay,
            clock,
        }
    }

    /// Nächster Slow-Tick: Zeit um ein Scan-Intervall vorstellen und `tick()`
    pub fn slow_tick(&mut self) {
        self.clock.advance(100);
        self.controller.tick();
    }
}
