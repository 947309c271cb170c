// I²C Bus-Scanner - findet PCA9955B und PCA9685 Chips
//
// Jeder gefundene Chip bekommt ein eigenes `RefCellDevice` auf den
// gemeinsamen Bus. Der Chip-Typ wird an MODE2 und PRE_SCALE erkannt,
// unbekannte Bausteine werden nicht angefasst.
//
// Full-Rescan: ganzer Adressbereich. Inkrementell: nur ein kurzes
// Round-Robin-Fenster pro Durchlauf, belegte Adressen prüft die Engine
// selbst über ihre Handles.

use core::cell::RefCell;

use defmt::{debug, info};
use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use heapless::Vec;
use pca_core::identify::{ChipKind, identify};
use pca_core::{
    AddressWindow, BusScanner, Channel, DeviceError, FaultRegisters, MAX_DEVICES, PwmDevice,
    ResponseCurve,
};

use super::pca9685::{self, Pca9685};
use super::pca9955b::Pca9955b;
use crate::config::{
    ALL_CALL_ADDR, PCA9685_PWM_FREQUENCY_HZ, PCA9955B_IREF, SCAN_END_ADDR, SCAN_START_ADDR,
    SCAN_WINDOW,
};

const MODE2: u8 = 0x01;
/// General Call Adresse + Software-Reset-Byte (beide Chip-Typen)
const GENERAL_CALL_ADDR: u8 = 0x00;
const SWRST: u8 = 0x06;

/// Ein Chip am Bus, Typ zur Laufzeit bestimmt
pub enum AnyPca<I> {
    Pca9955b(Pca9955b<I>),
    Pca9685(Pca9685<I>),
}

macro_rules! dispatch {
    ($self:ident, $dev:ident => $body:expr) => {
        match $self {
            AnyPca::Pca9955b($dev) => $body,
            AnyPca::Pca9685($dev) => $body,
        }
    };
}

impl<I: I2c> PwmDevice for AnyPca<I> {
    fn address(&self) -> u8 {
        dispatch!(self, dev => dev.address())
    }

    fn type_name(&self) -> &'static str {
        dispatch!(self, dev => dev.type_name())
    }

    fn channel_count(&self) -> u8 {
        dispatch!(self, dev => dev.channel_count())
    }

    fn is_connected(&mut self) -> bool {
        dispatch!(self, dev => dev.is_connected())
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        dispatch!(self, dev => dev.begin())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        dispatch!(self, dev => dev.reset())
    }

    fn has_begun(&self) -> bool {
        dispatch!(self, dev => dev.has_begun())
    }

    fn set_duty(&mut self, channel: Channel, value: f32) -> Result<(), DeviceError> {
        dispatch!(self, dev => dev.set_duty(channel, value))
    }

    fn set_response_curve(&mut self, curve: ResponseCurve) -> Result<(), DeviceError> {
        dispatch!(self, dev => dev.set_response_curve(curve))
    }

    fn fault_registers(&mut self) -> Option<&mut dyn FaultRegisters> {
        dispatch!(self, dev => dev.fault_registers())
    }
}

/// Scanner über einen geteilten I²C-Bus
pub struct I2cBusScanner<'a, T> {
    bus: &'a RefCell<T>,
    window: AddressWindow,
}

impl<'a, T: I2c> I2cBusScanner<'a, T> {
    pub fn new(bus: &'a RefCell<T>) -> Self {
        Self {
            bus,
            window: AddressWindow::new(SCAN_START_ADDR, SCAN_END_ADDR),
        }
    }

    fn read_reg(i2c: &mut RefCellDevice<'a, T>, address: u8, register: u8) -> Option<u8> {
        let mut buf = [0u8; 1];
        i2c.write_read(address, &[register], &mut buf).ok()?;
        Some(buf[0])
    }

    /// Liest MODE2 als Präsenz-Test, PRE_SCALE nur wenn nötig
    fn probe(&self, address: u8) -> Option<AnyPca<RefCellDevice<'a, T>>> {
        let mut i2c = RefCellDevice::new(self.bus);
        let mode2 = Self::read_reg(&mut i2c, address, MODE2)?;

        let kind = identify(
            mode2,
            || Self::read_reg(&mut i2c, address, pca9685::PRE_SCALE),
            pca9685::prescale(PCA9685_PWM_FREQUENCY_HZ),
        );
        match kind {
            Some(ChipKind::Pca9955b) => Some(AnyPca::Pca9955b(Pca9955b::new(
                i2c,
                address,
                PCA9955B_IREF,
            ))),
            Some(ChipKind::Pca9685) => Some(AnyPca::Pca9685(Pca9685::new(
                i2c,
                address,
                PCA9685_PWM_FREQUENCY_HZ,
            ))),
            None => {
                debug!("I2C: unknown device @ {:#x} skipped", address);
                None
            }
        }
    }

    fn probe_into(
        &self,
        address: u8,
        mapped: &[u8],
        devices: &mut Vec<AnyPca<RefCellDevice<'a, T>>, MAX_DEVICES>,
    ) {
        if address == ALL_CALL_ADDR || mapped.contains(&address) {
            return;
        }
        if let Some(device) = self.probe(address) {
            debug!("I2C: {} @ {:#x}", device.type_name(), address);
            // Kapazität prüft der Aufrufer
            let _ = devices.push(device);
        }
    }
}

impl<'a, T: I2c> BusScanner for I2cBusScanner<'a, T> {
    type Device = AnyPca<RefCellDevice<'a, T>>;

    fn scan_bus(
        &mut self,
        mapped: &[u8],
        max_devices: usize,
        full_rescan: bool,
    ) -> Vec<Self::Device, MAX_DEVICES> {
        let limit = max_devices.min(MAX_DEVICES);
        let mut devices = Vec::new();

        if full_rescan {
            // Alle Chips in den Power-On-Zustand, kein ACK ist kein Fehler
            let mut i2c = RefCellDevice::new(self.bus);
            let _ = i2c.write(GENERAL_CALL_ADDR, &[SWRST]);
            info!("I2C: full rescan {:#x}..={:#x}", SCAN_START_ADDR, SCAN_END_ADDR);

            for address in self.window.range() {
                if devices.len() >= limit {
                    break;
                }
                self.probe_into(address, mapped, &mut devices);
            }
            return devices;
        }

        let mut window = self.window;
        for address in window.by_ref().take(SCAN_WINDOW) {
            self.probe_into(address, mapped, &mut devices);
            if devices.len() >= limit {
                break;
            }
        }
        self.window = window;
        devices
    }
}
