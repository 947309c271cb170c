// PCA9955B Treiber - 16-Kanal Konstantstrom-LED-Treiber mit Fehlererkennung
//
// Der Chip meldet Übertemperatur sowie offene und kurzgeschlossene Ausgänge
// über MODE2 und EFLAG0..3. Die Engine fragt diese Register über
// `FaultRegisters` ab.

use embedded_hal::i2c::I2c;
use pca_core::identify::is_pca9955b;
use pca_core::logic::duty_to_u8;
use pca_core::{Channel, DeviceError, FaultRegisters, PwmDevice, ResponseCurve};

pub const TYPE_NAME: &str = "PCA9955B";
pub const CHANNELS: u8 = 16;

const MODE1: u8 = 0x00;
const MODE2: u8 = 0x01;
const LEDOUT0: u8 = 0x02;
const PWM0: u8 = 0x08;
const IREF0: u8 = 0x18;
const PWMALL: u8 = 0x44;
const IREFALL: u8 = 0x45;

/// Auto-Increment-Flag im Register-Byte
const AUTO_INCREMENT: u8 = 1 << 7;
const MODE1_SLEEP: u8 = 1 << 4;
/// Hardware-Exponential-Kennlinie
const MODE2_EXP_EN: u8 = 1 << 2;
/// LEDOUT: alle vier Ausgänge pro Register über PWMx steuern
const LEDOUT_INDIVIDUAL: u8 = 0xAA;

pub struct Pca9955b<I> {
    i2c: I,
    address: u8,
    iref: u8,
    begun: bool,
}

impl<I: I2c> Pca9955b<I> {
    pub fn new(i2c: I, address: u8, iref: u8) -> Self {
        Self {
            i2c,
            address,
            iref,
            begun: false,
        }
    }

    fn read_reg(&mut self, register: u8) -> Result<u8, DeviceError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|_| DeviceError::Bus)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, register: u8, value: u8) -> Result<(), DeviceError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|_| DeviceError::Bus)
    }
}

impl<I: I2c> PwmDevice for Pca9955b<I> {
    fn address(&self) -> u8 {
        self.address
    }

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn channel_count(&self) -> u8 {
        CHANNELS
    }

    fn is_connected(&mut self) -> bool {
        if !self.read_reg(MODE2).is_ok_and(is_pca9955b) {
            return false;
        }
        // IREFx steht nach Power-On auf 0, `begin()` setzt IREFALL
        if self.begun && self.iref != 0 && self.read_reg(IREF0) == Ok(0) {
            self.begun = false;
        }
        true
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        self.begun = false;

        // Oszillator an, alle Ausgänge erst einmal aus
        self.write_reg(MODE1, 0x00)?;
        self.write_reg(PWMALL, 0x00)?;
        self.i2c
            .write(
                self.address,
                &[
                    LEDOUT0 | AUTO_INCREMENT,
                    LEDOUT_INDIVIDUAL,
                    LEDOUT_INDIVIDUAL,
                    LEDOUT_INDIVIDUAL,
                    LEDOUT_INDIVIDUAL,
                ],
            )
            .map_err(|_| DeviceError::Bus)?;
        self.write_reg(IREFALL, self.iref)?;

        if !is_pca9955b(self.read_reg(MODE2)?) {
            return Err(DeviceError::Bus);
        }
        self.begun = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        self.begun = false;
        self.write_reg(PWMALL, 0x00)?;
        self.write_reg(MODE1, MODE1_SLEEP)
    }

    fn has_begun(&self) -> bool {
        self.begun
    }

    fn set_duty(&mut self, channel: Channel, value: f32) -> Result<(), DeviceError> {
        // Exponential-Kennlinie rechnet der Chip selbst (EXP_EN)
        let duty = duty_to_u8(value);
        match channel {
            Channel::All => self.write_reg(PWMALL, duty),
            Channel::Index(ch) if ch < CHANNELS => self.write_reg(PWM0 + ch, duty),
            Channel::Index(ch) => Err(DeviceError::InvalidChannel(ch)),
        }
    }

    fn set_response_curve(&mut self, curve: ResponseCurve) -> Result<(), DeviceError> {
        let mode2 = self.read_reg(MODE2)?;
        let mode2 = if curve.is_exponential() {
            mode2 | MODE2_EXP_EN
        } else {
            mode2 & !MODE2_EXP_EN
        };
        // Status-Bits 7:6 sind read-only, Schreiben ist unkritisch
        self.write_reg(MODE2, mode2)
    }

    fn fault_registers(&mut self) -> Option<&mut dyn FaultRegisters> {
        Some(self)
    }
}

impl<I: I2c> FaultRegisters for Pca9955b<I> {
    fn read_register(&mut self, register: u8) -> Result<u8, DeviceError> {
        self.read_reg(register)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), DeviceError> {
        self.write_reg(register, value)
    }

    fn channel_current(&mut self, channel: u8) -> Result<u8, DeviceError> {
        if channel >= CHANNELS {
            return Err(DeviceError::InvalidChannel(channel));
        }
        self.read_reg(IREF0 + channel)
    }
}
