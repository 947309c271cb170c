// PCA9685 Treiber - 16-Kanal 12-Bit PWM-Controller
//
// Keine Fehler-Register und keine Hardware-Kennlinie: die Exponential-Kurve
// wird vor dem Schreiben in Software angewendet.

use embedded_hal::i2c::I2c;
use pca_core::logic::duty_to_u12;
use pca_core::{Channel, DeviceError, PwmDevice, ResponseCurve, apply_curve};

pub const TYPE_NAME: &str = "PCA9685";
pub const CHANNELS: u8 = 16;

const MODE1: u8 = 0x00;
const MODE2: u8 = 0x01;
const LED0_ON_L: u8 = 0x06;
const ALL_LED_ON_L: u8 = 0xFA;
pub const PRE_SCALE: u8 = 0xFE;

const MODE1_AI: u8 = 1 << 5;
const MODE1_SLEEP: u8 = 1 << 4;
/// Totem-Pole-Ausgänge
const MODE2_OUTDRV: u8 = 1 << 2;
/// Bit 4 in ON_H/OFF_H: Kanal voll an bzw. voll aus
const FULL: u8 = 1 << 4;

const OSCILLATOR_HZ: u32 = 25_000_000;

/// Prescaler für die gewünschte PWM-Frequenz (gerundet, Bereich 3..=255)
pub fn prescale(frequency_hz: u32) -> u8 {
    let divisor = 4096 * frequency_hz.max(1);
    let value = (OSCILLATOR_HZ + divisor / 2) / divisor;
    value.saturating_sub(1).clamp(3, 255) as u8
}

/// ON_L, ON_H, OFF_L, OFF_H für einen 12-Bit-Wert
fn led_registers(duty: u16) -> [u8; 4] {
    match duty {
        0 => [0, 0, 0, FULL],
        4095.. => [0, FULL, 0, 0],
        _ => [0, 0, (duty & 0xFF) as u8, (duty >> 8) as u8],
    }
}

pub struct Pca9685<I> {
    i2c: I,
    address: u8,
    frequency_hz: u32,
    curve: ResponseCurve,
    begun: bool,
}

impl<I: I2c> Pca9685<I> {
    pub fn new(i2c: I, address: u8, frequency_hz: u32) -> Self {
        Self {
            i2c,
            address,
            frequency_hz,
            curve: ResponseCurve::Linear,
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

    fn write_led(&mut self, first_register: u8, duty: u16) -> Result<(), DeviceError> {
        let [on_l, on_h, off_l, off_h] = led_registers(duty);
        self.i2c
            .write(self.address, &[first_register, on_l, on_h, off_l, off_h])
            .map_err(|_| DeviceError::Bus)
    }
}

impl<I: I2c> PwmDevice for Pca9685<I> {
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
        let Ok(mode1) = self.read_reg(MODE1) else {
            return false;
        };
        // Nach Power-On schläft der Oszillator, `begin()` weckt ihn
        if mode1 & MODE1_SLEEP != 0 {
            self.begun = false;
        }
        true
    }

    fn begin(&mut self) -> Result<(), DeviceError> {
        self.begun = false;

        // PRE_SCALE ist nur im Sleep-Modus beschreibbar
        self.write_reg(MODE1, MODE1_SLEEP)?;
        self.write_reg(PRE_SCALE, prescale(self.frequency_hz))?;
        self.write_reg(MODE2, MODE2_OUTDRV)?;
        self.write_led(ALL_LED_ON_L, 0)?;
        self.write_reg(MODE1, MODE1_AI)?;

        self.begun = true;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        self.begun = false;
        self.write_reg(MODE1, MODE1_SLEEP)
    }

    fn has_begun(&self) -> bool {
        self.begun
    }

    fn set_duty(&mut self, channel: Channel, value: f32) -> Result<(), DeviceError> {
        let duty = duty_to_u12(apply_curve(value, self.curve));
        match channel {
            Channel::All => self.write_led(ALL_LED_ON_L, duty),
            Channel::Index(ch) if ch < CHANNELS => self.write_led(LED0_ON_L + 4 * ch, duty),
            Channel::Index(ch) => Err(DeviceError::InvalidChannel(ch)),
        }
    }

    fn set_response_curve(&mut self, curve: ResponseCurve) -> Result<(), DeviceError> {
        self.curve = curve;
        Ok(())
    }
}
