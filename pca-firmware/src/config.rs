// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen
#![allow(dead_code)]

// ============================================================================
// I²C Bus Konfiguration
// ============================================================================

/// GPIO-Pin für I²C SDA
pub const I2C_SDA_GPIO: u8 = 6;

/// GPIO-Pin für I²C SCL
pub const I2C_SCL_GPIO: u8 = 7;

/// I²C Taktfrequenz in kHz
/// 100 kHz (Standard-Mode) reicht für Helligkeits-Updates und ist robust
/// bei längeren Leitungen zu den LED-Treibern
pub const I2C_FREQUENCY_KHZ: u32 = 100;

/// Niedrigste Adresse für den Bus-Scan (0x00-0x07 sind reserviert)
pub const SCAN_START_ADDR: u8 = 0x08;

/// Höchste Adresse für den Bus-Scan
pub const SCAN_END_ADDR: u8 = 0x77;

/// All-Call-Adresse der PCA-Chips (wird beim Scan übersprungen)
pub const ALL_CALL_ADDR: u8 = 0x70;

/// Adressen pro inkrementellem Scan (Round-Robin)
/// - 8 Probes bei 100 kHz: unter 1 ms Bus-Zeit pro `tick()`
/// - Ganzer Bereich nach 14 Scan-Intervallen (1,4 s bei 100 ms)
pub const SCAN_WINDOW: usize = 8;

// ============================================================================
// LED-Treiber Konfiguration
// ============================================================================

/// Strom-Referenz (IREFALL) für PCA9955B-Ausgänge
/// 0x80 = halber Maximalstrom, schont LEDs und Treiber
pub const PCA9955B_IREF: u8 = 0x80;

/// PWM-Frequenz der PCA9685 in Hz
pub const PCA9685_PWM_FREQUENCY_HZ: u32 = 1000;

// ============================================================================
// Output-Enable Konfiguration
// ============================================================================

/// GPIO-Pin der Output-Enable-Leitung (low-aktiv)
/// Der einzige Pin, der auf dieser Platine mit OE verbunden ist
pub const OUTPUT_ENABLE_GPIO: i8 = 2;

// ============================================================================
// Engine-Takt und Startwerte
// ============================================================================

/// Tick-Periode der Steuer-Task in Millisekunden
/// Die Engine erwartet höchstens 100 ms zwischen zwei `tick()`-Aufrufen
pub const TICK_PERIOD_MS: u64 = 50;

/// Helligkeit nach dem Boot (0-255)
pub const START_BRIGHTNESS: u8 = 64;

/// Exponential-Kennlinie nach dem Boot
pub const START_EXPONENTIAL: bool = false;

/// Enable pro Slot nach dem Boot
pub const START_ACTIVATE: [bool; 4] = [true; 4];

/// Intervall für die Status-Ausgabe in Sekunden
pub const STATUS_INTERVAL_SECS: u64 = 5;

/// JSON-Buffer für die Status-Ansicht
/// Vier Slots mit Adresse und Typ passen in < 400 Bytes
pub const JSON_STATUS_BUFFER_SIZE: usize = 512;
