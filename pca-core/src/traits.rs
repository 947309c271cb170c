//! Hardware Abstraction Traits
//!
//! Diese Traits definieren die Schnittstellen zur Treiber-Schicht
//! (I²C-Chips, Bus-Scan, Zeitbasis) ohne konkrete Implementierung.
//!
//! Output-Enable-Leitung und Settle-Delay kommen direkt aus `embedded-hal`
//! (`OutputPin`, `DelayNs`).

use heapless::Vec;

use crate::types::MAX_DEVICES;

/// Fehler-Typ für Geräte-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// I²C-Transaktion fehlgeschlagen (NACK, Arbitration, Timeout)
    Bus,
    /// Chip antwortet nicht auf seiner Adresse
    NotConnected,
    /// Kanal-Index größer als `channel_count()`
    InvalidChannel(u8),
    /// Operation wird von dieser Chip-Familie nicht unterstützt
    Unsupported,
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeviceError::Bus => write!(f, "bus transaction failed"),
            DeviceError::NotConnected => write!(f, "device not connected"),
            DeviceError::InvalidChannel(ch) => write!(f, "invalid channel {}", ch),
            DeviceError::Unsupported => write!(f, "operation not supported"),
        }
    }
}

/// Kanal-Auswahl für `set_duty`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Index(u8),
    All,
}

/// Helligkeits-Kennlinie, die der Chip-Treiber auf den linearen Duty-Wert anwendet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseCurve {
    #[default]
    Linear,
    Exponential,
}

impl ResponseCurve {
    pub fn from_exponential(exponential: bool) -> Self {
        if exponential {
            ResponseCurve::Exponential
        } else {
            ResponseCurve::Linear
        }
    }

    pub fn is_exponential(self) -> bool {
        self == ResponseCurve::Exponential
    }
}

/// Trait für einen PWM-LED-Treiber-Chip am I²C-Bus
///
/// Jede Chip-Familie (PCA9955B, PCA9685, ...) implementiert diesen Trait.
///
/// # Implementierungen
/// - **Production:** `AnyPca` (pca-firmware, esp-hal I²C)
/// - **Testing:** `MockDevice` (pca-tests, in-memory Mock)
pub trait PwmDevice {
    /// 7-Bit I²C-Adresse
    fn address(&self) -> u8;

    /// Chip-Bezeichnung für die Diagnose-Anzeige, z.B. "PCA9955B"
    fn type_name(&self) -> &'static str;

    fn channel_count(&self) -> u8;

    /// Prüft ob der Chip elektrisch erreichbar ist (ACK auf seiner Adresse)
    ///
    /// Erkennt der Treiber dabei einen Power-On-Reset, meldet `has_begun()`
    /// danach `false`.
    fn is_connected(&mut self) -> bool;

    /// Initialisiert den Chip (Oszillator, LED-Ausgänge, Strom-Referenz)
    fn begin(&mut self) -> Result<(), DeviceError>;

    /// Software-Reset des Chips
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// `begin()` war erfolgreich und der Chip hat seine Konfiguration noch
    fn has_begun(&self) -> bool;

    /// Schreibt einen normierten Duty-Wert (0.0..=1.0)
    ///
    /// Die aktive `ResponseCurve` wird vom Treiber angewendet.
    fn set_duty(&mut self, channel: Channel, value: f32) -> Result<(), DeviceError>;

    fn set_response_curve(&mut self, curve: ResponseCurve) -> Result<(), DeviceError>;

    /// Capability-Abfrage: Chips mit Fehler-Registern geben sich hier zu erkennen
    fn fault_registers(&mut self) -> Option<&mut dyn FaultRegisters> {
        None
    }
}

/// Register-Layout für die Fehler-Erkennung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRegisterMap {
    pub mode2: u8,
    pub overtemp_mask: u8,
    pub error_mask: u8,
    pub clear_error_mask: u8,
    pub eflags: [u8; 4],
}

/// PCA9955B: MODE2 = 0x01, EFLAG0..3 = 0x46..0x49
pub const PCA9955B_FAULT_REGISTERS: FaultRegisterMap = FaultRegisterMap {
    mode2: 0x01,
    overtemp_mask: 1 << 7,
    error_mask: 1 << 6,
    clear_error_mask: 1 << 4,
    eflags: [0x46, 0x47, 0x48, 0x49],
};

/// Optionale Fähigkeit: Zugriff auf Status-/Fehler-Register
pub trait FaultRegisters {
    fn read_register(&mut self, register: u8) -> Result<u8, DeviceError>;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), DeviceError>;

    fn register_map(&self) -> &'static FaultRegisterMap {
        &PCA9955B_FAULT_REGISTERS
    }

    /// Rückmeldung des eingestellten Ausgangsstroms eines Kanals (IREFx)
    fn channel_current(&mut self, channel: u8) -> Result<u8, DeviceError>;
}

/// Trait für den Bus-Scan der Treiber-Schicht
pub trait BusScanner {
    type Device: PwmDevice;

    /// Probt den Bus und liefert Handles für neu gefundene Chips (aufsteigend nach Adresse)
    ///
    /// Adressen in `mapped` gehören schon einem Slot und werden nicht geprobt.
    /// Bei `full_rescan` darf der Treiber die Chips vorher per Software-Reset
    /// in den Power-On-Zustand bringen und muss den ganzen Adressbereich
    /// absuchen. Ein inkrementeller Scan darf sich auf einen Teil des
    /// Bereichs beschränken.
    fn scan_bus(
        &mut self,
        mapped: &[u8],
        max_devices: usize,
        full_rescan: bool,
    ) -> Vec<Self::Device, MAX_DEVICES>;
}

/// Monotone Millisekunden-Uhr
pub trait Clock {
    fn now_ms(&self) -> u64;
}
