//! Core Types für die PCA9xxx-Steuerung
//!
//! Datenstrukturen ohne Hardware-Dependencies

/// Maximale Anzahl Chips am Bus (feste Slot-Anzahl)
pub const MAX_DEVICES: usize = 4;

/// Fehlerklasse, die der Fault Monitor für einen Slot erkennt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    Overtemperature,
    OpenCircuit,
    ShortCircuit,
}

/// Fehler-Taxonomie auf Slot-Ebene
///
/// Wird nie an den Aufrufer von `tick()` propagiert, nur im Slot vermerkt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// Kein Chip im Slot (erwarteter Zustand, kein echter Fehler)
    NotPresent,
    /// `begin()` auch nach Reset + Retry fehlgeschlagen
    BeginFailed,
    Overtemperature,
    OpenCircuit,
    ShortCircuit,
}

impl From<FaultKind> for SlotError {
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::Overtemperature => SlotError::Overtemperature,
            FaultKind::OpenCircuit => SlotError::OpenCircuit,
            FaultKind::ShortCircuit => SlotError::ShortCircuit,
        }
    }
}

impl core::fmt::Display for SlotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            SlotError::NotPresent => "not present",
            SlotError::BeginFailed => "begin failed",
            SlotError::Overtemperature => "overtemperature",
            SlotError::OpenCircuit => "open circuit",
            SlotError::ShortCircuit => "short circuit",
        };
        f.write_str(text)
    }
}

/// Lifecycle-Zustand eines Slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    #[default]
    Unoccupied,
    /// Chip gefunden, aber (noch) nicht initialisiert
    Detected,
    Initializing,
    Active,
    Faulted(FaultKind),
    Recovering,
    /// Persistenter Fehler, erst ein Full-Rescan initialisiert den Slot neu
    Disabled(FaultKind),
}

impl SlotState {
    pub fn has_begun(self) -> bool {
        matches!(
            self,
            SlotState::Active | SlotState::Faulted(_) | SlotState::Recovering | SlotState::Disabled(_)
        )
    }

    pub fn is_faulted(self) -> bool {
        matches!(self, SlotState::Faulted(_) | SlotState::Disabled(_))
    }
}

/// Ein Slot im Geräte-Array
///
/// `index` bleibt über Hot-Plug hinweg stabil, `handle` wird vom Scanner
/// ein- und ausgetauscht.
pub struct DeviceSlot<D> {
    pub(crate) index: usize,
    pub(crate) handle: Option<D>,
    pub(crate) state: SlotState,
    /// Vom Host gewünschter Enable-Zustand
    pub(crate) enabled: bool,
    /// Zuletzt angewendeter Enable-Zustand, `None` erzwingt neues Schreiben
    pub(crate) enabled_previous: Option<bool>,
    pub(crate) applied_duty: f32,
    pub(crate) last_error: Option<SlotError>,
}

impl<D> DeviceSlot<D> {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            handle: None,
            state: SlotState::Unoccupied,
            enabled: false,
            enabled_previous: None,
            applied_duty: 0.0,
            last_error: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_occupied(&self) -> bool {
        self.handle.is_some()
    }

    pub fn has_begun(&self) -> bool {
        self.handle.is_some() && self.state.has_begun()
    }

    pub fn is_faulted(&self) -> bool {
        self.state.is_faulted()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Zuletzt geschriebener normierter Duty-Wert
    pub fn applied_duty(&self) -> f32 {
        self.applied_duty
    }

    pub fn last_error(&self) -> Option<SlotError> {
        self.last_error
    }

    pub fn device(&self) -> Option<&D> {
        self.handle.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.handle.as_mut()
    }

    /// Slot leeren, der Enable-Wunsch des Hosts bleibt erhalten
    pub(crate) fn vacate(&mut self) {
        self.handle = None;
        self.state = SlotState::Unoccupied;
        self.enabled_previous = None;
        self.applied_duty = 0.0;
        self.last_error = Some(SlotError::NotPresent);
    }

    pub(crate) fn occupy(&mut self, device: D) {
        self.handle = Some(device);
        self.state = SlotState::Detected;
        self.enabled_previous = None;
        self.applied_duty = 0.0;
        self.last_error = None;
    }
}

/// Schwellen für die Kurzschluss-Unterdrückung (Anteil vom Vollausschlag)
///
/// Kurzschluss-Flags sind bei kleinem Strom unzuverlässig und zählen erst
/// oberhalb dieser Helligkeit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultPolicy {
    pub short_threshold_linear: f32,
    pub short_threshold_exponential: f32,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            short_threshold_linear: 32.0 / 255.0,
            short_threshold_exponential: 144.0 / 255.0,
        }
    }
}

/// Engine-Konfiguration (Takte, Settle-Zeit, Fehler-Policy)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Intervall für den inkrementellen Bus-Scan
    pub scan_interval_ms: u64,
    /// Intervall für die Status-Register-Prüfung
    pub fault_check_interval_ms: u64,
    /// Wartezeit zwischen den beiden CLRERR-Schreibzugriffen
    pub clear_settle_us: u32,
    pub fault_policy: FaultPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 100,
            fault_check_interval_ms: 100,
            clear_settle_us: 1_000,
            fault_policy: FaultPolicy::default(),
        }
    }
}
