//! PCA Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert die Treiber-Traits und die komplette Geräte-Engine:
//! Bus-Scan, Lifecycle, Helligkeits-Mapping und Fehler-Überwachung.

#![no_std]

pub mod controller;
pub mod fault;
pub mod identify;
pub mod lifecycle;
pub mod logic;
pub mod mapper;
pub mod registry;
pub mod settings;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use controller::PcaController;
pub use fault::{FaultVerdict, Inspection};
pub use identify::ChipKind;
pub use lifecycle::LifecycleEvent;
pub use logic::{apply_curve, decode_error_flags, normalize_brightness};
pub use registry::{AddressWindow, ScanReport};
pub use settings::{DeviceStatus, PcaSettings, SettingsDocument, StatusView};
pub use traits::{
    BusScanner, Channel, Clock, DeviceError, FaultRegisterMap, FaultRegisters,
    PCA9955B_FAULT_REGISTERS, PwmDevice, ResponseCurve,
};
pub use types::{
    DeviceSlot, EngineConfig, FaultKind, FaultPolicy, MAX_DEVICES, SlotError, SlotState,
};
