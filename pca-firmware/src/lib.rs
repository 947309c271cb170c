// Library-Root: Treiber, Tasks und Channel-Typen der Firmware
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von pca-core
pub use pca_core::{PcaController, PcaSettings, SlotError, SlotState, StatusView};

use pca_core::MAX_DEVICES;

// Embassy Channel-Typen
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

use crate::config::{OUTPUT_ENABLE_GPIO, START_ACTIVATE, START_EXPONENTIAL};

// ============================================================================
// Nachrichten
// ============================================================================

/// Host-Kommandos an die Steuer-Task
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum PcaCommand {
    SetBrightness(u8),
    SetExponential(bool),
    SetSlotEnabled { slot: u8, enabled: bool },
    /// Komplette Einstellungen inkl. OE-Pin
    ApplySettings(PcaSettings),
    /// Alle Slots neu erkennen, auch deaktivierte
    FullRescan,
}

/// Diagnose-Snapshot nach einem Engine-Durchlauf
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct PcaStatusMessage {
    pub view: StatusView,
    pub brightness: u8,
    pub output_enabled: bool,
    pub states: [SlotState; MAX_DEVICES],
    pub errors: [Option<SlotError>; MAX_DEVICES],
    pub timestamp_ms: u64,
}

/// Einstellungen beim Boot (aus config.rs)
pub fn boot_settings() -> PcaSettings {
    PcaSettings {
        output_enable_pin: OUTPUT_ENABLE_GPIO,
        exponential: START_EXPONENTIAL,
        activate: START_ACTIVATE,
    }
}

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================

/// Channel für Host-Kommandos (Host → Steuer-Task)
/// - 4: Nachrichten-Kapazität (Boot-Einstellungen + Helligkeit passen rein)
pub type PcaCommandChannel = Channel<NoopRawMutex, PcaCommand, 4>;

/// Sender für Host-Kommandos
pub type PcaCommandSender = Sender<'static, NoopRawMutex, PcaCommand, 4>;

/// Receiver für Host-Kommandos (Steuer-Task empfängt)
pub type PcaCommandReceiver = Receiver<'static, NoopRawMutex, PcaCommand, 4>;

/// PubSubChannel für Status-Broadcasts
/// - 2: Nachrichten-Kapazität im Queue
/// - 2: Maximale Anzahl Subscribers (Status-Log + Host-Anbindung)
/// - 1: Publisher (Steuer-Task)
pub type PcaStatusChannel = PubSubChannel<NoopRawMutex, PcaStatusMessage, 2, 2, 1>;

/// Publisher für Status-Broadcasts
pub type PcaStatusPublisher = Publisher<'static, NoopRawMutex, PcaStatusMessage, 2, 2, 1>;

/// Subscriber für Status-Broadcasts
pub type PcaStatusSubscriber = Subscriber<'static, NoopRawMutex, PcaStatusMessage, 2, 2, 1>;
