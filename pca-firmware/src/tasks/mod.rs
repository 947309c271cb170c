// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Tasks kommunizieren über Embassy Channels (Host → Steuerung, Steuerung → Status).

pub mod pca_control;
pub mod status_log;

// Re-export Tasks für einfachen Import
pub use pca_control::{I2cBus, pca_control_task};
pub use status_log::status_log_task;
