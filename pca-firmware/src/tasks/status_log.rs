// Status-Log Task - gibt Engine-Snapshots über defmt aus
use defmt::{error, info, warn};
use pca_core::settings::ROOT_KEY;

use crate::config::JSON_STATUS_BUFFER_SIZE;
use crate::{PcaStatusMessage, PcaStatusSubscriber};

/// Serialisiert die Status-Ansicht im Format der Host-Konfiguration
///
/// Gibt die Anzahl geschriebener Bytes zurück, `None` wenn der Buffer zu klein ist.
pub fn render_status(message: &PcaStatusMessage, buf: &mut [u8]) -> Option<usize> {
    serde_json_core::to_slice(&message.view, buf).ok()
}

/// Status-Log Task
///
/// Loggt jeden Snapshot als JSON und meldet Slots mit Fehler einzeln.
#[embassy_executor::task]
pub async fn status_log_task(mut status_subscriber: PcaStatusSubscriber) {
    let mut buf = [0u8; JSON_STATUS_BUFFER_SIZE];

    loop {
        let message = status_subscriber.next_message_pure().await;

        info!(
            "Status @ {} ms: brightness {}, OE {}",
            message.timestamp_ms,
            message.brightness,
            if message.output_enabled { "on" } else { "off" }
        );

        match render_status(&message, &mut buf) {
            Some(len) => match core::str::from_utf8(&buf[..len]) {
                Ok(json) => info!("{}: {}", ROOT_KEY, json),
                Err(_) => error!("Status JSON is not valid UTF-8"),
            },
            None => error!("Status JSON exceeds {} bytes", JSON_STATUS_BUFFER_SIZE),
        }

        for (index, (state, last_error)) in message.states.iter().zip(message.errors).enumerate() {
            if state.is_faulted() {
                warn!("Slot {}: {} ({})", index, state, last_error);
            }
        }
    }
}
