// Millisekunden-Uhr für die Engine-Takte

use embassy_time::Instant;
use pca_core::Clock;

/// Monotone Uhr auf Basis von `embassy_time::Instant`
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
