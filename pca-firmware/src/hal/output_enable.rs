// Output-Enable-Leitung (low-aktiv) als Flex-GPIO
//
// Flex erlaubt es, die Leitung bei einer Pin-Umkonfiguration wieder als
// Eingang mit Pull-up freizugeben: die Ausgänge bleiben dann aus.

use esp_hal::gpio::{Flex, InputConfig, Level, OutputConfig, Pull};

/// Konfiguriert den Pin als Ausgang, startet high (Ausgänge aus)
pub fn claim(pin: &mut Flex<'static>) {
    pin.apply_output_config(&OutputConfig::default());
    pin.set_level(Level::High);
    pin.set_output_enable(true);
}

/// Gibt den Pin als Eingang mit Pull-up frei
pub fn release(pin: &mut Flex<'static>) {
    pin.set_output_enable(false);
    pin.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
    pin.set_input_enable(true);
}
