// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Flex;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

use defmt::{info, warn};

// Projekt-Module und Konfiguration
use pca_led_steuerung::config::{
    I2C_FREQUENCY_KHZ, I2C_SCL_GPIO, I2C_SDA_GPIO, OUTPUT_ENABLE_GPIO, START_BRIGHTNESS,
};
use pca_led_steuerung::tasks::{I2cBus, pca_control_task, status_log_task};
use pca_led_steuerung::{PcaCommand, PcaCommandChannel, PcaStatusChannel, boot_settings};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, startet Embassy Runtime und spawnt Tasks.
/// Danach schläft main() - alle Arbeit läuft in Tasks.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // I²C Bus (blocking) - wird über RefCell zwischen allen Chip-Handles geteilt
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("Invalid I2C configuration")
    .with_sda(peripherals.GPIO6)
    .with_scl(peripherals.GPIO7);
    info!(
        "I2C: SDA GPIO{}, SCL GPIO{}, {} kHz",
        I2C_SDA_GPIO, I2C_SCL_GPIO, I2C_FREQUENCY_KHZ
    );

    static I2C_BUS: static_cell::StaticCell<RefCell<I2cBus>> = static_cell::StaticCell::new();
    let bus = &*I2C_BUS.init(RefCell::new(i2c));

    // Output-Enable-Leitung (GPIO2), die Steuer-Task übernimmt die Konfiguration
    let oe_pin = Flex::new(peripherals.GPIO2);
    info!("OE: GPIO{}", OUTPUT_ENABLE_GPIO);

    // Status-Channel erstellen (Steuerung → Status-Log)
    // PubSubChannel für Broadcast: alle Subscribers bekommen jede Nachricht
    static STATUS_CHANNEL: static_cell::StaticCell<PcaStatusChannel> =
        static_cell::StaticCell::new();
    let status_channel = &*STATUS_CHANNEL.init(PcaStatusChannel::new());
    let status_publisher = status_channel.publisher().unwrap();
    let status_subscriber = status_channel.subscriber().unwrap();

    // Command-Channel erstellen (Host → Steuerung)
    static COMMAND_CHANNEL: static_cell::StaticCell<PcaCommandChannel> =
        static_cell::StaticCell::new();
    let command_channel = &*COMMAND_CHANNEL.init(PcaCommandChannel::new());
    let command_sender = command_channel.sender();

    // Boot-Einstellungen vorab einreihen, die Steuer-Task liest sie beim Start
    for command in [
        PcaCommand::ApplySettings(boot_settings()),
        PcaCommand::SetBrightness(START_BRIGHTNESS),
    ] {
        if command_sender.try_send(command).is_err() {
            warn!("Command channel full, dropped {}", command);
        }
    }

    // Spawn Steuer-Task (besitzt Engine, Bus-Scanner und OE-Leitung)
    spawner
        .spawn(pca_control_task(
            bus,
            oe_pin,
            command_channel.receiver(),
            status_publisher,
        ))
        .unwrap();

    // Spawn Status-Log Task
    spawner.spawn(status_log_task(status_subscriber)).unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
