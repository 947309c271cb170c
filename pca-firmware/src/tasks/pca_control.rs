// PCA Steuer-Task - besitzt die Engine und taktet `tick()`
use core::cell::RefCell;

use defmt::{info, warn};
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Ticker};
use embedded_hal::delay::DelayNs;
use esp_hal::Blocking;
use esp_hal::delay::Delay;
use esp_hal::gpio::Flex;
use esp_hal::i2c::master::I2c;
use pca_core::{BusScanner, Clock, EngineConfig, PcaController};

use crate::config::{OUTPUT_ENABLE_GPIO, STATUS_INTERVAL_SECS, TICK_PERIOD_MS};
use crate::hal::{EmbassyClock, I2cBusScanner, output_enable};
use crate::{PcaCommand, PcaCommandReceiver, PcaStatusMessage, PcaStatusPublisher};

/// Geteilter I²C-Bus der Firmware
pub type I2cBus = I2c<'static, Blocking>;

/// Engine mit den ESP32-C6 Adaptern
pub type FirmwareController =
    PcaController<I2cBusScanner<'static, I2cBus>, Flex<'static>, Delay, EmbassyClock>;

/// Nicht benutzte OE-Leitung (als Eingang mit Pull-up freigegeben)
struct ParkedPin {
    number: i8,
    pin: Option<Flex<'static>>,
}

/// Steuer-Logik ohne Task-Attribut
///
/// - Tick alle [`TICK_PERIOD_MS`] (Mapper, Scanner und Fault Monitor)
/// - Kommandos werden sofort übernommen, wirksam beim nächsten Tick
/// - Status-Broadcast nach jedem Kommando und alle [`STATUS_INTERVAL_SECS`]
pub async fn pca_control_logic<S, DL, C>(
    mut controller: PcaController<S, Flex<'static>, DL, C>,
    mut oe_pin: Flex<'static>,
    command_receiver: PcaCommandReceiver,
    status_publisher: PcaStatusPublisher,
) where
    S: BusScanner,
    DL: DelayNs,
    C: Clock,
{
    // OE bleibt geparkt, bis die Einstellungen einen Pin zuweisen
    output_enable::release(&mut oe_pin);
    let mut parked = ParkedPin {
        number: OUTPUT_ENABLE_GPIO,
        pin: Some(oe_pin),
    };

    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    let status_every = (STATUS_INTERVAL_SECS * 1000 / TICK_PERIOD_MS).max(1);
    let mut ticks: u64 = 0;

    loop {
        match select(ticker.next(), command_receiver.receive()).await {
            Either::First(()) => {
                controller.tick();
                ticks += 1;
                if ticks % status_every == 0 {
                    publish_status(&controller, &status_publisher);
                }
            }
            Either::Second(command) => {
                info!("Command received: {}", command);
                handle_command(&mut controller, command, &mut parked);
                publish_status(&controller, &status_publisher);
            }
        }
    }
}

fn handle_command<S, DL, C>(
    controller: &mut PcaController<S, Flex<'static>, DL, C>,
    command: PcaCommand,
    parked: &mut ParkedPin,
) where
    S: BusScanner,
    DL: DelayNs,
    C: Clock,
{
    match command {
        PcaCommand::SetBrightness(brightness) => controller.set_brightness(brightness),
        PcaCommand::SetExponential(exponential) => controller.set_exponential(exponential),
        PcaCommand::SetSlotEnabled { slot, enabled } => {
            controller.set_slot_enabled(usize::from(slot), enabled)
        }
        PcaCommand::ApplySettings(settings) => {
            let current_pin = controller.status_view().output_enable_pin;
            let pin_changed = settings.output_enable_pin != current_pin;
            controller.apply_settings(&settings);
            if pin_changed {
                reassign_output_enable(controller, settings.output_enable_pin, parked);
            }
        }
        PcaCommand::FullRescan => {
            let report = controller.full_rescan();
            info!("Full rescan: {} device(s)", report.occupied);
        }
    }
}

/// Tauscht die OE-Leitung, der alte Pin wird als Eingang mit Pull-up geparkt
fn reassign_output_enable<S, DL, C>(
    controller: &mut PcaController<S, Flex<'static>, DL, C>,
    pin_number: i8,
    parked: &mut ParkedPin,
) where
    S: BusScanner,
    DL: DelayNs,
    C: Clock,
{
    let new_pin = if pin_number == parked.number {
        parked.pin.take().map(|mut pin| {
            output_enable::claim(&mut pin);
            pin
        })
    } else {
        None
    };

    if pin_number >= 0 && new_pin.is_none() {
        warn!("OE: GPIO{} is not wired, outputs stay disabled", pin_number);
    }

    if let Some(mut old) = controller.replace_output_enable(new_pin, pin_number) {
        output_enable::release(&mut old);
        parked.pin = Some(old);
    }
}

fn publish_status<S, DL, C>(
    controller: &PcaController<S, Flex<'static>, DL, C>,
    status_publisher: &PcaStatusPublisher,
) where
    S: BusScanner,
    DL: DelayNs,
    C: Clock,
{
    let slots = controller.slots();
    let message = PcaStatusMessage {
        view: controller.status_view(),
        brightness: controller.brightness(),
        output_enabled: controller.is_output_enabled(),
        states: core::array::from_fn(|i| slots[i].state()),
        errors: core::array::from_fn(|i| slots[i].last_error()),
        timestamp_ms: Instant::now().as_millis(),
    };
    status_publisher.publish_immediate(message);
}

/// PCA Steuer-Task - Embassy Task für parallele Ausführung
///
/// Baut Scanner, Delay und Uhr auf und ruft dann `pca_control_logic()` auf.
///
/// # Parameter
/// - `bus`: geteilter I²C-Bus (RefCell, alle Chips laufen über diesen Bus)
/// - `oe_pin`: GPIO der Output-Enable-Leitung
/// - `command_receiver`: Channel Receiver für Host-Kommandos
/// - `status_publisher`: PubSub Publisher für Status-Broadcasts
#[embassy_executor::task]
pub async fn pca_control_task(
    bus: &'static RefCell<I2cBus>,
    oe_pin: Flex<'static>,
    command_receiver: PcaCommandReceiver,
    status_publisher: PcaStatusPublisher,
) {
    let controller: FirmwareController = PcaController::new(
        I2cBusScanner::new(bus),
        None,
        Delay::new(),
        EmbassyClock,
        EngineConfig::default(),
    );

    pca_control_logic(controller, oe_pin, command_receiver, status_publisher).await;
}
