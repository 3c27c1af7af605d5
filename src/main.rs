//! SurveyRig Firmware — Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  UartTransport      GearedMotion        EspScanSource        │
//! │  (Transport)        (MotionPort)        (ScanSource)         │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │           Session (pure protocol logic)            │      │
//! │  │  Link Driver · Frame Queue · Survey State          │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The outer loop below re-initialises the whole session after any
//! fatal link fault — there is no partial-session resume.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use esp_idf_hal::delay::{Delay, FreeRtos};
    use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
    use esp_idf_hal::units::Hertz;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
    use log::{error, info};

    use surveyrig::adapters::motion::GearedMotion;
    use surveyrig::adapters::uart::UartTransport;
    use surveyrig::adapters::wifi_scan::EspScanSource;
    use surveyrig::config::SystemConfig;
    use surveyrig::drivers::stepper::Stepper;
    use surveyrig::link::driver::{LinkDriver, RxIdle};
    use surveyrig::pins;
    use surveyrig::session::Session;

    /// Let the idle task (and its watchdog) breathe while a read spins.
    struct YieldIdle;

    impl RxIdle for YieldIdle {
        fn on_idle(&mut self) {
            FreeRtos::delay_ms(1);
        }
    }

    fn output_pin(pin: i32) -> anyhow::Result<PinDriver<'static, AnyOutputPin, Output>> {
        let any = unsafe { AnyOutputPin::new(pin) };
        Ok(PinDriver::output(any)?)
    }

    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SurveyRig v{} starting", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::default();
    let peripherals = Peripherals::take().context("peripherals already taken")?;

    // ── UART2 to the camera node ──────────────────────────────
    let uart = UartDriver::new(
        peripherals.uart2,
        unsafe { AnyIOPin::new(pins::UART_TX_GPIO) },
        unsafe { AnyIOPin::new(pins::UART_RX_GPIO) },
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.uart_baud)),
    )
    .context("uart2 init failed")?;
    info!("serial interface initialised at {} baud", config.uart_baud);

    // ── Steppers and motion adapter ───────────────────────────
    let vertical = Stepper::new(
        [
            output_pin(pins::V_STEPPER_GPIOS[0])?,
            output_pin(pins::V_STEPPER_GPIOS[1])?,
            output_pin(pins::V_STEPPER_GPIOS[2])?,
            output_pin(pins::V_STEPPER_GPIOS[3])?,
        ],
        config.stepper_delay_ms,
    );
    let horizontal = Stepper::new(
        [
            output_pin(pins::H_STEPPER_GPIOS[0])?,
            output_pin(pins::H_STEPPER_GPIOS[1])?,
            output_pin(pins::H_STEPPER_GPIOS[2])?,
            output_pin(pins::H_STEPPER_GPIOS[3])?,
        ],
        config.stepper_delay_ms,
    );
    let mut motion = GearedMotion::new(vertical, horizontal, Delay::new_default(), &config);

    // ── WiFi radio, scan-only ─────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    wifi.start().context("wifi start failed")?;
    let mut scanner = EspScanSource::new(wifi);

    // ── Session loop ──────────────────────────────────────────
    let driver = LinkDriver::new(UartTransport::new(uart), YieldIdle);
    let mut session = Session::new(driver, config);

    loop {
        match session.run(&mut motion, &mut scanner) {
            Ok(()) => info!("session closed cleanly; waiting for the next handshake"),
            Err(e) => {
                error!("session failed: {e}; re-initialising");
                FreeRtos::delay_ms(500);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("surveyrig's binary targets ESP-IDF; on the host, run `cargo test`");
}
