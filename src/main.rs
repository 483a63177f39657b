//! CatFeeder firmware — main entry point.
//!
//! Hexagonal architecture around one synchronous request path:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  HardwareAdapter   LogEventSink   NvsAdapter             │
//! │  (Servo+Delay)     (EventSink)    (Store+Config)         │
//! │  WifiAdapter       MdnsAdapter    HttpSurface            │
//! │  (Connectivity)    (Discovery)    (command surface)      │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │        FeederController (pure logic)           │      │
//! │  │  slot selection · calibration · MotionPlan     │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use catfeeder::adapters::hardware::HardwareAdapter;
use catfeeder::adapters::log_sink::LogEventSink;
use catfeeder::adapters::mdns::MdnsAdapter;
use catfeeder::adapters::nvs::NvsAdapter;
use catfeeder::adapters::wifi::{ConnectivityPort, WifiAdapter};
use catfeeder::app::controller::FeederController;
use catfeeder::app::ports::ConfigPort;
use catfeeder::config::FeederConfig;
use catfeeder::drivers::hw_init;
use catfeeder::drivers::servo::ServoDriver;
use catfeeder::http::server::{FeederSystem, HttpSurface};

// Compile-time station credentials, injected at build time:
// `CATFEEDER_WIFI_SSID=... CATFEEDER_WIFI_PASS=... cargo build`.
const WIFI_SSID: &str = match option_env!("CATFEEDER_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};
const WIFI_PASS: &str = match option_env!("CATFEEDER_WIFI_PASS") {
    Some(pass) => pass,
    None => "",
};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CatFeeder v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1b. Initialise hardware peripherals ───────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // The task watchdog resets the chip after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 2. NVS + config ───────────────────────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            // On next reboot, NVS should self-heal.
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            FeederConfig::default()
        }
    };

    // ── 3. Controller + cold-start snap ───────────────────────
    let mut hw = HardwareAdapter::new(ServoDriver::new());
    let mut sink = LogEventSink::new();
    let mut controller = FeederController::new(&config);
    controller.initialize(&nvs, &mut hw, &mut sink);

    // ── 4. WiFi station ───────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sysloop = EspSystemEventLoop::take().context("system event loop unavailable")?;

    let mut wifi = WifiAdapter::new();
    wifi.attach(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), None)?,
        sysloop,
    )?);
    match wifi.set_credentials(WIFI_SSID, WIFI_PASS) {
        Ok(()) => {
            // Blocking initial connect; failures fall through to the
            // reconnect poll in the park loop.
            if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({e}), will keep retrying");
            }
        }
        Err(e) => warn!("WiFi: no usable credentials ({e}), running offline"),
    }

    // ── 5. mDNS discovery ─────────────────────────────────────
    let mut mdns = MdnsAdapter::new(config.http_port);
    if wifi.is_connected() {
        mdns.start();
    }

    // ── 6. HTTP command surface ───────────────────────────────
    let system = Arc::new(Mutex::new(FeederSystem {
        controller,
        hw,
        store: nvs,
        sink,
    }));
    let _http = HttpSurface::start(config.http_port, Arc::clone(&system))?;

    info!("System ready.");

    // ── 7. Park loop ──────────────────────────────────────────
    // Requests are serviced on the httpd task; this task only keeps
    // the connectivity adapters alive.
    loop {
        FreeRtos::delay_ms(1000);
        wifi.poll();
        if wifi.is_connected() {
            if !mdns.is_active() {
                mdns.start();
            }
        } else if mdns.is_active() {
            mdns.stop();
        }
    }
}
