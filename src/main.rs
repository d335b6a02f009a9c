//! Firmware entry point: peripheral bring-up, task spawn, WiFi glue.
//!
//! Everything interesting lives in the library; this binary only wires
//! concrete ESP32 peripherals to the adapters, hands each task its writer
//! capability and mailboxes, and pins the tasks across the two cores.

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::gpio::{IOPin, OutputPin};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{self, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use boat_companion::adapters::aux_inputs::Esp32AuxInputs;
use boat_companion::adapters::console::Esp32Console;
use boat_companion::adapters::encoder::Esp32Encoder;
use boat_companion::adapters::gps::Esp32Gps;
use boat_companion::adapters::http::Esp32Http;
use boat_companion::adapters::indicator::Esp32Indicator;
use boat_companion::adapters::instrumentation::Esp32InstrumentationAdc;
use boat_companion::adapters::nvs::NvsFloatStore;
use boat_companion::adapters::probes::Esp32ProbeBus;
use boat_companion::adapters::throttle::Esp32ThrottleDac;
use boat_companion::commands::BlinkRate;
use boat_companion::config::SystemConfig;
use boat_companion::diagnostics::TaskRegistry;
use boat_companion::logging::LogCategories;
use boat_companion::mailbox::Hub;
use boat_companion::pins;
use boat_companion::state::{StateWriters, SystemState};
use boat_companion::tasks;
use boat_companion::tasks::spawn::{spawn_task, Core};

/// Console baud rate (UART0, shared with the log output).
const CONSOLE_BAUD: u32 = 115_200;

static REGISTRY: TaskRegistry = TaskRegistry::new();
static CATEGORIES: LogCategories = LogCategories::all();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  boat-companion v{}               ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Storage, config, shared state ──────────────────────
    let store = match NvsFloatStore::new() {
        Ok(store) => store,
        Err(e) => {
            // Calibration cannot persist this session; NVS usually
            // self-heals on the next reboot.
            return Err(anyhow::anyhow!("NVS init failed: {e}"));
        }
    };
    let config: &'static SystemConfig = Box::leak(Box::new(SystemConfig::default()));
    let (state, writers) = SystemState::leak();
    let hub = Hub::leak();
    let StateWriters {
        instrumentation: instrumentation_writer,
        gps: gps_writer,
        temperatures: temperatures_writer,
        pump_mask: pump_writer,
        dac_output: dac_writer,
    } = writers;

    // ── 3. Hardware adapters ──────────────────────────────────
    let pins_ = peripherals.pins;

    let indicator = Esp32Indicator::new(pins_.gpio2.downgrade_output())?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        pins_.gpio21,
        pins_.gpio22,
        &I2cConfig::new().baudrate(Hertz(100_000)),
    )?;
    let instrumentation_adc = Esp32InstrumentationAdc::new(i2c);

    let aux_inputs =
        Esp32AuxInputs::new().map_err(|e| anyhow::anyhow!("on-chip ADC init failed: {e}"))?;

    let probe_bus = Esp32ProbeBus::new(pins_.gpio15.downgrade(), pins_.gpio4.downgrade())
        .map_err(|e| anyhow::anyhow!("probe bus init failed: {e}"))?;

    let gps_uart = UartDriver::new(
        peripherals.uart2,
        pins_.gpio17,
        pins_.gpio16,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        &uart::config::Config::new().baudrate(Hertz(pins::GPS_BAUD_RATE)),
    )?;
    let gps_receiver = Esp32Gps::new(gps_uart);

    let encoder = Esp32Encoder::new(
        pins_.gpio12.downgrade(),
        pins_.gpio14.downgrade(),
        pins_.gpio27.downgrade(),
    )?;
    let throttle_dac =
        Esp32ThrottleDac::new().map_err(|e| anyhow::anyhow!("throttle DAC init failed: {e:?}"))?;

    let console = Esp32Console::new(CONSOLE_BAUD)
        .map_err(|e| anyhow::anyhow!("console init failed: {e:?}"))?;

    // ── 4. Task spawn ─────────────────────────────────────────
    // Acquisition and control on the APP core; the serial console and its
    // inline HTTP fetches stay on the PRO core with the network stack.
    let _ = spawn_task(&REGISTRY, Core::App, 6, 4, tasks::beacon::NAME, move || {
        tasks::beacon::run(hub, indicator, config);
    });
    let _ = spawn_task(&REGISTRY, Core::App, 4, 6, tasks::temperature::NAME, move || {
        tasks::temperature::run(hub, state, temperatures_writer, probe_bus, &CATEGORIES, config);
    });
    let _ = spawn_task(&REGISTRY, Core::App, 4, 8, tasks::gps::NAME, move || {
        tasks::gps::run(hub, state, gps_writer, gps_receiver, &CATEGORIES, config);
    });
    let _ = spawn_task(&REGISTRY, Core::App, 4, 6, tasks::instrumentation::NAME, move || {
        tasks::instrumentation::run(hub, instrumentation_writer, instrumentation_adc, &CATEGORIES, config);
    });
    let _ = spawn_task(&REGISTRY, Core::App, 5, 8, tasks::auxiliary::NAME, move || {
        tasks::auxiliary::run(hub, pump_writer, aux_inputs, store, &CATEGORIES, config);
    });
    let _ = spawn_task(&REGISTRY, Core::App, 10, 4, tasks::encoder::NAME, move || {
        tasks::encoder::run(dac_writer, encoder, throttle_dac, &CATEGORIES, config);
    });
    let _ = spawn_task(&REGISTRY, Core::Pro, 5, 12, tasks::serial::NAME, move || {
        tasks::serial::run(hub, console, Esp32Http::new());
    });
    let _ = spawn_task(&REGISTRY, Core::Pro, 2, 4, tasks::monitor::NAME, move || {
        tasks::monitor::run(&REGISTRY, &CATEGORIES, config);
    });

    // ── 5. WiFi association (main thread) ─────────────────────
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), None)?,
        sysloop,
    )?;
    associate(&mut wifi, hub, config);

    // Main parks; the tasks own the system from here.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

/// Try each configured network in order until one associates. The beacon
/// runs `Fast` while connecting; `net_ready` gates HTTP fetches.
fn associate(wifi: &mut BlockingWifi<EspWifi<'static>>, hub: &Hub, config: &SystemConfig) {
    hub.beacon.send(BlinkRate::Fast);

    for network in &config.wifi_networks {
        let (Ok(ssid), Ok(password)) = (
            network.ssid.as_str().try_into(),
            network.password.as_str().try_into(),
        ) else {
            warn!("WiFi: credentials for '{}' too long, skipping", network.ssid);
            continue;
        };

        let client = Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        });

        let attempt = (|| -> Result<()> {
            wifi.wifi_mut().set_configuration(&client)?;
            if !wifi.is_started()? {
                wifi.start()?;
            }
            wifi.connect()?;
            wifi.wait_netif_up()?;
            Ok(())
        })();

        match attempt {
            Ok(()) => {
                info!("WiFi: associated with '{}'", network.ssid);
                hub.net_ready.mark_ready();
                hub.beacon.send(BlinkRate::Slow);
                return;
            }
            Err(e) => warn!("WiFi: '{}' failed: {e}", network.ssid),
        }
    }

    warn!("WiFi: no network associated; HTTP fetches stay disabled");
    hub.beacon.send(BlinkRate::Slow);
}
