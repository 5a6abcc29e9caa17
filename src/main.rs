//! Power rail logger

use std::process;

use env_logger::Env;
use log::{error, info, warn};
use rppal::gpio::Gpio;
use rppal::i2c::I2c;

use railmon::board::{Board, LedPin, UartConsole};
use railmon::clock::{StopFlag, SystemClock};
use railmon::hw::{SharedBus, INA219, MAX17043};
use railmon::output::CSVDataWriter;
use railmon::{Config, Devices, Error, Setup};

fn main() {
    let env = Env::default().filter_or("LOG_LEVEL", "info");
    env_logger::init_from_env(env);

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let config = Config::default();
    config.validate()?;
    match serde_json::to_string(&config) {
        Ok(json) => info!("Configuration: {}", json),
        Err(e) => warn!("could not serialize configuration: {}", e),
    }

    let gpio = Gpio::new()?;
    let power_led = LedPin::new(gpio.get(config.power_led_pin)?.into_output());
    let mut init_pin = gpio.get(config.init_led_pin)?.into_output();
    // A failed initialization exits with the init indicator still lit.
    init_pin.set_reset_on_drop(false);
    let init_led = LedPin::new(init_pin);

    let bus = SharedBus::new(I2c::with_bus(config.i2c_bus)?);
    let devices = Devices {
        supply: Box::new(INA219::new(bus.clone(), config.supply_addr)),
        battery: Box::new(INA219::new(bus.clone(), config.battery_addr)),
        load: Box::new(INA219::new(bus.clone(), config.load_addr)),
        fuel_gauge: Box::new(MAX17043::new(bus.clone(), config.fuel_gauge_addr)),
    };
    let mut board = Board {
        interrupts: Box::new(bus.interlock()),
        power_led: Box::new(power_led),
        init_led: Box::new(init_led),
    };

    let console = UartConsole::open(&config.console_path, config.baud_rate)?;
    let writer = CSVDataWriter::new(console);

    let mut sampler = Setup::new(&config, devices)?
        .initialize(&mut board, writer)?;
    info!("Sampling");

    // Nothing requests a stop; the loop runs until reset or power loss.
    let stop = StopFlag::new();
    sampler.run(&mut SystemClock, &stop)
}
