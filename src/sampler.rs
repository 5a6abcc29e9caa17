/*!
The sampling loop.

Sampling goes through two phases, expressed as two types:

- [`Setup`]: devices are being configured with interrupts masked and the init indicator lit.
- [`Sampler`]: every device is configured; the loop samples, reports, and sleeps.

A [`Setup`] becomes a [`Sampler`] only if all four devices initialize, and there is no way back.
!*/

use std::time::Duration;

use log::{debug, info, warn};

use crate::board::Board;
use crate::clock::{Clock, StopFlag};
use crate::config::Config;
use crate::error::{Device, Error, Quantity};
use crate::hw;
use crate::hw::{FuelGauge, PowerSensor, ReadMode};
use crate::output::DataWriter;
use crate::rail::{PowerState, Rail, Record};

type Result<T> = std::result::Result<T, Error>;

/// The devices the monitor samples.
#[derive(Debug)]
pub struct Devices {
    /// Supply rail power monitor.
    pub supply: Box<dyn PowerSensor>,
    /// Battery rail power monitor.
    pub battery: Box<dyn PowerSensor>,
    /// Load rail power monitor.
    pub load: Box<dyn PowerSensor>,
    /// Battery fuel gauge.
    pub fuel_gauge: Box<dyn FuelGauge>,
}

/// A rail and the sensor measuring it.
#[derive(Debug)]
struct Channel {
    state: PowerState,
    sensor: Box<dyn PowerSensor>,
}

impl Channel {
    fn new(rail: Rail, sensor: Box<dyn PowerSensor>) -> Channel {
        Channel {
            state: PowerState::new(rail),
            sensor,
        }
    }

    /// Overwrite the state with a fresh voltage, power and current reading.
    fn sample(&mut self, failures: &mut u64) {
        let device = Device::Sensor(self.state.rail());
        let sensor = &mut self.sensor;

        let voltage = reading(failures, device, Quantity::Voltage,
                              || sensor.read_voltage(ReadMode::Averaged));
        let power = reading(failures, device, Quantity::Power,
                            || sensor.read_power(ReadMode::Averaged));
        let current = reading(failures, device, Quantity::Current,
                              || sensor.read_current(ReadMode::Instant));

        self.state.voltage = voltage;
        self.state.power = power;
        self.state.current = current;
    }
}

/// Take a reading, substituting NaN if the device fails.
fn reading<F>(failures: &mut u64, device: Device, quantity: Quantity, read: F) -> f32
where
    F: FnOnce() -> hw::Result<f32>
{
    read().unwrap_or_else(|source| {
        *failures += 1;
        warn!("{}", Error::SampleRead { device, quantity, source });
        f32::NAN
    })
}

/// Devices awaiting initialization.
#[derive(Debug)]
pub struct Setup {
    period: Duration,
    period_s: f64,
    channels: [Channel; 3],
    fuel_gauge: Box<dyn FuelGauge>,
}

impl Setup {
    /// Prepare to monitor `devices` as described by `config`.
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: &Config, devices: Devices) -> Result<Setup> {
        config.validate()?;

        let Devices { supply, battery, load, fuel_gauge } = devices;
        Ok(Setup {
            period: config.sample_period(),
            period_s: config.sample_period_s,
            channels: [Channel::new(Rail::Supply, supply),
                       Channel::new(Rail::Battery, battery),
                       Channel::new(Rail::Load, load)],
            fuel_gauge,
        })
    }

    /** Initialize every device, then start reporting to `writer`.

    The power indicator is lit first and left lit.
    The init indicator is lit and interrupts are disabled for the whole initialization;
    interrupts are enabled again once the last device returns, and the indicator is cleared only on success.

    # Errors
    - `Error::DeviceInit` for the first device that fails; later devices are not touched.
    - `Error::Console` if the header cannot be written.
     */
    pub fn initialize<W: DataWriter>(mut self, board: &mut Board, mut writer: W) -> Result<Sampler<W>> {
        board.power_led.set(true);
        board.init_led.set(true);

        board.interrupts.disable();
        let result = self.init_devices();
        board.interrupts.enable();
        result?;

        board.init_led.set(false);
        info!("All devices initialized; sampling every {}s", self.period_s);

        writer.write_header()?;

        let Setup { period, period_s, channels, fuel_gauge } = self;
        Ok(Sampler {
            period,
            period_s,
            channels,
            fuel_gauge,
            battery_soc: 0.0,
            iteration: 0,
            read_failures: 0,
            writer,
        })
    }

    fn init_devices(&mut self) -> Result<()> {
        for channel in self.channels.iter_mut() {
            let device = Device::Sensor(channel.state.rail());
            channel.sensor.init()
                .map_err(|source| Error::DeviceInit { device, source })?;
            info!("{} initialized", device);
        }

        self.fuel_gauge.init()
            .map_err(|source| Error::DeviceInit { device: Device::FuelGauge, source })?;
        info!("{} initialized", Device::FuelGauge);

        Ok(())
    }
}

/// The running monitor.
#[derive(Debug)]
pub struct Sampler<W> {
    period: Duration,
    period_s: f64,
    channels: [Channel; 3],
    fuel_gauge: Box<dyn FuelGauge>,
    battery_soc: f32,
    iteration: u64,
    read_failures: u64,
    writer: W,
}

impl<W: DataWriter> Sampler<W> {
    /** Run one iteration: sample, report, sleep, advance the timestamp.

    A failed device read does not stop the iteration; the field is reported as NaN.

    # Errors
    Returns `Error::Console` if the record cannot be written.
     */
    pub fn step(&mut self, clock: &mut dyn Clock) -> Result<()> {
        for channel in self.channels.iter_mut() {
            channel.sample(&mut self.read_failures);
        }

        let fuel_gauge = &mut self.fuel_gauge;
        self.battery_soc = reading(&mut self.read_failures, Device::FuelGauge, Quantity::StateOfCharge,
                                   || fuel_gauge.read_soc(ReadMode::Averaged));

        let record = self.record();
        self.writer.write_record(&record)?;
        debug!("{}", record);

        clock.sleep(self.period);
        self.iteration += 1;

        Ok(())
    }

    /// Run iterations until `stop` is requested.
    pub fn run(&mut self, clock: &mut dyn Clock, stop: &StopFlag) -> Result<()> {
        while !stop.is_requested() {
            self.step(clock)?;
        }
        info!("Stopped after {} samples ({} failed reads)", self.iteration, self.read_failures);

        Ok(())
    }

    /// The current values, stamped with the current logical time.
    pub fn record(&self) -> Record {
        Record {
            timestamp: self.timestamp(),
            rails: [self.channels[0].state, self.channels[1].state, self.channels[2].state],
            battery_soc: self.battery_soc,
        }
    }

    /// Last sampled state of a rail.
    pub fn rail(&self, rail: Rail) -> &PowerState {
        &self.channels[rail as usize].state
    }

    /// Last sampled battery state of charge, in percent.
    pub fn battery_soc(&self) -> f32 {
        self.battery_soc
    }

    /// Logical time of the next record: completed iterations times the sample period.
    pub fn timestamp(&self) -> f64 {
        self.iteration as f64 * self.period_s
    }

    /// Completed iterations.
    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Device reads that failed since sampling started.
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }
}
