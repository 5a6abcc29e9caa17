//! Monitor errors.

use std::error;
use std::fmt;
use std::fmt::Display;
use std::io;

use rppal::gpio;
use rppal::i2c;
use rppal::uart;

use crate::config;
use crate::hw::DeviceError;
use crate::rail::Rail;

/// A device on the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Device {
    /// Power monitor of a rail.
    Sensor(Rail),
    /// Battery fuel gauge.
    FuelGauge,
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Device::Sensor(rail) => write!(f, "{} sensor", rail),
            Device::FuelGauge => write!(f, "fuel gauge"),
        }
    }
}

/// A sampled quantity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Quantity {
    /// Bus voltage
    Voltage,
    /// Current
    Current,
    /// Power
    Power,
    /// State of charge
    StateOfCharge,
}

impl Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Quantity::*;
        match self {
            Voltage => write!(f, "voltage"),
            Current => write!(f, "current"),
            Power => write!(f, "power"),
            StateOfCharge => write!(f, "state of charge"),
        }
    }
}

/// Monitor error.
#[derive(Debug)]
pub enum Error {
    /// Configuration is unusable.
    Config(config::Error),
    /// A device failed to initialize; sampling must not start.
    DeviceInit {
        /// Device that failed.
        device: Device,
        /// Cause.
        source: DeviceError,
    },
    /// A single read failed while sampling.
    SampleRead {
        /// Device that failed.
        device: Device,
        /// What was being read.
        quantity: Quantity,
        /// Cause.
        source: DeviceError,
    },
    /// Writing to the console failed.
    Console(io::Error),
    /// GPIO acquisition error.
    Gpio(gpio::Error),
    /// I2C acquisition error.
    I2C(i2c::Error),
    /// UART acquisition error.
    UART(uart::Error),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        use Error::*;
        match self {
            Config(ref e) => Some(e),
            DeviceInit { ref source, .. } => Some(source),
            SampleRead { ref source, .. } => Some(source),
            Console(ref e) => Some(e),
            Gpio(ref e) => Some(e),
            I2C(ref e) => Some(e),
            UART(ref e) => Some(e),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;
        match self {
            Config(ref e) => write!(f, "invalid configuration: {}", e),
            DeviceInit { device, ref source } => write!(f, "{} failed to initialize: {}", device, source),
            SampleRead { device, quantity, ref source } =>
                write!(f, "could not read {} from {}: {}", quantity, device, source),
            Console(ref e) => write!(f, "console write failed: {}", e),
            Gpio(ref e) => write!(f, "could not obtain GPIO interface: {}", e),
            I2C(ref e) => write!(f, "could not obtain I2C interface: {}", e),
            UART(ref e) => write!(f, "could not obtain UART interface: {}", e),
        }
    }
}

impl From<config::Error> for Error {
    fn from(e: config::Error) -> Self {
        Error::Config(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Console(e)
    }
}

impl From<gpio::Error> for Error {
    fn from(e: gpio::Error) -> Self {
        Error::Gpio(e)
    }
}

impl From<i2c::Error> for Error {
    fn from(e: i2c::Error) -> Self {
        Error::I2C(e)
    }
}

impl From<uart::Error> for Error {
    fn from(e: uart::Error) -> Self {
        Error::UART(e)
    }
}
