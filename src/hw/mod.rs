//! Drivers for the power monitoring hardware.

use std::error;
use std::fmt;
use std::fmt::{Debug, Display};

pub mod bus;
pub mod filter;
pub mod ina219;
pub mod max17043;

pub use bus::{Bus, BusError, SharedBus, Transport};
pub use ina219::INA219;
pub use max17043::MAX17043;

/// Result type of device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// How a device read is reported.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadMode {
    /// Rolling average of recent samples.
    Averaged,
    /// The sample just taken.
    Instant,
}

/// Device-level errors.
#[derive(Debug)]
pub enum DeviceError {
    /// Transport-level failure talking to the device.
    Bus(BusError),
    /// A register did not hold what was written to it during initialization.
    InitFailed {
        /// Register address.
        register: u8,
        /// Value the register should hold.
        expected: u16,
        /// Value read back.
        found: u16,
    },
    /// The device flagged the measurement as out of range.
    Overflow,
}

impl error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DeviceError::Bus(ref e) => Some(e),
            _ => None,
        }
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DeviceError::*;
        match self {
            Bus(ref e) => write!(f, "bus transaction failed: {}", e),
            InitFailed { register, expected, found } =>
                write!(f, "register 0x{:02X} reads 0x{:04X} after configuration (expected 0x{:04X})",
                       register, found, expected),
            Overflow => write!(f, "measurement overflowed"),
        }
    }
}

impl From<BusError> for DeviceError {
    fn from(e: BusError) -> Self {
        DeviceError::Bus(e)
    }
}

/// A power monitor on one rail.
pub trait PowerSensor: Debug {
    /// Configure measurement range and calibration.
    fn init(&mut self) -> Result<()>;

    /// Bus voltage in volts.
    fn read_voltage(&mut self, mode: ReadMode) -> Result<f32>;

    /// Current in amps.
    fn read_current(&mut self, mode: ReadMode) -> Result<f32>;

    /// Power in watts.
    fn read_power(&mut self, mode: ReadMode) -> Result<f32>;
}

/// A battery fuel gauge.
pub trait FuelGauge: Debug {
    /// Prepare the gauge for state of charge estimation.
    fn init(&mut self) -> Result<()>;

    /// State of charge in percent.
    fn read_soc(&mut self, mode: ReadMode) -> Result<f32>;
}
