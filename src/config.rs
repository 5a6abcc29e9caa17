//! Compiled-in configuration.

use std::error;
use std::fmt;
use std::fmt::Display;
use std::time::Duration;

use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, Error>;

/// Lowest non-reserved 7-bit I2C address.
const FIRST_ADDRESS: u8 = 0x08;
/// Highest non-reserved 7-bit I2C address.
const LAST_ADDRESS: u8 = 0x77;

/// Configuration errors.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Sample period is not a positive, finite number of seconds.
    InvalidPeriod(f64),
    /// A device address is reserved or does not fit in 7 bits.
    InvalidAddress(&'static str, u8),
    /// Two devices are configured with the same address.
    DuplicateAddress(&'static str, &'static str, u8),
}

impl error::Error for Error {  }

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;
        match *self {
            InvalidPeriod(period) => write!(f, "sample period must be positive (got {}s)", period),
            InvalidAddress(name, addr) => write!(f, "'{}' is not a usable 7-bit address (0x{:02X})", name, addr),
            DuplicateAddress(first, second, addr) =>
                write!(f, "'{}' and '{}' share address 0x{:02X}", first, second, addr),
        }
    }
}

/// Board and sampling configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Time between samples, in seconds.
    pub sample_period_s: f64,
    /// I2C address of the supply rail INA219.
    pub supply_addr: u8,
    /// I2C address of the battery rail INA219.
    pub battery_addr: u8,
    /// I2C address of the load rail INA219.
    pub load_addr: u8,
    /// I2C address of the MAX17043 fuel gauge.
    pub fuel_gauge_addr: u8,
    /// I2C bus number the devices are wired to.
    pub i2c_bus: u8,
    /// Serial console device.
    pub console_path: String,
    /// Serial console baud rate.
    pub baud_rate: u32,
    /// GPIO (BCM numbering) of the "power available" indicator.
    pub power_led_pin: u8,
    /// GPIO (BCM numbering) of the initialization indicator.
    pub init_led_pin: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sample_period_s: 0.5,
            supply_addr: 0x40,
            battery_addr: 0x41,
            load_addr: 0x44,
            fuel_gauge_addr: 0x36,
            i2c_bus: 1,
            console_path: "/dev/serial0".to_string(),
            baud_rate: 115_200,
            power_led_pin: 17,
            init_led_pin: 27,
        }
    }
}

impl Config {
    /// Returns the sample period as a [`Duration`].
    ///
    /// Only meaningful for a configuration that passed [`Config::validate`].
    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(self.sample_period_s)
    }

    /// Device addresses, labelled, in initialization order.
    pub fn addresses(&self) -> [(&'static str, u8); 4] {
        [("supply_addr", self.supply_addr),
         ("battery_addr", self.battery_addr),
         ("load_addr", self.load_addr),
         ("fuel_gauge_addr", self.fuel_gauge_addr)]
    }

    /// Check that the configuration describes a usable board.
    pub fn validate(&self) -> Result<()> {
        if !self.sample_period_s.is_finite() || self.sample_period_s <= 0.0 {
            return Err(Error::InvalidPeriod(self.sample_period_s));
        }

        let addresses = self.addresses();
        for (i, &(name, addr)) in addresses.iter().enumerate() {
            if addr < FIRST_ADDRESS || addr > LAST_ADDRESS {
                return Err(Error::InvalidAddress(name, addr));
            }

            if let Some(&(other, _)) = addresses[..i].iter().find(|(_, a)| *a == addr) {
                return Err(Error::DuplicateAddress(other, name, addr));
            }
        }

        Ok(())
    }
}
