//! Support for the MAX17043 fuel gauge.

use log::{debug, trace};

use super::bus::Bus;
use super::filter::WindowAverage;
use super::{DeviceError, FuelGauge, ReadMode, Result};

/// MAX17043 register addresses.
#[allow(unused)]
mod register {
    pub const VCELL: u8   = 0x02;
    pub const SOC: u8     = 0x04;
    pub const MODE: u8    = 0x06;
    pub const VERSION: u8 = 0x08;
    pub const CONFIG: u8  = 0x0C;
    pub const COMMAND: u8 = 0xFE;
}

/// Restart SOC estimation from the current cell voltage.
const QUICK_START: u16 = 0x4000;

/// RCOMP 0x97, alert at 4% (threshold encoded as 32 - 4).
const CONFIG: u16 = 0x971C;

/// Alert status bit, set by the device and ignored when verifying CONFIG.
const CONFIG_ALERT: u16 = 0x0020;

/// Samples per averaged read.
const AVERAGE_WINDOW: usize = 4;

/// Driver for the Maxim MAX17043 single-cell fuel gauge.
#[derive(Debug)]
pub struct MAX17043<B> {
    bus: B,
    address: u8,
    soc: WindowAverage<AVERAGE_WINDOW>,
}

impl<B: Bus> MAX17043<B> {
    /// Create a new MAX17043 driver.
    ///
    /// Nothing is written to the device until [`FuelGauge::init`].
    pub fn new(bus: B, address: u8) -> MAX17043<B> {
        MAX17043 {
            bus,
            address,
            soc: WindowAverage::new(),
        }
    }

    /// Silicon version.
    pub fn version(&mut self) -> Result<u16> {
        self.read(register::VERSION)
    }

    fn state_of_charge(&mut self) -> Result<f32> {
        let [whole, fraction] = self.read(register::SOC)?.to_be_bytes();
        Ok(whole as f32 + fraction as f32 / 256.0)
    }

    fn read(&mut self, reg_addr: u8) -> Result<u16> {
        let mut out = [0xff; 2];
        self.bus.write_read(self.address, &[reg_addr], &mut out)?;
        Ok(u16::from_be_bytes(out))
    }

    fn write(&mut self, reg_addr: u8, value: u16) -> Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.bus.write(self.address, &[reg_addr, hi, lo])?;
        Ok(())
    }
}

impl<B: Bus> FuelGauge for MAX17043<B> {
    fn init(&mut self) -> Result<()> {
        // An absent device on a bus with pull-ups reads back all ones; a stuck bus reads zeros.
        let version = self.version()?;
        if version == 0x0000 || version == 0xFFFF {
            return Err(DeviceError::InitFailed {
                register: register::VERSION,
                expected: 0x0003,
                found: version,
            });
        }

        self.write(register::MODE, QUICK_START)?;
        self.write(register::CONFIG, CONFIG)?;

        let found = self.read(register::CONFIG)?;
        if found & !CONFIG_ALERT != CONFIG {
            return Err(DeviceError::InitFailed {
                register: register::CONFIG,
                expected: CONFIG,
                found,
            });
        }
        debug!("MAX17043 0x{:02X}: version {:04X}", self.address, version);

        Ok(())
    }

    fn read_soc(&mut self, mode: ReadMode) -> Result<f32> {
        let sample = self.state_of_charge()?;
        let averaged = self.soc.update(sample);
        trace!("MAX17043 0x{:02X}: {}% (avg {}%)", self.address, sample, averaged);

        Ok(match mode {
            ReadMode::Averaged => averaged,
            ReadMode::Instant => sample,
        })
    }
}
