//! Support for the INA219 sensor.

use std::thread;
use std::time::Duration;

use log::{debug, trace};

use super::bus::Bus;
use super::filter::WindowAverage;
use super::{DeviceError, PowerSensor, ReadMode, Result};

/// INA219 register addresses.
#[allow(unused)]
mod register {
    pub const CONFIGURATION: u8 = 0x00;
    pub const SHUNT_VOLTAGE: u8 = 0x01;
    pub const BUS_VOLTAGE: u8   = 0x02;
    pub const POWER: u8         = 0x03;
    pub const CURRENT: u8       = 0x04;
    pub const CALIBRATION: u8   = 0x05;
}

/// Conversion factor when reading bus voltage (4mV per value).
const BUS_VOLTAGE_LSB: f32 = 0.004;

/// Bus voltage register flag: current or power calculation out of range.
const BUS_VOLTAGE_OVF: u16 = 0x0001;

/// Samples per averaged read.
const AVERAGE_WINDOW: usize = 4;

/** Measurement configuration; see INA219 documentation for details.

- bus voltage range: 32V
- gain amplifier: /8 (+/- 320mV)
- bus ADC resolution: 12-bit, 532 us conversion time
- shunt ADC resolution: 12-bit, 532 us conversion time
- operating mode: shunt + bus, continuous
*/
const CONFIGURATION: u16 = 0b0_0_1_11_0011_0011_111;

/// Configuration register reset bit.
const RESET: u16 = 1 << 15;

/// Driver for the TI INA219 current sensor.
#[derive(Debug)]
pub struct INA219<B> {
    bus: B,
    address: u8,
    current_lsb: f32,
    calibration: u16,
    voltage: WindowAverage<AVERAGE_WINDOW>,
    current: WindowAverage<AVERAGE_WINDOW>,
    power: WindowAverage<AVERAGE_WINDOW>,
}

impl<B: Bus> INA219<B> {
    const MAX_CURRENT_AMPS: f32 = 3.2;
    const SHUNT_RESISTOR_OHMS: f32 = 0.1;

    /// Create a new INA219 driver.
    ///
    /// Nothing is written to the device until [`PowerSensor::init`].
    pub fn new(bus: B, address: u8) -> INA219<B> {
        let current_lsb = Self::MAX_CURRENT_AMPS / 2f32.powi(15);
        INA219 {
            bus,
            address,
            current_lsb,
            calibration: (0.04096f32 / (current_lsb * Self::SHUNT_RESISTOR_OHMS)) as u16,
            voltage: WindowAverage::new(),
            current: WindowAverage::new(),
            power: WindowAverage::new(),
        }
    }

    /// Reset the INA219.
    pub fn reset(&mut self) -> Result<()> {
        self.write(register::CONFIGURATION, RESET)?;
        thread::sleep(Duration::from_micros(40)); // need >=40us after reset.

        Ok(())
    }

    fn bus_voltage(&mut self) -> Result<f32> {
        // OVF concerns current and power only; the bus voltage stays valid.
        let raw = self.read(register::BUS_VOLTAGE)?;
        Ok(((raw >> 3) as f32) * BUS_VOLTAGE_LSB)
    }

    fn current_amps(&mut self) -> Result<f32> {
        self.check_overflow()?;
        Ok(self.read(register::CURRENT)? as i16 as f32 * self.current_lsb)
    }

    fn power_watts(&mut self) -> Result<f32> {
        self.check_overflow()?;
        Ok(self.read(register::POWER)? as f32 * 20.0f32 * self.current_lsb)
    }

    /// Fail if the last conversion saturated the current and power registers.
    fn check_overflow(&mut self) -> Result<()> {
        if self.read(register::BUS_VOLTAGE)? & BUS_VOLTAGE_OVF != 0 {
            return Err(DeviceError::Overflow);
        }

        Ok(())
    }

    fn verify(&mut self, reg_addr: u8, expected: u16) -> Result<()> {
        let found = self.read(reg_addr)?;
        if found != expected {
            return Err(DeviceError::InitFailed {
                register: reg_addr,
                expected,
                found,
            });
        }

        Ok(())
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

impl<B: Bus> PowerSensor for INA219<B> {
    fn init(&mut self) -> Result<()> {
        self.reset()?;
        self.write(register::CONFIGURATION, CONFIGURATION)?;
        self.write(register::CALIBRATION, self.calibration)?;

        self.verify(register::CONFIGURATION, CONFIGURATION)?;
        self.verify(register::CALIBRATION, self.calibration)?;
        debug!("INA219 0x{:02X}: calibration {}, current LSB {}A",
               self.address, self.calibration, self.current_lsb);

        Ok(())
    }

    fn read_voltage(&mut self, mode: ReadMode) -> Result<f32> {
        let sample = self.bus_voltage()?;
        let averaged = self.voltage.update(sample);
        trace!("INA219 0x{:02X}: {}V (avg {}V)", self.address, sample, averaged);
        Ok(pick(mode, sample, averaged))
    }

    fn read_current(&mut self, mode: ReadMode) -> Result<f32> {
        let sample = self.current_amps()?;
        let averaged = self.current.update(sample);
        trace!("INA219 0x{:02X}: {}A (avg {}A)", self.address, sample, averaged);
        Ok(pick(mode, sample, averaged))
    }

    fn read_power(&mut self, mode: ReadMode) -> Result<f32> {
        let sample = self.power_watts()?;
        let averaged = self.power.update(sample);
        trace!("INA219 0x{:02X}: {}W (avg {}W)", self.address, sample, averaged);
        Ok(pick(mode, sample, averaged))
    }
}

fn pick(mode: ReadMode, sample: f32, averaged: f32) -> f32 {
    match mode {
        ReadMode::Averaged => averaged,
        ReadMode::Instant => sample,
    }
}
