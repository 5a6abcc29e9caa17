/*! Board-level facilities: interrupt masking, status indicators, and the serial console.

The Raspberry Pi implementations use [`rppal`]; the sampler only sees the traits.
 */

use std::io;

use log::info;
use rppal::gpio::OutputPin;
use rppal::uart;
use rppal::uart::{
    Uart,
    Parity as UARTParity,
};

/// Masking of activity that could preempt the main flow of control.
pub trait Interrupts {
    /// Keep interrupt-driven activity from running.
    fn disable(&mut self);

    /// Allow interrupt-driven activity again.
    fn enable(&mut self);
}

/// A binary status signal (e.g., an LED).
pub trait Indicator {
    /// Turn the indicator on or off.
    fn set(&mut self, on: bool);
}

/// Status indicators the sampler drives.
pub struct Board {
    /// Interrupt masking for the initialization phase.
    pub interrupts: Box<dyn Interrupts>,
    /// Lit for as long as the board has power.
    pub power_led: Box<dyn Indicator>,
    /// Lit only while the devices are being initialized.
    pub init_led: Box<dyn Indicator>,
}

/// An LED on a GPIO pin, lit when the pin is driven high.
#[derive(Debug)]
pub struct LedPin {
    pin: OutputPin,
}

impl LedPin {
    /// Drive an LED from the pin, starting with it off.
    pub fn new(mut pin: OutputPin) -> LedPin {
        pin.set_low();
        LedPin {
            pin,
        }
    }
}

impl Indicator for LedPin {
    fn set(&mut self, on: bool) {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// Serial console on a UART.
#[derive(Debug)]
pub struct UartConsole {
    uart: Uart,
}

impl UartConsole {
    /// Open the UART at `path`: 8N1, no flow control, blocking writes.
    pub fn open(path: &str, baud_rate: u32) -> uart::Result<UartConsole> {
        info!("Opening UART: {} at {} baud", path, baud_rate);
        let mut uart = Uart::with_path(path, baud_rate, UARTParity::None, 8, 1)?;
        uart.set_hardware_flow_control(false)?;
        uart.set_write_mode(true)?;

        Ok(UartConsole {
            uart,
        })
    }
}

impl io::Write for UartConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.uart.write(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.uart.drain()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
