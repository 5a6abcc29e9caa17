/*! Shared two-wire bus access.

All four devices hang off one I2C bus, and an I2C transaction cannot be interleaved with another one.
[`SharedBus`] serializes every transaction behind a mutex, and re-addresses the adapter only when the next
transaction targets a different device.
An [`Interlock`] additionally lets one thread hold the bus across many transactions, which is how
initialization keeps any other bus user out while it writes configuration registers.
!*/

use std::error;
use std::fmt;
use std::fmt::{Debug, Display};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::thread::ThreadId;

use log::trace;
use rppal::i2c::I2c;

use crate::board::Interrupts;

type Result<T> = std::result::Result<T, BusError>;

/// Bus transaction errors.
#[derive(Clone, Debug, PartialEq)]
pub enum BusError {
    /// The device did not acknowledge or the transfer failed.
    Transfer {
        /// Target device.
        address: u8,
        /// Adapter-reported cause.
        reason: String,
    },
    /// The adapter accepted fewer bytes than were sent.
    ShortWrite {
        /// Target device.
        address: u8,
        /// Bytes accepted.
        written: usize,
        /// Bytes sent.
        expected: usize,
    },
    /// Another bus user panicked mid-transaction.
    Poisoned,
}

impl error::Error for BusError {  }

impl Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use BusError::*;
        match self {
            Transfer { address, reason } => write!(f, "device 0x{:02X}: {}", address, reason),
            ShortWrite { address, written, expected } =>
                write!(f, "device 0x{:02X}: wrote {} of {} bytes", address, written, expected),
            Poisoned => write!(f, "bus lock poisoned"),
        }
    }
}

/// Raw bus adapter that talks to one selected device at a time.
pub trait Transport: Send {
    /// Address subsequent transfers to the device.
    fn select(&mut self, address: u8) -> std::result::Result<(), String>;

    /// Write bytes to the selected device, returning how many were written.
    fn write(&mut self, bytes: &[u8]) -> std::result::Result<usize, String>;

    /// Write bytes, then read into the buffer without releasing the bus in between.
    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> std::result::Result<(), String>;
}

impl Transport for I2c {
    fn select(&mut self, address: u8) -> std::result::Result<(), String> {
        self.set_slave_address(address as u16)
            .map_err(|e| format!("failed to set peripheral address: {}", e))
    }

    fn write(&mut self, bytes: &[u8]) -> std::result::Result<usize, String> {
        I2c::write(self, bytes)
            .map_err(|e| format!("failed to write: {}", e))
    }

    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> std::result::Result<(), String> {
        I2c::write_read(self, bytes, buffer)
            .map_err(|e| format!("failed to perform write-read: {}", e))
    }
}

/// Address-level access to devices on a bus.
pub trait Bus: Debug {
    /// Write bytes to a device.
    fn write(&self, address: u8, bytes: &[u8]) -> Result<()>;

    /// Write bytes to a device and read its response.
    fn write_read(&self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<()>;
}

struct State<T> {
    transport: T,
    selected: Option<u8>,
    owner: Option<ThreadId>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    released: Condvar,
}

/// Clonable handle to a bus adapter shared by several drivers.
pub struct SharedBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> SharedBus<T> {
    /// Share a bus adapter.
    pub fn new(transport: T) -> SharedBus<T> {
        SharedBus {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    transport,
                    selected: None,
                    owner: None,
                }),
                released: Condvar::new(),
            }),
        }
    }

    /// Create a handle that can hold the bus for the calling thread.
    pub fn interlock(&self) -> Interlock<T> {
        Interlock {
            bus: self.clone(),
            held: false,
        }
    }

    /// Lock the bus once no other thread holds it.
    fn lock_available(&self) -> Result<MutexGuard<'_, State<T>>> {
        let me = thread::current().id();
        let mut state = self.inner.state.lock()
            .map_err(|_e| BusError::Poisoned)?;
        while state.owner.map_or(false, |owner| owner != me) {
            state = self.inner.released.wait(state)
                .map_err(|_e| BusError::Poisoned)?;
        }

        Ok(state)
    }

    fn with_device<F, R>(&self, address: u8, op: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> std::result::Result<R, String>
    {
        let mut state = self.lock_available()?;
        if state.selected != Some(address) {
            // Forget the old selection first so a failed select is retried next time.
            state.selected = None;
            state.transport.select(address)
                .map_err(|reason| BusError::Transfer { address, reason })?;
            state.selected = Some(address);
        }

        op(&mut state.transport)
            .map_err(|reason| BusError::Transfer { address, reason })
    }

    fn hold(&self) {
        let me = thread::current().id();
        let mut state = self.inner.state.lock()
            .unwrap_or_else(PoisonError::into_inner);
        while state.owner.map_or(false, |owner| owner != me) {
            state = self.inner.released.wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.owner = Some(me);
    }

    fn release(&self) {
        let me = thread::current().id();
        let mut state = self.inner.state.lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.owner == Some(me) {
            state.owner = None;
            self.inner.released.notify_all();
        }
    }
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        SharedBus {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for SharedBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SharedBus")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<T: Transport> Bus for SharedBus<T> {
    fn write(&self, address: u8, bytes: &[u8]) -> Result<()> {
        trace!("0x{:02X} <- {:02X?}", address, bytes);
        let written = self.with_device(address, |t| t.write(bytes))?;
        if written != bytes.len() {
            return Err(BusError::ShortWrite {
                address,
                written,
                expected: bytes.len(),
            });
        }

        Ok(())
    }

    fn write_read(&self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<()> {
        self.with_device(address, |t| t.write_read(bytes, buffer))?;
        trace!("0x{:02X} {:02X?} -> {:02X?}", address, bytes, buffer);

        Ok(())
    }
}

/// Exclusive hold on a [`SharedBus`], standing in for masking interrupts on this board.
///
/// While disabled, bus transactions from every other thread wait until [`Interrupts::enable`].
pub struct Interlock<T> {
    bus: SharedBus<T>,
    held: bool,
}

impl<T> Debug for Interlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Interlock")
            .field("held", &self.held)
            .finish()
    }
}

impl<T: Transport> Interrupts for Interlock<T> {
    fn disable(&mut self) {
        if !self.held {
            self.bus.hold();
            self.held = true;
        }
    }

    fn enable(&mut self) {
        if self.held {
            self.bus.release();
            self.held = false;
        }
    }
}

impl<T> Drop for Interlock<T> {
    fn drop(&mut self) {
        if self.held {
            let mut state = self.bus.inner.state.lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.owner = None;
            self.bus.inner.released.notify_all();
        }
    }
}
