//! Stand-ins for hardware, for tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::board::{Indicator, Interrupts};
use crate::clock::{Clock, StopFlag};
use crate::error::{Device, Quantity};
use crate::hw::bus::{BusError, Transport};
use crate::hw::{DeviceError, FuelGauge, PowerSensor, ReadMode, Result};
use crate::rail::Rail;

/// Something a fake observed.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Led(Led, bool),
    InterruptsDisabled,
    InterruptsEnabled,
    Init(Device),
    Read(Device, Quantity, ReadMode),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Led {
    Power,
    Init,
}

/// Ordered log shared by every fake in a test.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Journal {
    pub fn new() -> Journal {
        Journal::default()
    }

    pub fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

fn no_ack() -> DeviceError {
    DeviceError::Bus(BusError::Transfer {
        address: 0x00,
        reason: "no acknowledgement".to_string(),
    })
}

#[derive(Debug, Default)]
struct SensorState {
    voltage: f32,
    current: f32,
    power: f32,
    fail_init: bool,
    failing: Vec<Quantity>,
}

/// Power sensor returning scripted values. Clones share state.
#[derive(Clone, Debug)]
pub struct MockSensor {
    rail: Rail,
    journal: Journal,
    state: Rc<RefCell<SensorState>>,
}

impl MockSensor {
    pub fn new(rail: Rail, journal: &Journal) -> MockSensor {
        MockSensor {
            rail,
            journal: journal.clone(),
            state: Rc::default(),
        }
    }

    pub fn set(&self, voltage: f32, current: f32, power: f32) {
        let mut state = self.state.borrow_mut();
        state.voltage = voltage;
        state.current = current;
        state.power = power;
    }

    pub fn fail_init(&self) {
        self.state.borrow_mut().fail_init = true;
    }

    pub fn fail_reads(&self, quantity: Quantity) {
        self.state.borrow_mut().failing.push(quantity);
    }

    fn read(&self, quantity: Quantity, mode: ReadMode) -> Result<f32> {
        self.journal.record(Event::Read(Device::Sensor(self.rail), quantity, mode));
        let state = self.state.borrow();
        if state.failing.contains(&quantity) {
            return Err(no_ack());
        }

        Ok(match quantity {
            Quantity::Voltage => state.voltage,
            Quantity::Current => state.current,
            _ => state.power,
        })
    }
}

impl PowerSensor for MockSensor {
    fn init(&mut self) -> Result<()> {
        self.journal.record(Event::Init(Device::Sensor(self.rail)));
        if self.state.borrow().fail_init {
            Err(no_ack())
        } else {
            Ok(())
        }
    }

    fn read_voltage(&mut self, mode: ReadMode) -> Result<f32> {
        self.read(Quantity::Voltage, mode)
    }

    fn read_current(&mut self, mode: ReadMode) -> Result<f32> {
        self.read(Quantity::Current, mode)
    }

    fn read_power(&mut self, mode: ReadMode) -> Result<f32> {
        self.read(Quantity::Power, mode)
    }
}

#[derive(Debug, Default)]
struct GaugeState {
    soc: f32,
    fail_init: bool,
    fail_reads: bool,
}

/// Fuel gauge returning a scripted state of charge. Clones share state.
#[derive(Clone, Debug)]
pub struct MockGauge {
    journal: Journal,
    state: Rc<RefCell<GaugeState>>,
}

impl MockGauge {
    pub fn new(journal: &Journal) -> MockGauge {
        MockGauge {
            journal: journal.clone(),
            state: Rc::default(),
        }
    }

    pub fn set(&self, soc: f32) {
        self.state.borrow_mut().soc = soc;
    }

    pub fn fail_init(&self) {
        self.state.borrow_mut().fail_init = true;
    }

    pub fn fail_reads(&self) {
        self.state.borrow_mut().fail_reads = true;
    }
}

impl FuelGauge for MockGauge {
    fn init(&mut self) -> Result<()> {
        self.journal.record(Event::Init(Device::FuelGauge));
        if self.state.borrow().fail_init {
            Err(DeviceError::InitFailed { register: 0x08, expected: 0x0003, found: 0xFFFF })
        } else {
            Ok(())
        }
    }

    fn read_soc(&mut self, mode: ReadMode) -> Result<f32> {
        self.journal.record(Event::Read(Device::FuelGauge, Quantity::StateOfCharge, mode));
        let state = self.state.borrow();
        if state.fail_reads {
            Err(no_ack())
        } else {
            Ok(state.soc)
        }
    }
}

pub struct MockInterrupts {
    journal: Journal,
}

impl MockInterrupts {
    pub fn new(journal: &Journal) -> MockInterrupts {
        MockInterrupts {
            journal: journal.clone(),
        }
    }
}

impl Interrupts for MockInterrupts {
    fn disable(&mut self) {
        self.journal.record(Event::InterruptsDisabled);
    }

    fn enable(&mut self) {
        self.journal.record(Event::InterruptsEnabled);
    }
}

pub struct MockIndicator {
    led: Led,
    journal: Journal,
}

impl MockIndicator {
    pub fn new(led: Led, journal: &Journal) -> MockIndicator {
        MockIndicator {
            led,
            journal: journal.clone(),
        }
    }
}

impl Indicator for MockIndicator {
    fn set(&mut self, on: bool) {
        self.journal.record(Event::Led(self.led, on));
    }
}

/// Clock that records requested sleeps instead of sleeping.
#[derive(Debug, Default)]
pub struct SimClock {
    sleeps: Vec<Duration>,
    stop: Option<(usize, StopFlag)>,
}

impl SimClock {
    pub fn new() -> SimClock {
        SimClock::default()
    }

    /// Request a stop once `count` sleeps have happened.
    pub fn stopping_after(count: usize, stop: &StopFlag) -> SimClock {
        SimClock {
            sleeps: Vec::new(),
            stop: Some((count, stop.clone())),
        }
    }

    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }
}

impl Clock for SimClock {
    fn sleep(&mut self, period: Duration) {
        self.sleeps.push(period);
        if let Some((count, ref stop)) = self.stop {
            if self.sleeps.len() >= count {
                stop.request();
            }
        }
    }
}

#[derive(Debug, Default)]
struct ConsoleState {
    output: Vec<u8>,
    broken: bool,
}

/// In-memory console. Clones share the buffer.
#[derive(Clone, Debug, Default)]
pub struct Console {
    state: Rc<RefCell<ConsoleState>>,
}

impl Console {
    pub fn new() -> Console {
        Console::default()
    }

    pub fn fail_writes(&self) {
        self.state.borrow_mut().broken = true;
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.state.borrow().output.clone()).unwrap()
    }

    /// Lines without their CR LF terminators.
    pub fn lines(&self) -> Vec<String> {
        self.text()
            .split_terminator("\r\n")
            .map(String::from)
            .collect()
    }
}

impl io::Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.broken {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "console unplugged"));
        }
        state.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Registers {
    values: HashMap<(u8, u8), u16>,
    frozen: HashSet<(u8, u8)>,
    absent: HashSet<u8>,
    selected: Option<u8>,
    selects: usize,
    writes: Vec<(u8, Vec<u8>)>,
}

/// Bus adapter backed by a register file per device address.
///
/// Writes of a register pointer plus a big-endian word store the word; write-reads return it.
/// Every address acknowledges unless removed.
#[derive(Clone, Debug, Default)]
pub struct FakeI2c {
    registers: Arc<Mutex<Registers>>,
}

impl FakeI2c {
    pub fn new() -> FakeI2c {
        FakeI2c::default()
    }

    pub fn set_register(&self, address: u8, reg: u8, value: u16) {
        self.registers.lock().unwrap().values.insert((address, reg), value);
    }

    /// Hold a register at `value`, ignoring writes.
    pub fn freeze_register(&self, address: u8, reg: u8, value: u16) {
        let mut registers = self.registers.lock().unwrap();
        registers.values.insert((address, reg), value);
        registers.frozen.insert((address, reg));
    }

    pub fn remove_device(&self, address: u8) {
        self.registers.lock().unwrap().absent.insert(address);
    }

    pub fn register(&self, address: u8, reg: u8) -> Option<u16> {
        self.registers.lock().unwrap().values.get(&(address, reg)).copied()
    }

    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.registers.lock().unwrap().writes.iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn select_count(&self) -> usize {
        self.registers.lock().unwrap().selects
    }
}

impl Registers {
    fn target(&self) -> std::result::Result<u8, String> {
        let address = self.selected.ok_or_else(|| "no device selected".to_string())?;
        if self.absent.contains(&address) {
            Err("no acknowledgement".to_string())
        } else {
            Ok(address)
        }
    }
}

impl Transport for FakeI2c {
    fn select(&mut self, address: u8) -> std::result::Result<(), String> {
        let mut registers = self.registers.lock().unwrap();
        registers.selected = Some(address);
        registers.selects += 1;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> std::result::Result<usize, String> {
        let mut registers = self.registers.lock().unwrap();
        let address = registers.target()?;
        registers.writes.push((address, bytes.to_vec()));

        if let [reg, hi, lo] = *bytes {
            if !registers.frozen.contains(&(address, reg)) {
                registers.values.insert((address, reg), u16::from_be_bytes([hi, lo]));
            }
        }

        Ok(bytes.len())
    }

    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> std::result::Result<(), String> {
        let registers = self.registers.lock().unwrap();
        let address = registers.target()?;
        let reg = *bytes.first().ok_or_else(|| "empty register pointer".to_string())?;
        let value = registers.values.get(&(address, reg)).copied().unwrap_or(0);

        let word = value.to_be_bytes();
        let n = buffer.len().min(word.len());
        buffer[..n].copy_from_slice(&word[..n]);

        Ok(())
    }
}
