//! Result output formatting.

use std::fmt::Debug;
use std::io;
use std::io::Write;

use crate::rail::Record;

/// Column headings of the report.
pub const HEADER: &str = "Time (s),\
SUPPLY Voltage (V),SUPPLY Current (A),SUPPLY Power (W),\
BATTERY Voltage (V),BATTERY Current (A),BATTERY Power (W),\
LOAD Voltage (V),LOAD Current (A),LOAD Power (W),\
BATTERY SOC";

/// Line terminator of every report line.
pub const LINE_END: &str = "\r\n";

/// Writer for sampled data.
pub trait DataWriter: Debug {
    /// Emit the column headings.
    fn write_header(&mut self) -> io::Result<()>;

    /// Emit one record.
    fn write_record(&mut self, record: &Record) -> io::Result<()>;
}

/// Comma-separated lines over a byte stream.
#[derive(Debug)]
pub struct CSVDataWriter<W> {
    out: W,
}

impl<W: Write> CSVDataWriter<W> {
    /// Write CSV lines to `out`.
    pub fn new(out: W) -> CSVDataWriter<W> {
        CSVDataWriter {
            out,
        }
    }

    /// Returns the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}{}", text, LINE_END)?;
        self.out.flush()
    }
}

impl<W: Write + Debug> DataWriter for CSVDataWriter<W> {
    fn write_header(&mut self) -> io::Result<()> {
        self.line(HEADER)
    }

    fn write_record(&mut self, record: &Record) -> io::Result<()> {
        self.line(&record.to_string())
    }
}
