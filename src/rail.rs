//! Monitored power rails and their sampled state.

use std::fmt;
use std::fmt::Display;

/// A monitored power net.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Rail {
    /// External supply input
    Supply,
    /// Battery terminal
    Battery,
    /// Output to the load
    Load,
}

impl Rail {
    /// Every rail, in sampling and reporting order.
    pub const ALL: [Rail; 3] = [Rail::Supply, Rail::Battery, Rail::Load];

    /// Label used in the report header.
    pub fn label(&self) -> &'static str {
        use Rail::*;
        match self {
            Supply => "SUPPLY",
            Battery => "BATTERY",
            Load => "LOAD",
        }
    }
}

impl Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Most recent measurements of one rail.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PowerState {
    rail: Rail,
    /// Bus voltage in volts.
    pub voltage: f32,
    /// Current in amps.
    pub current: f32,
    /// Power in watts.
    pub power: f32,
}

impl PowerState {
    /// Create an unsampled (all zero) state for the rail.
    pub fn new(rail: Rail) -> PowerState {
        PowerState {
            rail,
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
        }
    }

    /// The rail this state describes.
    pub fn rail(&self) -> Rail {
        self.rail
    }
}

/// One row of the report: every rail plus the battery state of charge at a logical time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Record {
    /// Logical timestamp in seconds.
    pub timestamp: f64,
    /// Rail states in [`Rail::ALL`] order.
    pub rails: [PowerState; 3],
    /// Battery state of charge in percent.
    pub battery_soc: f32,
}

impl Display for Record {
    /// Comma-separated fields: time, then V/A/W for each rail, then SOC.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Microsecond resolution hides the error of n * period, e.g. 0.30000000000000004.
        write!(f, "{}", (self.timestamp * 1e6).round() / 1e6)?;
        for state in self.rails.iter() {
            write!(f, ",{},{},{}", state.voltage, state.current, state.power)?;
        }
        write!(f, ",{}", self.battery_soc)
    }
}
