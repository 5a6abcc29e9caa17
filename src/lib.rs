/*!
Power rail monitoring for a battery-powered board.

Three INA219 power monitors (supply, battery and load rails) and a MAX17043 fuel gauge share one I2C bus.
The devices are configured once with bus activity locked out, after which the [`sampler::Sampler`] loop reads every device,
writes one CSV record to the serial console, and sleeps for the sample period, until the board is reset.

Hardware access sits behind the traits in [`hw`], [`board`] and [`clock`] so the loop runs the same against fakes.
!*/

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod hw;
pub mod output;
pub mod rail;
pub mod sampler;

#[cfg(test)]
pub(crate) mod mock;

pub use config::Config;
pub use error::Error;
pub use sampler::{Devices, Sampler, Setup};
