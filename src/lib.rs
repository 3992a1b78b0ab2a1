#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

mod address;
mod bus;
mod command;
mod crc;
mod driver;
mod family;
mod iowire;
mod probe;
mod registry;
mod result;
mod scratchpad;
mod search;

#[cfg(test)]
mod sim;

pub use address::{Address, AddressError};
pub use bus::OneWireBus;
pub use command::{Command, FunctionCommand, OpCode, Scope};
pub use crc::{checksum_bad, compute_partial_crc8, crc8_step};
pub use driver::Driver;
pub use family::Family;
pub use iowire::{Inverted, IoWire, NoPowerPin};
pub use probe::{Polarity, Probe, Scale, INVALID_CONVERSION};
pub use registry::{Registry, RegistryFull, DEFAULT_CAPACITY};
pub use result::Error;
pub use scratchpad::{Resolution, Scratchpad};
