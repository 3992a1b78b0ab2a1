use crate::{crc, Error, Family};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};

/// 64-bit ROM code of a device: family code, 48-bit serial and CRC-8
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Address {
    raw: [u8; Self::BYTES as usize],
}

impl Default for Address {
    fn default() -> Self {
        Self::from([0; Self::BYTES as usize])
    }
}

impl From<[u8; Self::BYTES as usize]> for Address {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        Address { raw }
    }
}

impl From<Address> for [u8; Address::BYTES as usize] {
    fn from(addr: Address) -> [u8; Address::BYTES as usize] {
        addr.raw
    }
}

impl Deref for Address {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl Address {
    /// The length of device address in bytes
    pub const BYTES: u8 = 8;

    /// The length of device address in bits
    pub const BITS: u8 = Self::BYTES * 8;

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn family(&self) -> Family {
        Family::from(self.family_code())
    }

    /// Serial number, least significant byte first
    pub fn serial(&self) -> &[u8] {
        &self.raw[1..7]
    }

    pub fn crc8(&self) -> u8 {
        self[7]
    }

    /// `true` when the last byte is not the CRC-8 of the first seven
    pub fn checksum_bad(&self) -> bool {
        crc::checksum_bad(self.as_ref())
    }

    pub fn ensure_correct_crc8<E: Debug>(&self) -> Result<(), Error<E>> {
        let computed = crc::compute_partial_crc8(0, &self.raw[..7]);
        if computed != self.crc8() {
            Err(Error::CrcMismatch(computed, self.crc8()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn bit(&self, index: u8) -> bool {
        self.raw[(index / 8) as usize] & (0x01 << (index % 8)) != 0x00
    }
}

/// Error type
#[derive(Debug, PartialEq, Eq)]
pub enum AddressError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; Self::BYTES as usize];
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for byte in raw.iter_mut() {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        *byte = (h << 4) | l;
                    }
                    _ => return Err(AddressError::Invalid),
                },
                _ => return Err(AddressError::NotEnough),
            }
        }

        if chars.next().is_some() {
            return Err(AddressError::Invalid);
        }

        Ok(Address::from(raw))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}
