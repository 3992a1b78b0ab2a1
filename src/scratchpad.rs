use crate::{crc, Error, Family};
use byteorder::{ByteOrder, LittleEndian};
use core::{convert::TryFrom, fmt::Debug, ops::Deref};

const RESOLUTION_MASK: u8 = 0b0110_0000;
const RESOLUTION_SHIFT: u8 = 5;

/// Conversion resolution of the resolution-configurable families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Resolution {
    /// 0.5 °C
    Nine = 9,
    /// 0.25 °C
    Ten = 10,
    /// 0.125 °C
    Eleven = 11,
    /// 0.0625 °C, the power-on default
    #[default]
    Twelve = 12,
}

impl Resolution {
    pub fn bits(&self) -> u8 {
        *self as _
    }

    /// The resolution bits as they sit in the configuration register
    pub fn configuration_bits(&self) -> u8 {
        (self.bits() - 9) << RESOLUTION_SHIFT
    }

    pub fn from_configuration(configuration: u8) -> Self {
        match (configuration & RESOLUTION_MASK) >> RESOLUTION_SHIFT {
            0 => Resolution::Nine,
            1 => Resolution::Ten,
            2 => Resolution::Eleven,
            _ => Resolution::Twelve,
        }
    }

    /// Worst case conversion time
    pub fn conversion_time_ms(&self) -> u32 {
        match self {
            Resolution::Nine => 94,
            Resolution::Ten => 188,
            Resolution::Eleven => 375,
            Resolution::Twelve => 750,
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = u8;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            9 => Ok(Resolution::Nine),
            10 => Ok(Resolution::Ten),
            11 => Ok(Resolution::Eleven),
            12 => Ok(Resolution::Twelve),
            other => Err(other),
        }
    }
}

/// The 9 bytes of device RAM
///
/// | byte | content |
/// |------|---------|
/// | 0, 1 | temperature, little endian two's complement |
/// | 2, 3 | TH and TL alarm registers |
/// | 4    | configuration (DS18B20, DS1822) |
/// | 5    | reserved |
/// | 6, 7 | COUNT_REMAIN and COUNT_PER_C (DS18S20) |
/// | 8    | CRC-8 of bytes 0 to 7 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl Deref for Scratchpad {
    type Target = [u8; Self::BYTES];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl AsRef<[u8]> for Scratchpad {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    pub fn raw_temperature(&self) -> i16 {
        LittleEndian::read_i16(&self.raw[0..2])
    }

    pub fn alarm_high(&self) -> u8 {
        self.raw[2]
    }

    pub fn alarm_low(&self) -> u8 {
        self.raw[3]
    }

    pub fn configuration(&self) -> u8 {
        self.raw[4]
    }

    pub fn count_remain(&self) -> u8 {
        self.raw[6]
    }

    pub fn count_per_c(&self) -> u8 {
        self.raw[7]
    }

    pub fn crc8(&self) -> u8 {
        self.raw[8]
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_configuration(self.configuration())
    }

    /// Rewrites bits 5 and 6 of the configuration byte, the others are kept
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.raw[4] = (self.raw[4] & !RESOLUTION_MASK) | resolution.configuration_bits();
    }

    pub fn checksum_bad(&self) -> bool {
        crc::checksum_bad(&self.raw)
    }

    pub fn ensure_correct_crc8<E: Debug>(&self) -> Result<(), Error<E>> {
        let computed = crc::compute_partial_crc8(0, &self.raw[..8]);
        if computed != self.crc8() {
            Err(Error::CrcMismatch(computed, self.crc8()))
        } else {
            Ok(())
        }
    }

    /// Recomputes the CRC byte after a local edit
    pub(crate) fn seal(&mut self) {
        self.raw[8] = crc::compute_partial_crc8(0, &self.raw[..8]);
    }

    /// Decodes the temperature register, refusing data with a bad CRC
    pub fn celsius<E: Debug>(&self, family: Family) -> Result<f32, Error<E>> {
        self.ensure_correct_crc8()?;
        let raw = self.raw_temperature();
        match family {
            Family::Ds18b20 | Family::Ds1822 => Ok(raw as f32 / 16_f32),
            Family::Ds18s20 => Ok(extended_celsius(
                raw,
                self.count_remain(),
                self.count_per_c(),
            )),
            Family::Other(code) => Err(Error::UnsupportedFamily(code)),
        }
    }
}

/// DS18S20 reading refined with the count-remain registers:
/// `TEMP_READ - 0.25 + (COUNT_PER_C - COUNT_REMAIN) / COUNT_PER_C`
/// where `TEMP_READ` is the half degree register with the 0.5 bit truncated.
fn extended_celsius(raw: i16, count_remain: u8, count_per_c: u8) -> f32 {
    if count_per_c == 0 {
        return raw as f32 / 2_f32;
    }
    let per_c = count_per_c as f32;
    (raw >> 1) as f32 - 0.25 + (per_c - count_remain as f32) / per_c
}
