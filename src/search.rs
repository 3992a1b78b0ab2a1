use crate::{Address, Command, Driver, Error, IoWire, OpCode, Registry};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};

/// Scratch state of one search run
///
/// Bit positions are 1-based, a last discrepancy of 0 means the previous
/// pass did not leave any branch unexplored.
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchFrame {
    rom: [u8; 8],
    last_discrepancy: u8,
}

impl SearchFrame {
    pub(crate) fn new() -> SearchFrame {
        SearchFrame::default()
    }

    pub(crate) fn address(&self) -> Address {
        Address::from(self.rom)
    }

    fn is_bit_set(&self, position: u8) -> bool {
        self.address().bit(position - 1)
    }

    fn write_bit(&mut self, position: u8, value: bool) {
        let (index, mask) = Self::locate(position);
        if value {
            self.rom[index] |= mask;
        } else {
            self.rom[index] &= !mask;
        }
    }

    fn locate(position: u8) -> (usize, u8) {
        let bit = position - 1;
        ((bit / 8) as usize, 0x01 << (bit % 8))
    }

    /// Picks the branch at a position where devices disagree and returns it
    /// together with the discrepancy marker for the next pass
    fn resolve(&self, position: u8, marker: u8) -> (bool, u8) {
        if position == self.last_discrepancy {
            (true, marker)
        } else if position > self.last_discrepancy {
            (false, position)
        } else if self.is_bit_set(position) {
            (true, marker)
        } else {
            (false, position)
        }
    }
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    /// One walk down the device tree. Returns the discrepancy marker of the
    /// walk, the assembled code is left in `frame`.
    pub(crate) fn search_pass(
        &mut self,
        frame: &mut SearchFrame,
        delay: &mut impl DelayNs,
    ) -> Result<u8, Error<E>> {
        self.reset(delay)?;
        self.write_byte(delay, Command::SearchRom.op_code())?;

        let mut marker = 0;
        for position in 1..=Address::BITS {
            let bit_a = self.read_bit(delay)?; // normal bit
            let bit_b = self.read_bit(delay)?; // complement bit

            let bit = match (bit_a, bit_b) {
                (true, true) => {
                    warn!("no device answered search bit {}", position);
                    return Err(Error::SearchCollision);
                }
                (false, false) => {
                    let (bit, next) = frame.resolve(position, marker);
                    marker = next;
                    bit
                }
                (bit_a, _) => bit_a,
            };

            frame.write_bit(position, bit);
            self.write_bit(delay, bit)?;
        }

        trace!("search pass done, discrepancy marker {}", marker);
        Ok(marker)
    }

    /// Walks the bus until it finds a device that is not in `registry`.
    ///
    /// Fails with `NoPresence` on an empty bus, `SearchCollision` when a pass
    /// breaks off, `CrcMismatch` for a corrupt code and `NoUnclaimedDevice`
    /// when every device is already claimed. Nothing is retried.
    pub fn search_unclaimed<const N: usize>(
        &mut self,
        delay: &mut impl DelayNs,
        registry: &Registry<N>,
    ) -> Result<Address, Error<E>> {
        let mut frame = SearchFrame::new();
        loop {
            frame.last_discrepancy = self.search_pass(&mut frame, delay)?;
            let address = frame.address();

            if registry.contains(&address) {
                trace!("{} is already claimed", address);
                if frame.last_discrepancy == 0 {
                    return Err(Error::NoUnclaimedDevice);
                }
                continue;
            }

            if let Err(error) = address.ensure_correct_crc8::<E>() {
                warn!("search produced {} with a bad crc", address);
                return Err(error);
            }

            debug!("found unclaimed device {}", address);
            return Ok(address);
        }
    }
}
