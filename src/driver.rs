use crate::{Address, Command, Error, IoWire, OpCode, Scope};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Bit and byte transport over a software timed 1-wire line
pub struct Driver<W: IoWire> {
    io_wire: W,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Driver { io_wire }
    }

    /// Gives the wire back
    pub fn release(self) -> W {
        self.io_wire
    }

    /// Resets the bus and addresses either one device or all of them
    pub fn select(
        &mut self,
        delay: &mut impl DelayNs,
        scope: Scope,
        addr: &Address,
    ) -> Result<(), Error<E>> {
        match scope {
            Scope::ThisDevice => self.match_rom(delay, addr),
            Scope::AllDevices => self.skip_rom(delay),
        }
    }

    /// Reset followed by Skip ROM, the next command goes to every device
    pub fn skip_rom(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.write_command(delay, Command::SkipRom)?;
        Ok(())
    }

    /// Reset followed by Match ROM, only the device at `addr` keeps listening
    pub fn match_rom(&mut self, delay: &mut impl DelayNs, addr: &Address) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.write_command(delay, Command::MatchRom)?;
        self.write_bytes(delay, addr.as_ref())?;
        Ok(())
    }

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(WireFault) if the wire seems to be shortened,
    /// Err(NoPresence) if no device answered and Ok(()) once a
    /// presence pulse has been seen. The reset slot always takes the
    /// full 1 ms before the next command may start.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.ensure_wire_high(delay)?;

        self.set_low()?;
        delay.delay_us(500);
        self.set_high()?;

        delay.delay_us(90);
        let presence = self.is_low()?;
        delay.delay_us(410);

        if presence {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    pub fn reset_presence(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        self.reset(delay).map(|_| true).or_else(|error| {
            if matches!(error, Error::NoPresence) {
                Ok(false)
            } else {
                Err(error)
            }
        })
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        for _ in 0..125 {
            if self.is_high()? {
                return Ok(());
            }
            delay.delay_us(2);
        }
        Err(Error::WireFault)
    }

    /// Drives the line high for `ms` milliseconds, then releases it
    pub fn strong_pullup(&mut self, delay: &mut impl DelayNs, ms: u32) -> Result<(), E> {
        self.io_wire.hold_high()?;
        delay.delay_ms(ms);
        self.set_high()
    }

    pub fn read_bytes(&mut self, delay: &mut impl DelayNs, dst: &mut [u8]) -> Result<(), E> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, E> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    /// A short low pulse opens the device's answer window, the line is
    /// sampled 13 µs into the 60 µs slot
    pub fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        self.set_low()?;
        delay.delay_us(3);
        self.set_high()?;
        delay.delay_us(10);
        let val = self.is_high();
        delay.delay_us(45);
        val
    }

    pub fn write_command(&mut self, delay: &mut impl DelayNs, cmd: impl OpCode) -> Result<(), E> {
        self.write_byte(delay, cmd.op_code())
    }

    pub fn write_bytes(&mut self, delay: &mut impl DelayNs, bytes: &[u8]) -> Result<(), E> {
        for b in bytes {
            self.write_byte(delay, *b)?;
        }
        Ok(())
    }

    pub fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), E> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), E> {
        self.set_low()?;
        delay.delay_us(3);
        if high {
            self.set_high()?;
            delay.delay_us(55);
        } else {
            delay.delay_us(55);
            self.set_high()?;
            delay.delay_us(10);
        }
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn set_high(&mut self) -> Result<(), E> {
        self.io_wire.set_high()
    }

    #[inline(always)]
    pub(crate) fn set_low(&mut self) -> Result<(), E> {
        self.io_wire.set_low()
    }

    #[inline(always)]
    pub(crate) fn is_high(&mut self) -> Result<bool, E> {
        self.io_wire.is_high()
    }

    #[inline(always)]
    pub(crate) fn is_low(&mut self) -> Result<bool, E> {
        self.io_wire.is_low()
    }
}
