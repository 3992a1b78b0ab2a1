use crate::{
    Address, Error, Family, FunctionCommand, IoWire, NoPowerPin, OneWireBus, Resolution,
    Scope, Scratchpad, DEFAULT_CAPACITY,
};
use core::fmt::Debug;
use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, PinState},
};
use log::{debug, warn};

/// What [`Probe::temperature_or_invalid`] reports for a reading that failed its CRC check
pub const INVALID_CONVERSION: f32 = -1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Scale {
    pub fn from_celsius(&self, celsius: f32) -> f32 {
        match self {
            Scale::Celsius => celsius,
            Scale::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// `'f'` and `'F'` pick Fahrenheit, everything else Celsius
impl From<char> for Scale {
    fn from(scale: char) -> Self {
        match scale {
            'f' | 'F' => Scale::Fahrenheit,
            _ => Scale::Celsius,
        }
    }
}

/// Level that switches the power MOSFET on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

struct PowerControl<P: OutputPin> {
    pin: P,
    polarity: Polarity,
}

impl<P: OutputPin> PowerControl<P> {
    fn switch<E: Debug>(&mut self, on: bool) -> Result<(), Error<E>> {
        let level = on == (self.polarity == Polarity::ActiveHigh);
        self.pin
            .set_state(PinState::from(level))
            .map_err(|_| Error::PowerPinFault)
    }
}

/// One DS18x20 thermometer on a [`OneWireBus`]
///
/// Creating a probe claims the first device on the bus no other probe holds.
/// Dropping it hands the device back.
pub struct Probe<
    'bus,
    W: IoWire,
    D: DelayNs,
    P: OutputPin = NoPowerPin,
    const N: usize = DEFAULT_CAPACITY,
> {
    bus: &'bus OneWireBus<W, D, N>,
    address: Address,
    scratchpad: Scratchpad,
    /// the cached scratchpad passed its CRC check or was written by us
    synced: bool,
    parasite_power: bool,
    power: Option<PowerControl<P>>,
}

impl<'bus, W: IoWire, D: DelayNs, const N: usize> Probe<'bus, W, D, NoPowerPin, N> {
    /// Binds to an unassigned device. Parasite powered devices get their
    /// conversion current through the data line via [`IoWire::hold_high`].
    ///
    /// The `(pin,)` and `(input, output)` wirings only release the line there,
    /// so a parasite device then relies on the pull-up resistor alone. Use
    /// [`Probe::with_power_pin`] or an `IoWire` that drives the line high.
    pub fn new(bus: &'bus OneWireBus<W, D, N>) -> Result<Self, Error<W::Error>> {
        Self::bind(bus, None)
    }
}

impl<'bus, W: IoWire, D: DelayNs, P: OutputPin, const N: usize> Probe<'bus, W, D, P, N> {
    /// Binds to an unassigned device, `pin` drives the MOSFET feeding a
    /// parasite powered device during conversions
    pub fn with_power_pin(
        bus: &'bus OneWireBus<W, D, N>,
        pin: P,
        polarity: Polarity,
    ) -> Result<Self, Error<W::Error>> {
        Self::bind(bus, Some(PowerControl { pin, polarity }))
    }

    fn bind(
        bus: &'bus OneWireBus<W, D, N>,
        power: Option<PowerControl<P>>,
    ) -> Result<Self, Error<W::Error>> {
        let address = bus.search_unclaimed()?;
        bus.claim(address)?;

        // an early return from here on drops the probe, which releases the claim
        let mut probe = Probe {
            bus,
            address,
            scratchpad: Scratchpad::default(),
            synced: false,
            parasite_power: false,
            power,
        };
        if let Some(power) = probe.power.as_mut() {
            power.switch::<W::Error>(false)?;
        }
        probe.parasite_power = !probe.read_power_supply(Scope::ThisDevice)?;
        probe.read_scratchpad()?;

        debug!(
            "bound probe to {} (parasite power: {})",
            probe.address, probe.parasite_power
        );
        Ok(probe)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn family(&self) -> Family {
        self.address.family()
    }

    pub fn is_parasite_powered(&self) -> bool {
        self.parasite_power
    }

    /// The scratchpad as of the last read or write
    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    fn conversion_time_ms(&self, scope: Scope) -> u32 {
        match scope {
            Scope::ThisDevice if self.synced && self.family().has_configurable_resolution() => {
                self.scratchpad.resolution().conversion_time_ms()
            }
            _ => Resolution::Twelve.conversion_time_ms(),
        }
    }

    /// Starts a temperature conversion and returns the milliseconds until
    /// it is done.
    ///
    /// Parasite powered devices are fed for the whole conversion, so the call
    /// blocks and returns 0. Otherwise it only blocks when `wait` is set.
    pub fn convert_temperature(
        &mut self,
        wait: bool,
        scope: Scope,
    ) -> Result<u32, Error<W::Error>> {
        let ms = self.conversion_time_ms(scope);
        let address = self.address;
        let parasite_power = self.parasite_power;
        let power = &mut self.power;

        self.bus.transact(|driver, delay| {
            driver.select(delay, scope, &address)?;
            driver.write_command(delay, FunctionCommand::ConvertT)?;

            if parasite_power {
                match power {
                    Some(power) => {
                        power.switch::<W::Error>(true)?;
                        delay.delay_ms(ms);
                        power.switch::<W::Error>(false)?;
                    }
                    None => driver.strong_pullup(delay, ms)?,
                }
                Ok(0)
            } else if wait {
                delay.delay_ms(ms);
                Ok(0)
            } else {
                Ok(ms)
            }
        })
    }

    /// Reads the 9 scratchpad bytes into the cache. The CRC is not judged
    /// here, see [`Scratchpad::checksum_bad`].
    pub fn read_scratchpad(&mut self) -> Result<&Scratchpad, Error<W::Error>> {
        let address = self.address;
        let mut raw = [0u8; Scratchpad::BYTES];

        self.bus.transact(|driver, delay| {
            driver.match_rom(delay, &address)?;
            driver.write_command(delay, FunctionCommand::ReadScratchpad)?;
            driver.read_bytes(delay, &mut raw)?;
            Ok(())
        })?;

        self.scratchpad = Scratchpad::from(raw);
        self.synced = !self.scratchpad.checksum_bad();
        if !self.synced {
            warn!("scratchpad of {} failed its crc check", self.address);
        }
        Ok(&self.scratchpad)
    }

    /// Reads the last conversion result.
    ///
    /// A scratchpad with a bad CRC gives `Err(CrcMismatch)`, a family that is
    /// not a known thermometer gives `Err(UnsupportedFamily)`.
    pub fn temperature(&mut self, scale: Scale) -> Result<f32, Error<W::Error>> {
        self.read_scratchpad()?;
        let celsius = self.scratchpad.celsius::<W::Error>(self.family())?;
        Ok(scale.from_celsius(celsius))
    }

    /// Like [`Probe::temperature`], with a failed CRC check reported as
    /// [`INVALID_CONVERSION`]
    pub fn temperature_or_invalid(&mut self, scale: Scale) -> Result<f32, Error<W::Error>> {
        match self.temperature(scale) {
            Err(Error::CrcMismatch(..)) => Ok(INVALID_CONVERSION),
            other => other,
        }
    }

    /// Converts on every device, waits, then reads this probe in tenths of a degree
    pub fn temperature_tenths(&mut self, scale: Scale) -> Result<i32, Error<W::Error>> {
        self.convert_temperature(true, Scope::AllDevices)?;
        Ok((self.temperature(scale)? * 10.0) as i32)
    }

    /// Sets a 9 to 12 bit resolution and writes TH, TL and the configuration
    /// register back. Anything else fails before touching the bus.
    ///
    /// A cache that failed its CRC check is read again first; if it is still
    /// corrupt nothing is written and `Err(CrcMismatch)` is returned.
    pub fn set_resolution(&mut self, bits: u8) -> Result<(), Error<W::Error>> {
        let resolution = match Resolution::try_from(bits) {
            Ok(resolution) => resolution,
            Err(bits) => return Err(Error::InvalidResolution(bits)),
        };
        if !self.synced {
            self.read_scratchpad()?;
            self.scratchpad.ensure_correct_crc8::<W::Error>()?;
        }
        self.scratchpad.set_resolution(resolution);
        self.write_scratchpad()
    }

    fn write_scratchpad(&mut self) -> Result<(), Error<W::Error>> {
        let address = self.address;
        let scratchpad = self.scratchpad;
        let with_configuration = self.family().has_configurable_resolution();

        self.bus.transact(|driver, delay| {
            driver.match_rom(delay, &address)?;
            driver.write_command(delay, FunctionCommand::WriteScratchpad)?;
            driver.write_bytes(delay, &[scratchpad.alarm_high(), scratchpad.alarm_low()])?;
            if with_configuration {
                driver.write_byte(delay, scratchpad.configuration())?;
            }
            Ok(())
        })?;

        self.scratchpad.seal();
        self.synced = true;
        Ok(())
    }

    /// `true` when externally powered; with [`Scope::AllDevices`], `false`
    /// means at least one device on the bus is parasite powered
    pub fn read_power_supply(&self, scope: Scope) -> Result<bool, Error<W::Error>> {
        let address = self.address;
        self.bus.transact(|driver, delay| {
            driver.select(delay, scope, &address)?;
            driver.write_command(delay, FunctionCommand::ReadPowerSupply)?;
            Ok(driver.read_bit(delay)?)
        })
    }
}

impl<'bus, W: IoWire, D: DelayNs, P: OutputPin, const N: usize> Drop for Probe<'bus, W, D, P, N> {
    fn drop(&mut self) {
        self.bus.unclaim(&self.address);
    }
}
