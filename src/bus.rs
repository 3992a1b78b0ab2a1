use crate::{Address, Driver, Error, IoWire, Registry, DEFAULT_CAPACITY};
use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use log::debug;

/// A 1-wire line together with its timer and the registry of claimed devices
///
/// Probes borrow the bus, so all traffic and registry updates run on the
/// thread owning it. The bus is not `Sync`.
pub struct OneWireBus<W: IoWire, D: DelayNs, const N: usize = DEFAULT_CAPACITY> {
    link: RefCell<Link<W, D>>,
    registry: RefCell<Registry<N>>,
}

struct Link<W: IoWire, D: DelayNs> {
    driver: Driver<W>,
    delay: D,
}

impl<W: IoWire, D: DelayNs, const N: usize> OneWireBus<W, D, N> {
    pub fn new(io_wire: W, delay: D) -> Self {
        OneWireBus {
            link: RefCell::new(Link {
                driver: Driver::new(io_wire),
                delay,
            }),
            registry: RefCell::new(Registry::new()),
        }
    }

    /// Gives back the wire and the timer
    pub fn release(self) -> (W, D) {
        let Link { driver, delay } = self.link.into_inner();
        (driver.release(), delay)
    }

    /// Runs one transaction with exclusive use of the line. `f` must not
    /// call back into the bus.
    pub(crate) fn transact<T>(
        &self,
        f: impl FnOnce(&mut Driver<W>, &mut D) -> Result<T, Error<W::Error>>,
    ) -> Result<T, Error<W::Error>> {
        let mut link = self.link.borrow_mut();
        let Link { driver, delay } = &mut *link;
        f(driver, delay)
    }

    /// Sends a reset pulse, `Ok(false)` when nobody answered it
    pub fn reset(&self) -> Result<bool, Error<W::Error>> {
        self.transact(|driver, delay| driver.reset_presence(delay))
    }

    /// Searches for a device no probe is bound to yet
    pub fn search_unclaimed(&self) -> Result<Address, Error<W::Error>> {
        let registry = self.registry.borrow();
        self.transact(|driver, delay| driver.search_unclaimed(delay, &*registry))
    }

    /// Whether a new probe could be created on this bus.
    ///
    /// An empty bus, an interrupted or corrupt search and a bus where every
    /// device is taken all answer `false`. Only pin failures are errors.
    pub fn has_unclaimed_device(&self) -> Result<bool, Error<W::Error>> {
        match self.search_unclaimed() {
            Ok(_) => Ok(true),
            Err(
                error @ (Error::NoPresence
                | Error::SearchCollision
                | Error::CrcMismatch(..)
                | Error::NoUnclaimedDevice),
            ) => {
                debug!("no unassigned device: {}", error);
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    pub fn is_claimed(&self, address: &Address) -> bool {
        self.registry.borrow().contains(address)
    }

    /// Number of live probes on this bus
    pub fn claimed(&self) -> usize {
        self.registry.borrow().len()
    }

    pub(crate) fn claim(&self, address: Address) -> Result<(), Error<W::Error>> {
        if self.registry.borrow_mut().insert(address).is_err() {
            return Err(Error::RegistryFull);
        }
        debug!("claimed {}", address);
        Ok(())
    }

    pub(crate) fn unclaim(&self, address: &Address) {
        if self.registry.borrow_mut().remove(address) {
            debug!("released {}", address);
        }
    }
}
