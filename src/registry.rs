use crate::Address;

/// Number of probes a bus can hold unless told otherwise
pub const DEFAULT_CAPACITY: usize = 16;

/// The registry has no free slot left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

/// Addresses of the devices currently bound to a probe on one bus
///
/// A plain fixed size set, no allocation. An address is in here at most once.
#[derive(Debug, Clone)]
pub struct Registry<const N: usize = DEFAULT_CAPACITY> {
    slots: [Option<Address>; N],
}

impl<const N: usize> Default for Registry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Registry<N> {
    pub const fn new() -> Self {
        Registry { slots: [None; N] }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.iter().any(|claimed| claimed == address)
    }

    /// Adds `address`, returns `Ok(false)` if it was already there
    pub fn insert(&mut self, address: Address) -> Result<bool, RegistryFull> {
        if self.contains(&address) {
            return Ok(false);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(RegistryFull)?;
        *slot = Some(address);
        Ok(true)
    }

    /// Removes `address`, returns whether it was there
    pub fn remove(&mut self, address: &Address) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref() == Some(address))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.slots.iter().flatten()
    }
}
