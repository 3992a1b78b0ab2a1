use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E: Sized + Debug> {
    /// Wire not high
    WireFault,
    /// No presence on wire
    NoPresence,
    /// Both complementary search bits read high, nobody answered
    SearchCollision,
    /// Computed and received CRC-8
    CrcMismatch(u8, u8),
    /// Every device on the bus is already bound to a probe
    NoUnclaimedDevice,
    /// The bus registry has no room for another probe
    RegistryFull,
    InvalidResolution(u8),
    UnsupportedFamily(u8),
    PowerPinFault,
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}

impl<E: Sized + Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Error::WireFault => write!(f, "1-wire line is not pulled high"),
            Error::NoPresence => write!(f, "no presence pulse after reset"),
            Error::SearchCollision => write!(f, "no device answered during ROM search"),
            Error::CrcMismatch(computed, received) => write!(
                f,
                "crc mismatch {{ computed={:02x}, received={:02x} }}",
                computed, received
            ),
            Error::NoUnclaimedDevice => write!(f, "no unassigned device left on the bus"),
            Error::RegistryFull => write!(f, "device registry is full"),
            Error::InvalidResolution(bits) => {
                write!(f, "resolution of {} bits is outside 9..=12", bits)
            }
            Error::UnsupportedFamily(code) => write!(f, "unsupported family code {:02x}", code),
            Error::PowerPinFault => write!(f, "power control pin failed"),
            Error::PortError(e) => write!(f, "pin error: {:?}", e),
        }
    }
}
