use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// The data line of a 1-wire bus
pub trait IoWire {
    type Error: Error;

    /// Is the line high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Is the line low?
    fn is_low(&mut self) -> Result<bool, Self::Error>;

    /// Pulls the line low
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Releases the line, letting the pull-up resistor take it high
    ///
    /// *NOTE* the actual electrical state of the line may still be low, e.g. when a device
    /// answers a read slot or a presence pulse
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Actively drives the line high to feed parasite powered devices
    ///
    /// Open-drain wiring can only release the line, which is what the default does.
    /// The line goes back to normal operation with [`IoWire::set_high`].
    fn hold_high(&mut self) -> Result<(), Self::Error> {
        self.set_high()
    }
}

/// Single line config wrapper
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Dual line config wrapper
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}

/// Inverted wire wrapper, for lines behind an inverting level shifter
pub struct Inverted<P>(pub P);

impl<I: ErrorType> ErrorType for Inverted<I> {
    type Error = I::Error;
}

impl<I> InputPin for Inverted<I>
where
    I: InputPin,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

impl<O> OutputPin for Inverted<O>
where
    O: OutputPin,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}

/// Placeholder for probes without a power MOSFET control pin
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerPin;

impl ErrorType for NoPowerPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPowerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
