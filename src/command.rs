pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM commands, understood by every device on the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    MatchRom = 0x55,
    SearchRom = 0xF0,
    SkipRom = 0xCC,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Function commands of the DS18x20 thermometer family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCommand {
    ConvertT = 0x44,
    WriteScratchpad = 0x4E,
    ReadScratchpad = 0xBE,
    ReadPowerSupply = 0xB4,
}

impl OpCode for FunctionCommand {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Which devices a transaction is addressed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Scope {
    /// Only the probe's own device, selected with Match ROM
    ThisDevice,
    /// Every device on the bus at once, via Skip ROM
    #[default]
    AllDevices,
}
