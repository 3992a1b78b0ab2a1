/// Thermometer family, taken from the first byte of the ROM code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// DS18S20 / DS1820, fixed 9-bit register extended by the count-remain bytes
    Ds18s20,
    Ds18b20,
    Ds1822,
    Other(u8),
}

impl Family {
    pub const DS18S20: u8 = 0x10;
    pub const DS18B20: u8 = 0x28;
    pub const DS1822: u8 = 0x22;

    pub fn code(&self) -> u8 {
        match self {
            Family::Ds18s20 => Self::DS18S20,
            Family::Ds18b20 => Self::DS18B20,
            Family::Ds1822 => Self::DS1822,
            Family::Other(code) => *code,
        }
    }

    /// Whether the configuration register selects 9 to 12 bit conversions
    pub fn has_configurable_resolution(&self) -> bool {
        matches!(self, Family::Ds18b20 | Family::Ds1822)
    }
}

impl From<u8> for Family {
    fn from(code: u8) -> Self {
        match code {
            Self::DS18S20 => Family::Ds18s20,
            Self::DS18B20 => Family::Ds18b20,
            Self::DS1822 => Family::Ds1822,
            other => Family::Other(other),
        }
    }
}
