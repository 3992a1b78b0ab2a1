//! Timed 1-wire bus simulator used by the unit tests.
//!
//! The wire and the delay share one clock. Slots are decoded from how long the
//! master keeps the line low: 480 µs or more is a reset, less than 15 µs a one
//! (or a read slot), anything in between a zero. Devices decide what to answer
//! at the falling edge and pull the line low for 30 µs when answering a zero.

use crate::{compute_partial_crc8, Address, Family, IoWire, OneWireBus};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use std::{cell::RefCell, rc::Rc, vec::Vec};

const RESET_MIN_NS: u64 = 480_000;
const WRITE_ZERO_MIN_NS: u64 = 15_000;
const ANSWER_WINDOW_NS: u64 = 30_000;
const PRESENCE_START_NS: u64 = 15_000;
const PRESENCE_END_NS: u64 = 135_000;

/// ROM code with a valid CRC for `family` and the low 48 bits of `serial`
pub fn rom(family: u8, serial: u64) -> [u8; 8] {
    let mut rom = [0u8; 8];
    rom[0] = family;
    rom[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
    rom[7] = compute_partial_crc8(0, &rom[..7]);
    rom
}

fn seal(scratchpad: &mut [u8; 9]) {
    scratchpad[8] = compute_partial_crc8(0, &scratchpad[..8]);
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Bit,
    Complement,
    Direction,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    RomCommand { byte: u8, bits: u8 },
    MatchRom { index: u8 },
    Search { index: u8, step: Step },
    Function { byte: u8, bits: u8 },
    ReadScratchpad { index: u8 },
    WriteScratchpad { data: [u8; 3], index: u8 },
    ReadPowerSupply,
}

/// A DS18x20 on the simulated bus
#[derive(Debug, Clone)]
pub struct Thermometer {
    rom: [u8; 8],
    scratchpad: [u8; 9],
    parasite: bool,
    reading: i16,
    count_remain: u8,
    count_per_c: u8,
    corrupt: bool,
    conversions: usize,
    state: State,
}

impl Thermometer {
    pub fn new(family: u8, serial: u64) -> Self {
        Self::with_rom(rom(family, serial))
    }

    /// Uses `rom` as is, even with a broken CRC
    pub fn with_rom(rom: [u8; 8]) -> Self {
        let configurable = Family::from(rom[0]).has_configurable_resolution();
        let mut scratchpad = if configurable {
            [0x50, 0x05, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x00]
        } else {
            [0xAA, 0x00, 0x4B, 0x46, 0xFF, 0xFF, 0x0C, 0x10, 0x00]
        };
        seal(&mut scratchpad);
        Thermometer {
            rom,
            scratchpad,
            parasite: false,
            reading: if configurable { 0x0191 } else { 0x0032 },
            count_remain: 0x0C,
            count_per_c: 0x10,
            corrupt: false,
            conversions: 0,
            state: State::Idle,
        }
    }

    pub fn parasite(mut self) -> Self {
        self.parasite = true;
        self
    }

    /// Raw temperature register the next conversion produces
    pub fn reading(mut self, raw: i16) -> Self {
        self.reading = raw;
        self
    }

    pub fn counts(mut self, count_remain: u8, count_per_c: u8) -> Self {
        self.count_remain = count_remain;
        self.count_per_c = count_per_c;
        self
    }

    /// Every scratchpad update leaves a wrong CRC byte behind
    pub fn corrupt_scratchpad(mut self) -> Self {
        self.corrupt = true;
        self
    }

    pub fn scratchpad(&self) -> [u8; 9] {
        self.scratchpad
    }

    pub fn conversions(&self) -> usize {
        self.conversions
    }

    fn configurable(&self) -> bool {
        Family::from(self.rom[0]).has_configurable_resolution()
    }

    fn rom_bit(&self, index: u8) -> bool {
        Address::from(self.rom).bit(index)
    }

    fn update(&mut self) {
        seal(&mut self.scratchpad);
        if self.corrupt {
            self.scratchpad[8] ^= 0x5A;
        }
    }

    fn convert(&mut self) {
        self.scratchpad[..2].copy_from_slice(&self.reading.to_le_bytes());
        if !self.configurable() {
            self.scratchpad[6] = self.count_remain;
            self.scratchpad[7] = self.count_per_c;
        }
        self.conversions += 1;
        self.update();
    }

    fn write_len(&self) -> u8 {
        if self.configurable() {
            3
        } else {
            2
        }
    }

    fn store(&mut self, data: [u8; 3]) {
        self.scratchpad[2] = data[0];
        self.scratchpad[3] = data[1];
        if self.configurable() {
            self.scratchpad[4] = (data[2] & 0x60) | 0x1F;
        }
        self.update();
    }

    fn reset(&mut self) {
        self.state = State::RomCommand { byte: 0, bits: 0 };
    }

    fn answer(&self) -> Option<bool> {
        match self.state {
            State::Search {
                index,
                step: Step::Bit,
            } => Some(self.rom_bit(index)),
            State::Search {
                index,
                step: Step::Complement,
            } => Some(!self.rom_bit(index)),
            State::ReadScratchpad { index } => {
                Some(self.scratchpad[(index / 8) as usize] & (1 << (index % 8)) != 0)
            }
            State::ReadPowerSupply => Some(!self.parasite),
            _ => None,
        }
    }

    fn slot(&mut self, written: bool) {
        self.state = match self.state {
            State::Idle => State::Idle,
            State::RomCommand { byte, bits } => {
                let byte = byte | ((written as u8) << bits);
                if bits < 7 {
                    State::RomCommand {
                        byte,
                        bits: bits + 1,
                    }
                } else {
                    match byte {
                        0x55 => State::MatchRom { index: 0 },
                        0xCC => State::Function { byte: 0, bits: 0 },
                        0xF0 => State::Search {
                            index: 0,
                            step: Step::Bit,
                        },
                        _ => State::Idle,
                    }
                }
            }
            State::MatchRom { index } => {
                if written != self.rom_bit(index) {
                    State::Idle
                } else if index == 63 {
                    State::Function { byte: 0, bits: 0 }
                } else {
                    State::MatchRom { index: index + 1 }
                }
            }
            State::Search { index, step } => match step {
                Step::Bit => State::Search {
                    index,
                    step: Step::Complement,
                },
                Step::Complement => State::Search {
                    index,
                    step: Step::Direction,
                },
                Step::Direction => {
                    if written != self.rom_bit(index) || index == 63 {
                        State::Idle
                    } else {
                        State::Search {
                            index: index + 1,
                            step: Step::Bit,
                        }
                    }
                }
            },
            State::Function { byte, bits } => {
                let byte = byte | ((written as u8) << bits);
                if bits < 7 {
                    State::Function {
                        byte,
                        bits: bits + 1,
                    }
                } else {
                    match byte {
                        0x44 => {
                            self.convert();
                            State::Idle
                        }
                        0xBE => State::ReadScratchpad { index: 0 },
                        0x4E => State::WriteScratchpad {
                            data: [0; 3],
                            index: 0,
                        },
                        0xB4 => State::ReadPowerSupply,
                        _ => State::Idle,
                    }
                }
            }
            State::ReadScratchpad { index } => {
                if index == 71 {
                    State::Idle
                } else {
                    State::ReadScratchpad { index: index + 1 }
                }
            }
            State::WriteScratchpad { mut data, index } => {
                data[(index / 8) as usize] |= (written as u8) << (index % 8);
                if index + 1 == self.write_len() * 8 {
                    self.store(data);
                    State::Idle
                } else {
                    State::WriteScratchpad {
                        data,
                        index: index + 1,
                    }
                }
            }
            State::ReadPowerSupply => State::ReadPowerSupply,
        };
    }
}

/// Echoes every written byte back in the following eight read slots
#[derive(Debug, Clone, Default)]
struct Loopback {
    bits: [bool; 8],
    count: usize,
    replaying: bool,
}

impl Loopback {
    fn reset(&mut self) {
        *self = Loopback::default();
    }

    fn answer(&self) -> Option<bool> {
        self.replaying.then(|| self.bits[self.count])
    }

    fn slot(&mut self, written: bool) {
        if !self.replaying {
            self.bits[self.count] = written;
        }
        self.count += 1;
        if self.count == 8 {
            self.count = 0;
            self.replaying = !self.replaying;
        }
    }
}

#[derive(Debug, Clone)]
enum Responder {
    Thermometer(Thermometer),
    Loopback(Loopback),
    /// Answers the reset pulse and nothing else
    Ghost,
}

impl Responder {
    fn reset(&mut self) {
        match self {
            Responder::Thermometer(t) => t.reset(),
            Responder::Loopback(l) => l.reset(),
            Responder::Ghost => {}
        }
    }

    fn answer(&self) -> Option<bool> {
        match self {
            Responder::Thermometer(t) => t.answer(),
            Responder::Loopback(l) => l.answer(),
            Responder::Ghost => None,
        }
    }

    fn slot(&mut self, written: bool) {
        match self {
            Responder::Thermometer(t) => t.slot(written),
            Responder::Loopback(l) => l.slot(written),
            Responder::Ghost => {}
        }
    }
}

#[derive(Default)]
struct Line {
    now_ns: u64,
    master_low: bool,
    fell_at: u64,
    answers: Vec<Option<bool>>,
    presence: Option<(u64, u64)>,
    holding_since: Option<u64>,
    strong_pullups_ns: Vec<u64>,
    falling_edges: usize,
    written: Vec<bool>,
    responders: Vec<Responder>,
}

impl Line {
    fn level(&self) -> bool {
        if self.master_low {
            return false;
        }
        if let Some((from, until)) = self.presence {
            if (from..until).contains(&self.now_ns) {
                return false;
            }
        }
        let answering = self.now_ns - self.fell_at < ANSWER_WINDOW_NS;
        !(answering && self.answers.iter().any(|answer| *answer == Some(false)))
    }

    fn fall(&mut self) {
        if self.master_low {
            return;
        }
        self.master_low = true;
        self.fell_at = self.now_ns;
        self.falling_edges += 1;
        self.answers = self.responders.iter().map(Responder::answer).collect();
    }

    fn rise(&mut self) {
        if let Some(since) = self.holding_since.take() {
            self.strong_pullups_ns.push(self.now_ns - since);
        }
        if !self.master_low {
            return;
        }
        self.master_low = false;
        let low = self.now_ns - self.fell_at;
        if low >= RESET_MIN_NS {
            self.written.clear();
            self.presence = (!self.responders.is_empty()).then(|| {
                (
                    self.now_ns + PRESENCE_START_NS,
                    self.now_ns + PRESENCE_END_NS,
                )
            });
            self.responders.iter_mut().for_each(Responder::reset);
        } else {
            let bit = low < WRITE_ZERO_MIN_NS;
            self.written.push(bit);
            self.responders.iter_mut().for_each(|r| r.slot(bit));
        }
    }
}

/// Handle on a simulated bus, cheap to clone
#[derive(Clone, Default)]
pub struct Sim {
    line: Rc<RefCell<Line>>,
}

impl Sim {
    pub fn new() -> Self {
        Sim::default()
    }

    fn attach(self, responder: Responder) -> Self {
        self.line.borrow_mut().responders.push(responder);
        self
    }

    pub fn with_thermometer(self, thermometer: Thermometer) -> Self {
        self.attach(Responder::Thermometer(thermometer))
    }

    pub fn with_loopback(self) -> Self {
        self.attach(Responder::Loopback(Loopback::default()))
    }

    pub fn with_ghost(self) -> Self {
        self.attach(Responder::Ghost)
    }

    pub fn wire(&self) -> SimWire {
        SimWire(self.line.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.line.clone())
    }

    pub fn bus(&self) -> OneWireBus<SimWire, SimDelay> {
        OneWireBus::new(self.wire(), self.delay())
    }

    pub fn now_us(&self) -> u64 {
        self.line.borrow().now_ns / 1000
    }

    pub fn falling_edges(&self) -> usize {
        self.line.borrow().falling_edges
    }

    pub fn strong_pullups_ms(&self) -> Vec<u64> {
        self.line
            .borrow()
            .strong_pullups_ns
            .iter()
            .map(|ns| ns / 1_000_000)
            .collect()
    }

    /// Bytes written since the last reset, read slots count as ones
    pub fn written_bytes(&self) -> Vec<u8> {
        self.line
            .borrow()
            .written
            .chunks(8)
            .map(|bits| {
                bits.iter()
                    .enumerate()
                    .fold(0u8, |byte, (i, bit)| byte | ((*bit as u8) << i))
            })
            .collect()
    }

    pub fn thermometer(&self, index: usize) -> Thermometer {
        match &self.line.borrow().responders[index] {
            Responder::Thermometer(t) => t.clone(),
            other => panic!("responder {} is {:?}", index, other),
        }
    }
}

pub struct SimWire(Rc<RefCell<Line>>);

impl IoWire for SimWire {
    type Error = Infallible;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().level())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().fall();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().rise();
        Ok(())
    }

    fn hold_high(&mut self) -> Result<(), Self::Error> {
        let mut line = self.0.borrow_mut();
        line.rise();
        let now = line.now_ns;
        line.holding_since = Some(now);
        Ok(())
    }
}

pub struct SimDelay(Rc<RefCell<Line>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now_ns += ns as u64;
    }
}
