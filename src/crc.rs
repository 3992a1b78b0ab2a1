/// Feeds one byte into the Dallas/Maxim CRC-8 (`X^8 + X^5 + X^4 + 1`).
///
/// Bits are consumed least significant first. Whenever the incoming bit differs
/// from the current LSB the shifted register gets bit 7 set and bits 3 and 4
/// toggled, which is the same as xoring with `0x8C` after the shift.
pub fn crc8_step(crc: u8, byte: u8) -> u8 {
    let mut crc = crc;
    let mut byte = byte;
    for _ in 0..8 {
        let mix = (crc ^ byte) & 0x01;
        crc >>= 1;
        if mix != 0x00 {
            crc ^= 0x8C;
        }
        byte >>= 1;
    }
    crc
}

pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc, |crc, byte| crc8_step(crc, *byte))
}

/// Returns `true` when the last byte of `buffer` is not the CRC-8 of the bytes
/// before it.
///
/// Works the same for an 8 byte ROM code and a 9 byte scratchpad.
pub fn checksum_bad(buffer: &[u8]) -> bool {
    match buffer.split_last() {
        Some((crc8, data)) => compute_partial_crc8(0, data) != *crc8,
        None => true,
    }
}
