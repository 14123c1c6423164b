//! CRC-32 for persisted records
//!
//! Reflected CRC-32 (polynomial 0xEDB88320, the zlib/Ethernet variant),
//! computed bitwise. Records are a few hundred bytes at most and are checked
//! once per wake, so a lookup table would cost more flash than it saves time.

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Compute the CRC-32 of `bytes`
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLYNOMIAL & mask);
        }
    }
    !crc
}
