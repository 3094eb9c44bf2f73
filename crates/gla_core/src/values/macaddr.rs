//! 48-bit hardware (MAC) addresses.
//!
//! The address is stored as a plain integer with the first octet of the text
//! form in the most significant position, so integer order matches the order
//! of the text form read left to right.

use std::fmt;
use std::str::FromStr;

use gla_error::{DbError, Result};
use serde::{Deserialize, Serialize};

const NUM_OCTETS: usize = 6;
const ADDRESS_MASK: u64 = (1 << 48) - 1;

/// Hex digit value for every byte, `-1` for bytes that are not hex digits.
static HEX_TO_INT: [i8; 256] = build_hex_table();

const fn build_hex_table() -> [i8; 256] {
    let mut table = [-1_i8; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as i8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'a' as usize + i] = 10 + i as i8;
        table[b'A' as usize + i] = 10 + i as i8;
        i += 1;
    }
    table
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MacAddr(u64);

impl MacAddr {
    /// Create from the raw integer form. Bits above the low 48 are dropped.
    pub const fn from_u64(v: u64) -> Self {
        MacAddr(v & ADDRESS_MASK)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Pack octets, first octet ending up in the most significant position.
    pub const fn from_octets(octets: [u8; NUM_OCTETS]) -> Self {
        let mut v = 0_u64;
        let mut i = 0;
        while i < NUM_OCTETS {
            v = (v << 8) | octets[i] as u64;
            i += 1;
        }
        MacAddr(v)
    }

    pub const fn octets(&self) -> [u8; NUM_OCTETS] {
        let mut out = [0_u8; NUM_OCTETS];
        let mut i = 0;
        while i < NUM_OCTETS {
            let shift = 8 * (NUM_OCTETS - 1 - i);
            out[i] = (self.0 >> shift) as u8;
            i += 1;
        }
        out
    }

    /// Get a single octet, 0 being the leftmost in the text form.
    pub fn octet(&self, idx: usize) -> Option<u8> {
        self.octets().get(idx).copied()
    }
}

fn hex_value(b: u8) -> Result<u8> {
    let v = HEX_TO_INT[b as usize];
    if v < 0 {
        return Err(DbError::new("Invalid character in MAC address")
            .with_field("character", (b as char).escape_default()));
    }
    Ok(v as u8)
}

impl FromStr for MacAddr {
    type Err = DbError;

    /// Parse `xx:xx:xx:xx:xx:xx`. Each group is one or two hex digits,
    /// upper or lower case.
    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0_u8; NUM_OCTETS];
        let mut count = 0;

        for group in s.split(':') {
            if count == NUM_OCTETS {
                return Err(DbError::new("Too many groups in MAC address").with_field("input", s));
            }

            let octet = match group.as_bytes() {
                [lo] => hex_value(*lo)?,
                [hi, lo] => (hex_value(*hi)? << 4) | hex_value(*lo)?,
                _ => {
                    return Err(DbError::new("MAC address group must be 1 or 2 hex digits")
                        .with_field("input", s)
                        .with_field("group", group));
                }
            };

            octets[count] = octet;
            count += 1;
        }

        if count != NUM_OCTETS {
            return Err(DbError::new("Too few groups in MAC address")
                .with_field("input", s)
                .with_field("groups", count));
        }

        Ok(MacAddr::from_octets(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, octet) in self.octets().into_iter().enumerate() {
            if idx > 0 {
                write!(f, ":")?;
            }
            let hi = HEX_DIGITS[(octet >> 4) as usize] as char;
            let lo = HEX_DIGITS[(octet & 0x0f) as usize] as char;
            write!(f, "{hi}{lo}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_textual_order() {
        let mac: MacAddr = "01:23:45:67:89:ab".parse().unwrap();
        assert_eq!([0x01, 0x23, 0x45, 0x67, 0x89, 0xab], mac.octets());
        assert_eq!(0x0123_4567_89ab, mac.as_u64());
        assert_eq!("01:23:45:67:89:ab", mac.to_string());
    }

    #[test]
    fn top_octet_survives_round_trip() {
        let mac: MacAddr = "ff:00:00:00:00:01".parse().unwrap();
        assert_eq!(Some(0xff), mac.octet(0));
        assert_eq!("ff:00:00:00:00:01", mac.to_string());
    }

    #[test]
    fn short_groups_and_upper_case() {
        let mac: MacAddr = "1:B:c:0:FF:a".parse().unwrap();
        assert_eq!("01:0b:0c:00:ff:0a", mac.to_string());
    }

    #[test]
    fn ordering_follows_text() {
        let a: MacAddr = "00:ff:ff:ff:ff:ff".parse().unwrap();
        let b: MacAddr = "01:00:00:00:00:00".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn invalid_inputs() {
        "01:23:45:67:89".parse::<MacAddr>().unwrap_err();
        "01:23:45:67:89:ab:cd".parse::<MacAddr>().unwrap_err();
        "01:23:45:67:89:zz".parse::<MacAddr>().unwrap_err();
        "012:3:45:67:89:ab".parse::<MacAddr>().unwrap_err();
        "01:23::67:89:ab".parse::<MacAddr>().unwrap_err();
    }

    #[test]
    fn from_u64_masks_high_bits() {
        let mac = MacAddr::from_u64(u64::MAX);
        assert_eq!("ff:ff:ff:ff:ff:ff", mac.to_string());
        assert_eq!(MacAddr::default(), MacAddr::from_octets([0; 6]));
    }
}
