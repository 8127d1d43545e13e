use std::fmt;
use std::str::FromStr;

use crate::error::TransportError;

/// MAC address length in bytes.
pub const MAC_ADDR_LEN: usize = 6;

/// A 48-bit Ethernet hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; MAC_ADDR_LEN]);

impl MacAddr {
    /// The raw address bytes, most significant first.
    pub fn octets(&self) -> [u8; MAC_ADDR_LEN] {
        self.0
    }
}

/// Accepts `01606e11020f`, `01:60:6e:11:02:0f` or `01-60-6e-11-02-0f`.
impl FromStr for MacAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if digits.len() != MAC_ADDR_LEN * 2 || !digits.is_ascii() {
            return Err(TransportError::InvalidMac(s.to_string()));
        }

        let mut out = [0u8; MAC_ADDR_LEN];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| TransportError::InvalidMac(s.to_string()))?;
        }
        Ok(Self(out))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_hex() {
        let mac: MacAddr = "01606e11020f".parse().unwrap();
        assert_eq!(mac.octets(), [0x01, 0x60, 0x6e, 0x11, 0x02, 0x0f]);
    }

    #[test]
    fn parses_separated_forms() {
        let colon: MacAddr = "01:60:6E:11:02:0F".parse().unwrap();
        let dash: MacAddr = "01-60-6e-11-02-0f".parse().unwrap();
        assert_eq!(colon, dash);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("01606e11020".parse::<MacAddr>().is_err());
        assert!("zz606e11020f".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn display_is_colon_separated() {
        let mac = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
    }
}
