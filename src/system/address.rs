//! Port addresses
//!
//! Every ev3dev port and device exposes an `address` attribute, like
//! `spi0.1:S3` or `ev3-ports:outA`. The address of a port is stable across
//! reconfiguration, so it is the key used to find the device directories the
//! kernel creates for that port.
use crate::error::AddressError;
use std::{borrow::Cow, convert::TryFrom, fmt, str::FromStr};

/// Size of the [`Address`] buffer, including the length byte.
const CAPACITY: usize = 64;

/// Longest address, in bytes.
pub const MAX_LEN: usize = CAPACITY - 1;

/// A port address, like `spi0.1:S3`.
///
/// Stored inline in a fixed-size buffer, so it is [`Copy`] and comparing two
/// addresses never allocates.
///
/// Addresses compare byte for byte. The kernel doesn't promise utf-8, so
/// conversion to text is lossy and only done for display.
///
/// The [`Default`] value is the empty address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// `buf[0]` is the length, followed by the content. Unused bytes are
    /// always zero.
    buf: [u8; CAPACITY],
}

impl Address {
    /// Create a new [`Address`] from `s`.
    ///
    /// # Errors
    ///
    /// - If `s` is longer than [`MAX_LEN`] bytes.
    pub fn new(s: &str) -> Result<Self, AddressError> {
        Self::from_attr_bytes(s.as_bytes())
    }

    /// Create an [`Address`] from the raw content of an `address` attribute.
    ///
    /// The trailing newline, if any, must already be stripped.
    pub(crate) fn from_attr_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() > MAX_LEN {
            return Err(AddressError::TooLong { len: bytes.len() });
        }
        let mut buf = [0; CAPACITY];
        buf[0] = bytes.len() as u8;
        buf[1..=bytes.len()].copy_from_slice(bytes);
        Ok(Self { buf })
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[1..=self.len()]
    }

    /// The address as a string.
    ///
    /// Invalid utf-8 is replaced with [`char::REPLACEMENT_CHARACTER`].
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Length of the address, in bytes.
    pub fn len(&self) -> usize {
        self.buf[0] as usize
    }

    /// Whether this is the empty address.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Address {
    fn default() -> Self {
        Self { buf: [0; CAPACITY] }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Address").field(&self.as_str()).finish()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let long = "x".repeat(MAX_LEN);
        for s in ["", "spi0.1:S3", "ev3-ports:outA", long.as_str()] {
            let a = Address::new(s).unwrap();
            assert_eq!(a.as_str(), s);
            assert_eq!(a.to_string(), s);
            assert_eq!(a.len(), s.len());
        }
    }

    #[test]
    fn too_long() {
        let s = "x".repeat(MAX_LEN + 1);
        assert_eq!(
            Address::new(&s),
            Err(AddressError::TooLong { len: MAX_LEN + 1 })
        );
        assert!(s.parse::<Address>().is_err());
    }

    #[test]
    fn equality() {
        let a: Address = "iface:S1".parse().unwrap();
        let b = Address::try_from("iface:S1").unwrap();
        let c = Address::new("iface:S1x").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // A prefix must not compare equal just because the tail is hidden.
        assert_ne!(Address::new("iface:S").unwrap(), a);
    }

    #[test]
    fn default_is_empty() {
        let a = Address::default();
        assert!(a.is_empty());
        assert_eq!(a, Address::new("").unwrap());
        assert_ne!(a, Address::new("spi0.1:S3").unwrap());
    }

    #[test]
    fn raw_bytes_compare_exactly() {
        let raw = Address::from_attr_bytes(b"iface:S\xff").unwrap();
        assert_eq!(raw.as_bytes(), b"iface:S\xff");
        assert_ne!(raw, Address::new("iface:S?").unwrap());
        assert_ne!(raw, Address::from_attr_bytes(b"iface:S\xfe").unwrap());
        assert_eq!(raw.to_string(), "iface:S\u{fffd}");
    }

    #[test]
    fn debug() {
        let a = Address::new("spi0.1:S3").unwrap();
        assert_eq!(format!("{:?}", a), "Address(\"spi0.1:S3\")");
    }
}
