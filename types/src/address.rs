//! Settlement address type: `0x` + 40 lowercase hex characters.
//!
//! Addresses identify payout recipients on the escrow chain. Derivation
//! from a public key lives in the oracle crate; this type only carries
//! and validates the canonical string form.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 20-byte settlement-chain address in `0x`-prefixed hex form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub const PREFIX: &'static str = "0x";
    /// `0x` + 40 hex chars.
    pub const LEN: usize = 42;

    /// The zero address, used as an explicit "nobody" sentinel.
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Parse and normalize an address string. Hex digits are lowercased
    /// so equality is case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if !raw.starts_with(Self::PREFIX) || raw.len() != Self::LEN {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        let digits = &raw[Self::PREFIX.len()..];
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Construct from the raw 20 bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// The raw 20 bytes of this address.
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Validated at construction, so decoding cannot fail.
        let decoded = hex::decode(&self.0[Self::PREFIX.len()..]).unwrap_or_default();
        out.copy_from_slice(&decoded);
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case() {
        let a = Address::parse("0xDEADBEEFdeadbeefDEADBEEFdeadbeefDEADBEEF").unwrap();
        assert_eq!(a.as_str(), "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(Address::parse("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef00").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Address::parse("0xdeadbeef").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(Address::parse("0xzzadbeefdeadbeefdeadbeefdeadbeefdeadbeef").is_err());
    }

    #[test]
    fn bytes_roundtrip() {
        let a = Address::from_bytes([0xAB; 20]);
        assert_eq!(a.to_bytes(), [0xAB; 20]);
        assert_eq!(a.as_str().len(), Address::LEN);
    }

    #[test]
    fn zero_address() {
        assert!(Address::zero().is_zero());
        assert!(!Address::from_bytes([1; 20]).is_zero());
    }

    #[test]
    fn serde_rejects_invalid() {
        let bad: Result<Address, _> = serde_json::from_str("\"0xnope\"");
        assert!(bad.is_err());
        let good: Address =
            serde_json::from_str("\"0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef\"").unwrap();
        assert!(!good.is_zero());
    }
}
