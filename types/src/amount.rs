//! Settlement token amounts.
//!
//! Amounts are fixed-point integers (u128) with 6 decimal places to
//! match the settlement token. The smallest unit is 1 raw; one whole
//! token is [`TokenAmount::UNIT`] raw. All arithmetic is checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A token amount in raw fixed-point units (6 decimals).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);
    /// Raw units per whole token (10^6).
    pub const UNIT: u128 = 1_000_000;

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Construct from a whole-token count.
    pub fn from_tokens(tokens: u64) -> Self {
        Self(tokens as u128 * Self::UNIT)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// The winner's share of a collected pool: 80% of the total.
    /// The remainder (`total - prize`) stays with the contract as the
    /// platform fee. `prize + platform_fee == total` always holds.
    pub fn prize_share(self) -> Self {
        Self(self.0 / 5 * 4 + self.0 % 5 * 4 / 5)
    }

    /// The platform's share of a collected pool: whatever the prize
    /// split leaves behind.
    pub fn platform_fee(self) -> Self {
        self - self.prize_share()
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TokenAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::UNIT;
        let frac = self.0 % Self::UNIT;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{:06}", frac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_is_eighty_percent() {
        // 5 tokens collected -> 4 token prize, 1 token fee.
        let total = TokenAmount::from_tokens(5);
        assert_eq!(total.prize_share(), TokenAmount::from_tokens(4));
        assert_eq!(total.platform_fee(), TokenAmount::from_tokens(1));
    }

    #[test]
    fn prize_plus_fee_equals_total() {
        for raw in [0u128, 1, 4, 5, 999_999, 1_000_000, 7_777_777] {
            let total = TokenAmount::new(raw);
            let sum = total.prize_share().checked_add(total.platform_fee()).unwrap();
            assert_eq!(sum, total, "split must conserve the pool for raw={raw}");
        }
    }

    #[test]
    fn fee_is_quarter_of_prize_on_clean_multiples() {
        let total = TokenAmount::from_tokens(20);
        let prize = total.prize_share();
        assert_eq!(total.platform_fee().raw(), prize.raw() / 4);
    }

    #[test]
    fn display_formats_decimals() {
        assert_eq!(TokenAmount::from_tokens(3).to_string(), "3");
        assert_eq!(TokenAmount::new(2_400_000).to_string(), "2.400000");
        assert_eq!(TokenAmount::new(42).to_string(), "0.000042");
    }

    #[test]
    fn checked_math() {
        let a = TokenAmount::new(u128::MAX);
        assert!(a.checked_add(TokenAmount::new(1)).is_none());
        assert!(TokenAmount::ZERO.checked_sub(TokenAmount::new(1)).is_none());
    }
}
