//! The two battle sides and the battle status enum.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the topic a cast argues for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Support,
    Oppose,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Support => Side::Oppose,
            Side::Oppose => Side::Support,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Support => "SUPPORT",
            Side::Oppose => "OPPOSE",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUPPORT" => Ok(Side::Support),
            "OPPOSE" => Ok(Side::Oppose),
            other => Err(TypeError::InvalidSide(other.to_string())),
        }
    }
}

/// Lifecycle status of a battle. `Active -> Completed` is the only
/// transition; `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BattleStatus {
    Active,
    Completed,
}

impl BattleStatus {
    pub fn is_active(self) -> bool {
        matches!(self, BattleStatus::Active)
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleStatus::Active => f.write_str("ACTIVE"),
            BattleStatus::Completed => f.write_str("COMPLETED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parse_is_case_insensitive() {
        assert_eq!("support".parse::<Side>().unwrap(), Side::Support);
        assert_eq!("OPPOSE".parse::<Side>().unwrap(), Side::Oppose);
        assert!("neutral".parse::<Side>().is_err());
    }

    #[test]
    fn side_serde_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Side::Support).unwrap(), "\"SUPPORT\"");
        let s: Side = serde_json::from_str("\"OPPOSE\"").unwrap();
        assert_eq!(s, Side::Oppose);
    }

    #[test]
    fn opposite_flips() {
        assert_eq!(Side::Support.opposite(), Side::Oppose);
        assert_eq!(Side::Oppose.opposite(), Side::Support);
    }
}
