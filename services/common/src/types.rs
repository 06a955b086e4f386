//! Core scalar types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl Side {
    /// Single-character wire/CLI form ('B' / 'S')
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Buy => 'B',
            Self::Sell => 'S',
        }
    }

    /// Parse from the single-character form
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(Self::Buy),
            'S' => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_char_round_trip() {
        assert_eq!(Side::from_char('B'), Some(Side::Buy));
        assert_eq!(Side::from_char('S'), Some(Side::Sell));
        assert_eq!(Side::from_char('X'), None);
        assert_eq!(Side::Buy.as_char(), 'B');
        assert_eq!(Side::Sell.as_char(), 'S');
    }
}
