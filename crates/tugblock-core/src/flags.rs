//! Compiler feature flags.
//!
//! [`CompilerFlags`] is a bitset of `__future__` dialect toggles. The bit
//! values are the classic compiler constants so a flag set can be handed to
//! any tool that speaks the integer form.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A set of `__future__` feature flags.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CompilerFlags(u32);

/// Known features, in bit order.
const FEATURES: &[(&str, CompilerFlags)] = &[
    ("nested_scopes", CompilerFlags::NESTED_SCOPES),
    ("generators", CompilerFlags::GENERATORS),
    ("division", CompilerFlags::DIVISION),
    ("absolute_import", CompilerFlags::ABSOLUTE_IMPORT),
    ("with_statement", CompilerFlags::WITH_STATEMENT),
    ("print_function", CompilerFlags::PRINT_FUNCTION),
    ("unicode_literals", CompilerFlags::UNICODE_LITERALS),
];

impl CompilerFlags {
    pub const NONE: CompilerFlags = CompilerFlags(0);
    pub const NESTED_SCOPES: CompilerFlags = CompilerFlags(0x0010);
    pub const GENERATORS: CompilerFlags = CompilerFlags(0x1000);
    pub const DIVISION: CompilerFlags = CompilerFlags(0x2000);
    pub const ABSOLUTE_IMPORT: CompilerFlags = CompilerFlags(0x4000);
    pub const WITH_STATEMENT: CompilerFlags = CompilerFlags(0x8000);
    pub const PRINT_FUNCTION: CompilerFlags = CompilerFlags(0x10000);
    pub const UNICODE_LITERALS: CompilerFlags = CompilerFlags(0x20000);

    /// Wrap raw bits. Unknown bits are kept as-is.
    pub const fn from_bits(bits: u32) -> Self {
        CompilerFlags(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: CompilerFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flag for a `from __future__ import <name>` feature.
    pub fn from_future_name(name: &str) -> Option<CompilerFlags> {
        FEATURES
            .iter()
            .find(|(feature, _)| *feature == name)
            .map(|(_, flag)| *flag)
    }

    /// Names of the known features set in `self`.
    pub fn names(self) -> Vec<&'static str> {
        FEATURES
            .iter()
            .filter(|(_, flag)| !flag.is_empty() && self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for CompilerFlags {
    type Output = CompilerFlags;

    fn bitor(self, rhs: CompilerFlags) -> CompilerFlags {
        CompilerFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CompilerFlags {
    fn bitor_assign(&mut self, rhs: CompilerFlags) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for CompilerFlags {
    fn from(bits: u32) -> Self {
        CompilerFlags(bits)
    }
}

impl From<CompilerFlags> for u32 {
    fn from(flags: CompilerFlags) -> u32 {
        flags.0
    }
}

impl fmt::Display for CompilerFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("0")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

/// Error parsing a textual flag specification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagsParseError {
    #[error("invalid flag bits '{0}'")]
    InvalidBits(String),
    #[error("unknown compiler feature '{0}'")]
    UnknownFeature(String),
}

/// Accepts `0x10000`, `65536`, or `print_function,division`.
impl FromStr for CompilerFlags {
    type Err = FlagsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u32::from_str_radix(hex, 16)
                .map(CompilerFlags)
                .map_err(|_| FlagsParseError::InvalidBits(s.to_string()));
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse::<u32>()
                .map(CompilerFlags)
                .map_err(|_| FlagsParseError::InvalidBits(s.to_string()));
        }
        let mut flags = CompilerFlags::NONE;
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            flags |= CompilerFlags::from_future_name(name)
                .ok_or_else(|| FlagsParseError::UnknownFeature(name.to_string()))?;
        }
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_bitwise_or() {
        let merged = CompilerFlags::PRINT_FUNCTION | CompilerFlags::DIVISION;
        assert_eq!(merged.bits(), 0x12000);
        assert!(merged.contains(CompilerFlags::DIVISION));
        assert!(!merged.contains(CompilerFlags::UNICODE_LITERALS));
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(CompilerFlags::PRINT_FUNCTION.to_string(), "0x10000");
        assert_eq!(CompilerFlags::NONE.to_string(), "0");
    }

    #[test]
    fn future_names_round_trip() {
        let flags = CompilerFlags::from_future_name("print_function").unwrap()
            | CompilerFlags::from_future_name("absolute_import").unwrap();
        assert_eq!(flags.names(), vec!["absolute_import", "print_function"]);
        assert_eq!(CompilerFlags::from_future_name("braces"), None);
    }

    #[test]
    fn parse_forms() {
        assert_eq!("0x10000".parse(), Ok(CompilerFlags::PRINT_FUNCTION));
        assert_eq!("8192".parse(), Ok(CompilerFlags::DIVISION));
        assert_eq!(
            "division, print_function".parse(),
            Ok(CompilerFlags::DIVISION | CompilerFlags::PRINT_FUNCTION)
        );
        assert_eq!("".parse(), Ok(CompilerFlags::NONE));
        assert_eq!(
            "barry".parse::<CompilerFlags>(),
            Err(FlagsParseError::UnknownFeature("barry".to_string()))
        );
        assert!(matches!(
            "0xzz".parse::<CompilerFlags>(),
            Err(FlagsParseError::InvalidBits(_))
        ));
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&CompilerFlags::PRINT_FUNCTION).unwrap();
        assert_eq!(json, "65536");
    }
}
