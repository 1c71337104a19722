//! Yen type for parsing and displaying whole-yen amounts.
//!
//! Amounts in the ledger are plain integers. This module provides the `Yen` wrapper which handles
//! parsing values that may or may not include a yen sign and commas, and formats them for display.

use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Represents a whole-yen amount.
///
/// # Examples
///
/// Parsing with or without the yen sign and thousands separators:
/// ```
/// # use asset_ledger::model::Yen;
/// # use std::str::FromStr;
/// let a = Yen::from_str("¥1,000,000").unwrap();
/// let b = Yen::from_str("1000000").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "¥1,000,000");
/// ```
///
/// Negative values put the sign before the yen sign:
/// ```
/// # use asset_ledger::model::Yen;
/// assert_eq!(Yen::new(-5000).to_string(), "-¥5,000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Yen(i64);

impl Yen {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

/// An error that can occur when parsing strings into `Yen` values.
pub struct YenError(ParseIntError);

impl Debug for YenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for YenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "invalid yen amount: {}", self.0)
    }
}

impl std::error::Error for YenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Yen {
    type Err = YenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('円').unwrap_or(trimmed).trim_end();

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        // Full-width and half-width yen signs both show up in pasted values
        let digits = unsigned
            .strip_prefix('¥')
            .or_else(|| unsigned.strip_prefix('￥'))
            .unwrap_or(unsigned)
            .replace(',', "");

        let signed = if negative {
            format!("-{digits}")
        } else {
            digits
        };
        let value = i64::from_str(&signed).map_err(YenError)?;
        Ok(Yen(value))
    }
}

impl Display for Yen {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}¥{}", group_thousands(self.0.unsigned_abs()))
    }
}

/// Formats `n` with a comma between every group of three digits.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        assert_eq!(Yen::from_str("1000").unwrap().value(), 1000);
    }

    #[test]
    fn test_parse_with_yen_sign_and_commas() {
        assert_eq!(Yen::from_str("¥1,000,000").unwrap().value(), 1_000_000);
        assert_eq!(Yen::from_str("￥30,000").unwrap().value(), 30_000);
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(Yen::from_str("-¥50,000").unwrap().value(), -50_000);
        assert_eq!(Yen::from_str("-50000").unwrap().value(), -50_000);
    }

    #[test]
    fn test_parse_en_suffix_and_whitespace() {
        assert_eq!(Yen::from_str("  5,000円 ").unwrap().value(), 5_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Yen::from_str("").is_err());
        assert!(Yen::from_str("¥").is_err());
        assert!(Yen::from_str("12.5").is_err());
        assert!(Yen::from_str("abc").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Yen::new(0).to_string(), "¥0");
        assert_eq!(Yen::new(999).to_string(), "¥999");
        assert_eq!(Yen::new(1_500_000).to_string(), "¥1,500,000");
        assert_eq!(Yen::new(-30_000).to_string(), "-¥30,000");
    }

    #[test]
    fn test_display_is_exact_for_large_amounts() {
        assert_eq!(
            Yen::new(9_007_199_254_740_993).to_string(),
            "¥9,007,199,254,740,993"
        );
        assert_eq!(Yen::new(i64::MAX).to_string(), "¥9,223,372,036,854,775,807");
        assert_eq!(Yen::new(i64::MIN).to_string(), "-¥9,223,372,036,854,775,808");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(1), "1");
        assert_eq!(group_thousands(100), "100");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(123_456), "123,456");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
