//! Fixed-point stock quantities.

use std::{
    fmt,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, util::parse_fixed_point};

/// Number of thousandths in one unit.
pub const MILLI: i64 = 1_000;

/// A stock quantity with three decimal places, stored as thousandths.
///
/// Stock rows never hold a negative quantity; signed values only appear as
/// deltas (`adjust_quantity`) and in history directions.
///
/// ```rust
/// use engine::Quantity;
///
/// let q: Quantity = "1,25".parse().unwrap();
/// assert_eq!(q.milli(), 1_250);
/// assert_eq!(q.to_string(), "1.250");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    #[must_use]
    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    /// Whole units, e.g. `Quantity::units(5)` is `5.000`.
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * MILLI)
    }

    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[must_use]
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    #[must_use]
    pub fn checked_neg(self) -> Option<Quantity> {
        self.0.checked_neg().map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let milli = MILLI.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / milli, abs % milli)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, 3)
            .map(Quantity)
            .map_err(|reason| EngineError::InvalidQuantity(reason.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_always_has_three_decimals() {
        assert_eq!(Quantity::units(5).to_string(), "5.000");
        assert_eq!(Quantity::from_milli(1).to_string(), "0.001");
        assert_eq!(Quantity::from_milli(-2_500).to_string(), "-2.500");
    }

    #[test]
    fn parse_scales_short_fractions() {
        assert_eq!("2".parse::<Quantity>().unwrap(), Quantity::units(2));
        assert_eq!("0.5".parse::<Quantity>().unwrap().milli(), 500);
        assert_eq!("0,05".parse::<Quantity>().unwrap().milli(), 50);
        assert_eq!("1.234".parse::<Quantity>().unwrap().milli(), 1_234);
    }

    #[test]
    fn parse_rejects_fourth_decimal() {
        assert_eq!(
            "1.2345".parse::<Quantity>(),
            Err(EngineError::InvalidQuantity("too many decimals".to_string()))
        );
        assert!("abc".parse::<Quantity>().is_err());
        assert!("".parse::<Quantity>().is_err());
    }
}
