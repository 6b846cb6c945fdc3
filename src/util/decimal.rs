use std::{fmt::Display, ops::Deref};

use rust_decimal::Decimal;

// These were deprecated as methods on Decimal, so re-implement them.
// Those implementations don't actually do zero checks, and can result
// in weird behaviour.
pub fn is_positive(d: &Decimal) -> bool {
    d.is_sign_positive() && !d.is_zero()
}

pub fn is_negative(d: &Decimal) -> bool {
    d.is_sign_negative() && !d.is_zero()
}

// Every derived money column is rounded to 2 places the moment it is
// computed, never only at the final sum. Uses the default banker's
// (half-even) midpoint strategy.
pub fn round2(d: Decimal) -> Decimal {
    d.round_dp(2)
}

pub fn dollar_precision_str(d: &Decimal) -> String {
    format!("{:.2}", d)
}

// A Decimal known to be strictly greater than zero. Lot quantities,
// matched quantities and exchange rates are all PosDecimal, which makes
// the zero/negative cases unrepresentable instead of asserted.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct PosDecimal(Decimal);

impl TryFrom<Decimal> for PosDecimal {
    type Error = String;

    fn try_from(d: Decimal) -> Result<Self, Self::Error> {
        if is_positive(&d) {
            Ok(PosDecimal(d))
        } else {
            Err(format!("{} is not a positive value", d))
        }
    }
}

impl Deref for PosDecimal {
    type Target = Decimal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for PosDecimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Debug for PosDecimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl PosDecimal {
    pub fn one() -> Self {
        PosDecimal(Decimal::ONE)
    }

    // Pos * Pos stays positive
    pub fn mul(&self, rhs: PosDecimal) -> Self {
        PosDecimal(self.0 * rhs.0)
    }

    pub fn min(&self, rhs: PosDecimal) -> Self {
        if self.0 <= rhs.0 {
            *self
        } else {
            rhs
        }
    }

    // None when self <= rhs
    pub fn checked_sub(&self, rhs: PosDecimal) -> Option<PosDecimal> {
        PosDecimal::try_from(self.0 - rhs.0).ok()
    }
}

#[macro_export]
macro_rules! pdec {
    ($arg:literal) => {{
        use rust_decimal_macros::dec;
        $crate::util::decimal::PosDecimal::try_from(dec!($arg)).unwrap()
    }};
}
