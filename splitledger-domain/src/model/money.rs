use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

/// Exact monetary amount in the group's currency.
///
/// Amounts are kept at full decimal precision; rounding to cents only happens
/// where a rule asks for it (`floor_cents`, `round_cents`).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Tolerance applied to every amount comparison: one cent.
    pub fn cent() -> Self {
        Self(Decimal::new(1, 2))
    }

    /// Half a cent, the largest error a single rounding to cents can introduce.
    pub fn half_cent() -> Self {
        Self(Decimal::new(5, 3))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn signum(self) -> i64 {
        if self.is_positive() {
            1
        } else if self.is_negative() {
            -1
        } else {
            0
        }
    }

    /// Rounds towards negative infinity at two decimal places.
    pub fn floor_cents(self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity))
    }

    /// Rounds half away from zero at two decimal places.
    pub fn round_cents(self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Splits the amount into `parts` equal shares, without rounding.
    pub fn divide(self, parts: usize) -> Self {
        Self(self.0 / Decimal::from(parts))
    }

    /// `None` when the sum leaves the representable range.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: Decimal) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Sums `amounts`, stopping at the first overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }

    pub fn within(self, other: Self, tolerance: Self) -> bool {
        (self - other).abs() <= tolerance
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact(Money::new(3333, 2), Money::new(3333, 2))]
    #[case::truncates(Money::new(33_333_333, 6), Money::new(3333, 2))]
    #[case::negative_goes_down(Money::new(-1001, 3), Money::new(-101, 2))]
    fn floor_cents_cases(#[case] input: Money, #[case] expected: Money) {
        assert_eq!(input.floor_cents(), expected);
    }

    #[rstest]
    #[case::half_up(Money::new(1005, 3), Money::new(101, 2))]
    #[case::half_away_negative(Money::new(-1005, 3), Money::new(-101, 2))]
    #[case::below_half(Money::new(1004, 3), Money::new(100, 2))]
    fn round_cents_cases(#[case] input: Money, #[case] expected: Money) {
        assert_eq!(input.round_cents(), expected);
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_i64(5).to_string(), "5.00");
        assert_eq!(Money::new(3334, 2).to_string(), "33.34");
    }

    #[rstest]
    #[case::fits(Money::from_i64(1), Some(Money::from_decimal(Decimal::MAX)))]
    #[case::overflows(Money::from_i64(2), None)]
    fn checked_add_near_the_limit(#[case] rhs: Money, #[case] expected: Option<Money>) {
        let near_max = Money::from_decimal(Decimal::MAX - Decimal::ONE);
        assert_eq!(near_max.checked_add(rhs), expected);
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let max = Money::from_decimal(Decimal::MAX);
        assert_eq!(Money::checked_sum([max, Money::ZERO]), Some(max));
        assert_eq!(Money::checked_sum([max, max]), None);
        assert_eq!(max.checked_mul(Decimal::TWO), None);
    }

    #[test]
    fn within_is_inclusive() {
        let a = Money::new(10000, 2);
        assert!(a.within(Money::new(10001, 2), Money::cent()));
        assert!(!a.within(Money::new(10002, 2), Money::cent()));
    }
}
