//! Value Objects for network commerce

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Referral code value object, handed out to every registered member
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferralCode(String);

impl ReferralCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ReferralCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(ReferralCodeError::Empty); }
        if value.len() > 16 { return Err(ReferralCodeError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') { return Err(ReferralCodeError::InvalidCharacter); }
        Ok(Self(value))
    }

    /// Derive a code from a member id: `NC-` plus the last eight hex digits.
    pub fn generate(member_id: uuid::Uuid) -> Self {
        let hex = member_id.simple().to_string();
        Self(format!("NC-{}", hex[hex.len() - 8..].to_uppercase()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ReferralCodeError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for ReferralCodeError {}
impl fmt::Display for ReferralCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "referral code empty"),
            Self::TooLong => write!(f, "referral code too long"),
            Self::InvalidCharacter => write!(f, "referral code contains invalid characters"),
        }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        let amount = self.amount.checked_mul(Decimal::from(qty)).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
}

impl Default for Money { fn default() -> Self { Self::zero("NGN") } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
            Self::Overflow => write!(f, "Amount too large"),
        }
    }
}

/// Point value earned by purchases. Signed so that corrupted ledger rows can be
/// detected instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);
    pub fn new(value: i64) -> Self { Self(value) }
    pub fn value(&self) -> i64 { self.0 }
    pub fn is_negative(&self) -> bool { self.0 < 0 }
    pub fn to_decimal(self) -> Decimal { Decimal::from(self.0) }
    pub fn times(self, qty: u32) -> Points { Points(self.0.saturating_mul(i64::from(qty))) }
}

impl Add for Points {
    type Output = Points;
    fn add(self, rhs: Points) -> Points { Points(self.0.saturating_add(rhs.0)) }
}

impl AddAssign for Points {
    fn add_assign(&mut self, rhs: Points) { self.0 = self.0.saturating_add(rhs.0); }
}

impl std::iter::Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Points { iter.fold(Points::ZERO, |a, b| a + b) }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Inclusive calendar date range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "start_date")]
    start: NaiveDate,
    #[serde(rename = "end_date")]
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start { return Err(DateRangeError::EndBeforeStart); }
        Ok(Self { start, end })
    }
    pub fn start(&self) -> NaiveDate { self.start }
    pub fn end(&self) -> NaiveDate { self.end }
    pub fn contains(&self, date: NaiveDate) -> bool { date >= self.start && date <= self.end }
    pub fn overlaps(&self, other: &DateRange) -> bool { self.start <= other.end && other.start <= self.end }
}

#[derive(Debug, Clone)] pub enum DateRangeError { EndBeforeStart }
impl std::error::Error for DateRangeError {}
impl fmt::Display for DateRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "end date precedes start date") }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_referral_code() { let code = ReferralCode::new(" nc-ab12 ").unwrap(); assert_eq!(code.as_str(), "NC-AB12"); }
    #[test]
    fn test_referral_code_rejects_symbols() { assert_eq!(ReferralCode::new("ab$1"), Err(ReferralCodeError::InvalidCharacter)); }
    #[test]
    fn test_generated_code_is_valid() {
        let code = ReferralCode::generate(uuid::Uuid::new_v4());
        assert_eq!(ReferralCode::new(code.as_str()).unwrap(), code);
    }
    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(100, 0), "NGN");
        let b = Money::new(Decimal::new(50, 0), "NGN");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "USD")).is_err());
    }
    #[test]
    fn test_money_overflow_is_an_error() {
        let max = Money::new(Decimal::MAX, "NGN");
        assert_eq!(max.multiply(2), Err(MoneyError::Overflow));
        assert_eq!(max.add(&max), Err(MoneyError::Overflow));
        assert_eq!(max.multiply(1).unwrap(), max);
    }
    #[test]
    fn test_date_range_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let range = DateRange::new(d(1), d(31)).unwrap();
        assert!(range.contains(d(1)) && range.contains(d(31)));
        assert!(DateRange::new(d(2), d(1)).is_err());
        assert!(range.overlaps(&DateRange::new(d(31), d(31)).unwrap()));
    }
}
