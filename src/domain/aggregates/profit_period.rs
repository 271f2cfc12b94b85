//! Profit Period Aggregate
//!
//! A profit period is the frozen outcome of one commission cycle. It is created in
//! the `calculated` state, may have its snapshot rebuilt while still `calculated`,
//! and moves to `paid` exactly once. A paid period is never mutated again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::domain::aggregates::member::{MemberId, Rank, GENERATIONS};
use crate::domain::value_objects::{DateRange, Points};
use crate::domain::events::{DomainEvent, PeriodEvent};

pub type PeriodId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus { Calculated, Paid }

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self { PeriodStatus::Calculated => "calculated", PeriodStatus::Paid => "paid" }
    }
}

/// Personal and per-generation points of one member for one date range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PointsDocument", from = "PointsDocument")]
pub struct PointsSnapshot {
    pub personal: Points,
    /// Index 0 is generation 1 (direct referrals).
    pub generations: [Points; GENERATIONS],
}

impl PointsSnapshot {
    pub fn generation_total(&self) -> Points { self.generations.iter().copied().sum() }
    pub fn is_zero(&self) -> bool { self.personal == Points::ZERO && self.generation_total() == Points::ZERO }
}

#[derive(Serialize, Deserialize)]
struct PointsDocument {
    personal: Points,
    generation1: Points,
    generation2: Points,
    generation3: Points,
    generation4: Points,
    generation5: Points,
}

impl From<PointsSnapshot> for PointsDocument {
    fn from(p: PointsSnapshot) -> Self {
        let [generation1, generation2, generation3, generation4, generation5] = p.generations;
        Self { personal: p.personal, generation1, generation2, generation3, generation4, generation5 }
    }
}

impl From<PointsDocument> for PointsSnapshot {
    fn from(d: PointsDocument) -> Self {
        Self { personal: d.personal, generations: [d.generation1, d.generation2, d.generation3, d.generation4, d.generation5] }
    }
}

/// Currency amounts derived from a [`PointsSnapshot`] plus the external inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBreakdown {
    pub personal_commission: Decimal,
    pub generation_commission: Decimal,
    pub leadership_profit: Decimal,
    pub customer_purchase_commission: Decimal,
    pub total_profit_before_deduction: Decimal,
    pub website_development_commission: Decimal,
    pub total_profit: Decimal,
}

/// One member's frozen slice of a period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfit {
    pub member_id: MemberId,
    pub name: String,
    pub username: String,
    pub rank: Rank,
    pub points: PointsSnapshot,
    pub personal_sales: Decimal,
    pub group_sales: Decimal,
    #[serde(flatten)]
    pub commission: CommissionBreakdown,
}

/// Opaque per-member amounts supplied by the back office for a period.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalInputs {
    #[serde(default)]
    pub leadership_profits: BTreeMap<MemberId, Decimal>,
    #[serde(default)]
    pub customer_purchase_commissions: BTreeMap<MemberId, Decimal>,
}

impl ExternalInputs {
    pub fn leadership_profit(&self, member: MemberId) -> Decimal {
        self.leadership_profits.get(&member).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn customer_purchase_commission(&self, member: MemberId) -> Decimal {
        self.customer_purchase_commissions.get(&member).copied().unwrap_or(Decimal::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitPeriod {
    id: PeriodId,
    period_name: String,
    period_number: u32,
    #[serde(flatten)]
    range: DateRange,
    status: PeriodStatus,
    inputs: ExternalInputs,
    member_profits: Vec<MemberProfit>,
    created_at: DateTime<Utc>,
    recalculated_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

impl ProfitPeriod {
    pub fn calculated(period_name: impl Into<String>, period_number: u32, range: DateRange, inputs: ExternalInputs, member_profits: Vec<MemberProfit>) -> Self {
        Self {
            id: Uuid::now_v7(), period_name: period_name.into(), period_number,
            range, status: PeriodStatus::Calculated,
            inputs, member_profits, created_at: Utc::now(), recalculated_at: None, closed_at: None,
        }
    }

    pub fn id(&self) -> PeriodId { self.id }
    pub fn period_name(&self) -> &str { &self.period_name }
    pub fn period_number(&self) -> u32 { self.period_number }
    pub fn status(&self) -> PeriodStatus { self.status }
    pub fn is_paid(&self) -> bool { self.status == PeriodStatus::Paid }
    pub fn inputs(&self) -> &ExternalInputs { &self.inputs }
    pub fn member_profits(&self) -> &[MemberProfit] { &self.member_profits }
    pub fn closed_at(&self) -> Option<DateTime<Utc>> { self.closed_at }

    pub fn range(&self) -> DateRange { self.range }

    /// Member profits ordered by total profit, highest first.
    pub fn ranked_profits(&self) -> Vec<&MemberProfit> {
        let mut ranked: Vec<&MemberProfit> = self.member_profits.iter().collect();
        ranked.sort_by(|a, b| b.commission.total_profit.cmp(&a.commission.total_profit).then_with(|| a.username.cmp(&b.username)));
        ranked
    }

    pub fn profit_for(&self, member: MemberId) -> Option<&MemberProfit> {
        self.member_profits.iter().find(|p| p.member_id == member)
    }

    /// Sum of every member's total profit, saturating at `Decimal::MAX`.
    pub fn total_payout(&self) -> Decimal {
        self.member_profits.iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.commission.total_profit))
            .unwrap_or(Decimal::MAX)
    }

    /// Swap in a freshly computed snapshot. Rejected once the period is paid.
    pub fn replace_profits(&mut self, member_profits: Vec<MemberProfit>) -> Result<(), PeriodError> {
        if self.is_paid() { return Err(PeriodError::AlreadyClosed(self.id)); }
        self.member_profits = member_profits;
        self.recalculated_at = Some(Utc::now());
        Ok(())
    }

    /// `calculated -> paid`. A second attempt fails and leaves the period untouched.
    pub fn close(&mut self) -> Result<DomainEvent, PeriodError> {
        if self.is_paid() { return Err(PeriodError::AlreadyClosed(self.id)); }
        self.status = PeriodStatus::Paid;
        self.closed_at = Some(Utc::now());
        Ok(DomainEvent::Period(PeriodEvent::Closed { period_id: self.id, total_payout: self.total_payout() }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PeriodError { AlreadyClosed(PeriodId) }
impl std::error::Error for PeriodError {}
impl std::fmt::Display for PeriodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::AlreadyClosed(id) => write!(f, "Profit period {} is already closed", id) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn profit(username: &str, total: i64) -> MemberProfit {
        MemberProfit {
            member_id: Uuid::new_v4(), name: username.into(), username: username.into(), rank: Rank::Agent,
            points: PointsSnapshot::default(), personal_sales: Decimal::ZERO, group_sales: Decimal::ZERO,
            commission: CommissionBreakdown { total_profit: Decimal::new(total, 0), ..Default::default() },
        }
    }

    fn period() -> ProfitPeriod {
        let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()).unwrap();
        ProfitPeriod::calculated("January 2024", 1, range, ExternalInputs::default(), vec![profit("low", 10), profit("high", 90), profit("mid", 40)])
    }

    #[test]
    fn test_ranked_profits_highest_first() {
        let p = period();
        let order: Vec<&str> = p.ranked_profits().iter().map(|m| m.username.as_str()).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
        assert_eq!(p.total_payout(), Decimal::new(140, 0));
    }

    #[test]
    fn test_close_twice_fails_and_leaves_period_unchanged() {
        let mut p = period();
        p.close().unwrap();
        let before = serde_json::to_vec(&p).unwrap();
        let id = p.id();
        assert!(matches!(p.close(), Err(PeriodError::AlreadyClosed(closed)) if closed == id));
        assert_eq!(serde_json::to_vec(&p).unwrap(), before);
    }

    #[test]
    fn test_paid_period_rejects_new_snapshot() {
        let mut p = period();
        p.replace_profits(vec![profit("solo", 5)]).unwrap();
        assert_eq!(p.member_profits().len(), 1);
        p.close().unwrap();
        assert!(p.replace_profits(vec![]).is_err());
        assert_eq!(p.member_profits().len(), 1);
    }

    #[test]
    fn test_points_document_shape() {
        let snapshot = PointsSnapshot { personal: Points::new(7), generations: [1, 2, 3, 4, 5].map(Points::new) };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["generation3"], 3);
        assert_eq!(json["personal"], 7);
        assert_eq!(serde_json::from_value::<PointsSnapshot>(json).unwrap(), snapshot);
    }
}
