//! Points aggregator

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::domain::aggregates::{MemberId, Order, PointsSnapshot};
use crate::domain::value_objects::{DateRange, Points};
use crate::engine::downline::SponsorGraph;
use crate::{NetworkError, Result};

/// One points-bearing order as seen by the commission engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub order_id: Uuid,
    pub member_id: MemberId,
    pub placed_on: NaiveDate,
    pub points: Points,
    pub sales: Decimal,
}

impl LedgerEntry {
    /// Ledger view of an order, `None` when the order does not earn points.
    pub fn from_order(order: &Order) -> Option<Self> {
        order.counts_for_points().then(|| Self {
            order_id: order.id(), member_id: order.member_id(), placed_on: order.placed_on(),
            points: order.points(), sales: order.subtotal().amount(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PersonalTotals { points: Points, sales: Decimal }

/// Result of aggregating one member.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub points: PointsSnapshot,
    pub personal_sales: Decimal,
    /// Sales of all five generations.
    pub group_sales: Decimal,
}

/// Sums personal and generation points over a fixed date range.
pub struct PointsAggregator<'g, 'a> {
    graph: &'g SponsorGraph<'a>,
    totals: HashMap<MemberId, PersonalTotals>,
}

impl<'g, 'a> PointsAggregator<'g, 'a> {
    /// Index the ledger entries that fall in `range`. Negative point or sale
    /// values are treated as ledger corruption.
    pub fn new(graph: &'g SponsorGraph<'a>, ledger: &[LedgerEntry], range: DateRange) -> Result<Self> {
        let mut totals: HashMap<MemberId, PersonalTotals> = HashMap::new();
        for entry in ledger.iter().filter(|e| range.contains(e.placed_on)) {
            if entry.points.is_negative() || entry.sales < Decimal::ZERO {
                return Err(NetworkError::DataIntegrity(format!(
                    "order {} of member {} carries negative values ({} points, {} sales)",
                    entry.order_id, entry.member_id, entry.points, entry.sales
                )));
            }
            let t = totals.entry(entry.member_id).or_default();
            t.points += entry.points;
            t.sales = t.sales.checked_add(entry.sales)
                .ok_or_else(|| NetworkError::DataIntegrity(format!("sales of member {} overflow", entry.member_id)))?;
        }
        Ok(Self { graph, totals })
    }

    fn personal(&self, member: MemberId) -> PersonalTotals {
        self.totals.get(&member).copied().unwrap_or_default()
    }

    /// Fails with `DataIntegrity` when the member's sponsor chain or its
    /// downline loops, whatever the length of the loop.
    pub fn aggregate(&self, member: MemberId) -> Result<Aggregate> {
        if let Err(violation) = self.graph.upline(member) {
            tracing::warn!(%member, revisited = %violation.member_id, level = violation.level, "sponsor cycle detected above member");
            return Err(NetworkError::DataIntegrity(format!(
                "sponsor chain of member {} is cyclic: member {} revisited after {} levels",
                member, violation.member_id, violation.level
            )));
        }
        let downline = self.graph.downline(member);
        if let Some(violation) = downline.violations().first() {
            tracing::warn!(%member, revisited = %violation.member_id, level = violation.level, "sponsor cycle detected during aggregation");
            return Err(NetworkError::DataIntegrity(format!(
                "sponsor chain of member {} is cyclic: member {} revisited at level {}",
                member, violation.member_id, violation.level
            )));
        }

        let own = self.personal(member);
        let mut aggregate = Aggregate { personal_sales: own.sales, ..Aggregate::default() };
        aggregate.points.personal = own.points;
        for (generation, members) in downline.levels() {
            for id in members {
                let t = self.personal(*id);
                aggregate.points.generations[generation - 1] += t.points;
                aggregate.group_sales = aggregate.group_sales.checked_add(t.sales)
                    .ok_or_else(|| NetworkError::DataIntegrity(format!("group sales of member {} overflow", member)))?;
            }
        }
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Member, Role};

    fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 5, d).unwrap() }
    fn may() -> DateRange { DateRange::new(day(1), day(31)).unwrap() }

    fn entry(member: &Member, on: NaiveDate, points: i64) -> LedgerEntry {
        LedgerEntry { order_id: Uuid::new_v4(), member_id: member.id, placed_on: on, points: Points::new(points), sales: Decimal::from(points * 10) }
    }

    fn chain(len: usize) -> Vec<Member> {
        let mut members: Vec<Member> = Vec::new();
        for i in 0..len {
            let sponsor = members.last().map(|m| m.id);
            members.push(Member::register(format!("M{i}"), format!("m{i}"), Role::Member, sponsor));
        }
        members
    }

    #[test]
    fn test_personal_and_generation_points() {
        let members = chain(8);
        let graph = SponsorGraph::new(&members);
        let mut ledger: Vec<LedgerEntry> = members.iter().enumerate().map(|(i, m)| entry(m, day(10), 100 * (i as i64 + 1))).collect();
        ledger.push(entry(&members[0], day(31), 50));
        // outside the range
        ledger.push(entry(&members[1], NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 9_999));

        let aggregate = PointsAggregator::new(&graph, &ledger, may()).unwrap().aggregate(members[0].id).unwrap();
        assert_eq!(aggregate.points.personal, Points::new(150));
        assert_eq!(aggregate.points.generations, [200, 300, 400, 500, 600].map(Points::new));
        assert_eq!(aggregate.personal_sales, Decimal::from(1_500));
        assert_eq!(aggregate.group_sales, Decimal::from(20_000));
    }

    #[test]
    fn test_member_without_orders_is_zero() {
        let members = chain(2);
        let graph = SponsorGraph::new(&members);
        let aggregate = PointsAggregator::new(&graph, &[], may()).unwrap().aggregate(members[0].id).unwrap();
        assert!(aggregate.points.is_zero());
    }

    #[test]
    fn test_negative_points_are_rejected() {
        let members = chain(1);
        let graph = SponsorGraph::new(&members);
        let ledger = vec![entry(&members[0], day(3), -5)];
        assert!(matches!(PointsAggregator::new(&graph, &ledger, may()), Err(NetworkError::DataIntegrity(_))));
    }

    #[test]
    fn test_cyclic_sponsor_chain_is_flagged() {
        let mut member = Member::register("Loop", "loop", Role::Member, None);
        member.sponsor_id = Some(member.id);
        let members = vec![member.clone()];
        let graph = SponsorGraph::new(&members);
        let aggregator = PointsAggregator::new(&graph, &[], may()).unwrap();
        assert!(matches!(aggregator.aggregate(member.id), Err(NetworkError::DataIntegrity(_))));
    }

    #[test]
    fn test_loop_longer_than_five_generations_is_flagged() {
        let mut members = chain(6);
        members[0].sponsor_id = Some(members[5].id);
        let graph = SponsorGraph::new(&members);
        let ledger = vec![entry(&members[3], day(5), 1000)];
        let aggregator = PointsAggregator::new(&graph, &ledger, may()).unwrap();
        // the depth-capped walk alone never meets a revisit here
        assert!(graph.downline(members[0].id).is_consistent());
        for member in &members {
            assert!(matches!(aggregator.aggregate(member.id), Err(NetworkError::DataIntegrity(_))));
        }
    }

    #[test]
    fn test_sales_overflow_is_an_integrity_error() {
        let members = chain(1);
        let graph = SponsorGraph::new(&members);
        let mut big = entry(&members[0], day(2), 1);
        big.sales = Decimal::MAX;
        let ledger = vec![big.clone(), big];
        assert!(matches!(PointsAggregator::new(&graph, &ledger, may()), Err(NetworkError::DataIntegrity(_))));
    }
}
