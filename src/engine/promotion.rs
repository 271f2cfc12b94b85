//! Rank auto-promotion against the [`RankTable`].

use std::collections::HashMap;
use crate::domain::aggregates::{MemberId, Rank, RankTable};
use crate::engine::downline::SponsorGraph;

/// A direct referral counts as a bronze line once it holds `Bronze` or higher.
pub fn bronze_lines(graph: &SponsorGraph<'_>, member: MemberId, ranks: &HashMap<MemberId, Rank>) -> u32 {
    let count = graph.children(member).iter()
        .filter(|child| ranks.get(*child).copied().unwrap_or(Rank::Agent) >= Rank::Bronze)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Ranks every network member should be promoted to, as `(member, new_rank)`.
///
/// Promotions feed back into the sponsor's bronze lines, so evaluation repeats
/// until nothing changes. Ranks only ever go up, which bounds the loop.
pub fn plan_promotions(graph: &SponsorGraph<'_>, table: &RankTable) -> Vec<(MemberId, Rank)> {
    let mut ranks: HashMap<MemberId, Rank> = graph.members().map(|m| (m.id, m.rank)).collect();
    let mut network: Vec<_> = graph.members().filter(|m| m.is_network_member()).collect();
    network.sort_by_key(|m| m.id);

    loop {
        let mut changed = false;
        for member in &network {
            let lines = bronze_lines(graph, member.id, &ranks);
            let qualified = table.qualifying_rank(member.cumulative_points, lines);
            let current = ranks.get(&member.id).copied().unwrap_or(member.rank);
            if qualified > current {
                ranks.insert(member.id, qualified);
                changed = true;
            }
        }
        if !changed { break; }
    }

    network.iter()
        .filter_map(|m| ranks.get(&m.id).copied().filter(|r| *r > m.rank).map(|r| (m.id, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Member, Role};
    use crate::domain::value_objects::Points;

    fn member(points: i64, sponsor: Option<MemberId>) -> Member {
        let mut m = Member::register("M", "m", Role::Member, sponsor);
        m.cumulative_points = Points::new(points);
        m
    }

    #[test]
    fn test_promotion_cascades_through_bronze_lines() {
        let top = member(2_500, None);
        let a = member(600, Some(top.id));
        let b = member(100, Some(top.id));
        let members = vec![top.clone(), a.clone(), b.clone()];
        let graph = SponsorGraph::new(&members);
        let mut plan = plan_promotions(&graph, &RankTable::default());
        plan.sort_by_key(|(id, _)| *id);
        let mut expected = vec![(top.id, Rank::Silver), (a.id, Rank::Bronze)];
        expected.sort_by_key(|(id, _)| *id);
        assert_eq!(plan, expected);
    }

    #[test]
    fn test_no_demotion_and_customers_ignored() {
        let mut gold = member(0, None);
        gold.rank = Rank::Gold;
        let mut shopper = member(9_000, None);
        shopper.role = Role::Customer;
        let members = vec![gold, shopper];
        let graph = SponsorGraph::new(&members);
        assert!(plan_promotions(&graph, &RankTable::default()).is_empty());
    }
}
