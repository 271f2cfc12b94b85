//! Referral graph reader
//!
//! Resolves the downline of a member by breadth-first traversal of the inverse
//! sponsor relation. Traversal is capped at [`GENERATIONS`] levels. A corrupted
//! sponsor chain (a cycle) never loops: the revisited branch is cut and reported
//! as an [`IntegrityViolation`].

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{HashMap, HashSet};
use crate::domain::aggregates::{Member, MemberId, GENERATIONS};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct IntegrityViolation {
    /// Member that was reached a second time.
    pub member_id: MemberId,
    /// Level at which the revisit was detected.
    pub level: usize,
}

/// Downline of one root, grouped by generation.
#[derive(Clone, Debug, Default)]
pub struct Downline {
    pub root: MemberId,
    levels: [Vec<MemberId>; GENERATIONS],
    violations: Vec<IntegrityViolation>,
}

impl Downline {
    /// Members at `generation` (1-based). Out-of-range generations are empty.
    pub fn level(&self, generation: usize) -> &[MemberId] {
        generation.checked_sub(1).and_then(|i| self.levels.get(i)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &[MemberId])> {
        self.levels.iter().enumerate().map(|(i, l)| (i + 1, l.as_slice()))
    }

    pub fn len(&self) -> usize { self.levels.iter().map(Vec::len).sum() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn violations(&self) -> &[IntegrityViolation] { &self.violations }
    pub fn is_consistent(&self) -> bool { self.violations.is_empty() }
}

impl Serialize for Downline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Downline", 7)?;
        s.serialize_field("root", &self.root)?;
        s.serialize_field("level1", &self.levels[0])?;
        s.serialize_field("level2", &self.levels[1])?;
        s.serialize_field("level3", &self.levels[2])?;
        s.serialize_field("level4", &self.levels[3])?;
        s.serialize_field("level5", &self.levels[4])?;
        s.serialize_field("violations", &self.violations)?;
        s.end()
    }
}

/// Read-only view over the member directory, indexed for downline walks.
pub struct SponsorGraph<'a> {
    members: HashMap<MemberId, &'a Member>,
    children: HashMap<MemberId, Vec<MemberId>>,
}

impl<'a> SponsorGraph<'a> {
    pub fn new(directory: &'a [Member]) -> Self {
        let members: HashMap<MemberId, &Member> = directory.iter().map(|m| (m.id, m)).collect();
        let mut children: HashMap<MemberId, Vec<MemberId>> = HashMap::new();
        for member in directory.iter().filter(|m| m.is_network_member()) {
            // dangling sponsor references make the member a root of its own tree
            if let Some(sponsor) = member.sponsor_id.filter(|s| members.contains_key(s)) {
                children.entry(sponsor).or_default().push(member.id);
            }
        }
        Self { members, children }
    }

    pub fn member(&self, id: MemberId) -> Option<&'a Member> { self.members.get(&id).copied() }

    pub fn members(&self) -> impl Iterator<Item = &'a Member> + '_ { self.members.values().copied() }

    /// Direct network referrals of `id`.
    pub fn children(&self, id: MemberId) -> &[MemberId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn downline(&self, root: MemberId) -> Downline {
        let mut downline = Downline { root, ..Downline::default() };
        let mut seen = HashSet::from([root]);
        let mut frontier = vec![root];

        for depth in 0..GENERATIONS {
            let mut next = Vec::new();
            for parent in &frontier {
                for &child in self.children(*parent) {
                    if !seen.insert(child) {
                        downline.violations.push(IntegrityViolation { member_id: child, level: depth + 1 });
                        continue;
                    }
                    next.push(child);
                }
            }
            if next.is_empty() { break; }
            downline.levels[depth] = next.clone();
            frontier = next;
        }
        downline
    }

    /// Sponsor chain of `id`, nearest first. Fails on a cycle instead of looping.
    pub fn upline(&self, id: MemberId) -> Result<Vec<MemberId>, IntegrityViolation> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.member(id).and_then(|m| m.sponsor_id);
        while let Some(sponsor) = current {
            if !seen.insert(sponsor) {
                return Err(IntegrityViolation { member_id: sponsor, level: chain.len() + 1 });
            }
            chain.push(sponsor);
            current = self.member(sponsor).and_then(|m| m.sponsor_id);
        }
        Ok(chain)
    }

    /// Whether making `sponsor` the sponsor of `member` would close a loop.
    pub fn would_create_cycle(&self, member: MemberId, sponsor: MemberId) -> bool {
        if member == sponsor { return true; }
        match self.upline(sponsor) {
            Ok(chain) => chain.contains(&member),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Role;

    /// Builds a straight sponsor chain of `len` members; index 0 is the top.
    fn chain(len: usize) -> Vec<Member> {
        let mut members: Vec<Member> = Vec::new();
        for i in 0..len {
            let sponsor = members.last().map(|m| m.id);
            members.push(Member::register(format!("M{i}"), format!("m{i}"), Role::Member, sponsor));
        }
        members
    }

    #[test]
    fn test_downline_is_capped_at_five_levels() {
        let members = chain(9);
        let graph = SponsorGraph::new(&members);
        let downline = graph.downline(members[0].id);
        assert_eq!(downline.len(), 5);
        for generation in 1..=5 { assert_eq!(downline.level(generation), &[members[generation].id]); }
        assert!(downline.level(6).is_empty());
        assert!(downline.is_consistent());
    }

    #[test]
    fn test_levels_group_siblings() {
        let root = Member::register("Root", "root", Role::Member, None);
        let a = Member::register("A", "a", Role::Member, Some(root.id));
        let b = Member::register("B", "b", Role::Member, Some(root.id));
        let c = Member::register("C", "c", Role::Member, Some(b.id));
        let customer = Member::register("Shopper", "shopper", Role::Customer, Some(root.id));
        let members = vec![root.clone(), a.clone(), b.clone(), c.clone(), customer];
        let downline = SponsorGraph::new(&members).downline(root.id);
        assert_eq!(downline.level(1), &[a.id, b.id]);
        assert_eq!(downline.level(2), &[c.id]);
        assert_eq!(downline.len(), 3);
    }

    #[test]
    fn test_self_sponsored_member_terminates_with_violation() {
        let mut member = Member::register("Loop", "loop", Role::Member, None);
        member.sponsor_id = Some(member.id);
        let members = vec![member.clone()];
        let graph = SponsorGraph::new(&members);
        let downline = graph.downline(member.id);
        assert!(downline.is_empty());
        assert_eq!(downline.violations(), &[IntegrityViolation { member_id: member.id, level: 1 }]);
        assert!(graph.upline(member.id).is_err());
    }

    #[test]
    fn test_two_member_cycle_is_truncated() {
        let mut a = Member::register("A", "a", Role::Member, None);
        let b = Member::register("B", "b", Role::Member, Some(a.id));
        a.sponsor_id = Some(b.id);
        let members = vec![a.clone(), b.clone()];
        let downline = SponsorGraph::new(&members).downline(a.id);
        assert_eq!(downline.level(1), &[b.id]);
        assert_eq!(downline.violations().len(), 1);
    }

    #[test]
    fn test_missing_sponsor_is_a_leaf() {
        let orphan = Member::register("Orphan", "orphan", Role::Member, Some(uuid::Uuid::new_v4()));
        let members = vec![orphan.clone()];
        let graph = SponsorGraph::new(&members);
        assert!(graph.downline(orphan.id).is_empty());
        assert_eq!(graph.upline(orphan.id).unwrap().len(), 1);
    }

    #[test]
    fn test_would_create_cycle() {
        let members = chain(3);
        let graph = SponsorGraph::new(&members);
        assert!(graph.would_create_cycle(members[0].id, members[2].id));
        assert!(graph.would_create_cycle(members[1].id, members[1].id));
        assert!(!graph.would_create_cycle(members[2].id, members[0].id));
    }

    #[test]
    fn test_downline_json_shape() {
        let members = chain(2);
        let json = serde_json::to_value(SponsorGraph::new(&members).downline(members[0].id)).unwrap();
        assert_eq!(json["level1"].as_array().unwrap().len(), 1);
        assert!(json["level5"].as_array().unwrap().is_empty());
    }
}
