//! Member Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Points, ReferralCode};
use crate::domain::events::{DomainEvent, MemberEvent};

pub type MemberId = Uuid;

/// Number of downline generations that earn commission.
pub const GENERATIONS: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub username: String,
    pub referral_code: ReferralCode,
    pub sponsor_id: Option<MemberId>,
    pub role: Role,
    pub rank: Rank,
    pub monthly_points: Points,
    pub cumulative_points: Points,
    /// Decayed per-generation aggregates kept by the points ledger.
    pub generation_points: [Points; GENERATIONS],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn register(name: impl Into<String>, username: impl Into<String>, role: Role, sponsor_id: Option<MemberId>) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        Self {
            id, name: name.into(), username: username.into(), referral_code: ReferralCode::generate(id),
            sponsor_id, role, rank: Rank::Agent, monthly_points: Points::ZERO, cumulative_points: Points::ZERO,
            generation_points: [Points::ZERO; GENERATIONS], created_at: now, updated_at: now,
        }
    }

    /// Only network members earn and pass up commission; customers, staff and admins do not.
    pub fn is_network_member(&self) -> bool { matches!(self.role, Role::Member) }

    pub fn credit_points(&mut self, points: Points) {
        self.monthly_points += points;
        self.cumulative_points += points;
        self.touch();
    }

    /// Move to `rank` if it is higher than the current one. Ranks never demote.
    pub fn promote_to(&mut self, rank: Rank) -> Option<DomainEvent> {
        if rank <= self.rank { return None; }
        let from = self.rank;
        self.rank = rank;
        self.touch();
        Some(DomainEvent::Member(MemberEvent::RankChanged { member_id: self.id, from, to: rank }))
    }

    /// Apply one targeted change. Returns the event it raised, if any.
    pub fn apply(&mut self, update: MemberUpdate) -> Option<DomainEvent> {
        match update {
            MemberUpdate::Sponsor(to) => {
                let from = self.sponsor_id;
                if from == to { return None; }
                self.sponsor_id = to;
                self.touch();
                Some(DomainEvent::Member(MemberEvent::SponsorChanged { member_id: self.id, from, to }))
            }
            MemberUpdate::Promote(rank) => self.promote_to(rank),
            MemberUpdate::CreditPoints(points) => {
                self.credit_points(points);
                None
            }
        }
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// A single field-level change, applied by the store against the latest stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberUpdate {
    Sponsor(Option<MemberId>),
    Promote(Rank),
    CreditPoints(Points),
}

/// Closed set of account roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role { Admin, Staff, Member, Customer }

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Role::Admin => "admin", Role::Staff => "staff", Role::Member => "member", Role::Customer => "customer" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "member" => Ok(Role::Member),
            "customer" => Ok(Role::Customer),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// The nine member ranks, ordered from entry level upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank { Agent, Bronze, Silver, Gold, Platinum, Diamond, Crown, Ambassador, GlobalAmbassador }

impl Rank {
    pub const ALL: [Rank; 9] = [
        Rank::Agent, Rank::Bronze, Rank::Silver, Rank::Gold, Rank::Platinum,
        Rank::Diamond, Rank::Crown, Rank::Ambassador, Rank::GlobalAmbassador,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Agent => "agent",
            Rank::Bronze => "bronze",
            Rank::Silver => "silver",
            Rank::Gold => "gold",
            Rank::Platinum => "platinum",
            Rank::Diamond => "diamond",
            Rank::Crown => "crown",
            Rank::Ambassador => "ambassador",
            Rank::GlobalAmbassador => "global_ambassador",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Rank {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::ALL.iter().copied().find(|r| r.as_str() == s).ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown variant `{}`", self.0) }
}

#[derive(Clone, Debug, Serialize)]
pub struct RankRequirement {
    pub rank: Rank,
    pub min_cumulative_points: Points,
    /// Direct referrals holding `Bronze` or higher.
    pub min_bronze_lines: u32,
    pub description: &'static str,
}

/// Static rank reference data.
#[derive(Clone, Debug, Serialize)]
pub struct RankTable { requirements: Vec<RankRequirement> }

impl RankTable {
    pub fn requirements(&self) -> &[RankRequirement] { &self.requirements }

    /// Highest rank whose thresholds are met.
    pub fn qualifying_rank(&self, cumulative_points: Points, bronze_lines: u32) -> Rank {
        self.requirements.iter().rev()
            .find(|r| cumulative_points >= r.min_cumulative_points && bronze_lines >= r.min_bronze_lines)
            .map(|r| r.rank)
            .unwrap_or(Rank::Agent)
    }
}

impl Default for RankTable {
    fn default() -> Self {
        let row = |rank, points, lines, description| RankRequirement { rank, min_cumulative_points: Points::new(points), min_bronze_lines: lines, description };
        Self {
            requirements: vec![
                row(Rank::Agent, 0, 0, "Registered member with a referral code"),
                row(Rank::Bronze, 500, 0, "First purchase volume milestone"),
                row(Rank::Silver, 2_000, 1, "Sustained volume with one bronze line"),
                row(Rank::Gold, 5_000, 2, "Two bronze lines"),
                row(Rank::Platinum, 10_000, 3, "Three bronze lines"),
                row(Rank::Diamond, 25_000, 4, "Four bronze lines"),
                row(Rank::Crown, 50_000, 5, "Five bronze lines"),
                row(Rank::Ambassador, 100_000, 6, "Six bronze lines"),
                row(Rank::GlobalAmbassador, 250_000, 8, "Eight bronze lines and top network volume"),
            ],
        }
    }
}
