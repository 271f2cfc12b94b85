//! Member directory: registration, sponsor changes, downline reads and rank promotion.

use serde::Deserialize;
use validator::Validate;
use crate::domain::aggregates::{Member, MemberId, MemberUpdate, Role};
use crate::domain::events::{DomainEvent, MemberEvent};
use crate::domain::value_objects::ReferralCode;
use crate::engine::{plan_promotions, Downline, SponsorGraph};
use crate::service::NetworkService;
use crate::{NetworkError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterMemberRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 3, max = 40))]
    pub username: String,
    #[serde(default = "default_role")]
    pub role: Role,
    /// Referral code of the sponsoring member, if any.
    pub sponsor_code: Option<String>,
}

fn default_role() -> Role { Role::Member }

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSponsorRequest {
    pub sponsor_id: Option<MemberId>,
}

impl NetworkService {
    pub async fn register_member(&self, request: RegisterMemberRequest) -> Result<Member> {
        request.validate()?;
        let username = request.username.trim().to_ascii_lowercase();
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            return Err(NetworkError::Validation(format!("invalid username '{}'", request.username)));
        }

        let sponsor = match request.sponsor_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let code = ReferralCode::new(code)?;
                let sponsor = self.store.find_member_by_code(&code).await?
                    .ok_or_else(|| NetworkError::NotFound(format!("Referral code {}", code)))?;
                if !sponsor.is_network_member() {
                    return Err(NetworkError::Validation(format!("{} cannot sponsor members", sponsor.username)));
                }
                Some(sponsor.id)
            }
            None => None,
        };

        let member = Member::register(request.name.trim(), username, request.role, sponsor);
        self.store.insert_member(&member).await?;
        tracing::info!(member_id = %member.id, username = %member.username, role = %member.role, sponsor = ?sponsor, "member registered");
        self.events.publish(vec![DomainEvent::Member(MemberEvent::Registered { member_id: member.id, sponsor_id: sponsor })]).await;
        Ok(member)
    }

    /// Re-parent `id`. Rejected when the new sponsor sits in the member's own
    /// downline, since that would turn the sponsor chain into a loop.
    pub async fn change_sponsor(&self, id: MemberId, request: ChangeSponsorRequest) -> Result<Member> {
        let _guard = self.sponsor_lock.lock().await;
        let members = self.store.list_members().await?;
        let graph = SponsorGraph::new(&members);
        let member = graph.member(id).ok_or_else(|| NetworkError::NotFound(format!("Member {}", id)))?;

        if let Some(sponsor_id) = request.sponsor_id {
            let sponsor = graph.member(sponsor_id).ok_or_else(|| NetworkError::NotFound(format!("Member {}", sponsor_id)))?;
            if !sponsor.is_network_member() {
                return Err(NetworkError::Validation(format!("{} cannot sponsor members", sponsor.username)));
            }
            if graph.would_create_cycle(id, sponsor_id) {
                tracing::warn!(member_id = %id, sponsor_id = %sponsor_id, "rejected sponsor change that would create a cycle");
                return Err(NetworkError::DataIntegrity(format!("sponsoring {} by {} creates a cycle", id, sponsor_id)));
            }
        }

        let from = member.sponsor_id;
        let (member, event) = self.store.update_member(id, MemberUpdate::Sponsor(request.sponsor_id)).await?;
        if let Some(event) = event {
            tracing::info!(member_id = %id, from = ?from, to = ?request.sponsor_id, "sponsor changed");
            self.events.publish(vec![event]).await;
        }
        Ok(member)
    }

    pub async fn get_member(&self, id: MemberId) -> Result<Member> {
        self.store.find_member(id).await?.ok_or_else(|| NetworkError::NotFound(format!("Member {}", id)))
    }

    pub async fn list_members(&self) -> Result<Vec<Member>> { self.store.list_members().await }

    pub async fn downline(&self, id: MemberId) -> Result<Downline> {
        let members = self.store.list_members().await?;
        let graph = SponsorGraph::new(&members);
        if graph.member(id).is_none() { return Err(NetworkError::NotFound(format!("Member {}", id))); }
        let downline = graph.downline(id);
        if !downline.is_consistent() {
            tracing::warn!(member_id = %id, violations = downline.violations().len(), "downline contains a sponsor cycle");
        }
        Ok(downline)
    }

    /// Apply every promotion the rank table allows. Returns the promoted members.
    pub async fn promote_ranks(&self) -> Result<Vec<Member>> {
        let members = self.store.list_members().await?;
        let plan = {
            let graph = SponsorGraph::new(&members);
            plan_promotions(&graph, &self.ranks)
        };

        let mut promoted = Vec::new();
        let mut events = Vec::new();
        for (id, rank) in plan {
            if let (member, Some(event)) = self.store.update_member(id, MemberUpdate::Promote(rank)).await? {
                tracing::info!(member_id = %id, rank = %rank, "member promoted");
                events.push(event);
                promoted.push(member);
            }
        }
        self.events.publish(events).await;
        Ok(promoted)
    }
}
