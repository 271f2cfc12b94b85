//! In-memory store for tests and local runs.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::{Member, MemberId, MemberUpdate, Order, PeriodId, ProfitPeriod};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{DateRange, ReferralCode};
use crate::engine::LedgerEntry;
use crate::store::{MemberDirectory, OrderLedger, PeriodRepository};
use crate::{NetworkError, Result};

#[derive(Default)]
struct Tables {
    members: Vec<Member>,
    orders: Vec<Order>,
    /// Periods are kept serialized so that reads can never alias stored state.
    periods: Vec<(PeriodId, String, Vec<u8>)>,
}

#[derive(Default)]
pub struct MemoryStore { tables: RwLock<Tables> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Raw stored bytes of a period.
    pub async fn period_bytes(&self, id: PeriodId) -> Option<Vec<u8>> {
        self.tables.read().await.periods.iter().find(|(pid, _, _)| *pid == id).map(|(_, _, b)| b.clone())
    }
}

#[async_trait]
impl MemberDirectory for MemoryStore {
    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.tables.read().await.members.clone())
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>> {
        Ok(self.tables.read().await.members.iter().find(|m| m.id == id).cloned())
    }

    async fn find_member_by_code(&self, code: &ReferralCode) -> Result<Option<Member>> {
        Ok(self.tables.read().await.members.iter().find(|m| &m.referral_code == code).cloned())
    }

    async fn insert_member(&self, member: &Member) -> Result<()> {
        let mut t = self.tables.write().await;
        if t.members.iter().any(|m| m.username == member.username || m.referral_code == member.referral_code) {
            return Err(NetworkError::Conflict(format!("member {} already exists", member.username)));
        }
        t.members.push(member.clone());
        Ok(())
    }

    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<(Member, Option<DomainEvent>)> {
        let mut t = self.tables.write().await;
        let slot = t.members.iter_mut().find(|m| m.id == id).ok_or_else(|| NetworkError::NotFound(format!("Member {}", id)))?;
        let event = slot.apply(update);
        Ok((slot.clone(), event))
    }
}

#[async_trait]
impl OrderLedger for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.tables.write().await.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.iter().find(|o| o.id() == id).cloned())
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut t = self.tables.write().await;
        let slot = t.orders.iter_mut().find(|o| o.id() == order.id()).ok_or_else(|| NetworkError::NotFound(format!("Order {}", order.id())))?;
        *slot = order.clone();
        Ok(())
    }

    async fn record_payment(&self, order: &Order) -> Result<Member> {
        let mut t = self.tables.write().await;
        let order_idx = t.orders.iter().position(|o| o.id() == order.id() && !o.counts_for_points())
            .ok_or_else(|| NetworkError::Conflict(format!("order {} is missing or already paid", order.id())))?;
        let member_idx = t.members.iter().position(|m| m.id == order.member_id())
            .ok_or_else(|| NetworkError::NotFound(format!("Member {}", order.member_id())))?;
        t.orders[order_idx] = order.clone();
        let member = &mut t.members[member_idx];
        member.apply(MemberUpdate::CreditPoints(order.points()));
        Ok(member.clone())
    }

    async fn list_orders(&self, member: Option<MemberId>) -> Result<Vec<Order>> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().filter(|o| member.map_or(true, |m| o.member_id() == m)).cloned().collect())
    }

    async fn ledger_entries(&self, range: DateRange) -> Result<Vec<LedgerEntry>> {
        let t = self.tables.read().await;
        Ok(t.orders.iter().filter_map(LedgerEntry::from_order).filter(|e| range.contains(e.placed_on)).collect())
    }
}

#[async_trait]
impl PeriodRepository for MemoryStore {
    async fn insert_period(&self, period: &ProfitPeriod) -> Result<()> {
        let bytes = serde_json::to_vec(period)?;
        let mut t = self.tables.write().await;
        if t.periods.iter().any(|(_, name, _)| name == period.period_name()) {
            return Err(NetworkError::Conflict(format!("profit period '{}' already exists", period.period_name())));
        }
        t.periods.push((period.id(), period.period_name().to_string(), bytes));
        Ok(())
    }

    async fn find_period(&self, id: PeriodId) -> Result<Option<ProfitPeriod>> {
        match self.period_bytes(id).await {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_periods(&self) -> Result<Vec<ProfitPeriod>> {
        let t = self.tables.read().await;
        let mut periods = t.periods.iter()
            .map(|(_, _, b)| serde_json::from_slice(b).map_err(NetworkError::from))
            .collect::<Result<Vec<ProfitPeriod>>>()?;
        periods.sort_by(|a, b| b.period_number().cmp(&a.period_number()));
        Ok(periods)
    }

    async fn next_period_number(&self) -> Result<u32> {
        let periods = self.list_periods().await?;
        Ok(periods.iter().map(ProfitPeriod::period_number).max().unwrap_or(0) + 1)
    }

    async fn update_unpaid_period(&self, period: &ProfitPeriod) -> Result<()> {
        let bytes = serde_json::to_vec(period)?;
        let mut t = self.tables.write().await;
        let slot = t.periods.iter_mut().find(|(id, _, _)| *id == period.id()).ok_or_else(|| NetworkError::NotFound(format!("Profit period {}", period.id())))?;
        let stored: ProfitPeriod = serde_json::from_slice(&slot.2)?;
        if stored.is_paid() { return Err(NetworkError::AlreadyClosed(period.id())); }
        slot.2 = bytes;
        Ok(())
    }
}
