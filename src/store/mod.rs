//! Storage traits and their PostgreSQL / in-memory implementations.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::aggregates::{Member, MemberId, MemberUpdate, Order, PeriodId, ProfitPeriod};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{DateRange, ReferralCode};
use crate::engine::LedgerEntry;
use crate::Result;

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn list_members(&self) -> Result<Vec<Member>>;
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>>;
    async fn find_member_by_code(&self, code: &ReferralCode) -> Result<Option<Member>>;
    /// Fails with `Conflict` when the username or referral code is taken.
    async fn insert_member(&self, member: &Member) -> Result<()>;
    /// Apply `update` to the latest stored copy of the member under a row lock.
    /// Returns the updated member and the event the change raised.
    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<(Member, Option<DomainEvent>)>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn update_order(&self, order: &Order) -> Result<()>;
    /// Persist a newly paid order and credit its points to the buyer's stored row
    /// in the same write. Returns the credited member.
    async fn record_payment(&self, order: &Order) -> Result<Member>;
    async fn list_orders(&self, member: Option<MemberId>) -> Result<Vec<Order>>;
    /// Points-earning orders placed inside `range`.
    async fn ledger_entries(&self, range: DateRange) -> Result<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait PeriodRepository: Send + Sync {
    /// Fails with `Conflict` when the period name is taken. Nothing is written on failure.
    async fn insert_period(&self, period: &ProfitPeriod) -> Result<()>;
    async fn find_period(&self, id: PeriodId) -> Result<Option<ProfitPeriod>>;
    async fn list_periods(&self) -> Result<Vec<ProfitPeriod>>;
    async fn next_period_number(&self) -> Result<u32>;
    /// Overwrite a stored period only while the stored copy is still `calculated`;
    /// otherwise fails with `AlreadyClosed` and leaves storage untouched.
    async fn update_unpaid_period(&self, period: &ProfitPeriod) -> Result<()>;
}

pub trait NetworkStore: MemberDirectory + OrderLedger + PeriodRepository {}
impl<T: MemberDirectory + OrderLedger + PeriodRepository> NetworkStore for T {}
