//! Domain events
use crate::domain::aggregates::member::{MemberId, Rank};
use crate::domain::aggregates::profit_period::PeriodId;
use crate::domain::value_objects::Points;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Member(MemberEvent),
    Order(OrderEvent),
    Period(PeriodEvent),
}

impl DomainEvent {
    /// Subject suffix used when publishing, e.g. `period.closed`.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Member(MemberEvent::Registered { .. }) => "member.registered",
            DomainEvent::Member(MemberEvent::SponsorChanged { .. }) => "member.sponsor_changed",
            DomainEvent::Member(MemberEvent::RankChanged { .. }) => "member.rank_changed",
            DomainEvent::Order(OrderEvent::Created { .. }) => "order.created",
            DomainEvent::Order(OrderEvent::Confirmed { .. }) => "order.confirmed",
            DomainEvent::Order(OrderEvent::Paid { .. }) => "order.paid",
            DomainEvent::Order(OrderEvent::Shipped { .. }) => "order.shipped",
            DomainEvent::Order(OrderEvent::Delivered { .. }) => "order.delivered",
            DomainEvent::Order(OrderEvent::Cancelled { .. }) => "order.cancelled",
            DomainEvent::Period(PeriodEvent::Calculated { .. }) => "period.calculated",
            DomainEvent::Period(PeriodEvent::Recalculated { .. }) => "period.recalculated",
            DomainEvent::Period(PeriodEvent::Closed { .. }) => "period.closed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemberEvent {
    Registered { member_id: MemberId, sponsor_id: Option<MemberId> },
    SponsorChanged { member_id: MemberId, from: Option<MemberId>, to: Option<MemberId> },
    RankChanged { member_id: MemberId, from: Rank, to: Rank },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, member_id: MemberId },
    Confirmed { order_id: Uuid, total: Decimal },
    Paid { order_id: Uuid, member_id: MemberId, points: Points },
    Shipped { order_id: Uuid },
    Delivered { order_id: Uuid },
    Cancelled { order_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodEvent {
    Calculated { period_id: PeriodId, period_name: String, start_date: NaiveDate, end_date: NaiveDate, members: usize, total_payout: Decimal },
    Recalculated { period_id: PeriodId, members: usize, total_payout: Decimal },
    Closed { period_id: PeriodId, total_payout: Decimal },
}
