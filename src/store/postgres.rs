//! PostgreSQL store.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use crate::domain::aggregates::{Member, MemberId, MemberUpdate, Order, PeriodId, ProfitPeriod};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{DateRange, ReferralCode};
use crate::engine::LedgerEntry;
use crate::store::{MemberDirectory, OrderLedger, PeriodRepository};
use crate::{NetworkError, Result};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

fn conflict_or_storage(e: sqlx::Error, what: impl FnOnce() -> String) -> NetworkError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() { return NetworkError::Conflict(what()); }
    }
    NetworkError::from(e)
}

/// Read a member row and hold its lock until the surrounding transaction ends.
async fn lock_member(conn: &mut PgConnection, id: MemberId) -> Result<Member> {
    let row = sqlx::query_as::<_, (Json<Member>,)>("SELECT doc FROM members WHERE id = $1 FOR UPDATE")
        .bind(id).fetch_optional(&mut *conn).await?;
    row.map(|(doc,)| doc.0).ok_or_else(|| NetworkError::NotFound(format!("Member {}", id)))
}

async fn save_member(conn: &mut PgConnection, member: &Member) -> Result<()> {
    sqlx::query("UPDATE members SET sponsor_id = $2, role = $3, doc = $4, updated_at = $5 WHERE id = $1")
        .bind(member.id).bind(member.sponsor_id).bind(member.role.as_str()).bind(Json(member)).bind(member.updated_at)
        .execute(&mut *conn).await?;
    Ok(())
}

#[async_trait]
impl MemberDirectory for PgStore {
    async fn list_members(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, (Json<Member>,)>("SELECT doc FROM members ORDER BY created_at, id")
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, (Json<Member>,)>("SELECT doc FROM members WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn find_member_by_code(&self, code: &ReferralCode) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, (Json<Member>,)>("SELECT doc FROM members WHERE referral_code = $1")
            .bind(code.as_str()).fetch_optional(&self.pool).await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn insert_member(&self, member: &Member) -> Result<()> {
        sqlx::query("INSERT INTO members (id, username, referral_code, sponsor_id, role, doc, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(member.id).bind(&member.username).bind(member.referral_code.as_str()).bind(member.sponsor_id)
            .bind(member.role.as_str()).bind(Json(member)).bind(member.created_at).bind(member.updated_at)
            .execute(&self.pool).await
            .map_err(|e| conflict_or_storage(e, || format!("member {} already exists", member.username)))?;
        Ok(())
    }

    async fn update_member(&self, id: MemberId, update: MemberUpdate) -> Result<(Member, Option<DomainEvent>)> {
        let mut tx = self.pool.begin().await?;
        let mut member = lock_member(&mut tx, id).await?;
        let event = member.apply(update);
        save_member(&mut tx, &member).await?;
        tx.commit().await?;
        Ok((member, event))
    }
}

#[async_trait]
impl OrderLedger for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, member_id, placed_at, earns_points, doc, updated_at) VALUES ($1, $2, $3, $4, $5, NOW())")
            .bind(order.id()).bind(order.member_id()).bind(order.placed_at()).bind(order.counts_for_points()).bind(Json(order))
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET earns_points = $2, doc = $3, updated_at = NOW() WHERE id = $1")
            .bind(order.id()).bind(order.counts_for_points()).bind(Json(order))
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(NetworkError::NotFound(format!("Order {}", order.id()))); }
        Ok(())
    }

    async fn record_payment(&self, order: &Order) -> Result<Member> {
        let mut tx = self.pool.begin().await?;
        let paid = sqlx::query("UPDATE orders SET earns_points = $2, doc = $3, updated_at = NOW() WHERE id = $1 AND NOT earns_points")
            .bind(order.id()).bind(order.counts_for_points()).bind(Json(order))
            .execute(&mut *tx).await?;
        if paid.rows_affected() == 0 {
            return Err(NetworkError::Conflict(format!("order {} is missing or already paid", order.id())));
        }
        let mut member = lock_member(&mut tx, order.member_id()).await?;
        member.apply(MemberUpdate::CreditPoints(order.points()));
        save_member(&mut tx, &member).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn list_orders(&self, member: Option<MemberId>) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE $1::uuid IS NULL OR member_id = $1 ORDER BY placed_at DESC")
            .bind(member).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn ledger_entries(&self, range: DateRange) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, (Json<Order>,)>(
            "SELECT doc FROM orders WHERE earns_points AND (placed_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2 ORDER BY placed_at",
        )
            .bind(range.start()).bind(range.end()).fetch_all(&self.pool).await?;
        Ok(rows.iter().filter_map(|(doc,)| LedgerEntry::from_order(&doc.0)).collect())
    }
}

#[async_trait]
impl PeriodRepository for PgStore {
    async fn insert_period(&self, period: &ProfitPeriod) -> Result<()> {
        let number = i32::try_from(period.period_number()).map_err(|_| NetworkError::Validation("period number out of range".into()))?;
        let range = period.range();
        sqlx::query("INSERT INTO profit_periods (id, period_name, period_number, start_date, end_date, status, doc) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(period.id()).bind(period.period_name()).bind(number).bind(range.start()).bind(range.end())
            .bind(period.status().as_str()).bind(Json(period))
            .execute(&self.pool).await
            .map_err(|e| conflict_or_storage(e, || format!("profit period '{}' already exists", period.period_name())))?;
        Ok(())
    }

    async fn find_period(&self, id: PeriodId) -> Result<Option<ProfitPeriod>> {
        let row = sqlx::query_as::<_, (Json<ProfitPeriod>,)>("SELECT doc FROM profit_periods WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn list_periods(&self) -> Result<Vec<ProfitPeriod>> {
        let rows = sqlx::query_as::<_, (Json<ProfitPeriod>,)>("SELECT doc FROM profit_periods ORDER BY period_number DESC")
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn next_period_number(&self) -> Result<u32> {
        let (max,): (i32,) = sqlx::query_as("SELECT COALESCE(MAX(period_number), 0) FROM profit_periods")
            .fetch_one(&self.pool).await?;
        Ok(u32::try_from(max).unwrap_or(0) + 1)
    }

    async fn update_unpaid_period(&self, period: &ProfitPeriod) -> Result<()> {
        let done = sqlx::query("UPDATE profit_periods SET status = $2, doc = $3, closed_at = $4 WHERE id = $1 AND status = 'calculated'")
            .bind(period.id()).bind(period.status().as_str()).bind(Json(period)).bind(period.closed_at())
            .execute(&self.pool).await?;
        if done.rows_affected() == 1 { return Ok(()); }
        let exists: Option<(String,)> = sqlx::query_as("SELECT status FROM profit_periods WHERE id = $1")
            .bind(period.id()).fetch_optional(&self.pool).await?;
        match exists {
            Some(_) => Err(NetworkError::AlreadyClosed(period.id())),
            None => Err(NetworkError::NotFound(format!("Profit period {}", period.id()))),
        }
    }
}
