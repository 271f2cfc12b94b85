use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::api::{Actor, ApiResult, AppState};
use crate::domain::aggregates::{MemberProfit, PeriodId, PeriodStatus, ProfitPeriod};
use crate::service::CalculatePeriodRequest;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/profit-periods", get(list_periods).post(calculate_period))
        .route("/api/v1/profit-periods/:id", get(get_period))
        .route("/api/v1/profit-periods/:id/close", post(close_period))
        .route("/api/v1/profit-periods/:id/recalculate", post(recalculate_period))
}

#[derive(Debug, Serialize)]
pub struct PeriodSummary {
    pub id: PeriodId,
    pub period_name: String,
    pub period_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub members: usize,
    pub total_payout: Decimal,
    pub closed_at: Option<DateTime<Utc>>,
}

/// A period with its member profits ranked by total profit.
#[derive(Debug, Serialize)]
pub struct PeriodDetail {
    #[serde(flatten)]
    pub summary: PeriodSummary,
    pub member_profits: Vec<MemberProfit>,
}

impl From<&ProfitPeriod> for PeriodSummary {
    fn from(p: &ProfitPeriod) -> Self {
        Self {
            id: p.id(), period_name: p.period_name().to_string(), period_number: p.period_number(),
            start_date: p.range().start(), end_date: p.range().end(), status: p.status(),
            members: p.member_profits().len(), total_payout: p.total_payout(), closed_at: p.closed_at(),
        }
    }
}

impl From<&ProfitPeriod> for PeriodDetail {
    fn from(p: &ProfitPeriod) -> Self {
        Self { summary: p.into(), member_profits: p.ranked_profits().into_iter().cloned().collect() }
    }
}

async fn calculate_period(State(s): State<AppState>, actor: Actor, Json(r): Json<CalculatePeriodRequest>) -> ApiResult<(StatusCode, Json<PeriodDetail>)> {
    actor.require_admin()?;
    let period = s.service.calculate_period(r).await?;
    Ok((StatusCode::CREATED, Json((&period).into())))
}

async fn list_periods(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Vec<PeriodSummary>>> {
    actor.require_admin()?;
    let periods = s.service.list_periods().await?;
    Ok(Json(periods.iter().map(PeriodSummary::from).collect()))
}

async fn get_period(State(s): State<AppState>, actor: Actor, Path(id): Path<PeriodId>) -> ApiResult<Json<PeriodDetail>> {
    actor.require_admin()?;
    let period = s.service.get_period(id).await?;
    Ok(Json((&period).into()))
}

async fn close_period(State(s): State<AppState>, actor: Actor, Path(id): Path<PeriodId>) -> ApiResult<Json<PeriodSummary>> {
    actor.require_admin()?;
    let period = s.service.close_period(id).await?;
    Ok(Json((&period).into()))
}

async fn recalculate_period(State(s): State<AppState>, actor: Actor, Path(id): Path<PeriodId>) -> ApiResult<Json<PeriodDetail>> {
    actor.require_admin()?;
    let period = s.service.recalculate_period(id).await?;
    Ok(Json((&period).into()))
}
