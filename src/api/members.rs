use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use crate::api::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{Member, MemberId, RankRequirement, Role};
use crate::engine::{CommissionRates, Downline};
use crate::service::{ChangeSponsorRequest, MemberEarning, RegisterMemberRequest};
use crate::NetworkError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/members", get(list_members).post(register_member))
        .route("/api/v1/members/:id", get(get_member))
        .route("/api/v1/members/:id/sponsor", put(change_sponsor))
        .route("/api/v1/members/:id/downline", get(downline))
        .route("/api/v1/members/:id/earnings", get(earnings))
        .route("/api/v1/ranks", get(rank_table))
        .route("/api/v1/ranks/promote", post(promote_ranks))
}

#[derive(Debug, Serialize)]
pub struct RankTableResponse<'a> {
    pub ranks: &'a [RankRequirement],
    pub rates: &'a CommissionRates,
}

// Registration is open for members and customers. Staff and admin accounts
// can only be created by an admin.
async fn register_member(State(s): State<AppState>, actor: Option<Actor>, Json(r): Json<RegisterMemberRequest>) -> ApiResult<(StatusCode, Json<Member>)> {
    if matches!(r.role, Role::Admin | Role::Staff) {
        let actor = actor.ok_or_else(|| ApiError(NetworkError::Forbidden(format!("registering a {} account requires an admin", r.role))))?;
        actor.require_admin()?;
    }
    let member = s.service.register_member(r).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn list_members(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Vec<Member>>> {
    actor.require_admin()?;
    Ok(Json(s.service.list_members().await?))
}

async fn get_member(State(s): State<AppState>, actor: Actor, Path(id): Path<MemberId>) -> ApiResult<Json<Member>> {
    actor.require_self_or_staff(id)?;
    Ok(Json(s.service.get_member(id).await?))
}

async fn change_sponsor(State(s): State<AppState>, actor: Actor, Path(id): Path<MemberId>, Json(r): Json<ChangeSponsorRequest>) -> ApiResult<Json<Member>> {
    actor.require_admin()?;
    Ok(Json(s.service.change_sponsor(id, r).await?))
}

async fn downline(State(s): State<AppState>, actor: Actor, Path(id): Path<MemberId>) -> ApiResult<Json<Downline>> {
    actor.require_self_or_staff(id)?;
    Ok(Json(s.service.downline(id).await?))
}

async fn earnings(State(s): State<AppState>, actor: Actor, Path(id): Path<MemberId>) -> ApiResult<Json<Vec<MemberEarning>>> {
    actor.require_self_or_staff(id)?;
    Ok(Json(s.service.member_earnings(id).await?))
}

async fn rank_table(State(s): State<AppState>) -> Json<serde_json::Value> {
    let body = RankTableResponse { ranks: s.service.rank_table().requirements(), rates: s.service.calculator().rates() };
    Json(serde_json::to_value(body).unwrap_or_default())
}

async fn promote_ranks(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Vec<Member>>> {
    actor.require_admin()?;
    Ok(Json(s.service.promote_ranks().await?))
}
