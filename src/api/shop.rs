use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use crate::api::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{Cart, MemberId, Order, Role};
use crate::NetworkError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cart/:session", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items/:product_id", put(update_cart_item).delete(remove_cart_item))
        .route("/api/v1/checkout/:session", post(checkout))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/confirm", post(confirm_order))
        .route("/api/v1/orders/:id/pay", post(pay_order))
        .route("/api/v1/orders/:id/ship", post(ship_order))
        .route("/api/v1/orders/:id/deliver", post(deliver_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
}

#[derive(Debug, Deserialize)] pub struct UpdateQuantity { pub quantity: u32 }
#[derive(Debug, Deserialize)] pub struct OrderFilter { pub member_id: Option<MemberId> }

fn require_staff(actor: &Actor) -> ApiResult<()> {
    if matches!(actor.role, Role::Admin | Role::Staff) { return Ok(()); }
    Err(ApiError(NetworkError::Forbidden("staff role required".into())))
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Json<Cart> {
    Json(s.service.get_cart(&session).await)
}

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<crate::service::AddToCartRequest>) -> ApiResult<(StatusCode, Json<Cart>)> {
    Ok((StatusCode::CREATED, Json(s.service.add_to_cart(&session, r).await?)))
}

async fn update_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>, Json(r): Json<UpdateQuantity>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.service.update_cart_item(&session, &product_id, r.quantity).await?))
}

async fn remove_cart_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, String)>) -> ApiResult<Json<Cart>> {
    Ok(Json(s.service.remove_cart_item(&session, &product_id).await?))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> StatusCode {
    s.service.clear_cart(&session).await;
    StatusCode::NO_CONTENT
}

async fn checkout(State(s): State<AppState>, actor: Actor, Path(session): Path<String>) -> ApiResult<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.service.checkout(&session, actor.id).await?)))
}

async fn list_orders(State(s): State<AppState>, actor: Actor, Query(f): Query<OrderFilter>) -> ApiResult<Json<Vec<Order>>> {
    let member = match actor.role {
        Role::Admin | Role::Staff => f.member_id,
        _ => Some(actor.id),
    };
    Ok(Json(s.service.list_orders(member).await?))
}

async fn get_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    let order = s.service.get_order(id).await?;
    actor.require_self_or_staff(order.member_id())?;
    Ok(Json(order))
}

async fn confirm_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    let order = s.service.get_order(id).await?;
    actor.require_self_or_staff(order.member_id())?;
    Ok(Json(s.service.confirm_order(id).await?))
}

async fn pay_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    require_staff(&actor)?;
    Ok(Json(s.service.pay_order(id).await?))
}

async fn ship_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    require_staff(&actor)?;
    Ok(Json(s.service.ship_order(id).await?))
}

async fn deliver_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    require_staff(&actor)?;
    Ok(Json(s.service.deliver_order(id).await?))
}

async fn cancel_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    let order = s.service.get_order(id).await?;
    actor.require_self_or_staff(order.member_id())?;
    Ok(Json(s.service.cancel_order(id).await?))
}
