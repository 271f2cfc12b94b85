//! Carts, checkout and the order lifecycle. Paid orders credit the buyer's points.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{Cart, CartItem, MemberId, Order};
use crate::domain::value_objects::{Money, Points};
use crate::service::{NetworkService, DEFAULT_CURRENCY, MAX_AMOUNT_UNITS};
use crate::{NetworkError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddToCartRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub unit_points: i64,
}

impl NetworkService {
    pub async fn get_cart(&self, session: &str) -> Cart {
        self.carts.read().await.get(session).cloned().unwrap_or_else(|| Cart::new(session, DEFAULT_CURRENCY))
    }

    pub async fn add_to_cart(&self, session: &str, request: AddToCartRequest) -> Result<Cart> {
        request.validate()?;
        if request.unit_price < Decimal::ZERO {
            return Err(NetworkError::Validation("unit_price must not be negative".into()));
        }
        if request.unit_price > Decimal::from(MAX_AMOUNT_UNITS) {
            return Err(NetworkError::Validation(format!("unit_price must not exceed {}", MAX_AMOUNT_UNITS)));
        }
        let mut carts = self.carts.write().await;
        let cart = carts.entry(session.to_string()).or_insert_with(|| Cart::new(session, DEFAULT_CURRENCY));
        cart.add_item(CartItem {
            product_id: request.product_id, name: request.name, sku: request.sku, quantity: request.quantity,
            unit_price: Money::new(request.unit_price, DEFAULT_CURRENCY), unit_points: Points::new(request.unit_points),
        })?;
        Ok(cart.clone())
    }

    pub async fn update_cart_item(&self, session: &str, product_id: &str, quantity: u32) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(session).ok_or_else(|| NetworkError::NotFound(format!("Cart {}", session)))?;
        cart.update_quantity(product_id, quantity)?;
        Ok(cart.clone())
    }

    pub async fn remove_cart_item(&self, session: &str, product_id: &str) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts.get_mut(session).ok_or_else(|| NetworkError::NotFound(format!("Cart {}", session)))?;
        cart.remove_item(product_id)?;
        Ok(cart.clone())
    }

    pub async fn clear_cart(&self, session: &str) {
        self.carts.write().await.remove(session);
    }

    /// Turn the session cart into a pending order for `member`. The cart is taken
    /// out of the session map first and put back if the order cannot be stored.
    pub async fn checkout(&self, session: &str, member: MemberId) -> Result<Order> {
        let cart = self.carts.write().await.remove(session).ok_or_else(|| NetworkError::NotFound(format!("Cart {}", session)))?;
        let mut order = match self.place_order(member, &cart).await {
            Ok(order) => order,
            Err(e) => {
                // a cart started meanwhile under the same session is kept
                self.carts.write().await.entry(session.to_string()).or_insert(cart);
                return Err(e);
            }
        };

        tracing::info!(order_id = %order.id(), member_id = %member, points = %order.points(), "order placed");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn confirm_order(&self, id: Uuid) -> Result<Order> {
        self.transition_order(id, Order::confirm).await
    }

    /// Record payment and credit the order's points to its buyer in one write.
    pub async fn pay_order(&self, id: Uuid) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        order.mark_paid()?;
        let member = self.store.record_payment(&order).await?;

        tracing::info!(order_id = %id, member_id = %member.id, points = %order.points(), "order paid");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn ship_order(&self, id: Uuid) -> Result<Order> {
        self.transition_order(id, Order::ship).await
    }

    pub async fn deliver_order(&self, id: Uuid) -> Result<Order> {
        self.transition_order(id, Order::deliver).await
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<Order> {
        self.transition_order(id, Order::cancel).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order> {
        self.store.find_order(id).await?.ok_or_else(|| NetworkError::NotFound(format!("Order {}", id)))
    }

    pub async fn list_orders(&self, member: Option<MemberId>) -> Result<Vec<Order>> {
        self.store.list_orders(member).await
    }

    async fn place_order(&self, member: MemberId, cart: &Cart) -> Result<Order> {
        self.get_member(member).await?;
        let order = Order::from_cart(member, cart)?;
        self.store.insert_order(&order).await?;
        Ok(order)
    }

    async fn transition_order<F>(&self, id: Uuid, step: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), crate::domain::aggregates::OrderError>,
    {
        let mut order = self.get_order(id).await?;
        step(&mut order)?;
        self.store.update_order(&order).await?;
        tracing::info!(order_id = %id, status = ?order.status(), "order updated");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }
}
