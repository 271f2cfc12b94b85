//! Order Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::Cart;
use crate::domain::aggregates::member::MemberId;
use crate::domain::value_objects::{Money, MoneyError, Points};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    member_id: MemberId,
    status: OrderStatus,
    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,
    items: Vec<LineItem>,
    subtotal: Money,
    points: Points,
    placed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem { pub product_id: String, pub name: String, pub sku: String, pub quantity: u32, pub unit_price: Money, pub unit_points: Points, pub total: Money }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] #[serde(rename_all = "snake_case")] pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] #[serde(rename_all = "snake_case")] pub enum FulfillmentStatus { #[default] Unfulfilled, Fulfilled }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)] #[serde(rename_all = "snake_case")] pub enum PaymentStatus { #[default] Pending, Paid, Voided }

impl Order {
    pub fn create(member_id: MemberId, currency: &str) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id, order_number: format!("ORD-{}", &id.simple().to_string()[20..]).to_uppercase(), member_id,
            status: OrderStatus::Pending, fulfillment: FulfillmentStatus::Unfulfilled, payment: PaymentStatus::Pending,
            items: vec![], subtotal: Money::zero(currency), points: Points::ZERO,
            placed_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: id, member_id }));
        order
    }

    /// Turn a session cart into a pending order for `member_id`.
    pub fn from_cart(member_id: MemberId, cart: &Cart) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        let mut order = Self::create(member_id, cart.currency());
        for item in cart.items() {
            order.add_item(LineItem {
                product_id: item.product_id.clone(), name: item.name.clone(), sku: item.sku.clone(),
                quantity: item.quantity, unit_price: item.unit_price.clone(), unit_points: item.unit_points,
                total: item.line_total().map_err(OrderError::from)?,
            })?;
        }
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn member_id(&self) -> MemberId { self.member_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment }
    pub fn fulfillment_status(&self) -> FulfillmentStatus { self.fulfillment }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn points(&self) -> Points { self.points }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn placed_at(&self) -> DateTime<Utc> { self.placed_at }
    pub fn placed_on(&self) -> NaiveDate { self.placed_at.date_naive() }

    /// Paid, uncancelled orders feed the points ledger.
    pub fn counts_for_points(&self) -> bool {
        self.payment == PaymentStatus::Paid && self.status != OrderStatus::Cancelled
    }

    pub fn add_item(&mut self, item: LineItem) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::InvalidTransition { from: self.status, action: "add item" }); }
        if item.quantity == 0 { return Err(OrderError::InvalidQuantity); }
        self.items.push(item);
        if let Err(e) = self.recalculate() {
            self.items.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), OrderError> {
        if self.items.is_empty() { return Err(OrderError::NoItems); }
        self.transition(OrderStatus::Pending, OrderStatus::Confirmed, "confirm")?;
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id, total: self.subtotal.amount() }));
        Ok(())
    }

    pub fn mark_paid(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Confirmed, OrderStatus::Processing, "pay")?;
        self.payment = PaymentStatus::Paid;
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, member_id: self.member_id, points: self.points }));
        Ok(())
    }

    pub fn ship(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Processing, OrderStatus::Shipped, "ship")?;
        self.fulfillment = FulfillmentStatus::Fulfilled;
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id }));
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Shipped, OrderStatus::Delivered, "deliver")?;
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id }));
        Ok(())
    }

    /// Orders can only be cancelled before payment; paid points are never clawed back here.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return Err(OrderError::InvalidTransition { from: self.status, action: "cancel" });
        }
        self.status = OrderStatus::Cancelled;
        self.payment = PaymentStatus::Voided;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.status != from { return Err(OrderError::InvalidTransition { from: self.status, action }); }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn recalculate(&mut self) -> Result<(), OrderError> {
        let mut subtotal = Money::zero(self.subtotal.currency());
        for item in &self.items { subtotal = subtotal.add(&item.total)?; }
        self.subtotal = subtotal;
        self.points = self.items.iter().map(|i| i.unit_points.times(i.quantity)).sum();
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, InvalidQuantity, CurrencyMismatch, AmountTooLarge, InvalidTransition { from: OrderStatus, action: &'static str } }

impl From<MoneyError> for OrderError {
    fn from(e: MoneyError) -> Self {
        match e { MoneyError::CurrencyMismatch => OrderError::CurrencyMismatch, MoneyError::Overflow => OrderError::AmountTooLarge }
    }
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::InvalidQuantity => write!(f, "Quantity must be positive"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
            Self::AmountTooLarge => write!(f, "Order total too large"),
            Self::InvalidTransition { from, action } => write!(f, "Cannot {} an order in status {:?}", action, from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(quantity: u32) -> LineItem {
        LineItem { product_id: "P1".into(), name: "Widget".into(), sku: "W001".into(), quantity, unit_price: Money::new(Decimal::new(10, 0), "NGN"), unit_points: Points::new(25), total: Money::new(Decimal::new(10, 0), "NGN").multiply(quantity).unwrap() }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::create(Uuid::new_v4(), "NGN");
        order.add_item(widget(2)).unwrap();
        assert_eq!(order.points(), Points::new(50));
        order.confirm().unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert!(!order.counts_for_points());
        order.mark_paid().unwrap();
        assert!(order.counts_for_points());
        order.ship().unwrap();
        assert_eq!(order.status(), OrderStatus::Shipped);
        order.deliver().unwrap();
        assert_eq!(order.take_events().len(), 5);
    }

    #[test]
    fn test_cannot_pay_unconfirmed_or_cancel_paid() {
        let mut order = Order::create(Uuid::new_v4(), "NGN");
        order.add_item(widget(1)).unwrap();
        assert!(matches!(order.mark_paid(), Err(OrderError::InvalidTransition { .. })));
        order.confirm().unwrap();
        order.mark_paid().unwrap();
        assert!(order.cancel().is_err());
        assert!(order.counts_for_points());
    }

    #[test]
    fn test_cancelled_order_does_not_count() {
        let mut order = Order::create(Uuid::new_v4(), "NGN");
        order.add_item(widget(1)).unwrap();
        order.cancel().unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::Voided);
        assert!(!order.counts_for_points());
        assert!(order.add_item(widget(1)).is_err());
    }

    #[test]
    fn test_overflowing_item_is_rolled_back() {
        let mut order = Order::create(Uuid::new_v4(), "NGN");
        order.add_item(widget(1)).unwrap();
        let mut huge = widget(1);
        huge.total = Money::new(Decimal::MAX, "NGN");
        assert_eq!(order.add_item(huge), Err(OrderError::AmountTooLarge));
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.subtotal().amount(), Decimal::new(10, 0));
    }
}
