//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, MoneyError, Points};

/// A shopping cart held server-side for one browser session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    subtotal: Money,
    points: Points,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub unit_points: Points,
}

impl CartItem {
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.unit_price.multiply(self.quantity) }
    pub fn line_points(&self) -> Points { self.unit_points.times(self.quantity) }
}

impl Cart {
    pub fn new(session_id: impl Into<String>, currency: &str) -> Self {
        Self {
            session_id: session_id.into(), items: vec![], subtotal: Money::zero(currency), points: Points::ZERO,
            currency: currency.to_string(), created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn points(&self) -> Points { self.points }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if item.unit_points.is_negative() { return Err(CartError::NegativePoints); }
        if item.unit_price.currency() != self.currency { return Err(CartError::CurrencyMismatch); }
        let mut items = self.items.clone();
        if let Some(existing) = items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            items.push(item);
        }
        self.commit(items)
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let mut items = self.items.clone();
        let item = items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        self.commit(items)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        if !self.items.iter().any(|i| i.product_id == product_id) { return Err(CartError::ItemNotFound); }
        let items = self.items.iter().filter(|i| i.product_id != product_id).cloned().collect();
        self.commit(items)
    }

    /// Recompute totals for `items` and only then replace the cart contents, so a
    /// rejected change leaves the cart as it was.
    fn commit(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        let mut subtotal = Money::zero(&self.currency);
        for item in &items { subtotal = subtotal.add(&item.line_total()?)?; }
        self.points = items.iter().map(CartItem::line_points).sum();
        self.subtotal = subtotal;
        self.items = items;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity, NegativePoints, CurrencyMismatch, AmountTooLarge }

impl From<MoneyError> for CartError {
    fn from(e: MoneyError) -> Self {
        match e { MoneyError::CurrencyMismatch => CartError::CurrencyMismatch, MoneyError::Overflow => CartError::AmountTooLarge }
    }
}
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::InvalidQuantity => write!(f, "Quantity must be positive"),
            Self::NegativePoints => write!(f, "Point value cannot be negative"),
            Self::CurrencyMismatch => write!(f, "Currency mismatch"),
            Self::AmountTooLarge => write!(f, "Cart total too large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(quantity: u32) -> CartItem {
        CartItem { product_id: "P1".into(), name: "Widget".into(), sku: "W1".into(), quantity, unit_price: Money::new(Decimal::new(10, 0), "NGN"), unit_points: Points::new(40) }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new("sess-1", "NGN");
        cart.add_item(widget(2)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_item(widget(1)).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.points(), Points::new(120));
        cart.update_quantity("P1", 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item("P1"), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_cart_rejects_bad_items() {
        let mut cart = Cart::new("sess-1", "NGN");
        assert_eq!(cart.add_item(widget(0)), Err(CartError::InvalidQuantity));
        let mut usd = widget(1);
        usd.unit_price = Money::new(Decimal::ONE, "USD");
        assert_eq!(cart.add_item(usd), Err(CartError::CurrencyMismatch));
    }

    #[test]
    fn test_overflowing_total_leaves_cart_unchanged() {
        let mut cart = Cart::new("sess-1", "NGN");
        cart.add_item(widget(1)).unwrap();
        let mut huge = widget(2);
        huge.product_id = "P2".into();
        huge.unit_price = Money::new(Decimal::MAX, "NGN");
        assert_eq!(cart.add_item(huge), Err(CartError::AmountTooLarge));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(10, 0));
        assert_eq!(cart.update_quantity("P1", u32::MAX), Ok(()));
    }
}
