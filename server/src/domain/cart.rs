//! Customer cart.
//!
//! A cart maps menu-item ids to a snapshot of the item plus a quantity.
//! Lines keep the order in which they were first added. Adding an item that
//! is already present bumps its quantity; removing the last unit drops the
//! line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gst::PricedLine;
use crate::frame::ErrorCode;

/// Upper bound on units of one item in a single cart.
pub const MAX_QUANTITY: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_QUANTITY}")]
    InvalidQuantity,
    #[error("item not in cart: {0}")]
    NotInCart(Uuid),
}

impl ErrorCode for CartError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity => "E_INVALID_QUANTITY",
            Self::NotInCart(_) => "E_NOT_IN_CART",
        }
    }
}

/// The menu fields a cart line keeps from the moment the item was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItemSnapshot,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.item.price * Decimal::from(self.quantity)
    }
}

/// A cart line as submitted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `item`. Returns the new quantity of that line.
    ///
    /// A repeated add refreshes the snapshot so the cart shows the latest
    /// name and price the customer saw.
    pub fn add(&mut self, item: CartItemSnapshot) -> u32 {
        if let Some(line) = self.lines.iter_mut().find(|l| l.item.id == item.id) {
            line.quantity = (line.quantity + 1).min(MAX_QUANTITY);
            line.item = item;
            return line.quantity;
        }
        self.lines.push(CartLine { item, quantity: 1 });
        1
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] outside `1..=MAX_QUANTITY`,
    /// [`CartError::NotInCart`] for unknown ids.
    pub fn set_quantity(&mut self, id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 || quantity > MAX_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.item.id == id)
            .ok_or(CartError::NotInCart(id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove one unit. Returns the remaining quantity (0 when the line is gone).
    pub fn remove_one(&mut self, id: Uuid) -> u32 {
        let Some(index) = self.lines.iter().position(|l| l.item.id == id) else {
            return 0;
        };
        if self.lines[index].quantity <= 1 {
            self.lines.remove(index);
            return 0;
        }
        self.lines[index].quantity -= 1;
        self.lines[index].quantity
    }

    /// Drop a whole line. Returns whether anything was removed.
    pub fn remove_line(&mut self, id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.item.id != id);
        self.lines.len() != before
    }

    #[must_use]
    pub fn quantity_of(&self, id: Uuid) -> u32 {
        self.lines
            .iter()
            .find(|l| l.item.id == id)
            .map_or(0, |l| l.quantity)
    }

    /// Sum of `price × quantity`, before tax.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Take checked-out units off the cart. Units added after the checkout
    /// snapshot stay behind.
    pub fn remove_submitted(&mut self, submitted: &[OrderLine]) {
        for sent in submitted {
            if let Some(line) = self.lines.iter_mut().find(|l| l.item.id == sent.menu_item_id) {
                line.quantity = line.quantity.saturating_sub(sent.quantity);
            }
        }
        self.lines.retain(|l| l.quantity > 0);
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn to_order_lines(&self) -> Vec<OrderLine> {
        self.lines
            .iter()
            .map(|l| OrderLine { menu_item_id: l.item.id, quantity: l.quantity })
            .collect()
    }

    #[must_use]
    pub fn priced_lines(&self) -> Vec<PricedLine> {
        self.lines
            .iter()
            .map(|l| PricedLine { price: l.item.price, quantity: l.quantity })
            .collect()
    }
}

#[cfg(test)]
#[path = "cart_test.rs"]
mod tests;
