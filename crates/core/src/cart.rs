//! Client-held shopping cart.
//!
//! The cart is ephemeral: it lives only as long as the owning client and is
//! never persisted server-side. A [`CartStore`] starts empty and is handed to
//! whoever needs it by reference; there is no global instance.
//!
//! # Invariants
//!
//! - At most one [`CartLine`] per product; adding a product that is already in
//!   the cart increases that line's quantity.
//! - No line ever has a quantity of zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Product, ProductId};

/// One product and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Per-product aggregate view of the cart, as submitted to checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedCartItem {
    pub product: Product,
    pub quantity: u32,
}

/// Pricing collaborator that decides how much to take off a cart.
pub trait DiscountPolicy {
    /// Discount amount for the given lines, in the currency's standard unit.
    fn discount(&self, lines: &[CartLine]) -> Decimal;
}

/// No discount at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscount;

impl DiscountPolicy for NoDiscount {
    fn discount(&self, _lines: &[CartLine]) -> Decimal {
        Decimal::ZERO
    }
}

/// Applies each product's own `discount` percentage to its line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentOff;

impl DiscountPolicy for PercentOff {
    fn discount(&self, lines: &[CartLine]) -> Decimal {
        lines
            .iter()
            .filter_map(|line| {
                line.product
                    .discount
                    .map(|percent| line.line_total() * percent / Decimal::ONE_HUNDRED)
            })
            .sum()
    }
}

/// Ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartStore {
    lines: Vec<CartLine>,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` of a product. Adding zero is a no-op.
    pub fn add_item(&mut self, product: Product, quantity: u32) {
        if quantity == 0 {
            return;
        }

        match self.line_mut(&product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine { product, quantity }),
        }
    }

    /// Take one unit of a product out of the cart, dropping the line at zero.
    pub fn decrement_item(&mut self, product_id: &ProductId) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity -= 1;
        }
        self.lines.retain(|line| line.quantity > 0);
    }

    /// Remove a product's line entirely, whatever its quantity.
    pub fn remove_product(&mut self, product_id: &ProductId) {
        self.lines.retain(|line| &line.product.id != product_id);
    }

    /// Empty the cart.
    pub fn reset(&mut self) {
        self.lines.clear();
    }

    /// Lines in the order products were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of one product (zero if absent).
    #[must_use]
    pub fn item_count(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| &line.product.id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }

    /// Sum of unit price times quantity, before any discount.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Discount the policy grants on the current lines.
    #[must_use]
    pub fn discount(&self, policy: &dyn DiscountPolicy) -> Decimal {
        policy.discount(&self.lines)
    }

    /// Subtotal minus discount, never below zero.
    #[must_use]
    pub fn total(&self, policy: &dyn DiscountPolicy) -> Decimal {
        (self.subtotal() - self.discount(policy)).max(Decimal::ZERO)
    }

    /// One entry per distinct product still in the cart.
    #[must_use]
    pub fn grouped_items(&self) -> Vec<GroupedCartItem> {
        self.lines
            .iter()
            .filter(|line| line.quantity > 0)
            .map(|line| GroupedCartItem {
                product: line.product.clone(),
                quantity: line.quantity,
            })
            .collect()
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| &line.product.id == product_id)
    }
}
