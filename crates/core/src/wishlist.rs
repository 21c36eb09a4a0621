//! Client-held wishlist.

use crate::types::{Product, ProductId};

/// Products saved for later, in the order they were saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wishlist {
    items: Vec<Product>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Save a product. Returns `false` if it was already saved.
    pub fn add(&mut self, product: Product) -> bool {
        if self.contains(&product.id) {
            return false;
        }
        self.items.push(product);
        true
    }

    pub fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|item| &item.id != product_id);
    }

    /// Add the product if missing, otherwise remove it. Returns whether it is saved afterwards.
    pub fn toggle(&mut self, product: Product) -> bool {
        if self.contains(&product.id) {
            self.remove(&product.id);
            false
        } else {
            self.items.push(product);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.id == product_id)
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }
}
