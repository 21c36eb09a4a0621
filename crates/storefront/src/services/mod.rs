//! Business logic services for storefront.
//!
//! # Services
//!
//! - `addresses` - Address book with per-owner serialized writes
//! - `checkout` - Checkout session builder

pub mod addresses;
pub mod checkout;
