//! NextCart Core - Shared types library.
//!
//! This crate provides the types shared by the storefront server and its
//! client-side flows:
//! - `storefront` - JSON API, checkout builder and external service clients
//! - `integration-tests` - Black-box tests against a running storefront
//!
//! # Architecture
//!
//! The core crate contains only types and pure state - no I/O, no HTTP
//! clients. The cart and wishlist live here because they are client-held
//! state that never touches a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, products and addresses
//! - [`cart`] - Cart store, aggregation and discount policies
//! - [`wishlist`] - Saved-for-later product list

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;
pub mod wishlist;

pub use cart::{CartLine, CartStore, DiscountPolicy, GroupedCartItem, NoDiscount, PercentOff};
pub use types::*;
pub use wishlist::Wishlist;
