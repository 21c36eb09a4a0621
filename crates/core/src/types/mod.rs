//! Core types for NextCart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod price;
pub mod product;

pub use address::{Address, AddressSubmission, AddressValidationError, NewAddress, ValidAddress};
pub use id::*;
pub use price::{CurrencyCode, Price, to_minor_units};
pub use product::{ImageAsset, ImageRef, Product, Reference, Slug};
