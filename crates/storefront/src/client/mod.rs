//! Client-side flows.
//!
//! These drive the storefront API the way the browser does: the search box
//! typeahead and the cart page (addresses and checkout). They hold their UI
//! state explicitly so it can be observed and tested.

mod api;
pub mod cart_page;
pub mod typeahead;

pub use api::{ClientError, StorefrontApiClient};
pub use cart_page::{CartPageApi, CheckoutFlow, Notice};
pub use typeahead::{SearchSource, Typeahead, TypeaheadState};
