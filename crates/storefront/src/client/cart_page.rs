//! Cart page flow: address book and checkout.
//!
//! Each independent operation has its own loading flag, so saving an address
//! doesn't block checkout and vice versa. A flag is cleared when its
//! operation ends, including on failure or cancellation.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use nextcart_core::{Address, AddressSubmission, CartStore, GroupedCartItem, ProductId};

use super::ClientError;
use crate::services::addresses::AddressListing;

/// Storefront API calls the cart page makes.
#[async_trait]
pub trait CartPageApi: Send + Sync {
    async fn addresses(&self) -> Result<AddressListing, ClientError>;

    async fn create_address(&self, submission: &AddressSubmission) -> Result<Address, ClientError>;

    /// Returns the hosted checkout URL.
    async fn checkout(
        &self,
        items: Vec<GroupedCartItem>,
        address: Option<Address>,
    ) -> Result<String, ClientError>;
}

/// Toast-style messages for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ProductRemoved,
    CartReset,
    AddressSaved,
    AddressSaveFailed,
    CheckoutFailed,
}

impl Notice {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ProductRemoved => "Product deleted successfully!",
            Self::CartReset => "Cart reset successfully!",
            Self::AddressSaved => "Address added successfully!",
            Self::AddressSaveFailed => "Could not save address",
            Self::CheckoutFailed => "Something went wrong starting checkout. Please try again.",
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::AddressSaveFailed | Self::CheckoutFailed)
    }
}

/// Everything the cart page renders besides the cart itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartPageState {
    /// `None` until the first successful load.
    pub addresses: Option<Vec<Address>>,
    pub selected: Option<Address>,
    pub checkout_in_flight: bool,
    pub addresses_loading: bool,
    pub address_saving: bool,
    pub notices: Vec<Notice>,
}

#[derive(Clone, Copy)]
enum Flag {
    Checkout,
    Addresses,
    Saving,
}

impl Flag {
    fn slot(self, state: &mut CartPageState) -> &mut bool {
        match self {
            Self::Checkout => &mut state.checkout_in_flight,
            Self::Addresses => &mut state.addresses_loading,
            Self::Saving => &mut state.address_saving,
        }
    }
}

/// Clears its flag when dropped.
struct FlagGuard<'a> {
    state: &'a Mutex<CartPageState>,
    flag: Flag,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *self.flag.slot(&mut state) = false;
    }
}

/// Cart page controller over a [`CartPageApi`].
pub struct CheckoutFlow<A> {
    api: A,
    state: Mutex<CartPageState>,
}

impl<A: CartPageApi> CheckoutFlow<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::new(CartPageState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartPageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the page state.
    #[must_use]
    pub fn state(&self) -> CartPageState {
        self.lock().clone()
    }

    /// Take the notices raised so far.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.lock().notices)
    }

    /// Set `flag` unless that operation is already running.
    fn begin(&self, flag: Flag) -> Option<FlagGuard<'_>> {
        let mut state = self.lock();
        let slot = flag.slot(&mut state);
        if *slot {
            return None;
        }
        *slot = true;
        Some(FlagGuard {
            state: &self.state,
            flag,
        })
    }

    fn notify(&self, notice: Notice) {
        self.lock().notices.push(notice);
    }

    /// Fetch the user's addresses and select the default (or newest) one.
    ///
    /// Failures are logged; the page just shows no addresses.
    pub async fn load_addresses(&self) {
        let Some(_loading) = self.begin(Flag::Addresses) else {
            return;
        };

        match self.api.addresses().await {
            Ok(listing) => {
                let mut state = self.lock();
                state.selected = listing
                    .selected
                    .or_else(|| Address::select_active(&listing.addresses).cloned());
                state.addresses = Some(listing.addresses);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load addresses"),
        }
    }

    /// Pick one of the loaded addresses.
    pub fn select_address(&self, id: &str) {
        let mut state = self.lock();
        let picked = state
            .addresses
            .as_ref()
            .and_then(|list| list.iter().find(|a| a.id.as_str() == id).cloned());
        if picked.is_some() {
            state.selected = picked;
        }
    }

    /// Save a new address and select it.
    ///
    /// Returns the stored address, or `None` after raising
    /// [`Notice::AddressSaveFailed`].
    pub async fn save_address(&self, submission: AddressSubmission) -> Option<Address> {
        let _saving = self.begin(Flag::Saving)?;

        match self.api.create_address(&submission).await {
            Ok(address) => {
                let mut state = self.lock();
                let list = state.addresses.get_or_insert_with(Vec::new);
                if address.default {
                    for other in list.iter_mut() {
                        other.default = false;
                    }
                }
                list.insert(0, address.clone());
                state.selected = Some(address.clone());
                state.notices.push(Notice::AddressSaved);
                Some(address)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save address");
                self.notify(Notice::AddressSaveFailed);
                None
            }
        }
    }

    /// Start checkout for the cart with the selected address.
    ///
    /// Returns the URL to send the browser to, or `None` after raising
    /// [`Notice::CheckoutFailed`]. Ignored while a checkout is in flight.
    pub async fn checkout(&self, cart: &CartStore) -> Option<String> {
        let _in_flight = self.begin(Flag::Checkout)?;
        let address = self.lock().selected.clone();

        match self.api.checkout(cart.grouped_items(), address).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!(error = %e, "Error creating checkout session");
                self.notify(Notice::CheckoutFailed);
                None
            }
        }
    }

    /// Drop a product's line from the cart.
    pub fn remove_product(&self, cart: &mut CartStore, product_id: &ProductId) {
        cart.remove_product(product_id);
        self.notify(Notice::ProductRemoved);
    }

    /// Empty the cart.
    pub fn reset_cart(&self, cart: &mut CartStore) {
        cart.reset();
        self.notify(Notice::CartReset);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use nextcart_core::Product;
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::test_support::address;

    /// API fake whose checkout waits for `release` so tests can look at the
    /// page while it's in flight.
    #[derive(Default)]
    struct FakeApi {
        listing: Option<AddressListing>,
        fail_save: bool,
        fail_checkout: bool,
        release: Arc<Notify>,
        hold_checkout: bool,
        sent: Mutex<Vec<(Vec<GroupedCartItem>, Option<Address>)>>,
    }

    fn failure() -> ClientError {
        ClientError::Status {
            status: 500,
            message: "Internal server error".to_string(),
        }
    }

    #[async_trait]
    impl CartPageApi for FakeApi {
        async fn addresses(&self) -> Result<AddressListing, ClientError> {
            self.listing.clone().ok_or_else(failure)
        }

        async fn create_address(
            &self,
            submission: &AddressSubmission,
        ) -> Result<Address, ClientError> {
            if self.fail_save {
                return Err(failure());
            }
            let mut created = address("new", "user_1", submission.make_default == Some(true), 9);
            created.name = submission.name.clone().unwrap_or_default();
            Ok(created)
        }

        async fn checkout(
            &self,
            items: Vec<GroupedCartItem>,
            address: Option<Address>,
        ) -> Result<String, ClientError> {
            if self.hold_checkout {
                self.release.notified().await;
            }
            self.sent.lock().unwrap().push((items, address));
            if self.fail_checkout {
                return Err(failure());
            }
            Ok("https://checkout.example.com/session/1".to_string())
        }
    }

    fn listing() -> AddressListing {
        let addresses = vec![
            address("newest", "user_1", false, 3),
            address("flagged", "user_1", true, 1),
        ];
        AddressListing {
            selected: Address::select_active(&addresses).cloned(),
            addresses,
        }
    }

    fn cart() -> CartStore {
        let mut cart = CartStore::new();
        cart.add_item(Product::new("p1", "Lamp", Decimal::TEN), 2);
        cart
    }

    fn submission(make_default: bool) -> AddressSubmission {
        AddressSubmission {
            name: Some("Ada".into()),
            make_default: Some(make_default),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_selects_default() {
        let flow = CheckoutFlow::new(FakeApi {
            listing: Some(listing()),
            ..Default::default()
        });

        flow.load_addresses().await;

        let state = flow.state();
        assert_eq!(state.addresses.unwrap().len(), 2);
        assert_eq!(state.selected.unwrap().id.as_str(), "flagged");
        assert!(!state.addresses_loading);
    }

    #[tokio::test]
    async fn test_load_failure_is_quiet() {
        let flow = CheckoutFlow::new(FakeApi::default());

        flow.load_addresses().await;

        let state = flow.state();
        assert!(state.addresses.is_none());
        assert!(!state.addresses_loading);
        assert!(state.notices.is_empty());
    }

    #[tokio::test]
    async fn test_save_address_selects_it() {
        let flow = CheckoutFlow::new(FakeApi {
            listing: Some(listing()),
            ..Default::default()
        });
        flow.load_addresses().await;

        let saved = flow.save_address(submission(true)).await.unwrap();

        let state = flow.state();
        let addresses = state.addresses.unwrap();
        assert_eq!(addresses[0].id, saved.id);
        assert_eq!(addresses.iter().filter(|a| a.default).count(), 1);
        assert_eq!(state.selected.unwrap().id, saved.id);
        assert!(!state.address_saving);
        assert_eq!(flow.drain_notices(), vec![Notice::AddressSaved]);
    }

    #[tokio::test]
    async fn test_save_failure_notice() {
        let flow = CheckoutFlow::new(FakeApi {
            fail_save: true,
            ..Default::default()
        });

        assert!(flow.save_address(submission(false)).await.is_none());

        let notices = flow.drain_notices();
        assert_eq!(notices, vec![Notice::AddressSaveFailed]);
        assert_eq!(notices[0].message(), "Could not save address");
        assert!(!flow.state().address_saving);
    }

    #[tokio::test]
    async fn test_checkout_sends_cart_and_selection() {
        let flow = CheckoutFlow::new(FakeApi {
            listing: Some(listing()),
            ..Default::default()
        });
        flow.load_addresses().await;

        let url = flow.checkout(&cart()).await;

        assert_eq!(url.as_deref(), Some("https://checkout.example.com/session/1"));
        let sent = flow.api.sent.lock().unwrap();
        assert_eq!(sent[0].0[0].quantity, 2);
        assert_eq!(sent[0].1.as_ref().unwrap().id.as_str(), "flagged");
        drop(sent);
        assert!(!flow.state().checkout_in_flight);
    }

    #[tokio::test]
    async fn test_checkout_failure_resets_flag() {
        let flow = CheckoutFlow::new(FakeApi {
            fail_checkout: true,
            ..Default::default()
        });

        assert!(flow.checkout(&cart()).await.is_none());

        let state = flow.state();
        assert!(!state.checkout_in_flight);
        assert_eq!(state.notices, vec![Notice::CheckoutFailed]);
    }

    #[tokio::test]
    async fn test_flags_are_independent() {
        let release = Arc::new(Notify::new());
        let flow = CheckoutFlow::new(FakeApi {
            listing: Some(listing()),
            hold_checkout: true,
            release: Arc::clone(&release),
            ..Default::default()
        });
        let cart = cart();

        let checkout = async {
            flow.checkout(&cart).await
        };
        let meanwhile = async {
            tokio::task::yield_now().await;
            assert!(flow.state().checkout_in_flight);

            // A second click while in flight does nothing
            assert!(flow.checkout(&cart).await.is_none());

            flow.load_addresses().await;
            let state = flow.state();
            assert!(state.checkout_in_flight);
            assert!(!state.addresses_loading);
            assert!(state.addresses.is_some());

            release.notify_one();
        };

        let (url, ()) = tokio::join!(checkout, meanwhile);
        assert!(url.is_some());
        assert!(!flow.state().checkout_in_flight);
        assert_eq!(flow.api.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cart_notices() {
        let flow = CheckoutFlow::new(FakeApi::default());
        let mut cart = cart();

        flow.remove_product(&mut cart, &ProductId::new("p1"));
        assert!(cart.is_empty());

        cart.add_item(Product::new("p2", "Desk", Decimal::ONE), 1);
        flow.reset_cart(&mut cart);
        assert!(cart.is_empty());

        assert_eq!(
            flow.drain_notices(),
            vec![Notice::ProductRemoved, Notice::CartReset]
        );
    }
}
