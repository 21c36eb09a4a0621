//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use nextcart_core::Product;
use secrecy::SecretString;

use crate::config::StorefrontConfig;
use crate::content::{ContentClient, ContentStore, ImageUrlBuilder, RevalidationCache};
use crate::identity::{IdentityClient, IdentityError, IdentityProvider};
use crate::payments::{PaymentError, PaymentProvider, PaymentsClient};
use crate::services::addresses::AddressBook;
use crate::services::checkout::CheckoutService;

/// Rendered product reads kept in memory.
const PRODUCT_CACHE_CAPACITY: u64 = 1_000;

/// Upper bound on how stale a cached product may get if a webhook is missed.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// The three external services the storefront talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// external collaborators, the product cache and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    collaborators: Collaborators,
    product_cache: RevalidationCache<Product>,
    addresses: AddressBook,
    checkout: CheckoutService,
    webhook_secret: SecretString,
}

impl AppState {
    /// Create application state backed by the real HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built from the config.
    pub fn new(config: &StorefrontConfig) -> Result<Self, StateError> {
        let collaborators = Collaborators {
            content: Arc::new(ContentClient::new(&config.content)),
            payments: Arc::new(PaymentsClient::new(&config.payments)?),
            identity: Arc::new(IdentityClient::new(&config.identity)?),
        };

        let checkout = CheckoutService::new(
            config.base_url.clone(),
            config.payments.currency,
            ImageUrlBuilder::new(&config.content.project_id, &config.content.dataset),
        );

        Ok(Self::from_parts(
            collaborators,
            checkout,
            config.webhook_secret.clone(),
        ))
    }

    /// Assemble state from already-built collaborators.
    #[must_use]
    pub fn from_parts(
        collaborators: Collaborators,
        checkout: CheckoutService,
        webhook_secret: SecretString,
    ) -> Self {
        let addresses = AddressBook::new(Arc::clone(&collaborators.content));

        Self {
            inner: Arc::new(AppStateInner {
                collaborators,
                product_cache: RevalidationCache::new(PRODUCT_CACHE_CAPACITY, PRODUCT_CACHE_TTL),
                addresses,
                checkout,
                webhook_secret,
            }),
        }
    }

    /// Get the content store.
    #[must_use]
    pub fn content(&self) -> &dyn ContentStore {
        self.inner.collaborators.content.as_ref()
    }

    /// Get the payment provider.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProvider {
        self.inner.collaborators.payments.as_ref()
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.collaborators.identity.as_ref()
    }

    /// Get the cache of rendered product reads.
    #[must_use]
    pub fn product_cache(&self) -> &RevalidationCache<Product> {
        &self.inner.product_cache
    }

    /// Get the address book.
    #[must_use]
    pub fn addresses(&self) -> &AddressBook {
        &self.inner.addresses
    }

    /// Get the checkout session builder.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get the shared secret expected on revalidation webhooks.
    #[must_use]
    pub fn webhook_secret(&self) -> &SecretString {
        &self.inner.webhook_secret
    }
}
