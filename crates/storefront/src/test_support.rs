//! In-memory collaborators for unit and route tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderValue, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use nextcart_core::{Address, AddressId, CurrencyCode, NewAddress, OwnerId, Product};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use crate::content::{ContentError, ContentStore, ImageUrlBuilder, ProductFilter};
use crate::identity::{Identity, IdentityError, IdentityProvider, UserProfile};
use crate::payments::{
    CheckoutSession, CheckoutSessionParams, Customer, PaymentError, PaymentProvider,
};
use crate::services::checkout::CheckoutService;
use crate::state::{AppState, Collaborators};

/// A stored address for `owner`, created on January `day`.
pub fn address(id: &str, owner: &str, default: bool, day: u32) -> Address {
    Address {
        id: AddressId::new(id),
        owner_id: OwnerId::new(owner),
        name: "Ada".into(),
        email: "ada@example.com".into(),
        street: "12 Analytical Way".into(),
        city: "London".into(),
        state: "LDN".into(),
        zip: "N1".into(),
        default,
        created_at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
    }
}

fn unavailable() -> ContentError {
    ContentError::Api {
        status: 503,
        message: "unavailable".to_string(),
    }
}

/// How the fake reacts to "clear default addresses".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnsetBehavior {
    #[default]
    Succeed,
    /// Nothing is written and an error is returned.
    Fail,
    /// The write lands but the acknowledgement is lost.
    FailAfterWrite,
}

/// Content store backed by vectors.
#[derive(Default)]
pub struct FakeContent {
    products: Vec<Product>,
    addresses: Mutex<Vec<Address>>,
    unset: UnsetBehavior,
    fail_reads: bool,
    fail_creates: bool,
    search_calls: AtomicUsize,
    product_reads: AtomicUsize,
    unset_calls: AtomicUsize,
    last_filter: Mutex<Option<ProductFilter>>,
}

impl FakeContent {
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    pub fn with_addresses(self, addresses: Vec<Address>) -> Self {
        *self.addresses.lock().unwrap() = addresses;
        self
    }

    pub fn with_unset(mut self, behavior: UnsetBehavior) -> Self {
        self.unset = behavior;
        self
    }

    /// Every catalog and address read fails.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn product_reads(&self) -> usize {
        self.product_reads.load(Ordering::SeqCst)
    }

    pub fn unset_calls(&self) -> usize {
        self.unset_calls.load(Ordering::SeqCst)
    }

    pub fn last_filter(&self) -> Option<ProductFilter> {
        self.last_filter.lock().unwrap().clone()
    }

    /// Stored addresses for an owner, newest first.
    pub fn addresses_of(&self, owner: &str) -> Vec<Address> {
        let mut list: Vec<Address> = self
            .addresses
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.owner_id.as_str() == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }
}

#[async_trait]
impl ContentStore for FakeContent {
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ContentError> {
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        if self.fail_reads {
            return Err(unavailable());
        }
        Ok(self.products.clone())
    }

    async fn search_products(&self, term: &str) -> Result<Vec<Product>, ContentError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(unavailable());
        }
        let term = term.to_lowercase();
        Ok(self
            .products
            .iter()
            .filter(|p| {
                p.name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().starts_with(&term))
            })
            .cloned()
            .collect())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, ContentError> {
        self.product_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(unavailable());
        }
        Ok(self
            .products
            .iter()
            .find(|p| p.slug.as_ref().is_some_and(|s| s.current == slug))
            .cloned())
    }

    async fn addresses_for(&self, owner: &OwnerId) -> Result<Vec<Address>, ContentError> {
        if self.fail_reads {
            return Err(unavailable());
        }
        Ok(self.addresses_of(owner.as_str()))
    }

    async fn unset_default_addresses(&self, owner: &OwnerId) -> Result<(), ContentError> {
        self.unset_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.unset == UnsetBehavior::Fail {
            return Err(unavailable());
        }
        for address in self.addresses.lock().unwrap().iter_mut() {
            if address.owner_id == *owner {
                address.default = false;
            }
        }
        match self.unset {
            UnsetBehavior::FailAfterWrite => Err(unavailable()),
            _ => Ok(()),
        }
    }

    async fn create_address(&self, address: NewAddress) -> Result<Address, ContentError> {
        tokio::task::yield_now().await;

        if self.fail_creates {
            return Err(unavailable());
        }
        let mut addresses = self.addresses.lock().unwrap();
        let created = address.with_id(AddressId::new(format!("addr-{}", addresses.len() + 1)));
        addresses.push(created.clone());
        Ok(created)
    }
}

/// Payment provider that records session requests.
#[derive(Default)]
pub struct FakePayments {
    customers: Vec<Customer>,
    sessions: Mutex<Vec<CheckoutSessionParams>>,
    fail_sessions: bool,
}

impl FakePayments {
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customers.push(customer);
        self
    }

    pub fn failing_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    pub fn last_session(&self) -> Option<CheckoutSessionParams> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, PaymentError> {
        Ok(self
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_sessions {
            return Err(PaymentError::Api {
                status: 402,
                message: "card_error: declined".to_string(),
            });
        }
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(params.clone());
        Ok(CheckoutSession {
            id: format!("cs_{}", sessions.len()),
            url: Some(format!(
                "https://checkout.example.com/session/{}",
                sessions.len()
            )),
        })
    }
}

/// Identity provider with a fixed token table.
#[derive(Default)]
pub struct FakeIdentity {
    tokens: HashMap<String, OwnerId>,
    profiles: HashMap<OwnerId, UserProfile>,
}

impl FakeIdentity {
    pub fn with_user(mut self, token: &str, user_id: &str, profile: Option<UserProfile>) -> Self {
        let user_id = OwnerId::new(user_id);
        self.tokens.insert(token.to_string(), user_id.clone());
        if let Some(profile) = profile {
            self.profiles.insert(user_id, profile);
        }
        self
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_session(&self, token: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.tokens.get(token).map(|user_id| Identity {
            user_id: user_id.clone(),
        }))
    }

    async fn user_profile(&self, user_id: &OwnerId) -> Result<Option<UserProfile>, IdentityError> {
        Ok(self.profiles.get(user_id).cloned())
    }
}

/// Shared secret the test state expects on revalidation webhooks.
pub const WEBHOOK_SECRET: &str = "whsec-test-4f9a2c";

/// Session token `FakeIdentity::signed_in` accepts for `user_1`.
pub const USER_TOKEN: &str = "tok_user_1";

impl FakeIdentity {
    /// One user, `user_1`, with a full profile.
    pub fn signed_in() -> Self {
        Self::default().with_user(
            USER_TOKEN,
            "user_1",
            Some(UserProfile {
                full_name: Some("Ada Lovelace".to_string()),
                primary_email: Some("ada@example.com".to_string()),
            }),
        )
    }
}

/// App state over the given fakes.
pub fn state_with(
    content: Arc<FakeContent>,
    payments: Arc<FakePayments>,
    identity: Arc<FakeIdentity>,
) -> AppState {
    AppState::from_parts(
        Collaborators {
            content,
            payments,
            identity,
        },
        CheckoutService::new(
            "http://localhost:3000",
            CurrencyCode::USD,
            ImageUrlBuilder::new("proj", "production"),
        ),
        SecretString::from(WEBHOOK_SECRET),
    )
}

/// Send one request through `router` and decode the JSON reply.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Attach the signed-in user's bearer token.
pub fn authed(mut request: Request<Body>) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {USER_TOKEN}")).unwrap(),
    );
    request
}
