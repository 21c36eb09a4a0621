//! Address book: listing and creating shipping addresses per owner.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::Utc;
use nextcart_core::{Address, AddressSubmission, AddressValidationError, OwnerId, ValidAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::content::{ContentError, ContentStore};

/// Errors from address book operations.
#[derive(Debug, Error)]
pub enum AddressError {
    #[error(transparent)]
    Validation(#[from] AddressValidationError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// An owner's addresses and the one checkout should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressListing {
    /// Newest first.
    pub addresses: Vec<Address>,
    pub selected: Option<Address>,
}

/// Address reads and writes scoped to one owner at a time.
///
/// Mutations for the same owner run one after another so that two
/// "make default" submissions can't interleave their unset and create steps.
#[derive(Clone)]
pub struct AddressBook {
    content: Arc<dyn ContentStore>,
    owner_locks: OwnerLocks,
}

type OwnerLocks = Arc<std::sync::Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>>;

/// A claim on one owner's lock. Dropping it forgets the lock once nobody
/// else holds a claim, including when the waiting request is cancelled.
struct OwnerLease {
    locks: OwnerLocks,
    owner: OwnerId,
    lock: Arc<Mutex<()>>,
}

impl Drop for OwnerLease {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held here
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.owner);
        }
    }
}

impl AddressBook {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self {
            content,
            owner_locks: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// All of an owner's addresses plus the active selection.
    ///
    /// # Errors
    ///
    /// Returns the content store error if the read fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn list(&self, owner: &OwnerId) -> Result<AddressListing, ContentError> {
        let addresses = self.content.addresses_for(owner).await?;
        let selected = Address::select_active(&addresses).cloned();

        Ok(AddressListing {
            addresses,
            selected,
        })
    }

    /// Validate and store a new address.
    ///
    /// With `makeDefault`, the owner's existing defaults are cleared first.
    /// Failing to clear them is logged and does not stop the create.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Validation`] for missing fields (nothing is
    /// written) or [`AddressError::Content`] if the create fails.
    #[instrument(skip(self, submission), fields(owner = %owner))]
    pub async fn create(
        &self,
        owner: &OwnerId,
        submission: AddressSubmission,
    ) -> Result<Address, AddressError> {
        let valid = submission.validate()?;

        let lease = self.lease(owner);
        let created = {
            let _guard = lease.lock.lock().await;
            self.unset_then_create(owner, valid).await?
        };

        tracing::info!(address_id = %created.id, default = created.default, "Address created");
        Ok(created)
    }

    async fn unset_then_create(
        &self,
        owner: &OwnerId,
        valid: ValidAddress,
    ) -> Result<Address, ContentError> {
        if valid.make_default
            && let Err(e) = self.content.unset_default_addresses(owner).await
        {
            tracing::warn!(error = %e, "Failed to clear previous default address");
        }

        self.content
            .create_address(valid.into_new(owner.clone(), Utc::now()))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create address"))
    }

    fn lease(&self, owner: &OwnerId) -> OwnerLease {
        let mut locks = self.owner_locks.lock().unwrap_or_else(PoisonError::into_inner);
        OwnerLease {
            locks: Arc::clone(&self.owner_locks),
            owner: owner.clone(),
            lock: Arc::clone(locks.entry(owner.clone()).or_default()),
        }
    }
}
