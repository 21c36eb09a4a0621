//! Shipping addresses.
//!
//! Addresses are content store documents owned by an identity provider user.
//! At most one address per owner carries `default = true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AddressId, OwnerId};

/// A stored shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    /// Identity provider user id.
    #[serde(rename = "clerkUserId")]
    pub owner_id: OwnerId,
    pub name: String,
    pub email: String,
    /// Street line.
    #[serde(rename = "address")]
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Pick the active address from a list sorted newest first.
    ///
    /// The flagged default wins; otherwise the most recent one.
    #[must_use]
    pub fn select_active(addresses: &[Self]) -> Option<&Self> {
        addresses
            .iter()
            .find(|address| address.default)
            .or_else(|| addresses.first())
    }
}

/// Address as submitted by the client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub make_default: Option<bool>,
}

/// Validation failure for an [`AddressSubmission`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressValidationError {
    /// One or more of name, email, street, city, state or zip is absent or blank.
    #[error("Missing required fields")]
    MissingRequiredFields,
}

/// A submission with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAddress {
    pub name: String,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub make_default: bool,
}

impl AddressSubmission {
    /// Check that all required fields are present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`AddressValidationError::MissingRequiredFields`] if any of the
    /// six required fields is absent or blank. The error does not say which.
    pub fn validate(self) -> Result<ValidAddress, AddressValidationError> {
        fn required(field: Option<String>) -> Result<String, AddressValidationError> {
            field
                .filter(|value| !value.trim().is_empty())
                .ok_or(AddressValidationError::MissingRequiredFields)
        }

        Ok(ValidAddress {
            name: required(self.name)?,
            email: required(self.email)?,
            street: required(self.address)?,
            city: required(self.city)?,
            state: required(self.state)?,
            zip: required(self.zip)?,
            make_default: self.make_default.unwrap_or(false),
        })
    }
}

/// An address ready to be written to the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[serde(rename = "clerkUserId")]
    pub owner_id: OwnerId,
    pub name: String,
    pub email: String,
    #[serde(rename = "address")]
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub default: bool,
    pub created_at: DateTime<Utc>,
}

impl ValidAddress {
    /// Attach ownership and a creation time.
    #[must_use]
    pub fn into_new(self, owner_id: OwnerId, created_at: DateTime<Utc>) -> NewAddress {
        NewAddress {
            owner_id,
            name: self.name,
            email: self.email,
            street: self.street,
            city: self.city,
            state: self.state,
            zip: self.zip,
            default: self.make_default,
            created_at,
        }
    }
}

impl NewAddress {
    /// The stored record once the content store has assigned an id.
    #[must_use]
    pub fn with_id(self, id: AddressId) -> Address {
        Address {
            id,
            owner_id: self.owner_id,
            name: self.name,
            email: self.email,
            street: self.street,
            city: self.city,
            state: self.state,
            zip: self.zip,
            default: self.default,
            created_at: self.created_at,
        }
    }
}
