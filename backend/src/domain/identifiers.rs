//! Strongly typed identifiers for ledger records.
//!
//! Users are identified by UUIDs issued by the external identity provider.
//! Courses, modules, purchases and certificates use the store's `BIGSERIAL`
//! keys, wrapped so they cannot be mixed up at call sites.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned when parsing identifiers from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The user id was blank.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// The user id was not a UUID.
    #[error("user id must be a valid UUID")]
    InvalidUserId,
    /// A numeric record id could not be parsed.
    #[error("record id must be an integer: {0}")]
    InvalidRecordId(#[from] ParseIntError),
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(IdentifierError::EmptyUserId);
        }
        if raw.trim() != raw {
            return Err(IdentifierError::InvalidUserId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidUserId)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a UUID read from storage.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

macro_rules! define_record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw store key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw store key.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

define_record_id!(
    /// Identifier of a purchasable course.
    CourseId
);
define_record_id!(
    /// Identifier of a module within a course.
    ModuleId
);
define_record_id!(
    /// Identifier of a purchase record, returned to buyers as a receipt.
    PurchaseId
);
define_record_id!(
    /// Identifier of an issued certificate.
    CertificateId
);
