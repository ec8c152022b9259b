//! Core types for the Frame Hive registry.
//!
//! Entities are created by registry operations and never deleted. Callers
//! only ever hold the ids returned at creation time.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Sequential photo id, starting at 0.
pub type PhotoId = u64;

/// Sequential gallery id, starting at 0.
pub type GalleryId = u64;

/// Sequential collaboration id, starting at 0.
pub type CollaborationId = u64;

/// Opaque account identifier of a caller or award target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Principal {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An uploaded photo. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Photo {
    pub id: PhotoId,
    pub owner: Principal,
    pub title: String,
    pub description: String,
    /// Content-addressed identifier of the image bytes (e.g. an IPFS CID)
    pub content_hash: String,
}

/// A curated gallery. Only its rating totals change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Gallery {
    pub id: GalleryId,
    pub curator: Principal,
    pub title: String,
    pub description: String,
    pub rating_sum: u64,
    pub rating_count: u64,
}

impl Gallery {
    /// Mean rating, or `None` before the first rating lands.
    pub fn average_rating(&self) -> Option<f64> {
        if self.rating_count == 0 {
            return None;
        }
        Some(self.rating_sum as f64 / self.rating_count as f64)
    }
}

/// A collaboration announcement. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Collaboration {
    pub id: CollaborationId,
    pub creator: Principal,
    pub title: String,
    pub description: String,
}

/// Reputation view returned by `get-user-reputation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Reputation {
    pub score: u64,
}

/// Entity counts across the registry tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub photos: u64,
    pub galleries: u64,
    pub collaborations: u64,
    pub reputation_accounts: u64,
}

/// Error types for registry operations.
///
/// Every variant is an ordinary, caller-visible rejection. A rejected
/// operation leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Reference to an unknown entity
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Caller reputation below the operation threshold
    #[error("{operation} requires reputation {required}, caller has {actual}")]
    Unauthorized {
        operation: &'static str,
        required: u64,
        actual: u64,
    },

    /// Out-of-range or malformed argument
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
}

impl RegistryError {
    pub const NOT_FOUND: u32 = 101;
    pub const UNAUTHORIZED: u32 = 102;
    pub const INVALID_ARGUMENT: u32 = 103;

    /// Numeric code surfaced in failed receipts.
    pub fn code(&self) -> u32 {
        match self {
            Self::NotFound { .. } => Self::NOT_FOUND,
            Self::Unauthorized { .. } => Self::UNAUTHORIZED,
            Self::InvalidArgument { .. } => Self::INVALID_ARGUMENT,
        }
    }

    /// Kebab-case kind name, as used on the call surface.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not-found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::InvalidArgument { .. } => "invalid-argument",
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
