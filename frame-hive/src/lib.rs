//! Frame Hive - Reputation-Gated Content Registry
//!
//! A single-writer state machine holding photos, galleries, collaborations
//! and per-principal reputation scores:
//!
//! - **Photos**: anyone may upload; records are immutable
//! - **Galleries**: creation is gated on the curator's reputation; ratings
//!   accumulate on the gallery and reward the curator with points
//! - **Collaborations**: open by default, optionally gated
//! - **Reputation**: scores only grow, through awards and gallery ratings
//!
//! Every operation takes the caller principal explicitly and either commits
//! fully or is rejected with a [`RegistryError`] and no effect.
//!
//! # Example
//!
//! ```
//! use frame_hive::{Principal, Registry};
//!
//! let mut registry = Registry::default();
//! let alice = Principal::new("alice");
//! let bob = Principal::new("bob");
//!
//! registry.award_points(&alice, &alice, 60).unwrap();
//! let gallery = registry.create_gallery(&alice, "Street", "City walks").unwrap();
//! registry.rate_gallery(&bob, gallery, 5).unwrap();
//!
//! assert_eq!(registry.get_user_reputation(&alice).score, 110);
//! ```

pub mod call;
pub mod config;
pub mod registry;
pub mod types;
pub mod validation;

// Re-export main types
pub use call::{Call, CallValue, Outcome, Receipt, Transaction};
pub use config::{ConfigError, RegistryConfig};
pub use registry::{LedgerState, Registry, SetupError, SnapshotError};
pub use types::*;
