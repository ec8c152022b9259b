//! The registry state machine.
//!
//! All tables live in a [`LedgerState`] owned by a [`Registry`]. Each
//! operation validates its arguments and computes every new value before
//! writing anything, so a rejected call leaves the state exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ConfigError, RegistryConfig, RewardConfig};
use crate::types::*;
use crate::validation;

/// Entity tables plus per-type id counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    photos: BTreeMap<PhotoId, Photo>,
    galleries: BTreeMap<GalleryId, Gallery>,
    collaborations: BTreeMap<CollaborationId, Collaboration>,
    reputation: BTreeMap<Principal, u64>,
    next_photo_id: PhotoId,
    next_gallery_id: GalleryId,
    next_collaboration_id: CollaborationId,
}

impl LedgerState {
    /// Parse a JSON snapshot and check its internal consistency.
    pub fn from_json(json: &str) -> std::result::Result<Self, SnapshotError> {
        let state: Self = serde_json::from_str(json)?;
        state.check_consistency()?;
        Ok(state)
    }

    /// Serialize to a pretty-printed JSON snapshot.
    pub fn to_json(&self) -> std::result::Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Verify the tables could have been produced by registry operations.
    ///
    /// Keys must match record ids, ids must sit below their counters and
    /// every stored principal must be non-empty. Rating totals are checked
    /// against a rating range by [`LedgerState::check_ratings`].
    pub fn check_consistency(&self) -> std::result::Result<(), SnapshotError> {
        fn check<T>(
            table: &'static str,
            entries: &BTreeMap<u64, T>,
            id_of: impl Fn(&T) -> u64,
            next_id: u64,
        ) -> std::result::Result<(), SnapshotError> {
            for (key, record) in entries {
                if id_of(record) != *key {
                    return Err(SnapshotError::inconsistent(
                        table,
                        format!("record {} stored under key {}", id_of(record), key),
                    ));
                }
                if *key >= next_id {
                    return Err(SnapshotError::inconsistent(
                        table,
                        format!("id {} is not below counter {}", key, next_id),
                    ));
                }
            }
            Ok(())
        }

        check("photos", &self.photos, |p: &Photo| p.id, self.next_photo_id)?;
        check(
            "galleries",
            &self.galleries,
            |g: &Gallery| g.id,
            self.next_gallery_id,
        )?;
        check(
            "collaborations",
            &self.collaborations,
            |c: &Collaboration| c.id,
            self.next_collaboration_id,
        )?;

        let principals = self
            .photos
            .values()
            .map(|p| ("photos", &p.owner))
            .chain(self.galleries.values().map(|g| ("galleries", &g.curator)))
            .chain(
                self.collaborations
                    .values()
                    .map(|c| ("collaborations", &c.creator)),
            )
            .chain(self.reputation.keys().map(|p| ("reputation", p)));
        for (table, principal) in principals {
            if principal.as_str().is_empty() {
                return Err(SnapshotError::inconsistent(table, "empty principal"));
            }
        }

        Ok(())
    }

    /// Verify each gallery's rating sum is reachable with `rewards`' range.
    pub fn check_ratings(&self, rewards: &RewardConfig) -> std::result::Result<(), SnapshotError> {
        for gallery in self.galleries.values() {
            let lowest = gallery.rating_count.saturating_mul(rewards.min_rating);
            let highest = gallery.rating_count.saturating_mul(rewards.max_rating);
            if gallery.rating_sum < lowest || gallery.rating_sum > highest {
                return Err(SnapshotError::inconsistent(
                    "galleries",
                    format!(
                        "gallery {} sum {} outside {}..={} for {} ratings",
                        gallery.id, gallery.rating_sum, lowest, highest, gallery.rating_count
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            photos: self.photos.len() as u64,
            galleries: self.galleries.len() as u64,
            collaborations: self.collaborations.len() as u64,
            reputation_accounts: self.reputation.len() as u64,
        }
    }

    fn score_of(&self, principal: &Principal) -> u64 {
        self.reputation.get(principal).copied().unwrap_or(0)
    }
}

/// Errors reading or writing a ledger snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Malformed JSON
    #[error("Snapshot decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed but unreachable by registry operations
    #[error("Snapshot inconsistent in {table}: {reason}")]
    Inconsistent { table: &'static str, reason: String },
}

impl SnapshotError {
    fn inconsistent(table: &'static str, reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            table,
            reason: reason.into(),
        }
    }
}

/// Errors building a registry from config and ledger state.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Rejected configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Rejected ledger state
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Reputation-gated registry of photos, galleries and collaborations.
///
/// Operations take `&mut self` and run to completion, so calls are applied
/// one at a time in the order the host submits them.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    config: RegistryConfig,
    state: LedgerState,
}

impl Registry {
    /// Create an empty registry after validating `config`.
    pub fn new(config: RegistryConfig) -> std::result::Result<Self, SetupError> {
        Self::with_state(config, LedgerState::default())
    }

    /// Resume from an existing ledger state.
    pub fn with_state(
        config: RegistryConfig,
        state: LedgerState,
    ) -> std::result::Result<Self, SetupError> {
        config.validate()?;
        state.check_consistency()?;
        state.check_ratings(&config.rewards)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Give up the registry, keeping its ledger state.
    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn stats(&self) -> RegistryStats {
        self.state.stats()
    }

    /// Store a new photo owned by `caller`.
    pub fn upload_photo(
        &mut self,
        caller: &Principal,
        title: &str,
        description: &str,
        content_hash: &str,
    ) -> Result<PhotoId> {
        let limits = &self.config.limits;
        validation::principal("caller", caller)?;
        validation::title(title, limits)?;
        validation::description(description, limits)?;
        validation::content_hash(content_hash, limits)?;

        let id = self.state.next_photo_id;
        let next = next_counter("photo id", id)?;

        self.state.photos.insert(
            id,
            Photo {
                id,
                owner: caller.clone(),
                title: title.to_string(),
                description: description.to_string(),
                content_hash: content_hash.to_string(),
            },
        );
        self.state.next_photo_id = next;

        info!(photo_id = id, owner = %caller, content_hash, "Photo uploaded");
        Ok(id)
    }

    pub fn get_photo(&self, id: PhotoId) -> Option<&Photo> {
        let photo = self.state.photos.get(&id);
        debug!(photo_id = id, found = photo.is_some(), "Photo lookup");
        photo
    }

    /// Create a gallery curated by `caller`, gated on reputation.
    pub fn create_gallery(
        &mut self,
        caller: &Principal,
        title: &str,
        description: &str,
    ) -> Result<GalleryId> {
        validation::principal("caller", caller)?;
        self.require_reputation(
            "create-gallery",
            caller,
            self.config.thresholds.create_gallery,
        )?;
        validation::title(title, &self.config.limits)?;
        validation::description(description, &self.config.limits)?;

        let id = self.state.next_gallery_id;
        let next = next_counter("gallery id", id)?;

        self.state.galleries.insert(
            id,
            Gallery {
                id,
                curator: caller.clone(),
                title: title.to_string(),
                description: description.to_string(),
                rating_sum: 0,
                rating_count: 0,
            },
        );
        self.state.next_gallery_id = next;

        info!(gallery_id = id, curator = %caller, "Gallery created");
        Ok(id)
    }

    pub fn get_gallery(&self, id: GalleryId) -> Option<&Gallery> {
        let gallery = self.state.galleries.get(&id);
        debug!(gallery_id = id, found = gallery.is_some(), "Gallery lookup");
        gallery
    }

    /// Rate a gallery and reward its curator with points per star.
    pub fn rate_gallery(
        &mut self,
        caller: &Principal,
        gallery_id: GalleryId,
        rating: u64,
    ) -> Result<bool> {
        let rewards = &self.config.rewards;
        validation::principal("caller", caller)?;
        validation::rating(rating, rewards)?;

        let gallery = self
            .state
            .galleries
            .get(&gallery_id)
            .ok_or(RegistryError::NotFound {
                entity: "gallery",
                id: gallery_id,
            })?;

        let rating_sum = gallery
            .rating_sum
            .checked_add(rating)
            .ok_or_else(|| RegistryError::invalid("rating", "gallery rating sum overflows"))?;
        let rating_count = gallery
            .rating_count
            .checked_add(1)
            .ok_or_else(|| RegistryError::invalid("rating", "gallery rating count overflows"))?;
        let reward = rating
            .checked_mul(rewards.points_per_rating_star)
            .ok_or_else(|| RegistryError::invalid("rating", "curator reward overflows"))?;
        let curator = gallery.curator.clone();
        let score = add_points("curator score", self.state.score_of(&curator), reward)?;

        if let Some(gallery) = self.state.galleries.get_mut(&gallery_id) {
            gallery.rating_sum = rating_sum;
            gallery.rating_count = rating_count;
        }
        self.state.reputation.insert(curator.clone(), score);

        info!(
            gallery_id,
            rater = %caller,
            rating,
            curator = %curator,
            reward,
            "Gallery rated"
        );
        Ok(true)
    }

    /// Create a collaboration started by `caller`.
    pub fn create_collaboration(
        &mut self,
        caller: &Principal,
        title: &str,
        description: &str,
    ) -> Result<CollaborationId> {
        validation::principal("caller", caller)?;
        self.require_reputation(
            "create-collaboration",
            caller,
            self.config.thresholds.create_collaboration,
        )?;
        validation::title(title, &self.config.limits)?;
        validation::description(description, &self.config.limits)?;

        let id = self.state.next_collaboration_id;
        let next = next_counter("collaboration id", id)?;

        self.state.collaborations.insert(
            id,
            Collaboration {
                id,
                creator: caller.clone(),
                title: title.to_string(),
                description: description.to_string(),
            },
        );
        self.state.next_collaboration_id = next;

        info!(collaboration_id = id, creator = %caller, "Collaboration created");
        Ok(id)
    }

    pub fn get_collaboration(&self, id: CollaborationId) -> Option<&Collaboration> {
        let collaboration = self.state.collaborations.get(&id);
        debug!(
            collaboration_id = id,
            found = collaboration.is_some(),
            "Collaboration lookup"
        );
        collaboration
    }

    /// Add `amount` to `target`'s score.
    ///
    /// Any caller may award points to any principal.
    pub fn award_points(
        &mut self,
        caller: &Principal,
        target: &Principal,
        amount: u64,
    ) -> Result<bool> {
        validation::principal("caller", caller)?;
        validation::principal("target", target)?;

        let score = add_points("amount", self.state.score_of(target), amount)?;
        self.state.reputation.insert(target.clone(), score);

        info!(awarder = %caller, target = %target, amount, score, "Points awarded");
        Ok(true)
    }

    /// Current score of `principal`; 0 for accounts never seen.
    pub fn get_user_reputation(&self, principal: &Principal) -> Reputation {
        let score = self.state.score_of(principal);
        debug!(principal = %principal, score, "Reputation lookup");
        Reputation { score }
    }

    fn require_reputation(
        &self,
        operation: &'static str,
        caller: &Principal,
        required: u64,
    ) -> Result<()> {
        let actual = self.state.score_of(caller);
        if actual < required {
            debug!(
                operation,
                caller = %caller,
                required,
                actual,
                "Reputation below threshold"
            );
            return Err(RegistryError::Unauthorized {
                operation,
                required,
                actual,
            });
        }
        Ok(())
    }
}

fn next_counter(field: &'static str, current: u64) -> Result<u64> {
    current
        .checked_add(1)
        .ok_or_else(|| RegistryError::invalid(field, "id space exhausted"))
}

fn add_points(field: &'static str, score: u64, amount: u64) -> Result<u64> {
    score
        .checked_add(amount)
        .ok_or_else(|| RegistryError::invalid(field, "reputation score overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(n: u32) -> Principal {
        Principal::new(format!("wallet_{}", n))
    }

    #[test]
    fn test_photo_ids_are_sequential_across_callers() {
        let mut registry = Registry::default();
        let a = registry
            .upload_photo(&wallet(1), "One", "First", "QmOne")
            .unwrap();
        let b = registry
            .upload_photo(&wallet(2), "Two", "Second", "QmTwo")
            .unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(registry.get_photo(1).unwrap().owner, wallet(2));
        assert!(registry.get_photo(2).is_none());
    }

    #[test]
    fn test_invalid_photo_does_not_consume_id() {
        let mut registry = Registry::default();
        let err = registry
            .upload_photo(&wallet(1), "", "Missing title", "QmTest")
            .unwrap_err();
        assert_eq!(err.code(), RegistryError::INVALID_ARGUMENT);

        let long_hash = "Q".repeat(65);
        assert!(registry
            .upload_photo(&wallet(1), "Title", "Desc", &long_hash)
            .is_err());

        let id = registry
            .upload_photo(&wallet(1), "Title", "Desc", "QmTest")
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_gallery_requires_threshold() {
        let mut registry = Registry::default();
        let err = registry
            .create_gallery(&wallet(1), "Gallery", "Desc")
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                operation: "create-gallery",
                required: 50,
                actual: 0,
            }
        );
        assert_eq!(registry.stats().galleries, 0);

        registry.award_points(&wallet(2), &wallet(1), 50).unwrap();
        assert_eq!(
            registry.create_gallery(&wallet(1), "Gallery", "Desc"),
            Ok(0)
        );
    }

    #[test]
    fn test_rate_gallery_rewards_curator() {
        let mut registry = Registry::default();
        registry.award_points(&wallet(1), &wallet(1), 60).unwrap();
        let id = registry
            .create_gallery(&wallet(1), "Gallery", "Desc")
            .unwrap();

        assert_eq!(registry.rate_gallery(&wallet(2), id, 3), Ok(true));
        assert_eq!(registry.rate_gallery(&wallet(3), id, 4), Ok(true));

        let gallery = registry.get_gallery(id).unwrap();
        assert_eq!(gallery.rating_sum, 7);
        assert_eq!(gallery.rating_count, 2);
        assert_eq!(registry.get_user_reputation(&wallet(1)).score, 130);
        assert_eq!(registry.get_user_reputation(&wallet(2)).score, 0);
    }

    #[test]
    fn test_rate_gallery_rejections_leave_state() {
        let mut registry = Registry::default();
        registry.award_points(&wallet(1), &wallet(1), 60).unwrap();
        registry
            .create_gallery(&wallet(1), "Gallery", "Desc")
            .unwrap();
        let before = registry.state().clone();

        let missing = registry.rate_gallery(&wallet(2), 9, 5).unwrap_err();
        assert_eq!(missing.code(), RegistryError::NOT_FOUND);

        let zero = registry.rate_gallery(&wallet(2), 0, 0).unwrap_err();
        let six = registry.rate_gallery(&wallet(2), 0, 6).unwrap_err();
        assert_eq!(zero.code(), RegistryError::INVALID_ARGUMENT);
        assert_eq!(six.code(), RegistryError::INVALID_ARGUMENT);

        assert_eq!(registry.state(), &before);
    }

    #[test]
    fn test_award_overflow_is_rejected_atomically() {
        let mut registry = Registry::default();
        registry
            .award_points(&wallet(1), &wallet(2), u64::MAX)
            .unwrap();
        let err = registry.award_points(&wallet(1), &wallet(2), 1).unwrap_err();
        assert_eq!(err.code(), RegistryError::INVALID_ARGUMENT);
        assert_eq!(registry.get_user_reputation(&wallet(2)).score, u64::MAX);
    }

    #[test]
    fn test_collaboration_threshold_is_configurable() {
        let config = RegistryConfig::default().with_collaboration_threshold(20);
        let mut registry = Registry::new(config).unwrap();
        let err = registry
            .create_collaboration(&wallet(1), "Zine", "Print run")
            .unwrap_err();
        assert_eq!(err.code(), RegistryError::UNAUTHORIZED);
        assert_eq!(registry.stats().collaborations, 0);

        registry.award_points(&wallet(2), &wallet(1), 20).unwrap();
        assert_eq!(
            registry.create_collaboration(&wallet(1), "Zine", "Print run"),
            Ok(0)
        );
        assert_eq!(registry.get_collaboration(0).unwrap().creator, wallet(1));
    }

    #[test]
    fn test_snapshot_roundtrip_resumes_counters() {
        let mut registry = Registry::default();
        registry
            .upload_photo(&wallet(1), "One", "First", "QmOne")
            .unwrap();
        let json = registry.state().to_json().unwrap();

        let state = LedgerState::from_json(&json).unwrap();
        let mut resumed = Registry::with_state(RegistryConfig::default(), state).unwrap();
        let id = resumed
            .upload_photo(&wallet(2), "Two", "Second", "QmTwo")
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_inconsistent_snapshot_rejected() {
        let json = r#"{
            "photos": {"0": {"id": 0, "owner": "wallet_1", "title": "t",
                             "description": "d", "content_hash": "h"}},
            "galleries": {},
            "collaborations": {},
            "reputation": {},
            "next_photo_id": 0,
            "next_gallery_id": 0,
            "next_collaboration_id": 0
        }"#;
        let err = LedgerState::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Inconsistent {
                table: "photos",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RegistryConfig::default();
        config.rewards.min_rating = 0;
        assert!(matches!(
            Registry::new(config),
            Err(SetupError::Config(ConfigError::Invalid {
                field: "rewards.min_rating",
                ..
            }))
        ));
    }

    #[test]
    fn test_curator_reward_overflow_leaves_gallery_untouched() {
        let mut registry = Registry::default();
        let curator = wallet(1);
        registry
            .award_points(&curator, &curator, u64::MAX - 10)
            .unwrap();
        registry
            .create_gallery(&curator, "Gallery", "Desc")
            .unwrap();
        let before = registry.state().clone();

        let err = registry.rate_gallery(&wallet(2), 0, 5).unwrap_err();
        assert_eq!(
            err,
            RegistryError::invalid("curator score", "reputation score overflows")
        );
        assert_eq!(err.code(), RegistryError::INVALID_ARGUMENT);

        let gallery = registry.get_gallery(0).unwrap();
        assert_eq!((gallery.rating_sum, gallery.rating_count), (0, 0));
        assert_eq!(registry.get_user_reputation(&curator).score, u64::MAX - 10);
        assert_eq!(registry.state(), &before);
    }

    #[test]
    fn test_exhausted_id_space_rejects_upload() {
        let mut state = LedgerState::default();
        state.next_photo_id = u64::MAX;
        let mut registry = Registry::with_state(RegistryConfig::default(), state).unwrap();

        let err = registry
            .upload_photo(&wallet(1), "Title", "Desc", "QmTest")
            .unwrap_err();
        assert_eq!(err, RegistryError::invalid("photo id", "id space exhausted"));
        assert_eq!(registry.stats().photos, 0);
        assert_eq!(registry.state().next_photo_id, u64::MAX);
    }

    #[test]
    fn test_gallery_and_collaboration_validate_strings() {
        let mut registry = Registry::default();
        let curator = wallet(1);
        registry.award_points(&curator, &curator, 50).unwrap();
        let before = registry.stats();
        let long = "x".repeat(65);
        let long_description = "x".repeat(257);

        let cases = [
            ("", "Desc"),
            (long.as_str(), "Desc"),
            ("Caf\u{e9}", "Desc"),
            ("Title", ""),
            ("Title", long_description.as_str()),
        ];
        for (title, description) in cases {
            let gallery = registry
                .create_gallery(&curator, title, description)
                .unwrap_err();
            assert_eq!(gallery.code(), RegistryError::INVALID_ARGUMENT);

            let collaboration = registry
                .create_collaboration(&curator, title, description)
                .unwrap_err();
            assert_eq!(collaboration.code(), RegistryError::INVALID_ARGUMENT);
        }

        assert_eq!(registry.stats(), before);
        assert_eq!(registry.create_gallery(&curator, "Title", "Desc"), Ok(0));
        assert_eq!(registry.create_collaboration(&curator, "Title", "Desc"), Ok(0));
    }

    #[test]
    fn test_unqualified_curator_sees_unauthorized_before_string_checks() {
        let mut registry = Registry::default();
        let err = registry.create_gallery(&wallet(1), "", "").unwrap_err();
        assert_eq!(err.code(), RegistryError::UNAUTHORIZED);
    }

    #[test]
    fn test_unreachable_rating_totals_rejected() {
        let mut registry = Registry::default();
        registry.award_points(&wallet(1), &wallet(1), 50).unwrap();
        registry
            .create_gallery(&wallet(1), "Gallery", "Desc")
            .unwrap();
        registry.rate_gallery(&wallet(2), 0, 4).unwrap();

        let mut state = registry.into_state();
        if let Some(gallery) = state.galleries.get_mut(&0) {
            gallery.rating_sum = 6;
        }
        assert!(state.check_consistency().is_ok());
        assert!(matches!(
            Registry::with_state(RegistryConfig::default(), state),
            Err(SetupError::Snapshot(SnapshotError::Inconsistent {
                table: "galleries",
                ..
            }))
        ));
    }

    #[derive(Clone, Default)]
    struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reads_are_logged_at_debug() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let registry = Registry::default();
            assert!(registry.get_photo(0).is_none());
            assert!(registry.get_gallery(1).is_none());
            assert!(registry.get_collaboration(2).is_none());
            assert_eq!(registry.get_user_reputation(&wallet(1)).score, 0);
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        for message in [
            "Photo lookup",
            "Gallery lookup",
            "Collaboration lookup",
            "Reputation lookup",
        ] {
            assert!(output.contains(message), "missing {:?} in {}", message, output);
        }
        assert!(output.contains("DEBUG"));
    }

    #[test]
    fn test_empty_principal_in_snapshot_rejected() {
        let mut state = LedgerState::default();
        state.reputation.insert(Principal::new(""), 10);
        let err = state.check_consistency().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Inconsistent {
                table: "reputation",
                ..
            }
        ));
    }
}
