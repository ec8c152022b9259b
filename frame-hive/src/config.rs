//! Configuration for the registry.

use serde::{Deserialize, Serialize};

/// Settings the registry cannot operate under.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Out-of-range or inconsistent setting
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Configuration for a Frame Hive registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Reputation gates per operation
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// String field bounds
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Rating range and curator rewards
    #[serde(default)]
    pub rewards: RewardConfig,
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl RegistryConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Builder: set the gallery creation threshold.
    pub fn with_gallery_threshold(mut self, score: u64) -> Self {
        self.thresholds.create_gallery = score;
        self
    }

    /// Builder: set the collaboration creation threshold.
    pub fn with_collaboration_threshold(mut self, score: u64) -> Self {
        self.thresholds.create_collaboration = score;
        self
    }

    /// Reject settings the registry cannot operate under.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("limits.max_title_len", self.limits.max_title_len),
            ("limits.max_description_len", self.limits.max_description_len),
            ("limits.max_content_hash_len", self.limits.max_content_hash_len),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        let rewards = &self.rewards;
        if rewards.min_rating == 0 {
            return Err(ConfigError::invalid(
                "rewards.min_rating",
                "must be at least 1",
            ));
        }
        if rewards.min_rating > rewards.max_rating {
            return Err(ConfigError::invalid(
                "rewards.max_rating",
                format!(
                    "{} is below min_rating {}",
                    rewards.max_rating, rewards.min_rating
                ),
            ));
        }
        if rewards
            .points_per_rating_star
            .checked_mul(rewards.max_rating)
            .is_none()
        {
            return Err(ConfigError::invalid(
                "rewards.points_per_rating_star",
                "reward for max_rating overflows u64",
            ));
        }

        Ok(())
    }
}

/// Minimum caller reputation per gated operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Score needed to create a gallery
    pub create_gallery: u64,
    /// Score needed to create a collaboration (0 = open)
    pub create_collaboration: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            create_gallery: 50,
            create_collaboration: 0,
        }
    }
}

/// Maximum byte lengths of ASCII string fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_content_hash_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_title_len: 64,
            max_description_len: 256,
            max_content_hash_len: 64,
        }
    }
}

/// Rating range and the points a curator earns per rating star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub points_per_rating_star: u64,
    pub min_rating: u64,
    pub max_rating: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            points_per_rating_star: 10,
            min_rating: 1,
            max_rating: 5,
        }
    }
}

/// General configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
