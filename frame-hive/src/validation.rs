//! Argument checks shared by registry operations.

use crate::config::{LimitsConfig, RewardConfig};
use crate::types::{Principal, RegistryError, Result};

/// Check a bounded ASCII string field.
pub fn ascii_field(field: &'static str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() {
        return Err(RegistryError::invalid(field, "must not be empty"));
    }
    if !value.is_ascii() {
        return Err(RegistryError::invalid(field, "must be ASCII"));
    }
    if value.len() > max_len {
        return Err(RegistryError::invalid(
            field,
            format!("{} bytes exceeds limit of {}", value.len(), max_len),
        ));
    }
    Ok(())
}

pub fn title(value: &str, limits: &LimitsConfig) -> Result<()> {
    ascii_field("title", value, limits.max_title_len)
}

pub fn description(value: &str, limits: &LimitsConfig) -> Result<()> {
    ascii_field("description", value, limits.max_description_len)
}

pub fn content_hash(value: &str, limits: &LimitsConfig) -> Result<()> {
    ascii_field("content_hash", value, limits.max_content_hash_len)
}

pub fn principal(field: &'static str, value: &Principal) -> Result<()> {
    if value.as_str().is_empty() {
        return Err(RegistryError::invalid(field, "principal must not be empty"));
    }
    Ok(())
}

pub fn rating(value: u64, rewards: &RewardConfig) -> Result<()> {
    if value < rewards.min_rating || value > rewards.max_rating {
        return Err(RegistryError::invalid(
            "rating",
            format!(
                "{} is outside {}..={}",
                value, rewards.min_rating, rewards.max_rating
            ),
        ));
    }
    Ok(())
}
