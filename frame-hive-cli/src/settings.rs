//! Config file loading

use std::path::Path;

use anyhow::Context;
use frame_hive::RegistryConfig;

/// Load registry config from a YAML file, or defaults if it does not exist.
pub fn load(path: &Path) -> anyhow::Result<RegistryConfig> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        RegistryConfig::from_yaml(&content)
            .with_context(|| format!("parsing config {}", path.display()))?
    } else {
        RegistryConfig::default()
    };

    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}
