mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Smallest sniff window that still covers every container signature.
pub const MIN_SNIFF_LIMIT: u64 = mediaprobe_container::sniff::SIGNATURE_WINDOW;
/// Largest sniff window accepted from configuration.
pub const MAX_SNIFF_LIMIT: u64 = 16 * 1024 * 1024;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    normalize_extensions(&mut config.probe.extensions);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./mediaprobe.toml", "~/.config/mediaprobe/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn normalize_extensions(extensions: &mut Vec<String>) {
    for ext in extensions.iter_mut() {
        *ext = ext.trim_start_matches('.').to_ascii_lowercase();
    }
    extensions.sort();
    extensions.dedup();
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let limit = config.probe.sniff_limit;
    if !(MIN_SNIFF_LIMIT..=MAX_SNIFF_LIMIT).contains(&limit) {
        anyhow::bail!(
            "probe.sniff_limit must be between {} and {} bytes, got {}",
            MIN_SNIFF_LIMIT,
            MAX_SNIFF_LIMIT,
            limit
        );
    }

    if config.logging.filter.trim().is_empty() {
        tracing::warn!("Empty logging filter, falling back to defaults");
    }

    Ok(())
}
