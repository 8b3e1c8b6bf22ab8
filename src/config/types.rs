use mediaprobe_probe::SessionOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Options for every session opened with this configuration.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            strict: self.probe.strict,
            sniff_limit: self.probe.sniff_limit,
            ..SessionOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Report damaged containers and unknown formats as errors
    #[serde(default)]
    pub strict: bool,

    /// Leading bytes read to identify the container
    #[serde(default = "default_sniff_limit")]
    pub sniff_limit: u64,

    /// Extensions considered when scanning a directory (empty = all files)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_sniff_limit() -> u64 {
    mediaprobe_container::sniff::DEFAULT_SNIFF_LIMIT
}

fn default_extensions() -> Vec<String> {
    ["mp4", "m4v", "m4a", "mov", "mkv", "mka", "webm", "wav", "avi", "flac"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strict: false,
            sniff_limit: default_sniff_limit(),
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Trace every structural record
    #[serde(default)]
    pub verbose: bool,
}

fn default_filter() -> String {
    "mediaprobe=info,mediaprobe_container=info,mediaprobe_probe=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            verbose: false,
        }
    }
}
