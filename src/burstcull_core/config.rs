use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Name of the quarantine folder created directly under the scanned root.
pub const QUARANTINE_DIR_NAME: &str = "_culled";

/// How scanned items are ordered before they are sliced into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingMode {
    /// Sort by capture time and split on time gaps
    #[default]
    Chronological,
    /// Sort by filename and split into fixed-size chunks
    Lexical,
}

/// Which file types the scanner picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFilter {
    #[default]
    Images,
    Videos,
    All,
}

/// Parameters of a culling session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CullConfig {
    pub max_gap_seconds: f64,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub ordering: OrderingMode,
    pub media: MediaFilter,
    pub recursive: bool,
    /// Read embedded capture times with exiftool.
    pub use_metadata: bool,
}

impl Default for CullConfig {
    fn default() -> Self {
        CullConfig {
            max_gap_seconds: 2.0,
            min_batch_size: 2,
            max_batch_size: 30,
            ordering: OrderingMode::Chronological,
            media: MediaFilter::Images,
            recursive: false,
            use_metadata: true,
        }
    }
}

impl CullConfig {
    /// Clamp sizes into a usable range.
    pub fn normalized(mut self) -> Self {
        self.max_batch_size = self.max_batch_size.max(1);
        self.min_batch_size = self.min_batch_size.max(1);
        if !self.max_gap_seconds.is_finite() || self.max_gap_seconds < 0.0 {
            log::warn!(
                "Invalid max gap {}, using {}",
                self.max_gap_seconds,
                CullConfig::default().max_gap_seconds
            );
            self.max_gap_seconds = CullConfig::default().max_gap_seconds;
        }
        if self.min_batch_size > self.max_batch_size {
            log::warn!(
                "Minimum batch size {} exceeds maximum {}, no batch can form",
                self.min_batch_size,
                self.max_batch_size
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_sizes() {
        let config = CullConfig {
            max_batch_size: 0,
            min_batch_size: 0,
            max_gap_seconds: -1.0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.max_batch_size, 1);
        assert_eq!(config.min_batch_size, 1);
        assert_eq!(config.max_gap_seconds, 2.0);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: CullConfig = serde_json::from_str(r#"{"maxGapSeconds": 30}"#).unwrap();
        assert_eq!(config.max_gap_seconds, 30.0);
        assert_eq!(config.min_batch_size, 2);
        assert_eq!(config.ordering, OrderingMode::Chronological);
    }
}
