//! CPU configuration.
//!
//! The configuration describes the simulated CPU's resources: accumulator
//! count and the size of every memory area. It is read from a JSON file;
//! every field is optional and falls back to the defaults below.
//!
//! ```json
//! {
//!     "accus": 4,
//!     "markers": 512,
//!     "data_blocks": { "1": 64, "10": 1024 },
//!     "mnemonics": "english",
//!     "insn_limit": 100000
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Largest byte area a 24-bit pointer offset can address.
pub const MAX_AREA_BYTES: usize = 0x20_0000;
/// Timer and counter numbers are 16 bit.
pub const MAX_TIMERS: usize = 0x1_0000;
/// Upper bound on all areas together.
pub const MAX_TOTAL_BYTES: usize = 64 * 1024 * 1024;

/// Mnemonic set used when rendering listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mnemonics {
    /// SIMATIC German mnemonics (`U`, `SPB`, `E 0.0`).
    #[default]
    German,
    /// International mnemonics (`A`, `JC`, `I 0.0`).
    English,
}

/// Simulated CPU resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Number of accumulators: 2 (S7-300) or 4 (S7-400).
    pub accus: u8,
    /// Process image of inputs, in bytes.
    pub inputs: usize,
    /// Process image of outputs, in bytes.
    pub outputs: usize,
    /// Bit memory, in bytes.
    pub markers: usize,
    /// Number of timers.
    pub timers: usize,
    /// Number of counters.
    pub counters: usize,
    /// Local data, in bytes.
    pub local_bytes: usize,
    /// Data blocks: number → size in bytes.
    pub data_blocks: BTreeMap<u16, usize>,
    /// Mnemonic set for listings and dumps.
    pub mnemonics: Mnemonics,
    /// Maximum instructions per cycle; `None` runs unbounded.
    pub insn_limit: Option<u64>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            accus: 2,
            inputs: 128,
            outputs: 128,
            markers: 256,
            timers: 256,
            counters: 256,
            local_bytes: 1024,
            data_blocks: BTreeMap::new(),
            mnemonics: Mnemonics::default(),
            insn_limit: None,
        }
    }
}

impl CpuConfig {
    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded CPU configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parse and validate a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no CPU can have.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accus != 2 && self.accus != 4 {
            return Err(ConfigError::InvalidAccuCount(self.accus));
        }

        let mut areas = vec![
            ("inputs".to_string(), self.inputs, MAX_AREA_BYTES, 1),
            ("outputs".to_string(), self.outputs, MAX_AREA_BYTES, 1),
            ("markers".to_string(), self.markers, MAX_AREA_BYTES, 1),
            ("local_bytes".to_string(), self.local_bytes, MAX_AREA_BYTES, 1),
            // one 16-bit word per timer or counter
            ("timers".to_string(), self.timers, MAX_TIMERS, 2),
            ("counters".to_string(), self.counters, MAX_TIMERS, 2),
        ];
        areas.extend(self.data_blocks.iter().map(|(nr, &size)| (format!("DB{}", nr), size, MAX_AREA_BYTES, 1)));

        let mut total = 0usize;
        for (area, size, max, unit) in areas {
            if size > max {
                return Err(ConfigError::AreaTooLarge { area, size, max });
            }
            total += size * unit;
        }
        if total > MAX_TOTAL_BYTES {
            return Err(ConfigError::MemoryTooLarge { total, max: MAX_TOTAL_BYTES });
        }
        Ok(())
    }

    /// Is this a 4-accumulator CPU?
    pub fn four_accus(&self) -> bool {
        self.accus == 4
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid accumulator count {0} (must be 2 or 4)")]
    InvalidAccuCount(u8),

    #[error("{area} size {size} exceeds the maximum of {max}")]
    AreaTooLarge { area: String, size: usize, max: usize },

    #[error("configured memory totals {total} bytes, more than {max}")]
    MemoryTooLarge { total: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = CpuConfig::from_json(r#"{ "markers": 64 }"#).unwrap();
        assert_eq!(config.markers, 64);
        assert_eq!(config.accus, 2);
        assert_eq!(config.inputs, 128);
        assert!(config.data_blocks.is_empty());
    }

    #[test]
    fn test_data_block_map() {
        let config = CpuConfig::from_json(
            r#"{ "accus": 4, "data_blocks": { "1": 16, "20": 4 }, "mnemonics": "english" }"#,
        )
        .unwrap();
        assert!(config.four_accus());
        assert_eq!(config.data_blocks.get(&1), Some(&16));
        assert_eq!(config.data_blocks.get(&20), Some(&4));
        assert_eq!(config.mnemonics, Mnemonics::English);
    }

    #[test]
    fn test_invalid_accu_count() {
        let err = CpuConfig::from_json(r#"{ "accus": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAccuCount(3)));
    }

    #[test]
    fn test_oversized_areas_are_rejected() {
        let err = CpuConfig::from_json(r#"{ "markers": 3000000 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::AreaTooLarge { ref area, size: 3_000_000, .. } if area == "markers"));

        let huge = format!(r#"{{ "timers": {} }}"#, usize::MAX);
        let err = CpuConfig::from_json(&huge).unwrap_err();
        assert!(matches!(err, ConfigError::AreaTooLarge { ref area, .. } if area == "timers"));

        let err = CpuConfig::from_json(r#"{ "data_blocks": { "7": 2097153 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::AreaTooLarge { ref area, .. } if area == "DB7"));

        let blocks: Vec<String> = (1..=40).map(|nr| format!(r#""{}": 2097152"#, nr)).collect();
        let many = format!(r#"{{ "data_blocks": {{ {} }} }}"#, blocks.join(", "));
        assert!(matches!(CpuConfig::from_json(&many), Err(ConfigError::MemoryTooLarge { .. })));

        let mut config = CpuConfig::default();
        config.counters = MAX_TIMERS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_json_is_error() {
        assert!(CpuConfig::from_json("{ not json").is_err());
    }
}
