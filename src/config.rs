// In: src/config.rs

//! The single source of truth for accelflate codec configuration.
//!
//! This module defines the unified `AccelflateConfig` struct, which is designed
//! to be created once at the application boundary (e.g., from a storage
//! engine's option string) and then passed down through the codec via a
//! shared, read-only `Arc<AccelflateConfig>`. The codec only ever reads these
//! fields; parsing and validation of named settings belong to the caller.

use serde::{Deserialize, Serialize};

//==================================================================================
// I. Core Configuration Enums
//==================================================================================

/// Selects where compression and decompression jobs execute.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// **Default:** let the backend pick between the accelerator and the
    /// software fallback at context-initialization time.
    #[default]
    Auto,

    /// Force the dedicated accelerator. Context initialization fails when no
    /// device is present.
    #[serde(alias = "hw")]
    Hardware,

    /// Force the software emulation path.
    #[serde(alias = "sw")]
    Software,
}

impl ExecutionPath {
    /// Number of distinct paths; sizes the per-thread context caches.
    pub const COUNT: usize = 3;

    /// Stable index into per-path arrays.
    pub fn index(self) -> usize {
        match self {
            ExecutionPath::Auto => 0,
            ExecutionPath::Hardware => 1,
            ExecutionPath::Software => 2,
        }
    }
}

/// Selects how the backend builds its Huffman tables.
///
/// Dynamic tables are derived from the data and compress better; fixed tables
/// skip the table-building pass and favor throughput.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    #[default]
    Dynamic,
    Fixed,
}

//==================================================================================
// II. The Unified AccelflateConfig
//==================================================================================

/// Sentinel meaning "use the backend's default effort". Storage engines pass
/// this when the user never set an explicit compression level.
pub const DEFAULT_LEVEL: i32 = 32_767;

/// The single, unified configuration for the accelflate codec.
/// This struct is created once and shared throughout the system via an `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AccelflateConfig {
    /// Where jobs execute: accelerator, software emulation, or automatic.
    #[serde(default)]
    pub execution_path: ExecutionPath,

    /// Dynamic or fixed Huffman tables.
    #[serde(default)]
    pub compression_mode: CompressionMode,

    /// If true, the backend re-expands each compressed block and checks it
    /// against the input before reporting success.
    #[serde(default)]
    pub verify: bool,

    /// Numeric compression level. `0` and [`DEFAULT_LEVEL`] select the
    /// backend's default effort; any other value selects its high effort.
    #[serde(default)]
    pub level: i32,

    /// Advertised to the storage engine so it can shard large values across
    /// worker threads. The codec itself never spawns threads.
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: u32,
}

impl Default for AccelflateConfig {
    fn default() -> Self {
        Self {
            execution_path: ExecutionPath::default(),
            compression_mode: CompressionMode::default(),
            verify: false,
            level: 0,
            parallel_threads: default_parallel_threads(),
        }
    }
}

/// Helper for `serde` to provide a default for `parallel_threads`.
fn default_parallel_threads() -> u32 {
    1
}

//==================================================================================
// Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config: AccelflateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AccelflateConfig::default());
        assert_eq!(config.execution_path, ExecutionPath::Auto);
        assert_eq!(config.compression_mode, CompressionMode::Dynamic);
        assert!(!config.verify);
        assert_eq!(config.level, 0);
        assert_eq!(config.parallel_threads, 1);
    }

    #[test]
    fn test_non_default_fields_deserialize() {
        let config: AccelflateConfig = serde_json::from_str(
            r#"{
                "execution_path": "hardware",
                "compression_mode": "fixed",
                "verify": true,
                "level": 1,
                "parallel_threads": 2
            }"#,
        )
        .unwrap();
        assert_eq!(config.execution_path, ExecutionPath::Hardware);
        assert_eq!(config.compression_mode, CompressionMode::Fixed);
        assert!(config.verify);
        assert_eq!(config.level, 1);
        assert_eq!(config.parallel_threads, 2);
    }

    #[test]
    fn test_short_path_aliases() {
        let config: AccelflateConfig =
            serde_json::from_str(r#"{"execution_path": "hw"}"#).unwrap();
        assert_eq!(config.execution_path, ExecutionPath::Hardware);

        let config: AccelflateConfig =
            serde_json::from_str(r#"{"execution_path": "sw"}"#).unwrap();
        assert_eq!(config.execution_path, ExecutionPath::Software);
    }

    #[test]
    fn test_path_indices_are_distinct() {
        let mut seen = [false; ExecutionPath::COUNT];
        for path in [
            ExecutionPath::Auto,
            ExecutionPath::Hardware,
            ExecutionPath::Software,
        ] {
            let idx = path.index();
            assert!(!seen[idx], "duplicate index {idx}");
            seen[idx] = true;
        }
    }
}
