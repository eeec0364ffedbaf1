//! Configuration and value types for the conversion engine facade.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location prefix for the engine's bootstrap assets.
pub const DEFAULT_ASSET_BASE: &str = "/libreoffice-wasm/";

// Asset names the engine loader expects under the base path.
const RUNTIME_SCRIPT: &str = "soffice.js";
const ENGINE_BINARY: &str = "soffice.wasm";
const ENGINE_DATA: &str = "soffice.data";
const ENGINE_WORKER: &str = "soffice.worker.js";
const BRIDGE_WORKER: &str = "browser.worker.global.js";

/// Configuration for the conversion engine.
///
/// Fixed at construction time; the lifecycle never re-reads it after the
/// facade is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Location prefix under which the engine's bootstrap assets live.
    /// Default: `/libreoffice-wasm/`.
    pub asset_base: String,

    /// Time allowed for one engine bootstrap.
    /// Default: 120 seconds.
    pub startup_timeout: Duration,

    /// Timeout for individual document conversions.
    /// Default: 120 seconds.
    pub conversion_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_base: DEFAULT_ASSET_BASE.to_string(),
            startup_timeout: Duration::from_secs(120),
            conversion_timeout: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    /// Create a config with a custom asset base path.
    pub fn with_asset_base(asset_base: impl Into<String>) -> Self {
        Self {
            asset_base: asset_base.into(),
            ..Default::default()
        }
    }

    /// Set the bootstrap timeout.
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Set the per-conversion timeout.
    pub fn conversion_timeout(mut self, timeout: Duration) -> Self {
        self.conversion_timeout = timeout;
        self
    }

    /// Location of the engine's executable loader script.
    pub fn runtime_script(&self) -> String {
        self.asset(RUNTIME_SCRIPT)
    }

    /// Location of the engine's binary payload.
    pub fn engine_binary(&self) -> String {
        self.asset(ENGINE_BINARY)
    }

    /// Location of the engine's auxiliary data blob.
    pub fn engine_data(&self) -> String {
        self.asset(ENGINE_DATA)
    }

    /// Location of the engine-side worker script.
    pub fn engine_worker(&self) -> String {
        self.asset(ENGINE_WORKER)
    }

    /// Location of the host-side bridge worker script.
    pub fn bridge_worker(&self) -> String {
        self.asset(BRIDGE_WORKER)
    }

    fn asset(&self, name: &str) -> String {
        if self.asset_base.ends_with('/') {
            format!("{}{}", self.asset_base, name)
        } else {
            format!("{}/{}", self.asset_base, name)
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.asset_base.is_empty() {
            return Err(crate::error::ConvertError::InvalidConfig(
                "asset_base must not be empty".to_string(),
            ));
        }
        if self.startup_timeout.is_zero() {
            return Err(crate::error::ConvertError::InvalidConfig(
                "startup_timeout must be greater than 0".to_string(),
            ));
        }
        if self.conversion_timeout.is_zero() {
            return Err(crate::error::ConvertError::InvalidConfig(
                "conversion_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stage of the engine load reported through progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// Fetching engine assets.
    Loading,
    /// Engine runtime is starting up.
    Initializing,
    /// A conversion is running.
    Converting,
    /// A stage finished.
    Complete,
    /// The engine is ready for conversions.
    Ready,
}

/// Progress report delivered to the subscriber during one bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current load stage.
    pub phase: ProgressPhase,

    /// Completion estimate in `[0, 100]`.
    pub percent: f32,

    /// Human-readable status line.
    pub message: String,
}

/// A single conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw document bytes.
    pub content: Vec<u8>,

    /// Name of the source file; its trailing extension selects the input
    /// format.
    pub source_name: String,

    /// Format to convert into, e.g. `pdf`.
    pub target_format: String,
}

impl ConversionRequest {
    /// Create a new conversion request.
    pub fn new(
        source_name: impl Into<String>,
        content: Vec<u8>,
        target_format: impl Into<String>,
    ) -> Self {
        Self {
            content,
            source_name: source_name.into(),
            target_format: target_format.into(),
        }
    }

    /// Input format derived from the trailing extension of the source name,
    /// lower-cased. A name without an extension yields an empty string; the
    /// engine decides whether it can sniff the format on its own.
    pub fn source_format(&self) -> String {
        Path::new(&self.source_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    /// Converted document bytes.
    pub bytes: Vec<u8>,

    /// Mime type reported by the engine, e.g. `application/pdf`.
    pub mime_type: String,
}
