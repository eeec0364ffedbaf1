//! # office-convert-core
//!
//! Lifecycle facade for a heavy, asynchronously-loaded document conversion
//! engine (a WASM build of an office suite in production).
//!
//! The engine takes tens of seconds to fetch and start, so this crate
//! provides:
//!
//! - **Single-flight initialization** — any number of concurrent
//!   `initialize` calls collapse into exactly one bootstrap, and all of them
//!   observe its outcome
//! - **Structured progress** during the multi-stage load
//! - **Readiness gating** — conversions fail fast before `initialize` and
//!   after `destroy`, and destruction allows a full rebuild
//!
//! The engine itself is an external collaborator plugged in through the
//! [`ConversionEngine`] trait; this crate never interprets documents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use office_convert_core::{
//!     ConversionEngine, ConversionRequest, Converter, EngineConfig, EngineError,
//!     EngineLifecycle, ProgressSink, RawConversion,
//! };
//!
//! struct WasmEngine;
//!
//! #[async_trait]
//! impl ConversionEngine for WasmEngine {
//!     async fn start(&self, _on_progress: ProgressSink) -> Result<(), EngineError> {
//!         // Fetch assets, boot the worker, report progress along the way.
//!         Ok(())
//!     }
//!
//!     async fn convert(
//!         &self,
//!         _content: &[u8],
//!         _input_format: &str,
//!         _output_format: &str,
//!         _source_name: &str,
//!     ) -> Result<RawConversion, EngineError> {
//!         unimplemented!("delegate to the real engine")
//!     }
//!
//!     async fn shutdown(&self) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let lifecycle = Arc::new(EngineLifecycle::new(
//!         EngineConfig::default(),
//!         Box::new(|_config| Box::new(WasmEngine)),
//!     )?);
//!
//!     // Explicit initialization; conversions are rejected until it succeeds.
//!     lifecycle
//!         .initialize_with_progress(|event| {
//!             println!("{:?} {:.0}%: {}", event.phase, event.percent, event.message);
//!         })
//!         .await?;
//!
//!     let converter = Converter::new(Arc::clone(&lifecycle));
//!     let result = converter
//!         .convert(ConversionRequest::new(
//!             "report.docx",
//!             std::fs::read("report.docx")?,
//!             "pdf",
//!         ))
//!         .await?;
//!
//!     std::fs::write("report.pdf", &result.bytes)?;
//!     lifecycle.destroy().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod lifecycle;

// Re-export main types for convenience
pub use config::{
    ConversionRequest, ConversionResult, EngineConfig, ProgressEvent, ProgressPhase,
    DEFAULT_ASSET_BASE,
};
pub use converter::Converter;
pub use engine::{
    ConversionEngine, EngineError, EngineFactory, EngineHandle, EngineProgress, ProgressSink,
    RawConversion,
};
pub use error::{ConvertError, Result};
pub use lifecycle::{EngineLifecycle, ProgressSubscriber};

/// Initialize the library's logging.
/// Call this once at application startup if you want to see logs.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
}
