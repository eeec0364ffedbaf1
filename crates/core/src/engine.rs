//! The conversion engine seam and the handle owning one live instance.
//!
//! The actual engine (a WASM build of the office suite in production) is an
//! external collaborator reached through the [`ConversionEngine`] trait. This
//! module only defines the boundary contract and the [`EngineHandle`] that
//! wraps a started instance; when engines are created and destroyed is the
//! lifecycle's decision.

use crate::config::{EngineConfig, ProgressPhase};
use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Error reported by the underlying engine, carried verbatim.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    /// Create an engine error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raw progress report produced by the engine during bootstrap.
#[derive(Debug, Clone)]
pub struct EngineProgress {
    /// Load stage the engine is in.
    pub phase: ProgressPhase,
    /// Completion estimate in `[0, 100]`.
    pub percent: f32,
    /// Engine-native status line.
    pub message: String,
}

/// Fire-and-forget sink for raw engine progress reports.
pub type ProgressSink = Box<dyn Fn(EngineProgress) + Send + Sync>;

/// Raw output of one conversion as reported by the engine.
#[derive(Debug, Clone)]
pub struct RawConversion {
    /// Converted bytes.
    pub data: Vec<u8>,
    /// Mime type of the output.
    pub mime_type: String,
}

/// The document conversion engine behind the facade.
///
/// Implementations wrap whatever actually performs conversions — the
/// production WASM worker, a subprocess, or a stub in tests. All methods are
/// async; the engine may use background execution contexts internally, which
/// is opaque to this crate.
#[async_trait]
pub trait ConversionEngine: Send + Sync {
    /// Load assets and start the engine runtime. Progress may be reported
    /// through the sink while the load is running.
    async fn start(&self, on_progress: ProgressSink) -> std::result::Result<(), EngineError>;

    /// Convert a document. `input_format` may be empty when the source name
    /// carried no extension.
    async fn convert(
        &self,
        content: &[u8],
        input_format: &str,
        output_format: &str,
        source_name: &str,
    ) -> std::result::Result<RawConversion, EngineError>;

    /// Tear the engine down. The instance must not be used afterwards.
    async fn shutdown(&self) -> std::result::Result<(), EngineError>;
}

/// Factory constructing a fresh engine for each bootstrap.
///
/// Injected at composition time so re-initialization after `destroy` can
/// rebuild the engine from scratch.
pub type EngineFactory = Box<dyn Fn(&EngineConfig) -> Box<dyn ConversionEngine> + Send + Sync>;

/// Owns exactly one live engine instance.
///
/// Constructed by the lifecycle when a bootstrap succeeds and dropped when
/// the facade is destroyed; a torn-down handle is never reused.
pub struct EngineHandle {
    engine: Box<dyn ConversionEngine>,
}

impl EngineHandle {
    /// Run the engine's asynchronous bootstrap and wrap the live instance.
    pub(crate) async fn start(
        engine: Box<dyn ConversionEngine>,
        on_progress: ProgressSink,
    ) -> std::result::Result<Self, EngineError> {
        let start = Instant::now();
        engine.start(on_progress).await?;
        debug!("Engine started in {:?}", start.elapsed());
        Ok(Self { engine })
    }

    /// Delegate one conversion to the live engine.
    pub(crate) async fn convert(
        &self,
        content: &[u8],
        input_format: &str,
        output_format: &str,
        source_name: &str,
    ) -> std::result::Result<RawConversion, EngineError> {
        let start = Instant::now();
        let result = self
            .engine
            .convert(content, input_format, output_format, source_name)
            .await?;
        debug!(
            "Converted '{}' to {} ({} bytes) in {:?}",
            source_name,
            output_format,
            result.data.len(),
            start.elapsed()
        );
        Ok(result)
    }

    /// Delegate teardown to the live engine.
    pub(crate) async fn shutdown(&self) -> std::result::Result<(), EngineError> {
        self.engine.shutdown().await
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct EchoEngine {
        started: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConversionEngine for EchoEngine {
        async fn start(&self, on_progress: ProgressSink) -> std::result::Result<(), EngineError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            on_progress(EngineProgress {
                phase: ProgressPhase::Loading,
                percent: 0.0,
                message: "fetching".to_string(),
            });
            Ok(())
        }

        async fn convert(
            &self,
            content: &[u8],
            input_format: &str,
            _output_format: &str,
            _source_name: &str,
        ) -> std::result::Result<RawConversion, EngineError> {
            Ok(RawConversion {
                data: content.to_vec(),
                mime_type: format!("application/{}", input_format),
            })
        }

        async fn shutdown(&self) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::new("no filter available");
        assert_eq!(format!("{}", err), "no filter available");
    }

    #[tokio::test]
    async fn test_handle_start_runs_engine_bootstrap() {
        let started = Arc::new(AtomicUsize::new(0));
        let engine = Box::new(EchoEngine {
            started: Arc::clone(&started),
        });

        let reported = Arc::new(AtomicUsize::new(0));
        let sink_counter = Arc::clone(&reported);
        let handle = EngineHandle::start(engine, Box::new(move |_| {
            sink_counter.fetch_add(1, Ordering::SeqCst);
        }))
        .await
        .unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(reported.load(Ordering::SeqCst), 1);

        let result = handle.convert(&[7, 8], "docx", "pdf", "a.docx").await.unwrap();
        assert_eq!(result.data, vec![7, 8]);
        assert_eq!(result.mime_type, "application/docx");
    }

    #[tokio::test]
    async fn test_handle_shutdown_delegates() {
        let engine = Box::new(EchoEngine {
            started: Arc::new(AtomicUsize::new(0)),
        });
        let handle = EngineHandle::start(engine, Box::new(|_| {})).await.unwrap();
        assert!(handle.shutdown().await.is_ok());
    }
}
