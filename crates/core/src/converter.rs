//! Conversion gateway delegating to the shared engine.
//!
//! This module provides the high-level API for converting documents. It
//! enforces that the engine is ready before delegating and wraps raw engine
//! output into typed results; initialization stays an explicit, separate
//! step on [`EngineLifecycle`].

use crate::config::{ConversionRequest, ConversionResult};
use crate::error::{ConvertError, Result};
use crate::lifecycle::EngineLifecycle;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::debug;

/// High-level entry point for document conversions.
///
/// Stateless per call: readiness is re-checked on every request because the
/// engine can be destroyed between calls, and the handle is only borrowed
/// for the duration of one conversion.
pub struct Converter {
    lifecycle: Arc<EngineLifecycle>,
}

impl Converter {
    /// Create a converter on top of a shared engine lifecycle.
    pub fn new(lifecycle: Arc<EngineLifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Convert a document to the request's target format.
    ///
    /// Fails with [`ConvertError::NotInitialized`] unless the engine is
    /// ready; the gateway never initializes on the caller's behalf. Engine
    /// failures surface as [`ConvertError::Conversion`] and do not affect
    /// readiness.
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult> {
        let handle = self.lifecycle.handle().await?;

        let input_format = request.source_format();
        let deadline = self.lifecycle.config().conversion_timeout;

        debug!(
            "Converting '{}' ({} -> {}, {} bytes)",
            request.source_name,
            if input_format.is_empty() { "?" } else { input_format.as_str() },
            request.target_format,
            request.content.len()
        );

        let raw = timeout(
            deadline,
            handle.convert(
                &request.content,
                &input_format,
                &request.target_format,
                &request.source_name,
            ),
        )
        .await
        .map_err(|_| ConvertError::Timeout {
            source_name: request.source_name.clone(),
            timeout_secs: deadline.as_secs(),
        })?
        .map_err(|e| ConvertError::Conversion {
            source_name: request.source_name.clone(),
            message: e.to_string(),
        })?;

        Ok(ConversionResult {
            bytes: raw.data,
            mime_type: raw.mime_type,
        })
    }

    /// Convert a document to PDF.
    ///
    /// Convenience over [`convert`](Self::convert) that fixes the target
    /// format; the request's own `target_format` is ignored.
    pub async fn convert_to_pdf(&self, request: ConversionRequest) -> Result<ConversionResult> {
        self.convert(ConversionRequest {
            target_format: "pdf".to_string(),
            ..request
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{ConversionEngine, EngineError, ProgressSink, RawConversion};
    use async_trait::async_trait;

    /// Engine that must never be reached; the gateway has to reject the
    /// call before delegating.
    struct UnreachableEngine;

    #[async_trait]
    impl ConversionEngine for UnreachableEngine {
        async fn start(&self, _on_progress: ProgressSink) -> std::result::Result<(), EngineError> {
            Err(EngineError::new("engine must not be started"))
        }

        async fn convert(
            &self,
            _content: &[u8],
            _input_format: &str,
            _output_format: &str,
            _source_name: &str,
        ) -> std::result::Result<RawConversion, EngineError> {
            Err(EngineError::new("engine must not be reached"))
        }

        async fn shutdown(&self) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_convert_requires_initialized_engine() {
        let lifecycle = Arc::new(
            EngineLifecycle::new(
                EngineConfig::default(),
                Box::new(|_| Box::new(UnreachableEngine)),
            )
            .unwrap(),
        );
        let converter = Converter::new(lifecycle);

        let request = ConversionRequest::new("report.docx", vec![1, 2, 3], "pdf");
        match converter.convert(request).await {
            Err(ConvertError::NotInitialized) => (),
            other => panic!("Expected NotInitialized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_convert_to_pdf_requires_initialized_engine() {
        let lifecycle = Arc::new(
            EngineLifecycle::new(
                EngineConfig::default(),
                Box::new(|_| Box::new(UnreachableEngine)),
            )
            .unwrap(),
        );
        let converter = Converter::new(lifecycle);

        let request = ConversionRequest::new("report.docx", vec![], "docx");
        match converter.convert_to_pdf(request).await {
            Err(ConvertError::NotInitialized) => (),
            other => panic!("Expected NotInitialized, got {:?}", other),
        }
    }
}
