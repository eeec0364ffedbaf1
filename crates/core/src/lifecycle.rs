//! Single-flight lifecycle management for the shared conversion engine.
//!
//! The engine is expensive to start (tens of megabytes of assets plus a
//! runtime warm-up), so this module makes sure that any number of concurrent
//! `initialize` calls collapse into exactly one bootstrap, that readiness is
//! tracked as an explicit state machine, and that a destroyed engine can be
//! rebuilt from scratch.

use crate::config::{EngineConfig, ProgressEvent, ProgressPhase};
use crate::engine::{EngineFactory, EngineHandle, EngineProgress, ProgressSink};
use crate::error::{ConvertError, Result};
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Fire-and-forget consumer of progress events during one bootstrap.
pub type ProgressSubscriber = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Outcome of an in-flight bootstrap, shared with dedupe-waiters. `None`
/// until the bootstrap resolves; errors travel as messages because waiters
/// each reconstruct their own [`ConvertError`].
type BootstrapOutcome = Option<std::result::Result<(), String>>;

/// Subscriber slot shared with the engine's progress sink. Emptied once the
/// engine is ready so no event can fire afterwards.
type SubscriberSlot = Arc<SyncMutex<Option<ProgressSubscriber>>>;

enum EngineState {
    /// No engine exists and no bootstrap has started.
    Uninitialized,
    /// Exactly one bootstrap is in flight; `done` resolves to its outcome.
    Initializing { done: watch::Receiver<BootstrapOutcome> },
    /// A live engine is available for conversions.
    Ready { handle: Arc<EngineHandle> },
    /// The engine was torn down; a new `initialize` rebuilds it.
    Destroyed,
}

/// Lifecycle manager for the process-wide conversion engine.
///
/// Owns the only [`EngineHandle`] and the state machine around it. Intended
/// to be created once by the application's composition root and shared via
/// [`Arc`]; there is deliberately no hidden global instance.
pub struct EngineLifecycle {
    config: EngineConfig,
    factory: EngineFactory,
    state: Mutex<EngineState>,
}

impl EngineLifecycle {
    /// Create a new lifecycle manager. The factory is invoked once per
    /// bootstrap to construct a fresh engine.
    pub fn new(config: EngineConfig, factory: EngineFactory) -> Result<Self> {
        config.validate()?;

        info!(
            "Engine lifecycle created, assets under {:?}",
            config.asset_base
        );

        Ok(Self {
            config,
            factory,
            state: Mutex::new(EngineState::Uninitialized),
        })
    }

    /// Initialize the engine without observing progress.
    ///
    /// Safe to call from any state: a ready engine returns immediately,
    /// callers arriving during an in-flight bootstrap await its outcome, and
    /// anything else starts exactly one new bootstrap.
    pub async fn initialize(&self) -> Result<()> {
        self.initialize_inner(None).await
    }

    /// Initialize the engine, receiving progress events during the load.
    ///
    /// Only the caller that actually triggers the bootstrap is wired to
    /// progress; callers that join an in-flight bootstrap get its eventual
    /// outcome but no event stream.
    pub async fn initialize_with_progress<F>(&self, on_progress: F) -> Result<()>
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.initialize_inner(Some(Box::new(on_progress))).await
    }

    async fn initialize_inner(&self, subscriber: Option<ProgressSubscriber>) -> Result<()> {
        // Inspect the state and claim the bootstrap slot if it is free.
        let (done_tx, done_rx) = {
            let mut state = self.state.lock().await;
            match &*state {
                EngineState::Ready { .. } => return Ok(()),
                EngineState::Initializing { done } => {
                    debug!("Joining in-flight engine bootstrap");
                    let rx = done.clone();
                    drop(state);
                    return Self::await_outcome(rx).await;
                }
                EngineState::Uninitialized | EngineState::Destroyed => {
                    let (tx, rx) = watch::channel(None);
                    *state = EngineState::Initializing { done: rx.clone() };
                    (tx, rx)
                }
            }
        };

        let outcome = self.bootstrap(subscriber, &done_rx).await;

        // Publish the outcome to every dedupe-waiter. The state transition
        // already happened inside bootstrap(), so a waiter that retries
        // after a failure observes a re-initializable state.
        let shared = match &outcome {
            Ok(()) => Ok(()),
            Err(ConvertError::Bootstrap(message)) => Err(message.clone()),
            Err(e) => Err(e.to_string()),
        };
        let _ = done_tx.send(Some(shared));

        outcome
    }

    /// Run one bootstrap to completion. `token` identifies this bootstrap's
    /// generation so a concurrent `destroy` cannot be clobbered.
    async fn bootstrap(
        &self,
        subscriber: Option<ProgressSubscriber>,
        token: &watch::Receiver<BootstrapOutcome>,
    ) -> Result<()> {
        info!("Starting engine bootstrap");

        let slot: SubscriberSlot = Arc::new(SyncMutex::new(subscriber));
        let sink = Self::progress_sink(Arc::clone(&slot));

        let engine = (self.factory)(&self.config);
        let started = timeout(
            self.config.startup_timeout,
            EngineHandle::start(engine, sink),
        )
        .await;

        let handle = match started {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                error!("Engine bootstrap failed: {}", e);
                self.abort_bootstrap(token).await;
                return Err(ConvertError::Bootstrap(e.to_string()));
            }
            Err(_) => {
                error!(
                    "Engine bootstrap timed out after {:?}",
                    self.config.startup_timeout
                );
                self.abort_bootstrap(token).await;
                return Err(ConvertError::Bootstrap(format!(
                    "startup timed out after {} seconds",
                    self.config.startup_timeout.as_secs()
                )));
            }
        };

        // Commit readiness unless destroy() raced the bootstrap.
        {
            let mut state = self.state.lock().await;
            let ours = matches!(
                &*state,
                EngineState::Initializing { done } if done.same_channel(token)
            );
            if !ours {
                drop(state);
                warn!("Engine was destroyed during bootstrap, discarding fresh instance");
                if let Err(e) = handle.shutdown().await {
                    warn!("Failed to shut down discarded engine: {}", e);
                }
                *slot.lock() = None;
                return Err(ConvertError::Bootstrap(
                    "engine was destroyed during startup".to_string(),
                ));
            }
            *state = EngineState::Ready {
                handle: Arc::new(handle),
            };
        }

        info!("Engine bootstrap complete");

        // Final synthetic event, then disconnect the subscriber so nothing
        // can fire after readiness.
        if let Some(on_progress) = slot.lock().take() {
            on_progress(ProgressEvent {
                phase: ProgressPhase::Ready,
                percent: 100.0,
                message: "Conversion engine ready".to_string(),
            });
        }

        Ok(())
    }

    /// Reset a failed bootstrap back to `Uninitialized`, unless another
    /// transition (a concurrent `destroy`) already replaced it.
    async fn abort_bootstrap(&self, token: &watch::Receiver<BootstrapOutcome>) {
        let mut state = self.state.lock().await;
        if let EngineState::Initializing { done } = &*state {
            if done.same_channel(token) {
                *state = EngineState::Uninitialized;
            }
        }
    }

    /// Sink handed to the engine: translates raw reports into progress
    /// events with a percent-included status line, as long as the slot still
    /// holds the subscriber.
    fn progress_sink(slot: SubscriberSlot) -> ProgressSink {
        Box::new(move |report: EngineProgress| {
            let slot = slot.lock();
            if let Some(on_progress) = &*slot {
                on_progress(ProgressEvent {
                    phase: report.phase,
                    percent: report.percent,
                    message: format!(
                        "Loading conversion engine ({}%)...",
                        report.percent.round()
                    ),
                });
            }
        })
    }

    /// Await the outcome of a bootstrap triggered by another caller.
    async fn await_outcome(mut rx: watch::Receiver<BootstrapOutcome>) -> Result<()> {
        loop {
            let resolved = rx.borrow().clone();
            if let Some(outcome) = resolved {
                return outcome.map_err(ConvertError::Bootstrap);
            }
            if rx.changed().await.is_err() {
                // The bootstrapping task dropped its sender without
                // publishing an outcome.
                return Err(ConvertError::Bootstrap(
                    "bootstrap task ended before publishing an outcome".to_string(),
                ));
            }
        }
    }

    /// Whether a live engine is available for conversions.
    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.lock().await, EngineState::Ready { .. })
    }

    /// Snapshot of the live handle for the duration of a single call.
    /// Readiness is re-checked here on every conversion; callers must not
    /// cache the result across calls.
    pub(crate) async fn handle(&self) -> Result<Arc<EngineHandle>> {
        match &*self.state.lock().await {
            EngineState::Ready { handle } => Ok(Arc::clone(handle)),
            _ => Err(ConvertError::NotInitialized),
        }
    }

    /// Tear the engine down and reset the facade.
    ///
    /// Safe from any state. Local state is reset even when the engine's
    /// teardown reports an error, so a subsequent `initialize` always
    /// rebuilds from scratch. Calling this while a conversion is in flight
    /// is unsupported; the conversion's outcome is unspecified.
    pub async fn destroy(&self) -> Result<()> {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, EngineState::Destroyed)
        };

        match previous {
            EngineState::Ready { handle } => {
                info!("Destroying conversion engine");
                handle.shutdown().await.map_err(|e| {
                    error!("Engine teardown failed: {}", e);
                    ConvertError::Teardown(e.to_string())
                })
            }
            EngineState::Initializing { .. } => {
                // The in-flight bootstrap notices the state swap when it
                // completes and shuts its fresh engine down itself.
                warn!("destroy() called while a bootstrap was in flight");
                Ok(())
            }
            EngineState::Uninitialized | EngineState::Destroyed => Ok(()),
        }
    }

    /// Get the configuration fixed at construction time.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ConversionEngine, EngineError, RawConversion};
    use async_trait::async_trait;

    struct NoopEngine;

    #[async_trait]
    impl ConversionEngine for NoopEngine {
        async fn start(&self, _on_progress: ProgressSink) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        async fn convert(
            &self,
            _content: &[u8],
            _input_format: &str,
            _output_format: &str,
            _source_name: &str,
        ) -> std::result::Result<RawConversion, EngineError> {
            Ok(RawConversion {
                data: vec![],
                mime_type: "application/octet-stream".to_string(),
            })
        }

        async fn shutdown(&self) -> std::result::Result<(), EngineError> {
            Ok(())
        }
    }

    fn noop_lifecycle() -> EngineLifecycle {
        EngineLifecycle::new(EngineConfig::default(), Box::new(|_| Box::new(NoopEngine)))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = EngineLifecycle::new(
            EngineConfig::with_asset_base(""),
            Box::new(|_| Box::new(NoopEngine)),
        );
        match result {
            Err(ConvertError::InvalidConfig(_)) => (),
            other => panic!("Expected InvalidConfig, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_not_ready_before_initialize() {
        let lifecycle = noop_lifecycle();
        assert!(!lifecycle.is_ready().await);
        assert!(matches!(
            lifecycle.handle().await,
            Err(ConvertError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_initialize_reaches_ready() {
        let lifecycle = noop_lifecycle();
        lifecycle.initialize().await.unwrap();
        assert!(lifecycle.is_ready().await);
        assert!(lifecycle.handle().await.is_ok());
    }

    #[tokio::test]
    async fn test_destroy_resets_state() {
        let lifecycle = noop_lifecycle();
        lifecycle.initialize().await.unwrap();
        lifecycle.destroy().await.unwrap();
        assert!(!lifecycle.is_ready().await);

        // Destroy is idempotent and safe from any state.
        lifecycle.destroy().await.unwrap();
        assert!(!lifecycle.is_ready().await);
    }
}
