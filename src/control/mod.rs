//! Operator control surface.
//!
//! Ties the lifecycle manager and the campaign orchestrator together behind
//! the operations an operator can invoke: connect, disconnect, start a run,
//! request a stop, and read combined status. At most one campaign run exists
//! at a time; stopping a run is decoupled from disconnecting the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::campaign::CampaignOrchestrator;
use crate::common::error::{CampaignError, GatewayError};
use crate::common::{RunOutcome, StatusReport};
use crate::config::types::Config;
use crate::events::EventSink;
use crate::lifecycle::LifecycleHandle;

pub struct Controller {
    lifecycle: LifecycleHandle,
    sink: Arc<EventSink>,
    config: Arc<Config>,
    running: Arc<AtomicBool>,
    cancel: Mutex<CancellationToken>,
}

impl Controller {
    pub fn new(lifecycle: LifecycleHandle, sink: Arc<EventSink>, config: Arc<Config>) -> Self {
        Self {
            lifecycle,
            sink,
            config,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Begin the session handshake.
    pub async fn start_connection(&self) -> Result<(), GatewayError> {
        self.lifecycle.connect().await
    }

    /// Close the session. Does not touch a running campaign; its next send
    /// will fail and terminate the run.
    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        self.lifecycle.disconnect().await
    }

    /// Start a campaign run.
    ///
    /// Returns the run's join handle; the terminal [`RunOutcome`] is the
    /// task's output. The single-run guard stays held until the spawned run
    /// actually terminates, not merely until a stop is requested.
    pub async fn start_campaign(&self) -> Result<JoinHandle<RunOutcome>, CampaignError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CampaignError::AlreadyRunning);
        }

        let gateway = match self.lifecycle.acquire().await {
            Ok(gateway) => gateway,
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(CampaignError::NotConnected);
            }
        };

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel token poisoned") = token.clone();

        self.sink.info("Campaign started");

        let orchestrator =
            CampaignOrchestrator::new(gateway, Arc::clone(&self.sink), token);
        let config = Arc::clone(&self.config);
        let running = Arc::clone(&self.running);
        Ok(tokio::spawn(async move {
            let outcome = orchestrator.execute(&config).await;
            running.store(false, Ordering::SeqCst);
            outcome
        }))
    }

    /// Request that the running campaign stop at its next checkpoint.
    ///
    /// The in-flight send, if any, still completes; the run terminates with
    /// [`RunOutcome::Interrupted`] once the cancellation is observed.
    pub fn stop_campaign(&self) -> Result<(), CampaignError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CampaignError::NotRunning);
        }
        self.cancel.lock().expect("cancel token poisoned").cancel();
        self.sink.info("Stop requested, finishing current batch");
        Ok(())
    }

    /// Combined connection and campaign status.
    pub fn status(&self) -> StatusReport {
        let snapshot = self.lifecycle.status();
        let running = self.running.load(Ordering::SeqCst);
        let should_stop = running
            && self
                .cancel
                .lock()
                .expect("cancel token poisoned")
                .is_cancelled();

        StatusReport {
            connection: snapshot.state,
            is_connected: snapshot.is_ready(),
            is_connecting: snapshot.is_connecting(),
            has_pending_qr: snapshot.qr.is_some(),
            running,
            should_stop,
        }
    }
}
