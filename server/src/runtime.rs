//! Background task scheduling.
//!
//! Adapters call [`Runtime::mark_ready`] every time the platform connection
//! becomes ready. The first call reconciles active mutes and starts the
//! periodic tasks; reconnects do not start them again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::audit_log::spawn_log_cleanup_task;
use crate::moderation::{reconcile_mutes, spawn_expiry_task};
use crate::observability::report_error;
use crate::state::AppState;

pub struct Runtime {
    state: Arc<AppState>,
    ready: watch::Sender<bool>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime {
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            state,
            ready,
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Signal that the platform is ready. Starts the scheduler exactly once.
    pub async fn mark_ready(&self) {
        self.ready.send_replace(true);
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Platform ready again, scheduler already running");
            return;
        }
        self.start().await;
    }

    /// Wait until [`Runtime::mark_ready`] has been called.
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives as long as `self`
        let _ = ready.wait_for(|ready| *ready).await;
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    async fn start(&self) {
        match reconcile_mutes(&self.state).await {
            Ok(restored) => info!(restored, "Mute reconciliation finished"),
            Err(err) => report_error("mute reconciliation", &err),
        }

        let mut tasks = self.tasks.lock().await;
        tasks.push(spawn_expiry_task(Arc::clone(&self.state)));
        tasks.push(spawn_log_cleanup_task(Arc::clone(&self.state)));
        info!(
            scan_interval = ?self.state.config.sanction_scan_interval,
            "Background tasks started"
        );
    }

    /// Abort the background tasks.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        info!("Background tasks stopped");
    }
}
