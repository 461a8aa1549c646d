//! Periodic and on-demand cache refresh
//!
//! A single background task owns the refresh loop, so ticks and manual
//! triggers never overlap. Triggers already queued when an on-demand pass
//! starts share its report; a trigger sent during a pass gets the next one.

use crate::cache::AnalyticalCache;
use crate::error::{CoreError, RefreshReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

type Trigger = oneshot::Sender<RefreshReport>;

/// Cloneable handle for requesting a refresh
#[derive(Clone)]
pub struct RefreshHandle {
    trigger_tx: mpsc::Sender<Trigger>,
}

impl RefreshHandle {
    /// Run a refresh pass now and wait for its report
    ///
    /// The pass always starts after the request was queued, so it sees every
    /// store change made before the call.
    pub async fn refresh_now(&self) -> Result<RefreshReport, CoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.trigger_tx
            .send(reply_tx)
            .await
            .map_err(|_| CoreError::SchedulerStopped)?;
        reply_rx.await.map_err(|_| CoreError::SchedulerStopped)
    }
}

/// Background refresher, first pass on start then every `interval`
///
/// Dropping the scheduler stops the loop after the pass in flight.
pub struct RefreshScheduler {
    handle: RefreshHandle,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    pub fn start(cache: Arc<AnalyticalCache>, interval: Duration) -> Result<Self, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::InvalidConfig {
                message: "refresh interval must be greater than zero".to_string(),
            });
        }

        let (trigger_tx, mut trigger_rx) = mpsc::channel::<Trigger>(16);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        info!(interval_secs = interval.as_secs(), "Refresh scheduler started");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Periodic refresh");
                        cache.refresh().await;
                    }
                    Some(reply) = trigger_rx.recv() => {
                        let mut waiting = vec![reply];
                        while let Ok(queued) = trigger_rx.try_recv() {
                            waiting.push(queued);
                        }
                        debug!(triggers = waiting.len(), "On-demand refresh");

                        let report = cache.refresh().await;
                        for reply in waiting {
                            let _ = reply.send(report.clone());
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Refresh scheduler shutting down");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            handle: RefreshHandle { trigger_tx },
            shutdown_tx,
            task,
        })
    }

    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
