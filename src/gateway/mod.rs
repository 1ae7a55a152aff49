//! Gateway: the event loop connecting the channel, the store, and the scheduler.
//!
//! Includes: command handling, reminder intake, topic routing, and graceful
//! shutdown.

mod commands;
mod delivery;
mod pipeline;
mod scheduler;

pub use delivery::TopicRouter;
pub use scheduler::Scheduler;

use chrono::TimeDelta;
use nudge_core::{
    config::SchedulerConfig,
    error::NudgeError,
    traits::{Channel, DeliveryGateway},
};
use nudge_memory::ReminderStore;
use nudge_parse::DateTimeParser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Extra time the scheduler gets on shutdown beyond one delivery timeout.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The central gateway that turns chat messages into reminders.
pub struct Gateway {
    pub(super) channel: Arc<dyn Channel>,
    pub(super) store: ReminderStore,
    pub(super) router: TopicRouter,
    pub(super) parser: DateTimeParser,
    pub(super) scheduler_config: SchedulerConfig,
    /// How long before the fire time a notification goes out.
    pub(super) lead: TimeDelta,
    /// Upper bound for one topic reply before falling back to a plain one.
    pub(super) reply_timeout: Duration,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        channel: Arc<dyn Channel>,
        delivery: Arc<dyn DeliveryGateway>,
        store: ReminderStore,
        parser: DateTimeParser,
        lead: Duration,
        scheduler_config: SchedulerConfig,
    ) -> Result<Self, NudgeError> {
        let lead = TimeDelta::from_std(lead).map_err(|e| {
            NudgeError::Config(format!("lead time {}s is out of range: {e}", lead.as_secs()))
        })?;
        let reply_timeout = scheduler_config.delivery_timeout();

        Ok(Self {
            channel,
            router: TopicRouter::new(store.clone(), delivery),
            store,
            parser,
            scheduler_config,
            lead,
            reply_timeout,
        })
    }

    /// Run the main event loop until a shutdown signal arrives.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Nudge gateway running | channel: {} | timezone: {} | lead: {} min | pending: {}",
            self.channel.name(),
            self.parser.zone().name(),
            self.lead.num_minutes(),
            self.store.len().await,
        );

        let (stop_tx, stop_rx) = watch::channel(false);

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;

        let sched_handle = if self.scheduler_config.enabled {
            let scheduler = Scheduler::new(
                self.store.clone(),
                self.router.clone(),
                self.lead,
                self.scheduler_config.delivery_timeout(),
                stop_rx,
            );
            Some(tokio::spawn(scheduler.run()))
        } else {
            info!("scheduler disabled, reminders will not be delivered");
            None
        };

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                maybe = rx.recv() => match maybe {
                    Some(incoming) => self.handle_message(incoming).await,
                    None => {
                        warn!("channel closed, shutting down");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(stop_tx, sched_handle).await;
        Ok(())
    }

    /// Graceful shutdown: stop the scheduler, then the channel.
    async fn shutdown(&self, stop_tx: watch::Sender<bool>, sched_handle: Option<JoinHandle<()>>) {
        info!("Shutting down...");

        let _ = stop_tx.send(true);
        if let Some(mut handle) = sched_handle {
            let grace = self.scheduler_config.delivery_timeout() + SHUTDOWN_GRACE;
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!("scheduler did not stop within {}s, aborting", grace.as_secs());
                handle.abort();
            }
        }

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        info!("Shutdown complete.");
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
