//! Log subscriptions with isolated callbacks.
//!
//! A consumer callback must never break the transport's dispatch loop, and
//! tearing a subscription down must never raise. Both kinds of failure are
//! contained here and handed to a `FailureReporter` instead.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::client::ResilientClient;
use crate::error::Result;
use crate::models::LogNotification;
use crate::transport::{LogHandler, RpcTransport, SubscriptionId};

// == Isolated Failure ==
/// A failure contained inside the subscription machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolatedFailure {
    /// The consumer callback returned an error or panicked
    Callback { topic: String, message: String },
    /// The transport refused to remove the listener
    Disposal {
        topic: String,
        id: SubscriptionId,
        message: String,
    },
}

/// Hook receiving every contained failure.
pub type FailureReporter = Arc<dyn Fn(&IsolatedFailure) + Send + Sync>;

/// Default reporter: logs the failure.
pub fn log_failure(failure: &IsolatedFailure) {
    match failure {
        IsolatedFailure::Callback { topic, message } => {
            error!(%topic, %message, "Log subscription callback failed");
        }
        IsolatedFailure::Disposal { topic, id, message } => {
            error!(%topic, %id, %message, "Failed to remove log subscription");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

// == Log Subscription ==
/// Disposer for a log subscription.
///
/// `dispose` removes the listener exactly once. Later calls do nothing, and
/// no callback runs after the first call returns.
pub struct LogSubscription {
    topic: String,
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    transport: Arc<dyn RpcTransport>,
    reporter: FailureReporter,
}

impl LogSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Unregisters the listener. Never fails; a transport error is reported
    /// and swallowed.
    pub async fn dispose(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            debug!(topic = %self.topic, id = %self.id, "Log subscription already disposed");
            return;
        }

        match self.transport.unsubscribe_logs(self.id).await {
            Ok(()) => info!(topic = %self.topic, id = %self.id, "Log subscription disposed"),
            Err(err) => (self.reporter)(&IsolatedFailure::Disposal {
                topic: self.topic.clone(),
                id: self.id,
                message: err.to_string(),
            }),
        }
    }
}

impl ResilientClient {
    /// Calls `callback` for every log event mentioning `topic`.
    ///
    /// Events are requested at the client's commitment. Errors returned by
    /// the callback and panics inside it are reported, never propagated, and
    /// the subscription keeps delivering afterwards. Registration itself is
    /// not retried.
    pub async fn subscribe_logs<F>(&self, topic: &str, callback: F) -> Result<LogSubscription>
    where
        F: Fn(LogNotification) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));

        let handler: LogHandler = {
            let active = active.clone();
            let reporter = self.reporter.clone();
            let topic = topic.to_string();

            Arc::new(move |notification: LogNotification| {
                if !active.load(Ordering::Acquire) {
                    return;
                }

                let message = match panic::catch_unwind(AssertUnwindSafe(|| callback(notification))) {
                    Ok(Ok(())) => return,
                    Ok(Err(err)) => format!("{err:#}"),
                    Err(payload) => panic_message(payload.as_ref()),
                };
                reporter(&IsolatedFailure::Callback {
                    topic: topic.clone(),
                    message,
                });
            })
        };

        let id = self
            .transport
            .subscribe_logs(topic, self.commitment, handler)
            .await?;
        info!(%topic, %id, commitment = %self.commitment, "Subscribed to logs");

        Ok(LogSubscription {
            topic: topic.to_string(),
            id,
            active,
            transport: self.transport.clone(),
            reporter: self.reporter.clone(),
        })
    }
}
