//! Fire-and-forget notification queue.

use std::sync::Arc;

use routing::{Notification, Notifier};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Capacity used by the binary.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Producer half, held by request handlers.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// Enqueues without waiting. A full or closed queue drops the
    /// notification with a warning.
    pub fn send(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(issue = %dropped.identifier(), "notification queue full, dropping notification");
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(issue = %dropped.identifier(), "notification worker stopped, dropping notification");
            }
        }
    }
}

/// Consumer half. Drains the queue into a [`Notifier`].
#[derive(Debug)]
pub struct NotificationWorker {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationWorker {
    /// Runs until every [`NotificationSender`] is dropped. Notifier errors are
    /// logged and the worker moves on.
    pub async fn run(mut self, notifier: Arc<dyn Notifier>) {
        while let Some(notification) = self.rx.recv().await {
            match notifier.notify(&notification).await {
                Ok(()) => debug!(issue = %notification.identifier(), "notification delivered"),
                Err(err) => warn!(
                    issue = %notification.identifier(),
                    error = %err,
                    "failed to deliver notification"
                ),
            }
        }
        debug!("notification queue closed");
    }
}

/// Creates a bounded notification queue. `capacity` must be non-zero.
pub fn notification_channel(capacity: usize) -> (NotificationSender, NotificationWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationSender { tx }, NotificationWorker { rx })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use routing::{AgentId, IssueIdentifier, NotifyError};

    use super::*;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.seen
                .lock()
                .expect("lock")
                .push(notification.identifier().to_string());
            if self.fail {
                return Err(NotifyError::Delivery {
                    message: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn failed(identifier: &str) -> Notification {
        Notification::SubmissionFailed {
            identifier: IssueIdentifier::new(identifier).expect("identifier"),
            agent_id: AgentId::new("build").expect("agent"),
            error: "down".into(),
        }
    }

    #[tokio::test]
    async fn worker_delivers_in_order_and_survives_errors() {
        let notifier = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let (tx, worker) = notification_channel(4);
        tx.send(failed("T-1"));
        tx.send(failed("T-2"));
        drop(tx);

        worker.run(notifier.clone()).await;
        assert_eq!(*notifier.seen.lock().expect("lock"), vec!["T-1", "T-2"]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, worker) = notification_channel(1);
        tx.send(failed("T-1"));
        tx.send(failed("T-2"));
        drop(tx);

        let notifier = Arc::new(Recording::default());
        worker.run(notifier.clone()).await;
        assert_eq!(*notifier.seen.lock().expect("lock"), vec!["T-1"]);
    }
}
