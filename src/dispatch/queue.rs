use tokio::sync::mpsc;

use super::job::NotificationJob;

/// Producer half of the dispatch queue. Unbounded: producers never wait.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<NotificationJob>,
}

/// Consumer half, owned by the dispatcher.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<NotificationJob>,
}

pub fn channel() -> (DispatchQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchQueue { tx }, JobReceiver { rx })
}

impl DispatchQueue {
    /// Enqueues a job. Returns `false` if the dispatcher has already stopped.
    pub fn push(&self, job: NotificationJob) -> bool {
        match self.tx.send(job) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(title = %e.0.title, "Dispatcher stopped, dropping job");
                false
            }
        }
    }
}

impl JobReceiver {
    /// Waits for the next job. `None` once every producer is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<NotificationJob> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NotificationJob> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
