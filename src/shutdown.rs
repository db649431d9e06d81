//! Cooperative cancellation shared by the daemon's loops.
use tokio::sync::watch;

/// Sending half, held by the daemon.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every loop.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, ShutdownListener { rx })
    }

    pub fn trigger(&self) {
        // send_replace never fails, even with every listener gone.
        self.tx.send_replace(true);
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered, or the [`Shutdown`] is dropped.
    pub async fn wait(&mut self) {
        // Err means the sender is gone, which is also a stop.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleeps for `duration` unless shutdown arrives first.
    ///
    /// Returns `true` if the sleep was cut short by shutdown.
    pub async fn sleep(&mut self, duration: std::time::Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.wait() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let (shutdown, mut listener) = Shutdown::new();
        assert!(!listener.is_triggered());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), listener.wait())
            .await
            .expect("wait should resolve");
        assert!(listener.is_triggered());
    }

    #[tokio::test]
    async fn test_late_listener_sees_trigger() {
        let (shutdown, _listener) = Shutdown::new();
        shutdown.trigger();
        let mut late = shutdown.listener();
        assert!(late.is_triggered());
        assert!(late.sleep(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_dropping_sender_stops_listeners() {
        let (shutdown, mut listener) = Shutdown::new();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), listener.wait())
            .await
            .expect("wait should resolve once the sender is dropped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_to_completion_without_trigger() {
        let (_shutdown, mut listener) = Shutdown::new();
        assert!(!listener.sleep(Duration::from_secs(30)).await);
    }
}
