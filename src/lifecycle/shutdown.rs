//! Stop-signal fan-out for a NodeSet's accept loops.

use tokio::sync::broadcast;

/// One-shot stop signal shared by the accept loops of a single NodeSet.
///
/// Each loop holds a [`StopListener`]; triggering wakes them all. Triggering
/// is idempotent and non-blocking, and a listener subscribed after the
/// trigger still observes the stop.
#[derive(Debug)]
pub struct StopSignal {
    tx: broadcast::Sender<()>,
    fired: std::sync::atomic::AtomicBool,
}

/// Receiving side held by one accept loop.
#[derive(Debug)]
pub struct StopListener {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Hand out a listener for one accept loop.
    pub fn listener(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
            fired: self.fired.load(std::sync::atomic::Ordering::SeqCst),
        }
    }

    /// Wake every listener. Safe to call more than once.
    pub fn trigger(&self) {
        self.fired.store(true, std::sync::atomic::Ordering::SeqCst);
        let _ = self.tx.send(());
    }
}

impl StopListener {
    /// Resolve when the stop signal fires.
    pub async fn stopped(&mut self) {
        if self.fired {
            return;
        }
        // A send before our subscribe is covered by the fired snapshot; any
        // recv error after that means the signal fired and the channel wound
        // down, which is also a stop.
        let _ = self.rx.recv().await;
        self.fired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_listener() {
        let signal = StopSignal::new();
        let mut listener = signal.listener();

        let waiter = tokio::spawn(async move {
            listener.stopped().await;
        });
        signal.trigger();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn listener_after_trigger_sees_stop() {
        let signal = StopSignal::new();
        signal.trigger();

        let mut listener = signal.listener();
        // Must resolve immediately rather than hang.
        tokio::time::timeout(std::time::Duration::from_millis(100), listener.stopped())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let signal = StopSignal::new();
        let mut listener = signal.listener();
        signal.trigger();
        signal.trigger();
        listener.stopped().await;
    }
}
