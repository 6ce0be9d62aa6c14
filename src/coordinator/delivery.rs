//! Callback Delivery
//!
//! Where listener callbacks run. By default they run inline on the
//! coordinator thread; `ChannelDelivery` hands them to a designated thread
//! (e.g. a UI loop) that drains a `CallbackReceiver`.

use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;

/// A single listener invocation
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Delivery policy for listener callbacks.
///
/// Implementations must preserve submission order.
pub trait Delivery: Send + Sync {
    fn deliver(&self, callback: Callback);
}

/// Runs callbacks on the coordinator thread; a panicking listener is logged
/// and does not stop the loop
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDelivery;

impl Delivery for InlineDelivery {
    fn deliver(&self, callback: Callback) {
        if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
            error!("Task listener panicked during callback delivery");
        }
    }
}

/// Forwards callbacks into an ordered channel
#[derive(Debug, Clone)]
pub struct ChannelDelivery {
    tx: mpsc::UnboundedSender<Callback>,
}

impl ChannelDelivery {
    /// Create the delivery policy and the receiver to drain on the target thread
    pub fn channel() -> (Self, CallbackReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, CallbackReceiver { rx })
    }
}

impl Delivery for ChannelDelivery {
    fn deliver(&self, callback: Callback) {
        if self.tx.send(callback).is_err() {
            debug!("Callback receiver dropped, discarding callback");
        }
    }
}

/// Receiving end of a `ChannelDelivery`
pub struct CallbackReceiver {
    rx: mpsc::UnboundedReceiver<Callback>,
}

impl CallbackReceiver {
    /// Run every callback already queued; returns how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(callback) = self.rx.try_recv() {
            callback();
            count += 1;
        }
        count
    }

    /// Block until one callback is available and run it.
    ///
    /// Returns false once the coordinator is gone. Must not be called from
    /// inside an async runtime.
    pub fn blocking_run_next(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Await one callback and run it; false once the coordinator is gone
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_inline_survives_panic() {
        let delivery = InlineDelivery;
        let hits = Arc::new(Mutex::new(0));
        delivery.deliver(Box::new(|| panic!("listener bug")));
        let h = hits.clone();
        delivery.deliver(Box::new(move || *h.lock() += 1));
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_channel_preserves_order() {
        let (delivery, mut receiver) = ChannelDelivery::channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            delivery.deliver(Box::new(move || seen.lock().push(i)));
        }

        assert!(seen.lock().is_empty());
        assert_eq!(receiver.run_pending(), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(receiver.run_pending(), 0);
    }

    #[tokio::test]
    async fn test_run_next_ends_when_sender_dropped() {
        let (delivery, mut receiver) = ChannelDelivery::channel();
        delivery.deliver(Box::new(|| {}));
        drop(delivery);

        assert!(receiver.run_next().await);
        assert!(!receiver.run_next().await);
    }
}
