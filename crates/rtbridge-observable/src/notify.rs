//! Fan-out of change notifications to subscribers.

use tokio::sync::mpsc;

/// Subscriber channels for one adapter.
///
/// Sending never runs subscriber code, so changes can be emitted while the
/// adapter's own state is borrowed.
pub(crate) struct Subscribers<T> {
    senders: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    pub(crate) fn subscribe(&mut self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Deliver `change` to every live subscriber, forgetting dropped ones.
    pub(crate) fn emit(&mut self, change: &T) {
        self.senders.retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Drop every sender; receivers observe end-of-stream once drained.
    pub(crate) fn clear(&mut self) {
        self.senders.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut subscribers: Subscribers<u32> = Subscribers::default();
        let mut kept = subscribers.subscribe();
        let dropped = subscribers.subscribe();
        drop(dropped);

        subscribers.emit(&7);
        assert_eq!(subscribers.len(), 1);
        assert_eq!(kept.try_recv().unwrap(), 7);
    }

    #[test]
    fn clear_closes_channels() {
        let mut subscribers: Subscribers<u32> = Subscribers::default();
        let mut rx = subscribers.subscribe();
        subscribers.emit(&1);
        subscribers.clear();

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
