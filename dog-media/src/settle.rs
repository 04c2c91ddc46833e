use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Single-assignment completion handle.
///
/// Clones share one slot; the first `settle` call delivers its value and every
/// later call is a no-op. The paired [`Outcome`] yields `None` when all handles
/// were dropped without settling.
pub struct Settle<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

/// Receiving side of a [`Settle`] handle
pub struct Outcome<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Settle<T> {
    pub fn channel() -> (Settle<T>, Outcome<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Settle {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            Outcome { rx },
        )
    }

    /// Deliver `value` if nothing has been delivered yet.
    ///
    /// Returns `true` when this call won.
    pub fn settle(&self, value: T) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(tx) => {
                // receiver gone means the caller stopped waiting; still counts as settled
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Outcome<T> {
    pub async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_signal_wins() {
        let (settle, outcome) = Settle::channel();
        let other = settle.clone();

        assert!(other.settle("callback"));
        assert!(!settle.settle("pipe error"));
        assert!(settle.is_settled());

        assert_eq!(outcome.wait().await, Some("callback"));
    }

    #[tokio::test]
    async fn dropped_handles_yield_none() {
        let (settle, outcome) = Settle::<u32>::channel();
        let other = settle.clone();
        drop(settle);
        drop(other);

        assert_eq!(outcome.wait().await, None);
    }

    #[tokio::test]
    async fn settles_across_tasks_once() {
        let (settle, outcome) = Settle::channel();
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let settle = settle.clone();
            handles.push(tokio::spawn(async move { settle.settle(i) }));
        }
        drop(settle);

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(outcome.wait().await.is_some());
    }
}
