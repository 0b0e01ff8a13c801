use core::sync::atomic::Ordering::Relaxed;
use futures::{task::AtomicWaker, Stream};
use std::{
    fmt::Debug,
    pin::Pin,
    sync::{atomic::AtomicBool, Arc, Weak},
    task::{Context, Poll},
};

/// Sends coalesced "something changed" notifications to a single [`Notifications`] stream.
#[derive(Debug)]
pub(crate) struct Notifier(Arc<Inner>);

/// A stream that yields once for every batch of notifications sent since it was last polled.
///
/// The stream ends when the object it observes is dropped or disposed.
#[derive(Debug)]
pub struct Notifications(Weak<Inner>);

#[derive(Debug, Default)]
struct Inner {
    waker: AtomicWaker,
    pending: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // a parked reader must see `None`
        self.waker.wake();
    }
}

/// Creates a connected notifier and stream.
pub(crate) fn notifications() -> (Notifier, Notifications) {
    let shared = Arc::new(Inner::default());
    let stream = Notifications(Arc::downgrade(&shared));
    (Notifier(shared), stream)
}

impl Notifier {
    pub fn notify(&self) {
        self.0.pending.store(true, Relaxed);
        self.0.waker.wake();
    }

    /// Whether the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        Arc::weak_count(&self.0) == 0
    }
}

impl Stream for Notifications {
    type Item = ();

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let Some(inner) = self.0.upgrade() else {
            return Poll::Ready(None);
        };
        inner.waker.register(cx.waker());
        if inner.pending.swap(false, Relaxed) {
            Poll::Ready(Some(()))
        } else {
            Poll::Pending
        }
    }
}
