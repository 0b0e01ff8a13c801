use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    Stream, StreamExt,
};
use std::{
    fmt::Debug,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

/// Identifies a registered change listener, so that it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// A list of callbacks, plus the senders of any streams observing the same events.
pub(crate) struct Listeners<F: ?Sized, M> {
    next_id: usize,
    callbacks: Vec<(ListenerId, Rc<F>)>,
    senders: Vec<UnboundedSender<M>>,
}

impl<F: ?Sized, M> Default for Listeners<F, M> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: Vec::new(),
            senders: Vec::new(),
        }
    }
}

impl<F: ?Sized, M: Clone> Listeners<F, M> {
    pub fn add(&mut self, callback: Rc<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.callbacks.iter().position(|(i, _)| *i == id) {
            self.callbacks.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn stream(&mut self) -> UnboundedReceiver<M> {
        let (tx, rx) = unbounded();
        self.senders.push(tx);
        rx
    }

    /// Clones the current callbacks, so that they can be invoked without holding a borrow.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.callbacks.iter().map(|(_, f)| Rc::clone(f)).collect()
    }

    /// Sends a message to every stream, dropping senders whose stream is gone.
    pub fn send(&mut self, message: &M) {
        self.senders
            .retain(|tx| tx.unbounded_send(message.clone()).is_ok());
    }

    /// Drops every callback and ends every stream.
    pub fn clear(&mut self) {
        self.callbacks.clear();
        self.senders.clear();
    }
}

impl<F: ?Sized, M> Debug for Listeners<F, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("callbacks", &self.callbacks.len())
            .field("streams", &self.senders.len())
            .finish()
    }
}

/// A stream of changed keys, as returned by [`Context::changes`](crate::Context::changes).
///
/// Every change is reported in the canonical dotted spelling and, when it differs, in the
/// slash-separated spelling as well. The stream ends when the context is dropped.
#[derive(Debug)]
pub struct ChangeStream(pub(crate) UnboundedReceiver<String>);

impl Stream for ChangeStream {
    type Item = String;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.0.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
