//! Channel adapter turning subject emissions into a pollable stream
//!
//! The adapter's callback only enqueues; it never waits on the consumer, so a
//! slow reader cannot stall `next`. The queue depth is governed by
//! [`ChannelPolicy`].

use crate::config::ChannelPolicy;
use crate::types::Token;
use crate::value::Emission;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Producer half held by the adapter's callback
pub(crate) enum Forwarder {
    Unbounded(mpsc::UnboundedSender<Emission>),
    Bounded(mpsc::Sender<Emission>),
}

/// Outcome of handing one emission to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Forwarded {
    Sent,
    /// Bounded queue full, emission discarded
    Dropped,
    /// Stream dropped by its consumer
    Closed,
}

impl Forwarder {
    pub(crate) fn forward(&self, emission: Emission) -> Forwarded {
        match self {
            Forwarder::Unbounded(sender) => match sender.send(emission) {
                Ok(()) => Forwarded::Sent,
                Err(_) => Forwarded::Closed,
            },
            Forwarder::Bounded(sender) => match sender.try_send(emission) {
                Ok(()) => Forwarded::Sent,
                Err(mpsc::error::TrySendError::Full(_)) => Forwarded::Dropped,
                Err(mpsc::error::TrySendError::Closed(_)) => Forwarded::Closed,
            },
        }
    }
}

pub(crate) enum Receiver {
    Unbounded(mpsc::UnboundedReceiver<Emission>),
    Bounded(mpsc::Receiver<Emission>),
}

pub(crate) fn pair(policy: &ChannelPolicy) -> (Forwarder, Receiver) {
    match policy {
        ChannelPolicy::Unbounded => {
            let (sender, receiver) = mpsc::unbounded_channel();
            (Forwarder::Unbounded(sender), Receiver::Unbounded(receiver))
        }
        ChannelPolicy::DropNewest { capacity } => {
            // Capacity is validated by SubjectConfig; clamp anyway since
            // tokio panics on a zero-sized channel
            let (sender, receiver) = mpsc::channel((*capacity).max(1));
            (Forwarder::Bounded(sender), Receiver::Bounded(receiver))
        }
    }
}

/// Receive-only sequence of every emission delivered to a subject after the
/// stream was created.
///
/// The stream ends only when no further deliveries are possible: once the
/// subject is closed, or every handle to it is dropped. Dropping the stream
/// removes its internal subscription on the next delivery.
pub struct EmissionStream {
    receiver: Receiver,
    token: Token,
}

impl EmissionStream {
    pub(crate) fn new(receiver: Receiver, token: Token) -> Self {
        Self { receiver, token }
    }

    /// Token of the internal subscription feeding this stream
    pub fn token(&self) -> Token {
        self.token
    }

    pub async fn recv(&mut self) -> Option<Emission> {
        match &mut self.receiver {
            Receiver::Unbounded(receiver) => receiver.recv().await,
            Receiver::Bounded(receiver) => receiver.recv().await,
        }
    }

    pub fn try_recv(&mut self) -> Result<Emission, TryRecvError> {
        match &mut self.receiver {
            Receiver::Unbounded(receiver) => receiver.try_recv(),
            Receiver::Bounded(receiver) => receiver.try_recv(),
        }
    }
}

impl Stream for EmissionStream {
    type Item = Emission;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Emission>> {
        match &mut self.get_mut().receiver {
            Receiver::Unbounded(receiver) => receiver.poll_recv(cx),
            Receiver::Bounded(receiver) => receiver.poll_recv(cx),
        }
    }
}

impl std::fmt::Debug for EmissionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.receiver {
            Receiver::Unbounded(_) => "unbounded",
            Receiver::Bounded(_) => "bounded",
        };
        f.debug_struct("EmissionStream")
            .field("token", &self.token)
            .field("kind", &kind)
            .finish()
    }
}
