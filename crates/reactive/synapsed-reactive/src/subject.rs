//! Subject: the broadcast primitive
//!
//! A [`Subject`] owns one [`Registry`]. `next` takes a snapshot of it and
//! runs the binder for each subscriber on the calling thread; subscribers
//! whose signature does not fit the emission are skipped without error.

use crate::binder;
use crate::callback::{Args, Callback, Signature};
use crate::channel::{self, EmissionStream, Forwarded};
use crate::config::SubjectConfig;
use crate::pipe::{Middleware, Pipeline};
use crate::registry::Registry;
use crate::types::{Id, ReactiveError, ReactiveResult, Token};
use crate::value::Emission;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Read side of a subject: registration and removal of callbacks
pub trait Observable: Send + Sync {
    /// Registers `callback` for every further emission
    fn subscribe_callback(&self, callback: Callback) -> ReactiveResult<Token>;

    /// Registers a type-erased value, which must be a [`Callback`]
    fn subscribe_any(&self, value: Box<dyn Any + Send + Sync>) -> ReactiveResult<Token> {
        match value.downcast::<Callback>() {
            Ok(callback) => self.subscribe_callback(*callback),
            Err(_) => Err(ReactiveError::invalid_callback("value is not a callback")),
        }
    }

    /// Removes a registration; in-flight invocations are not cancelled
    fn unsubscribe(&self, token: Token) -> ReactiveResult<()>;

    /// Stream of every emission delivered after this call
    fn as_channel(&self) -> EmissionStream;
}

/// Write side of a subject
pub trait Subjectable: Observable {
    /// Broadcasts `values` to every current subscriber whose signature binds
    fn next(&self, values: Emission);

    /// Drops every current subscription
    fn close(&self);
}

struct Inner {
    id: Id,
    config: SubjectConfig,
    registry: RwLock<Arc<Registry>>,
    sequence: AtomicU64,
}

impl Inner {
    fn registry(&self) -> Arc<Registry> {
        self.registry.read().clone()
    }

    fn label(&self) -> &str {
        self.config.name.as_deref().unwrap_or("")
    }
}

/// Cheap-clone handle to a subject; clones share the same subscriptions
#[derive(Clone)]
pub struct Subject {
    inner: Arc<Inner>,
}

impl Subject {
    pub fn new() -> Self {
        Self::from_config(SubjectConfig::default())
    }

    pub fn with_config(config: SubjectConfig) -> ReactiveResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: SubjectConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Id::new(),
                config,
                registry: RwLock::new(Arc::new(Registry::new())),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> Id {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.config.name.as_deref()
    }

    pub fn config(&self) -> &SubjectConfig {
        &self.inner.config
    }

    /// Number of current subscriptions
    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.inner.registry.read().contains(token)
    }

    /// True when both handles refer to the same subject
    pub fn ptr_eq(&self, other: &Subject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Builds a chain of derived subjects, one per middleware.
    ///
    /// `None` entries are skipped. With no middlewares the returned
    /// pipeline's tail is this subject. The chain lives as long as the
    /// returned [`Pipeline`].
    #[must_use = "dropping the Pipeline tears the chain down"]
    pub fn pipe<I>(&self, middlewares: I) -> ReactiveResult<Pipeline>
    where
        I: IntoIterator,
        I::Item: Into<Option<Arc<dyn Middleware>>>,
    {
        Pipeline::new(self.clone()).pipe(middlewares)
    }

    /// Fresh subject for the next stage of a pipe
    pub(crate) fn derive(&self, stage: usize) -> Subject {
        let config = SubjectConfig {
            name: self.name().map(|name| format!("{name}/{stage}")),
            channel_policy: self.inner.config.channel_policy.clone(),
        };
        Self::from_config(config)
    }

    fn mint(&self) -> Token {
        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Token::new(self.inner.id, seq)
    }

    fn insert(&self, callback: Callback) -> Token {
        let token = self.mint();
        // Held across the insert so a concurrent close cannot swallow it
        let registry = self.inner.registry.read();
        registry.insert(token, callback);
        token
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("id", &self.inner.id)
            .field("name", &self.inner.config.name)
            .field("subscriptions_count", &self.len())
            .finish()
    }
}

impl Observable for Subject {
    fn subscribe_callback(&self, callback: Callback) -> ReactiveResult<Token> {
        callback.signature().validate()?;
        let signature = callback.signature().to_string();
        let token = self.insert(callback);
        debug!(subject = %self.inner.id, name = self.inner.label(), %token, %signature, "subscribed");
        Ok(token)
    }

    fn unsubscribe(&self, token: Token) -> ReactiveResult<()> {
        // Guard released first: dropping the callback may re-enter this subject
        if !self.inner.registry().remove(&token) {
            return Err(ReactiveError::UnknownSubscription(token));
        }
        debug!(subject = %self.inner.id, name = self.inner.label(), %token, "unsubscribed");
        Ok(())
    }

    fn as_channel(&self) -> EmissionStream {
        let (forwarder, receiver) = channel::pair(&self.inner.config.channel_policy);
        let own_token: Arc<OnceCell<Token>> = Arc::default();
        let subject: Weak<Inner> = Arc::downgrade(&self.inner);

        let slot = own_token.clone();
        let callback = Callback::from_parts(Signature::any(), "as_channel", move |args: Args| {
            match forwarder.forward(args.into_emission()) {
                Forwarded::Sent => {}
                Forwarded::Dropped => {
                    warn!(token = ?slot.get(), "channel full, emission dropped");
                }
                Forwarded::Closed => {
                    if let (Some(inner), Some(token)) = (subject.upgrade(), slot.get()) {
                        inner.registry().remove(token);
                        trace!(subject = %inner.id, %token, "channel receiver gone, unsubscribed");
                    }
                }
            }
        });

        let token = self.insert(callback);
        let _ = own_token.set(token);
        debug!(subject = %self.inner.id, name = self.inner.label(), %token, "channel attached");
        EmissionStream::new(receiver, token)
    }
}

impl Subjectable for Subject {
    fn next(&self, values: Emission) {
        let registry = self.inner.registry();
        for (token, callback) in registry.snapshot() {
            // Unsubscribed by an earlier callback of this same call
            if !registry.contains(&token) {
                continue;
            }
            match binder::bind(callback.signature(), &values) {
                Ok(args) => {
                    trace!(subject = %self.inner.id, %token, "delivering");
                    callback.invoke(args);
                }
                Err(mismatch) => {
                    trace!(subject = %self.inner.id, %token, %mismatch, "subscriber skipped");
                }
            }
        }
    }

    fn close(&self) {
        let previous = std::mem::replace(
            &mut *self.inner.registry.write(),
            Arc::new(Registry::new()),
        );
        debug!(
            subject = %self.inner.id,
            name = self.inner.label(),
            dropped = previous.len(),
            "closed"
        );
    }
}
