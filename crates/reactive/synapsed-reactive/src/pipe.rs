//! Middleware composition into chains of subjects
//!
//! Each middleware receives its parent as an [`Upstream`] and a freshly built
//! child [`Subject`], and wires the forwarding itself. The [`Pipeline`] keeps
//! every token a middleware registered on its parent, so tearing the chain
//! down unsubscribes exactly those callbacks and releases the children they
//! captured.

use crate::callback::Callback;
use crate::channel::EmissionStream;
use crate::subject::{Observable, Subject, Subjectable};
use crate::types::{ReactiveResult, Token};
use crate::value::Emission;
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Wires a parent observable to a derived child subject
pub trait Middleware: Send + Sync {
    fn apply(&self, parent: &Upstream<'_>, child: &Subject) -> ReactiveResult<()>;
}

impl<F> Middleware for F
where
    F: Fn(&Upstream<'_>, &Subject) -> ReactiveResult<()> + Send + Sync,
{
    fn apply(&self, parent: &Upstream<'_>, child: &Subject) -> ReactiveResult<()> {
        self(parent, child)
    }
}

/// Boxes a closure as a middleware, fixing its higher-ranked signature
pub fn middleware<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&Upstream<'_>, &Subject) -> ReactiveResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Parent side handed to a middleware; records what it subscribes
pub struct Upstream<'a> {
    parent: &'a Subject,
    tokens: Mutex<Vec<Token>>,
}

impl<'a> Upstream<'a> {
    fn new(parent: &'a Subject) -> Self {
        Self {
            parent,
            tokens: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, token: Token) {
        self.tokens.lock().push(token);
    }

    fn into_tokens(self) -> Vec<Token> {
        self.tokens.into_inner()
    }
}

impl Observable for Upstream<'_> {
    fn subscribe_callback(&self, callback: Callback) -> ReactiveResult<Token> {
        let token = self.parent.subscribe_callback(callback)?;
        self.record(token);
        Ok(token)
    }

    fn unsubscribe(&self, token: Token) -> ReactiveResult<()> {
        self.parent.unsubscribe(token)?;
        self.tokens.lock().retain(|recorded| *recorded != token);
        Ok(())
    }

    fn as_channel(&self) -> EmissionStream {
        let stream = self.parent.as_channel();
        self.record(stream.token());
        stream
    }
}

impl std::fmt::Debug for Upstream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("parent", &self.parent.id())
            .field("tokens_count", &self.tokens.lock().len())
            .finish()
    }
}

/// One stage of a chain: the parent and what was registered on it
#[derive(Debug)]
struct Link {
    parent: Subject,
    tokens: Vec<Token>,
}

/// Owned chain of subjects built by [`Subject::pipe`].
///
/// Derefs to the tail subject. Dropping the pipeline (or calling
/// [`teardown`](Pipeline::teardown)) unsubscribes every registration the
/// middlewares made on their parents; [`into_subject`](Pipeline::into_subject)
/// keeps the wiring alive instead.
#[derive(Debug)]
#[must_use = "dropping a Pipeline tears down its middleware wiring"]
pub struct Pipeline {
    tail: Subject,
    links: Vec<Link>,
}

impl Pipeline {
    pub(crate) fn new(head: Subject) -> Self {
        Self {
            tail: head,
            links: Vec::new(),
        }
    }

    /// Extends the chain from its current tail
    pub fn pipe<I>(mut self, middlewares: I) -> ReactiveResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Option<Arc<dyn Middleware>>>,
    {
        for middleware in middlewares
            .into_iter()
            .filter_map(|entry| -> Option<Arc<dyn Middleware>> { entry.into() })
        {
            let child = self.tail.derive(self.links.len());
            let upstream = Upstream::new(&self.tail);
            // On error the links built so far are torn down by Drop
            let applied = middleware.apply(&upstream, &child);
            let tokens = upstream.into_tokens();
            self.links.push(Link {
                parent: self.tail.clone(),
                tokens,
            });
            applied?;

            debug!(parent = %self.tail.id(), child = %child.id(), stage = self.links.len(), "piped");
            self.tail = child;
        }
        Ok(self)
    }

    /// The last subject of the chain.
    ///
    /// A clone of it does not keep the chain alive: once the pipeline is
    /// dropped the clone stops receiving. Use
    /// [`into_subject`](Pipeline::into_subject) to keep the wiring.
    pub fn subject(&self) -> &Subject {
        &self.tail
    }

    /// Number of middleware stages
    pub fn stages(&self) -> usize {
        self.links.len()
    }

    /// Unsubscribes every registration the middlewares made, tail first
    pub fn teardown(&mut self) {
        while let Some(link) = self.links.pop() {
            for token in link.tokens {
                // Already gone if the parent was closed or the middleware
                // removed it itself
                let _ = link.parent.unsubscribe(token);
            }
            debug!(parent = %link.parent.id(), "pipe stage torn down");
        }
    }

    /// Detaches the chain, leaving its wiring in place
    pub fn into_subject(mut self) -> Subject {
        self.links.clear();
        self.tail.clone()
    }
}

impl Deref for Pipeline {
    type Target = Subject;

    fn deref(&self) -> &Subject {
        &self.tail
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Observable for Pipeline {
    fn subscribe_callback(&self, callback: Callback) -> ReactiveResult<Token> {
        self.tail.subscribe_callback(callback)
    }

    fn unsubscribe(&self, token: Token) -> ReactiveResult<()> {
        self.tail.unsubscribe(token)
    }

    fn as_channel(&self) -> EmissionStream {
        self.tail.as_channel()
    }
}

impl Subjectable for Pipeline {
    fn next(&self, values: Emission) {
        self.tail.next(values)
    }

    fn close(&self) {
        self.tail.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject_ext::ObservableExt;
    use crate::types::ReactiveError;
    use crate::value::Value;
    use crate::values;
    use crate::Variadic;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn forward_all() -> Arc<dyn Middleware> {
        middleware(|parent, child| {
            let child = child.clone();
            parent.subscribe(move |all: Variadic<Value>| child.next(all.into_inner()))?;
            Ok(())
        })
    }

    #[test]
    fn test_empty_pipe_returns_same_subject() {
        let subject = Subject::new();
        let pipeline = subject.pipe(Vec::<Arc<dyn Middleware>>::new()).unwrap();

        assert!(pipeline.ptr_eq(&subject));
        assert_eq!(pipeline.stages(), 0);
    }

    #[test]
    fn test_none_entries_skipped() {
        let subject = Subject::new();
        let pipeline = subject.pipe([None, Some(forward_all())]).unwrap();

        assert_eq!(pipeline.stages(), 1);
        assert!(!pipeline.ptr_eq(&subject));
    }

    #[test]
    fn test_upstream_records_tokens() {
        let subject = Subject::new();
        let pipeline = subject.pipe([forward_all(), forward_all()]).unwrap();

        assert_eq!(subject.len(), 1);
        assert_eq!(pipeline.links[0].tokens.len(), 1);
        assert_eq!(pipeline.links[1].tokens.len(), 1);
        assert!(pipeline.links[0].parent.ptr_eq(&subject));
        assert!(!pipeline.links[1].parent.ptr_eq(&subject));
    }

    #[test]
    fn test_teardown_unsubscribes_parents() {
        let subject = Subject::new();
        let mut pipeline = subject.pipe([forward_all()]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        pipeline
            .subscribe(move |_: i64| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        subject.next(values![1]);
        pipeline.teardown();
        subject.next(values![2]);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(subject.is_empty());
    }

    #[test]
    fn test_drop_tears_down() {
        let subject = Subject::new();
        drop(subject.pipe([forward_all(), forward_all()]).unwrap());
        assert!(subject.is_empty());
    }

    #[test]
    fn test_into_subject_keeps_wiring() {
        let subject = Subject::new();
        let tail = subject.pipe([forward_all()]).unwrap().into_subject();
        let mut stream = tail.as_channel();

        subject.next(values![7]);

        assert_eq!(stream.try_recv(), Ok(values![7]));
        assert_eq!(subject.len(), 1);
    }

    #[test]
    fn test_failing_middleware_unwinds_chain() {
        let subject = Subject::new();
        let failing = middleware(|parent, _child| {
            parent.subscribe(|| {})?;
            Err(ReactiveError::invalid_config("refused"))
        });

        let result = subject.pipe([forward_all(), failing]);

        assert!(result.is_err());
        assert!(subject.is_empty());
    }

    #[test]
    fn test_middleware_unsubscribe_is_forgotten() {
        let subject = Subject::new();
        let pipeline = subject
            .pipe([middleware(|parent, _child| {
                let token = parent.subscribe(|| {})?;
                parent.unsubscribe(token)
            })])
            .unwrap();

        assert!(pipeline.links[0].tokens.is_empty());
    }
}
