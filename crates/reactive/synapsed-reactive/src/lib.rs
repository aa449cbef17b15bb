//! # Synapsed Reactive
//!
//! In-process subjects broadcasting tuples of tagged values to callbacks of
//! arbitrary arity.
//!
//! Each subscriber declares a [`Signature`]; on every [`Subjectable::next`]
//! the emitted tuple is bound against it and the subscriber is invoked only
//! when the values fit. Subscribers that do not fit are skipped silently, so
//! one subject can serve a heterogeneous pool of callbacks.
//!
//! ## Key Components
//!
//! - **Subject**: owns the subscription registry and broadcasts emissions
//! - **Callback**: invocable value plus its declared signature
//! - **Binder**: matches an emission against a signature, variadic tails included
//! - **EmissionStream**: channel adapter exposing emissions as a `Stream`
//! - **Pipeline**: chain of derived subjects wired by middlewares
//!
//! ```
//! use synapsed_reactive::{values, ObservableExt, Subject, Subjectable, Variadic};
//!
//! let subject = Subject::new();
//! subject.subscribe(|prefix: String, nums: Variadic<i64>| {
//!     assert_eq!(prefix, "x");
//!     assert_eq!(nums.into_inner(), vec![1, 2, 3]);
//! }).unwrap();
//! subject.subscribe(|_flag: bool| unreachable!()).unwrap();
//!
//! subject.next(values!["x", 1, 2, 3]);
//! ```

pub mod binder;
pub mod callback;
pub mod channel;
pub mod config;
pub mod pipe;
pub mod registry;
pub mod subject;
pub mod subject_ext;
pub mod types;
pub mod value;

// Re-export main interfaces
pub use binder::{bind, Mismatch};
pub use callback::{Args, Callback, Custom, IntoCallback, Param, Signature, Variadic};
pub use channel::{EmissionStream, TryRecvError};
pub use config::{ChannelPolicy, SubjectConfig};
pub use pipe::{middleware, Middleware, Pipeline, Upstream};
pub use registry::Registry;
pub use subject::{Observable, Subject, Subjectable};
pub use subject_ext::ObservableExt;
pub use types::{Id, ReactiveError, ReactiveResult, Token};
pub use value::{CustomType, CustomValue, Emission, Value, ValueType};
