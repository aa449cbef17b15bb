//! Extension trait for Observable with generic methods
//! This pattern allows the core traits to remain object-safe

use crate::callback::IntoCallback;
use crate::subject::Observable;
use crate::types::{ReactiveResult, Token};

/// Extension trait providing typed subscription for any [`Observable`]
pub trait ObservableExt: Observable {
    /// Registers a typed closure (or a ready [`Callback`](crate::Callback)).
    ///
    /// ```
    /// use synapsed_reactive::{values, ObservableExt, Subject, Subjectable};
    ///
    /// let subject = Subject::new();
    /// subject.subscribe(|a: i64, b: String| println!("{a} {b}")).unwrap();
    /// subject.next(values![5, "hi"]);
    /// ```
    fn subscribe<M>(&self, callback: impl IntoCallback<M>) -> ReactiveResult<Token> {
        self.subscribe_callback(callback.into_callback())
    }
}

// Automatically implement extension traits
impl<T: Observable + ?Sized> ObservableExt for T {}
