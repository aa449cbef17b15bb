//! Callbacks and their declared signatures
//!
//! A [`Callback`] pairs an invocable handler with the [`Signature`] it was
//! declared with. Typed closures become callbacks through [`IntoCallback`]:
//! every parameter must implement [`Param`], and a trailing [`Variadic<E>`]
//! parameter declares a variadic signature with element type `E`.

use crate::types::{ReactiveError, ReactiveResult};
use crate::value::{Emission, Value, ValueType};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Ordered parameter types plus a flag marking the last one as variadic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ValueType>,
    variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<ValueType>, variadic: bool) -> Self {
        Self { params, variadic }
    }

    /// Signature with a fixed number of parameters
    pub fn fixed(params: Vec<ValueType>) -> Self {
        Self::new(params, false)
    }

    /// Signature whose last entry is the element type of the variadic tail
    pub fn variadic(params: Vec<ValueType>) -> Self {
        Self::new(params, true)
    }

    /// `fn(...any)`: accepts every non-empty emission unchanged
    pub fn any() -> Self {
        Self::variadic(vec![ValueType::Any])
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Number of declared parameters, the variadic one included
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Element type of the variadic tail
    pub fn element_type(&self) -> Option<&ValueType> {
        if self.variadic {
            self.params.last()
        } else {
            None
        }
    }

    pub fn validate(&self) -> ReactiveResult<()> {
        if self.variadic && self.params.is_empty() {
            return Err(ReactiveError::invalid_callback(
                "variadic signature declares no parameters",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fn(")?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && index + 1 == self.params.len() {
                f.write_str("...")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// Arguments produced by the binder for one invocation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    fixed: Vec<Value>,
    rest: Option<Vec<Value>>,
}

impl Args {
    pub fn fixed(values: Vec<Value>) -> Self {
        Self {
            fixed: values,
            rest: None,
        }
    }

    pub fn variadic(fixed: Vec<Value>, rest: Vec<Value>) -> Self {
        Self {
            fixed,
            rest: Some(rest),
        }
    }

    /// Values bound to the non-variadic parameters
    pub fn positional(&self) -> &[Value] {
        &self.fixed
    }

    /// Values collected by the variadic parameter, if the signature has one
    pub fn rest(&self) -> Option<&[Value]> {
        self.rest.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fixed.len() + self.rest.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Vec<Value>, Option<Vec<Value>>) {
        (self.fixed, self.rest)
    }

    /// Flattens positional and variadic values back into one tuple
    pub fn into_emission(self) -> Emission {
        let mut emission = self.fixed;
        if let Some(rest) = self.rest {
            emission.extend(rest);
        }
        emission
    }
}

type Handler = dyn Fn(Args) + Send + Sync;

/// An invocable value together with its declared signature
#[derive(Clone)]
pub struct Callback {
    signature: Arc<Signature>,
    handler: Arc<Handler>,
    name: &'static str,
}

impl Callback {
    /// Creates a callback from a raw handler working on bound [`Args`]
    pub fn new<F>(signature: Signature, handler: F) -> Self
    where
        F: Fn(Args) + Send + Sync + 'static,
    {
        Self::from_parts(signature, std::any::type_name::<F>(), handler)
    }

    pub(crate) fn from_parts<F>(signature: Signature, name: &'static str, handler: F) -> Self
    where
        F: Fn(Args) + Send + Sync + 'static,
    {
        Self {
            signature: Arc::new(signature),
            handler: Arc::new(handler),
            name,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, args: Args) {
        (self.handler)(args)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// A Rust type usable as a typed callback parameter
pub trait Param: Sized + Send + 'static {
    fn value_type() -> ValueType;

    /// Extracts the parameter from a value the binder already checked
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_param {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Param for $ty {
                fn value_type() -> ValueType {
                    ValueType::$variant
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_param! {
    bool => Bool,
    i64 => Int,
    u64 => Uint,
    f64 => Float,
    String => Str,
    Vec<u8> => Bytes,
    Vec<Value> => List,
}

/// Untyped parameter: accepts any value, `Nil` included
impl Param for Value {
    fn value_type() -> ValueType {
        ValueType::Any
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

/// Typed parameter for user-defined values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Custom<T>(pub T);

impl<T> Custom<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Custom<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> Param for Custom<T>
where
    T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn value_type() -> ValueType {
        ValueType::custom::<T>()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.downcast_ref::<T>().cloned().map(Custom)
    }
}

/// Trailing parameter collecting zero or more values of type `E`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variadic<E>(pub Vec<E>);

impl<E> Variadic<E> {
    pub fn into_inner(self) -> Vec<E> {
        self.0
    }
}

impl<E> Deref for Variadic<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.0
    }
}

impl<E> IntoIterator for Variadic<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Conversion into a [`Callback`].
///
/// `M` is a marker that keeps the closure impls of different arities apart;
/// callers never name it.
pub trait IntoCallback<M>: Send + Sync + 'static {
    fn into_callback(self) -> Callback;
}

impl IntoCallback<Callback> for Callback {
    fn into_callback(self) -> Callback {
        self
    }
}

#[doc(hidden)]
pub struct VariadicMarker<M>(PhantomData<M>);

macro_rules! impl_into_callback {
    ($($param:ident $arg:ident),*) => {
        impl<F, R, $($param,)*> IntoCallback<fn($($param,)*) -> R> for F
        where
            F: Fn($($param),*) -> R + Send + Sync + 'static,
            $($param: Param,)*
            R: 'static,
        {
            #[allow(unused_mut, unused_variables)]
            fn into_callback(self) -> Callback {
                let signature = Signature::fixed(vec![$($param::value_type()),*]);
                Callback::from_parts(signature, std::any::type_name::<F>(), move |args: Args| {
                    let (fixed, _) = args.into_parts();
                    let mut fixed = fixed.into_iter();
                    $(
                        let Some($arg) = fixed.next().and_then($param::from_value) else {
                            return;
                        };
                    )*
                    let _ = (self)($($arg),*);
                })
            }
        }

        impl<F, R, $($param,)* E> IntoCallback<VariadicMarker<fn($($param,)* Variadic<E>) -> R>> for F
        where
            F: Fn($($param,)* Variadic<E>) -> R + Send + Sync + 'static,
            $($param: Param,)*
            E: Param,
            R: 'static,
        {
            #[allow(unused_mut, unused_variables)]
            fn into_callback(self) -> Callback {
                let signature = Signature::variadic(vec![$($param::value_type(),)* E::value_type()]);
                Callback::from_parts(signature, std::any::type_name::<F>(), move |args: Args| {
                    let (fixed, rest) = args.into_parts();
                    let mut fixed = fixed.into_iter();
                    $(
                        let Some($arg) = fixed.next().and_then($param::from_value) else {
                            return;
                        };
                    )*
                    let Some(rest) = rest
                        .unwrap_or_default()
                        .into_iter()
                        .map(E::from_value)
                        .collect::<Option<Vec<E>>>()
                    else {
                        return;
                    };
                    let _ = (self)($($arg,)* Variadic(rest));
                })
            }
        }
    };
}

impl_into_callback!();
impl_into_callback!(A a);
impl_into_callback!(A a, B b);
impl_into_callback!(A a, B b, C c);
impl_into_callback!(A a, B b, C c, D d);
impl_into_callback!(A a, B b, C c, D d, G g);
impl_into_callback!(A a, B b, C c, D d, G g, H h);
