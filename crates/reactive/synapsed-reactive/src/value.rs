//! Tagged values carried by emissions
//!
//! Every emitted value carries its own type tag. Subscribers declare the tags
//! they accept through a [`Signature`](crate::Signature) and the binder checks
//! assignability tag by tag instead of relying on dynamic typing.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Ordered tuple of values passed to a single `next` call
pub type Emission = Vec<Value>;

/// Builds an [`Emission`] from heterogeneous expressions.
///
/// ```
/// use synapsed_reactive::{values, Value};
///
/// let emission = values![5, "hi", Value::Nil];
/// assert_eq!(emission.len(), 3);
/// ```
#[macro_export]
macro_rules! values {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

type DebugFn = fn(&(dyn Any + Send + Sync), &mut fmt::Formatter<'_>) -> fmt::Result;
type EqFn = fn(&(dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;

/// Descriptor for a user-defined value type
#[derive(Clone, Copy)]
pub struct CustomType {
    id: TypeId,
    name: &'static str,
    zero: fn() -> Value,
    debug: DebugFn,
    eq: EqFn,
}

impl CustomType {
    pub fn of<T>() -> Self
    where
        T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            zero: zero_of::<T>,
            debug: debug_of::<T>,
            eq: eq_of::<T>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

fn zero_of<T>() -> Value
where
    T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    Value::custom(T::default())
}

fn debug_of<T: fmt::Debug + 'static>(
    value: &(dyn Any + Send + Sync),
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match value.downcast_ref::<T>() {
        Some(value) => value.fmt(f),
        None => f.write_str("<opaque>"),
    }
}

fn eq_of<T: PartialEq + 'static>(
    left: &(dyn Any + Send + Sync),
    right: &(dyn Any + Send + Sync),
) -> bool {
    match (left.downcast_ref::<T>(), right.downcast_ref::<T>()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CustomType {}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomType").field(&self.name).finish()
    }
}

/// Declared type of a callback parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Accepts every value; its zero value is [`Value::Nil`]
    Any,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Bytes,
    List,
    Custom(CustomType),
}

impl ValueType {
    pub fn custom<T>() -> Self
    where
        T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self::Custom(CustomType::of::<T>())
    }

    /// The value substituted for `Nil` at a parameter of this type
    pub fn zero(&self) -> Value {
        match self {
            ValueType::Any => Value::Nil,
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Uint => Value::Uint(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Str => Value::Str(String::new()),
            ValueType::Bytes => Value::Bytes(Vec::new()),
            ValueType::List => Value::List(Vec::new()),
            ValueType::Custom(custom) => (custom.zero)(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => f.write_str("any"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Int => f.write_str("int"),
            ValueType::Uint => f.write_str("uint"),
            ValueType::Float => f.write_str("float"),
            ValueType::Str => f.write_str("string"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::List => f.write_str("list"),
            ValueType::Custom(custom) => f.write_str(custom.name),
        }
    }
}

/// Shared payload of a user-defined type; compares by payload
#[derive(Clone)]
pub struct CustomValue {
    ty: CustomType,
    inner: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            ty: CustomType::of::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn custom_type(&self) -> CustomType {
        self.ty
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && (Arc::ptr_eq(&self.inner, &other.inner)
                || (self.ty.eq)(self.inner.as_ref(), other.inner.as_ref()))
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.ty.debug)(self.inner.as_ref(), f)
    }
}

/// A single emitted value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence marker: "use the parameter's zero value"
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Custom(CustomValue),
}

impl Value {
    pub fn custom<T>(value: T) -> Self
    where
        T: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        Value::Custom(CustomValue::new(value))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Runtime type tag, `None` for `Nil`
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Nil => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Uint(_) => Some(ValueType::Uint),
            Value::Float(_) => Some(ValueType::Float),
            Value::Str(_) => Some(ValueType::Str),
            Value::Bytes(_) => Some(ValueType::Bytes),
            Value::List(_) => Some(ValueType::List),
            Value::Custom(custom) => Some(ValueType::Custom(custom.ty)),
        }
    }

    /// Exact tag match, or any value at an `Any` parameter.
    ///
    /// `Nil` is never assignable; the binder replaces it with the zero value
    /// of the target type before checking.
    pub fn is_assignable_to(&self, ty: &ValueType) -> bool {
        match self.value_type() {
            None => false,
            Some(_) if *ty == ValueType::Any => true,
            Some(own) => own == *ty,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Custom(custom) => custom.downcast_ref::<T>(),
            _ => None,
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

impl_from_int!(Int as i64: i8, i16, i32, i64);
impl_from_int!(Uint as u64: u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<CustomValue> for Value {
    fn from(value: CustomValue) -> Self {
        Value::Custom(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}
