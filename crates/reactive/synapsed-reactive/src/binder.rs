//! Argument binding between an emission and a subscriber's signature
//!
//! Binding walks the declared parameters in order:
//! - a position with no emitted value rejects the subscriber;
//! - `Nil` is replaced by the zero value of the parameter type;
//! - any other value must be assignable to the parameter type;
//! - a variadic last parameter consumes every remaining value, each checked
//!   against the element type.
//!
//! Values beyond the last fixed parameter of a non-variadic signature are
//! ignored. A rejection is reported as a [`Mismatch`], which callers treat as
//! "skip this subscriber", never as an error.

use crate::callback::{Args, Signature};
use crate::value::{Value, ValueType};

/// Why an emission could not be bound to a signature
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Mismatch {
    #[error("no value emitted for parameter {position}")]
    MissingValue { position: usize },
    #[error("value at position {position} is {found}, expected {expected}")]
    TypeMismatch {
        position: usize,
        expected: ValueType,
        found: ValueType,
    },
    #[error("bound {bound} arguments for {arity} parameters")]
    ArityOverflow { bound: usize, arity: usize },
}

/// Binds `values` to `signature`, producing the arguments for one invocation
pub fn bind(signature: &Signature, values: &[Value]) -> Result<Args, Mismatch> {
    let arity = signature.arity();
    let mut fixed = Vec::with_capacity(arity);

    for (position, param) in signature.params().iter().enumerate() {
        if position == values.len() {
            return Err(Mismatch::MissingValue { position });
        }

        if signature.is_variadic() && position == arity - 1 {
            let rest = values[position..]
                .iter()
                .enumerate()
                .map(|(offset, value)| coerce(position + offset, value, param))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Args::variadic(fixed, rest));
        }

        fixed.push(coerce(position, &values[position], param)?);
    }

    if fixed.len() != arity {
        return Err(Mismatch::ArityOverflow {
            bound: fixed.len(),
            arity,
        });
    }
    Ok(Args::fixed(fixed))
}

fn coerce(position: usize, value: &Value, param: &ValueType) -> Result<Value, Mismatch> {
    if value.is_nil() {
        return Ok(param.zero());
    }
    if value.is_assignable_to(param) {
        return Ok(value.clone());
    }
    Err(Mismatch::TypeMismatch {
        position,
        expected: *param,
        // Only Nil lacks a type and it was handled above
        found: value.value_type().unwrap_or(ValueType::Any),
    })
}
