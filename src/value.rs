// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime value model
//!
//! Expressions evaluate against [`Value`]s: literal primitives produced by
//! the argument codec, collections, and host objects contributed through
//! the [`TypedValue`] trait. The explicit [`Value::Undefined`] sentinel is
//! a definite known-absent value and is distinct from a variable that is
//! not present at all.

use rust_decimal::Decimal;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Built-in type name of boolean values.
pub const BOOLEAN_TYPE: &str = "Boolean";
/// Built-in type name of integer values.
pub const INTEGER_TYPE: &str = "Integer";
/// Built-in type name of decimal values.
pub const DECIMAL_TYPE: &str = "Decimal";
/// Built-in type name of string values.
pub const STRING_TYPE: &str = "String";
/// Built-in type name of list values; also the target type name used when
/// adapting a non-list value into something a quantifier can iterate.
pub const COLLECTION_TYPE: &str = "Collection";
/// Built-in type name of the undefined sentinel.
pub const UNDEFINED_TYPE: &str = "Undefined";

/// Host object contributed to the engine by the surrounding system.
///
/// Implementations carry their fully-qualified runtime type name and the
/// closure of supertype/interface names, which drive `instanceof` checks.
/// A value may additionally expose its own adapter capability, consulted
/// as a second chance after the registered adapter provider gives up.
pub trait TypedValue: fmt::Debug + Send + Sync {
    /// Fully-qualified name of the concrete runtime type.
    fn type_name(&self) -> &str;

    /// Fully-qualified names of every supertype and interface the concrete
    /// type satisfies, excluding [`type_name`](Self::type_name) itself.
    fn supertype_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Value equality against another host object.
    fn object_eq(&self, other: &dyn TypedValue) -> bool;

    /// Downcast support for [`object_eq`](Self::object_eq) implementations.
    fn as_any(&self) -> &dyn Any;

    /// Second-chance adapter lookup exposed by the value itself.
    fn get_adapter(&self, type_name: &str) -> Option<Value> {
        let _ = type_name;
        None
    }
}

/// A typed runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit known-absent sentinel. Composite nodes treat this as a
    /// definite value, never as a lookup failure.
    Undefined,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Decimal value; `rust_decimal` keeps literal equality and hashing
    /// exact, which the tree equality contract depends on.
    Decimal(Decimal),
    /// String value.
    String(Arc<str>),
    /// Ordered collection of values.
    List(Vec<Value>),
    /// Host object with a runtime type.
    Object(Arc<dyn TypedValue>),
}

impl Value {
    /// Runtime type name of this value; for objects, the concrete
    /// fully-qualified name the host declared.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Undefined => UNDEFINED_TYPE,
            Value::Boolean(_) => BOOLEAN_TYPE,
            Value::Integer(_) => INTEGER_TYPE,
            Value::Decimal(_) => DECIMAL_TYPE,
            Value::String(_) => STRING_TYPE,
            Value::List(_) => COLLECTION_TYPE,
            Value::Object(object) => object.type_name(),
        }
    }

    /// Whether this value is the [`Value::Undefined`] sentinel.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Borrow the elements when this value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Wrap a host object.
    pub fn object(object: impl TypedValue + 'static) -> Value {
        Value::Object(Arc::new(object))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.object_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            // Objects hash by type name only; equal objects share a type,
            // so the Eq/Hash contract holds.
            Value::Object(object) => object.type_name().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Named(&'static str);

    impl TypedValue for Named {
        fn type_name(&self) -> &str {
            "tests.Named"
        }

        fn object_eq(&self, other: &dyn TypedValue) -> bool {
            other
                .as_any()
                .downcast_ref::<Named>()
                .is_some_and(|named| named.0 == self.0)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn primitive_equality() {
        assert_eq!(Value::from("one"), Value::from("one"));
        assert_ne!(Value::from("one"), Value::from(1i64));
        assert_eq!(Value::Undefined, Value::Undefined);
        assert_ne!(Value::Undefined, Value::from(false));
    }

    #[test]
    fn object_equality_uses_object_eq() {
        assert_eq!(Value::object(Named("a")), Value::object(Named("a")));
        assert_ne!(Value::object(Named("a")), Value::object(Named("b")));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::from(true).type_name(), BOOLEAN_TYPE);
        assert_eq!(Value::List(Vec::new()).type_name(), COLLECTION_TYPE);
        assert_eq!(Value::object(Named("a")).type_name(), "tests.Named");
    }
}
