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

//! Type resolution facade
//!
//! Subtype checks and adapter-based coercion sit behind [`TypeResolver`].
//! Subtype walks run per node per evaluation and are the measured hot path
//! of enablement evaluation, so results are memoized per
//! (concrete type name, target type name) pair in a concurrent map:
//! readers never block each other and a racy duplicate write of the same
//! boolean is harmless. The cache is unbounded; the set of concrete types
//! a deployment evaluates against is small and fixed.

use crate::value::{COLLECTION_TYPE, Value};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

/// External adapter lookup, the capability boundary behind
/// [`TypeResolver::adapt`].
///
/// Given a value and a target type name, an implementation returns the
/// coerced value or `None`; `None` is a valid negative answer, not an
/// error.
pub trait AdapterProvider: Send + Sync {
    /// Attempt to coerce `value` into the named target type.
    fn adapt(&self, value: &Value, type_name: &str) -> Option<Value>;
}

/// An [`AdapterProvider`] with no registered adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyAdapterProvider;

impl AdapterProvider for EmptyAdapterProvider {
    fn adapt(&self, _value: &Value, _type_name: &str) -> Option<Value> {
        None
    }
}

/// Cached subtype and adapter queries over runtime values.
///
/// One resolver instance is shared by every context of a deployment;
/// expression trees hold no reference to it and stay freely shareable.
pub struct TypeResolver {
    adapters: Arc<dyn AdapterProvider>,
    subtype_cache: DashMap<(String, String), bool, FxBuildHasher>,
}

impl TypeResolver {
    /// Create a resolver delegating adapter lookups to `adapters`.
    pub fn new(adapters: Arc<dyn AdapterProvider>) -> Self {
        Self {
            adapters,
            subtype_cache: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Whether `value`'s runtime type, or any type in its supertype and
    /// interface closure, carries the fully-qualified name `type_name`.
    ///
    /// Primitive values match their built-in type name only; lists match
    /// [`COLLECTION_TYPE`]; the undefined sentinel matches nothing.
    pub fn is_subtype_of(&self, value: &Value, type_name: &str) -> bool {
        if value.is_undefined() {
            return false;
        }
        let concrete = value.type_name();
        if concrete == type_name {
            return true;
        }
        let Value::Object(object) = value else {
            return false;
        };
        let key = (concrete.to_string(), type_name.to_string());
        if let Some(cached) = self.subtype_cache.get(&key) {
            return *cached;
        }
        let result = object
            .supertype_names()
            .iter()
            .any(|name| name == type_name);
        // A lost write race stores the same boolean again; last write wins.
        self.subtype_cache.insert(key, result);
        result
    }

    /// Coerce `value` into the named target type.
    ///
    /// A direct type match wins, then the registered adapter provider is
    /// consulted, then the value's own adapter capability gets a second
    /// chance. `None` means "not adaptable", a valid negative answer.
    pub fn adapt(&self, value: &Value, type_name: &str) -> Option<Value> {
        if value.is_undefined() {
            return None;
        }
        if self.is_subtype_of(value, type_name) {
            return Some(value.clone());
        }
        if let Some(adapted) = self.adapters.adapt(value, type_name) {
            return Some(adapted);
        }
        if let Value::Object(object) = value {
            if let Some(adapted) = object.get_adapter(type_name) {
                return Some(adapted);
            }
        }
        None
    }

    /// View `value` as a collection: a list directly, anything else
    /// through an adaptation to [`COLLECTION_TYPE`].
    pub fn as_collection(&self, value: &Value) -> Option<Vec<Value>> {
        match value {
            Value::List(items) => Some(items.clone()),
            _ => match self.adapt(value, COLLECTION_TYPE)? {
                Value::List(items) => Some(items),
                _ => None,
            },
        }
    }

    /// Size of the collection view of `value` without materializing the
    /// elements: a list directly, anything else through an adaptation to
    /// [`COLLECTION_TYPE`].
    pub fn collection_size(&self, value: &Value) -> Option<usize> {
        match value {
            Value::List(items) => Some(items.len()),
            _ => match self.adapt(value, COLLECTION_TYPE)? {
                Value::List(items) => Some(items.len()),
                _ => None,
            },
        }
    }

    /// Number of memoized subtype pairs, exposed for diagnostics.
    pub fn cached_pairs(&self) -> usize {
        self.subtype_cache.len()
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(Arc::new(EmptyAdapterProvider))
    }
}

impl std::fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeResolver")
            .field("cached_pairs", &self.subtype_cache.len())
            .finish()
    }
}
