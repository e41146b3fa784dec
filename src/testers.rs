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

//! Property tester boundary
//!
//! `test` expressions delegate to named property testers contributed by
//! the surrounding system. A tester's provider may not be active yet; in
//! that case a lookup reports [`TesterAvailability::NotLoaded`] and the
//! expression evaluates to
//! [`EvaluationResult::NotLoaded`](crate::EvaluationResult::NotLoaded)
//! unless activation is forced, which runs the provider's deferred
//! factory exactly once.

use crate::error::{ExpressionError, Result};
use crate::value::Value;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

/// A named property check contributed by the surrounding system.
pub trait PropertyTester: Send + Sync {
    /// Test `property` on `receiver` with the given arguments against an
    /// optional expected value.
    ///
    /// # Errors
    ///
    /// Implementations surface their own failures; the engine passes them
    /// through unchanged.
    fn test(
        &self,
        receiver: &Value,
        property: &str,
        args: &[Value],
        expected: Option<&Value>,
    ) -> Result<bool>;
}

/// Outcome of a tester lookup.
pub enum TesterAvailability {
    /// The tester is live and can be invoked.
    Ready(Arc<dyn PropertyTester>),
    /// The tester's provider is registered but not currently active, and
    /// activation was not forced.
    NotLoaded,
}

/// Registry of property testers keyed by namespace and property name.
pub trait PropertyTesterProvider: Send + Sync {
    /// Locate the tester contributing `namespace.property`, activating its
    /// provider when `force_activation` is set.
    ///
    /// # Errors
    ///
    /// [`ExpressionError::UnknownProperty`] when no registration covers
    /// the pair.
    fn lookup(
        &self,
        namespace: &str,
        property: &str,
        force_activation: bool,
    ) -> Result<TesterAvailability>;
}

/// A provider with no registered testers; every lookup fails with
/// [`ExpressionError::UnknownProperty`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTesterProvider;

impl PropertyTesterProvider for EmptyTesterProvider {
    fn lookup(
        &self,
        namespace: &str,
        property: &str,
        _force_activation: bool,
    ) -> Result<TesterAvailability> {
        Err(ExpressionError::UnknownProperty {
            namespace: namespace.to_string(),
            property: property.to_string(),
        })
    }
}

type TesterFactory = Box<dyn Fn() -> Arc<dyn PropertyTester> + Send + Sync>;

enum TesterState {
    Active(Arc<dyn PropertyTester>),
    Dormant(TesterFactory),
}

struct TesterDescriptor {
    namespace: String,
    properties: Vec<String>,
    state: RwLock<TesterState>,
}

impl TesterDescriptor {
    fn handles(&self, namespace: &str, property: &str) -> bool {
        self.namespace == namespace && self.properties.iter().any(|p| p == property)
    }
}

/// In-process [`PropertyTesterProvider`] modeling lazy provider
/// activation.
///
/// Live testers are registered with [`register`](Self::register); testers
/// whose provider should only spin up on demand are registered with
/// [`register_lazy`](Self::register_lazy) and stay dormant until a forced
/// lookup runs the factory. Activation is write-once: concurrent forced
/// lookups race on the descriptor lock and the losers reuse the winner's
/// tester.
#[derive(Default)]
pub struct StaticTesterRegistry {
    descriptors: Vec<TesterDescriptor>,
}

impl StaticTesterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live tester for `properties` under `namespace`.
    pub fn register(
        &mut self,
        namespace: impl Into<String>,
        properties: &[&str],
        tester: Arc<dyn PropertyTester>,
    ) {
        self.descriptors.push(TesterDescriptor {
            namespace: namespace.into(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            state: RwLock::new(TesterState::Active(tester)),
        });
    }

    /// Register a dormant tester whose provider activates on the first
    /// forced lookup.
    pub fn register_lazy(
        &mut self,
        namespace: impl Into<String>,
        properties: &[&str],
        factory: impl Fn() -> Arc<dyn PropertyTester> + Send + Sync + 'static,
    ) {
        self.descriptors.push(TesterDescriptor {
            namespace: namespace.into(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            state: RwLock::new(TesterState::Dormant(Box::new(factory))),
        });
    }
}

impl PropertyTesterProvider for StaticTesterRegistry {
    fn lookup(
        &self,
        namespace: &str,
        property: &str,
        force_activation: bool,
    ) -> Result<TesterAvailability> {
        let descriptor = self
            .descriptors
            .iter()
            .find(|d| d.handles(namespace, property))
            .ok_or_else(|| ExpressionError::UnknownProperty {
                namespace: namespace.to_string(),
                property: property.to_string(),
            })?;

        if let TesterState::Active(tester) = &*descriptor.state.read() {
            return Ok(TesterAvailability::Ready(tester.clone()));
        }
        if !force_activation {
            return Ok(TesterAvailability::NotLoaded);
        }

        let mut state = descriptor.state.write();
        let tester = match &*state {
            // another forced lookup won the race while we waited
            TesterState::Active(tester) => tester.clone(),
            TesterState::Dormant(factory) => {
                let tester = factory();
                debug!("activated property tester provider for {namespace}.{property}");
                *state = TesterState::Active(tester.clone());
                tester
            }
        };
        Ok(TesterAvailability::Ready(tester))
    }
}
