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

//! Evaluation context
//!
//! An [`EvaluationContext`] carries the default variable an expression
//! tree evaluates against, a named variable map, registered variable
//! resolvers, and the shared collaborator handles (type resolver, property
//! tester provider). Contexts chain: scoping nodes (`with`, `iterate`,
//! `resolve`, `adapt`) derive a child context with a rebound default
//! variable that borrows its parent, so a child can never outlive the
//! evaluation that created it.
//!
//! Variable lookup order is fixed and load-bearing: the local map, then
//! the well-known pseudo-variables, then (for [`resolve_variable`]
//! lookups) each registered resolver in registration order, then the
//! parent chain. Reordering silently changes which contributed resolver
//! wins on a name collision.
//!
//! [`resolve_variable`]: EvaluationContext::resolve_variable

use crate::error::{ExpressionError, Result};
use crate::testers::{EmptyTesterProvider, PropertyTesterProvider};
use crate::types::TypeResolver;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pseudo-variable resolving to the context's current default variable.
pub const DEFAULT_VARIABLE: &str = "defaultVariable";

/// Pseudo-variable resolving to the root ancestor's default variable.
pub const ROOT_VARIABLE: &str = "rootVariable";

/// A contributed variable resolver.
///
/// Resolvers are consulted by [`EvaluationContext::resolve_variable`] in
/// registration order. Returning `Ok(None)` means "this resolver does not
/// contribute the name" and lookup continues; an error aborts the lookup
/// and surfaces as [`ExpressionError::VariableNotResolved`] carrying the
/// resolver's own message.
pub trait VariableResolver: Send + Sync {
    /// Resolve `name` with the given arguments.
    fn resolve(&self, name: &str, args: &[Value]) -> Result<Option<Value>>;
}

/// Scoped evaluation state for one expression evaluation.
pub struct EvaluationContext<'a> {
    parent: Option<&'a EvaluationContext<'a>>,
    default_variable: Value,
    variables: FxHashMap<String, Value>,
    resolvers: Vec<Arc<dyn VariableResolver>>,
    type_resolver: Arc<TypeResolver>,
    testers: Arc<dyn PropertyTesterProvider>,
    allow_plugin_activation: Option<bool>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a root context with no adapters and no property testers.
    ///
    /// Pass [`Value::Undefined`] when there is no meaningful default
    /// variable.
    pub fn root(default_variable: Value) -> EvaluationContext<'static> {
        EvaluationContext::with_providers(
            default_variable,
            Arc::new(TypeResolver::default()),
            Arc::new(EmptyTesterProvider),
        )
    }

    /// Create a root context wired to the given collaborators.
    ///
    /// Deployments share one [`TypeResolver`] across contexts so the
    /// subtype cache keeps paying off.
    pub fn with_providers(
        default_variable: Value,
        type_resolver: Arc<TypeResolver>,
        testers: Arc<dyn PropertyTesterProvider>,
    ) -> EvaluationContext<'static> {
        EvaluationContext {
            parent: None,
            default_variable,
            variables: FxHashMap::default(),
            resolvers: Vec::new(),
            type_resolver,
            testers,
            allow_plugin_activation: None,
        }
    }

    /// Derive a child context with a new default variable.
    ///
    /// The child starts with an empty local variable map and no resolvers
    /// of its own; lookups that miss locally continue through the parent
    /// chain. Collaborator handles are inherited.
    pub fn new(parent: &'a EvaluationContext<'a>, default_variable: Value) -> Self {
        Self {
            parent: Some(parent),
            default_variable,
            variables: FxHashMap::default(),
            resolvers: Vec::new(),
            type_resolver: parent.type_resolver.clone(),
            testers: parent.testers.clone(),
            allow_plugin_activation: None,
        }
    }

    /// Attach variable resolvers, consulted in the given order.
    pub fn with_resolvers(mut self, resolvers: Vec<Arc<dyn VariableResolver>>) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// The default variable expressions evaluate against.
    pub fn default_variable(&self) -> &Value {
        &self.default_variable
    }

    /// Add or replace a named variable in the local map.
    ///
    /// Storing [`Value::Undefined`] is meaningful: the name is then
    /// defined with the explicit known-absent sentinel, which `with`
    /// treats as a value rather than a lookup failure.
    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Remove a variable from the local map, returning its value.
    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    /// Plain variable lookup: local map, pseudo-variables, parent chain.
    /// Registered resolvers are not consulted.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.pseudo_variable(name) {
            return Some(value);
        }
        self.parent.and_then(|parent| parent.get_variable(name))
    }

    /// Full variable resolution: local map, pseudo-variables, registered
    /// resolvers in registration order, then the parent chain.
    ///
    /// # Errors
    ///
    /// [`ExpressionError::VariableNotResolved`] when a consulted resolver
    /// fails; its message is preserved.
    pub fn resolve_variable(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        if let Some(value) = self.variables.get(name) {
            return Ok(Some(value.clone()));
        }
        if let Some(value) = self.pseudo_variable(name) {
            return Ok(Some(value));
        }
        for resolver in &self.resolvers {
            match resolver.resolve(name, args) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(error) => return Err(resolver_failure(name, error)),
            }
        }
        match self.parent {
            Some(parent) => parent.resolve_variable(name, args),
            None => Ok(None),
        }
    }

    /// Allow `test` expressions evaluated against this context (and its
    /// children) to activate dormant tester providers.
    pub fn set_allow_plugin_activation(&mut self, allow: bool) {
        self.allow_plugin_activation = Some(allow);
    }

    /// Whether tester provider activation is allowed here; unset contexts
    /// inherit from the parent chain and default to `false`.
    pub fn allow_plugin_activation(&self) -> bool {
        match self.allow_plugin_activation {
            Some(allow) => allow,
            None => self
                .parent
                .is_some_and(EvaluationContext::allow_plugin_activation),
        }
    }

    /// The shared type resolution facade.
    pub fn type_resolver(&self) -> &TypeResolver {
        &self.type_resolver
    }

    /// The shared property tester provider.
    pub fn testers(&self) -> &Arc<dyn PropertyTesterProvider> {
        &self.testers
    }

    fn pseudo_variable(&self, name: &str) -> Option<Value> {
        match name {
            DEFAULT_VARIABLE => Some(self.default_variable.clone()),
            ROOT_VARIABLE => Some(self.root_context().default_variable.clone()),
            _ => None,
        }
    }

    fn root_context(&self) -> &EvaluationContext<'a> {
        let mut current = self;
        while let Some(parent) = current.parent {
            current = parent;
        }
        current
    }
}

fn resolver_failure(name: &str, error: ExpressionError) -> ExpressionError {
    match error {
        already @ ExpressionError::VariableNotResolved { .. } => already,
        other => ExpressionError::VariableNotResolved {
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FixedResolver {
        name: &'static str,
        value: Value,
    }

    impl VariableResolver for FixedResolver {
        fn resolve(&self, name: &str, _args: &[Value]) -> Result<Option<Value>> {
            Ok((name == self.name).then(|| self.value.clone()))
        }
    }

    struct FailingResolver;

    impl VariableResolver for FailingResolver {
        fn resolve(&self, name: &str, _args: &[Value]) -> Result<Option<Value>> {
            Err(ExpressionError::VariableNotResolved {
                name: name.to_string(),
                message: "backend unavailable".to_string(),
            })
        }
    }

    #[test]
    fn local_map_shadows_resolvers_and_parent() {
        let mut parent = EvaluationContext::root(Value::Undefined);
        parent.add_variable("x", Value::from("parent"));
        let mut child = EvaluationContext::new(&parent, Value::Undefined);
        child.add_variable("x", Value::from("child"));
        assert_eq!(child.get_variable("x"), Some(Value::from("child")));
        child.remove_variable("x");
        assert_eq!(child.get_variable("x"), Some(Value::from("parent")));
    }

    #[test]
    fn resolvers_run_in_registration_order_before_parent() {
        let mut parent = EvaluationContext::root(Value::Undefined);
        parent.add_variable("x", Value::from("parent"));
        let child = EvaluationContext::new(&parent, Value::Undefined).with_resolvers(vec![
            Arc::new(FixedResolver {
                name: "x",
                value: Value::from("first"),
            }),
            Arc::new(FixedResolver {
                name: "x",
                value: Value::from("second"),
            }),
        ]);
        assert_eq!(
            child.resolve_variable("x", &[]).unwrap(),
            Some(Value::from("first"))
        );
        // plain lookup skips resolvers entirely
        assert_eq!(child.get_variable("x"), Some(Value::from("parent")));
    }

    #[test]
    fn resolver_failures_surface_with_their_message() {
        let context = EvaluationContext::root(Value::Undefined)
            .with_resolvers(vec![Arc::new(FailingResolver)]);
        let error = context.resolve_variable("x", &[]).unwrap_err();
        assert_eq!(
            error,
            ExpressionError::VariableNotResolved {
                name: "x".to_string(),
                message: "backend unavailable".to_string(),
            }
        );
    }

    #[test]
    fn pseudo_variables() {
        let root = EvaluationContext::root(Value::from("root-value"));
        let child = EvaluationContext::new(&root, Value::from("child-value"));
        assert_eq!(
            child.get_variable(DEFAULT_VARIABLE),
            Some(Value::from("child-value"))
        );
        assert_eq!(
            child.get_variable(ROOT_VARIABLE),
            Some(Value::from("root-value"))
        );
    }

    #[test]
    fn undefined_sentinel_is_a_present_value() {
        let mut context = EvaluationContext::root(Value::Undefined);
        assert_eq!(context.get_variable("x"), None);
        context.add_variable("x", Value::Undefined);
        assert_eq!(context.get_variable("x"), Some(Value::Undefined));
    }

    #[test]
    fn activation_flag_inherits_from_parent() {
        let mut root = EvaluationContext::root(Value::Undefined);
        assert!(!root.allow_plugin_activation());
        root.set_allow_plugin_activation(true);
        let child = EvaluationContext::new(&root, Value::Undefined);
        assert!(child.allow_plugin_activation());
        let mut opted_out = EvaluationContext::new(&root, Value::Undefined);
        opted_out.set_allow_plugin_activation(false);
        assert!(!opted_out.allow_plugin_activation());
    }
}
