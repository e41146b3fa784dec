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

//! Composite and control expression nodes
//!
//! Composites combine child results left to right with short-circuiting;
//! control nodes (`count`, `iterate`, `with`, `resolve`, `adapt`,
//! `enablement`) rebind or reinterpret the default variable before their
//! children run. Scoping nodes derive a borrowed child context, so the
//! parent context is never mutated.

use crate::context::EvaluationContext;
use crate::error::{ExpressionError, Result};
use crate::expr::Expression;
use crate::result::EvaluationResult;
use crate::value::Value;
use log::debug;
use smallvec::SmallVec;
use std::str::FromStr;
use std::time::Instant;

/// Evaluate `children` as a conjunction: left to right, `False` short
/// circuits, an empty list is `True`, and a `NotLoaded` child keeps the
/// running result unknown without stopping the walk (a later definitive
/// `False` still wins).
pub(crate) fn evaluate_and(
    children: &[Expression],
    context: &EvaluationContext<'_>,
) -> Result<EvaluationResult> {
    let mut result = EvaluationResult::True;
    for child in children {
        result = result.and(child.evaluate(context)?);
        if result == EvaluationResult::False {
            break;
        }
    }
    Ok(result)
}

/// Evaluate `children` as a disjunction: left to right, `True` short
/// circuits, an empty list is `False`; `NotLoaded` propagates as in
/// [`evaluate_and`].
pub(crate) fn evaluate_or(
    children: &[Expression],
    context: &EvaluationContext<'_>,
) -> Result<EvaluationResult> {
    let mut result = EvaluationResult::False;
    for child in children {
        result = result.or(child.evaluate(context)?);
        if result == EvaluationResult::True {
            break;
        }
    }
    Ok(result)
}

/// Child list of an `and`/`or` composite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompositeData {
    /// Child expressions, evaluated in order.
    pub children: Vec<Expression>,
}

impl CompositeData {
    /// Create a composite over `children`.
    pub fn new(children: Vec<Expression>) -> Self {
        Self { children }
    }

    /// Append a child expression.
    pub fn add(&mut self, child: Expression) {
        self.children.push(child);
    }
}

/// Size predicate of a `count` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountQuantifier {
    /// `*`: any size.
    Any,
    /// `!`: exactly zero elements.
    Empty,
    /// `?`: zero or one element.
    AtMostOne,
    /// `+`: at least one element.
    AtLeastOne,
    /// A literal non-negative integer: exact size match.
    Exact(usize),
}

impl CountQuantifier {
    /// Whether a collection of `size` elements satisfies this quantifier.
    pub fn matches(self, size: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Empty => size == 0,
            Self::AtMostOne => size <= 1,
            Self::AtLeastOne => size >= 1,
            Self::Exact(expected) => size == expected,
        }
    }
}

impl FromStr for CountQuantifier {
    type Err = ExpressionError;

    fn from_str(spec: &str) -> Result<Self> {
        match spec {
            "*" => Ok(Self::Any),
            "!" => Ok(Self::Empty),
            "?" => Ok(Self::AtMostOne),
            "+" => Ok(Self::AtLeastOne),
            _ => spec
                .parse::<usize>()
                .map(Self::Exact)
                .map_err(|_| ExpressionError::InvalidQuantifier {
                    spec: spec.to_string(),
                }),
        }
    }
}

/// `count`: matches the size of the default variable's collection view
/// against a quantifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountData {
    /// The size predicate.
    pub quantifier: CountQuantifier,
}

impl CountData {
    /// Create a count node from a raw quantifier specification; a missing
    /// specification means any size.
    ///
    /// # Errors
    ///
    /// [`ExpressionError::InvalidQuantifier`] on an unrecognized
    /// specification.
    pub fn new(spec: Option<&str>) -> Result<Self> {
        let quantifier = match spec {
            None => CountQuantifier::Any,
            Some(spec) => spec.parse()?,
        };
        Ok(Self { quantifier })
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let size = context
            .type_resolver()
            .collection_size(context.default_variable())
            .ok_or_else(|| not_a_collection(context.default_variable()))?;
        Ok(self.quantifier.matches(size).into())
    }
}

/// Combination operator of an `iterate` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterateOperator {
    /// Every element must pass.
    And,
    /// Some element must pass.
    Or,
}

impl FromStr for IterateOperator {
    type Err = ExpressionError;

    fn from_str(operator: &str) -> Result<Self> {
        match operator {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(ExpressionError::malformed(format!(
                "iterate operator must be \"and\" or \"or\", got {operator:?}"
            ))),
        }
    }
}

/// `iterate`: evaluates the children once per element of the default
/// variable's collection view, with the default variable rebound to the
/// element.
///
/// The children of one element always combine as a conjunction; the
/// operator combines the per-element answers across the collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IterateData {
    /// How per-element results combine across the collection.
    pub operator: IterateOperator,
    /// Explicit result for an empty collection; `None` falls back to the
    /// operator's identity (`True` for and, `False` for or).
    pub if_empty: Option<bool>,
    /// Child expressions evaluated per element.
    pub children: Vec<Expression>,
}

impl IterateData {
    /// Create an iterate node.
    pub fn new(operator: IterateOperator, if_empty: Option<bool>, children: Vec<Expression>) -> Self {
        Self {
            operator,
            if_empty,
            children,
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let items = context
            .type_resolver()
            .as_collection(context.default_variable())
            .ok_or_else(|| not_a_collection(context.default_variable()))?;

        if items.is_empty() {
            return Ok(match self.if_empty {
                Some(explicit) => explicit.into(),
                None => match self.operator {
                    IterateOperator::And => EvaluationResult::True,
                    IterateOperator::Or => EvaluationResult::False,
                },
            });
        }

        let mut result = match self.operator {
            IterateOperator::And => EvaluationResult::True,
            IterateOperator::Or => EvaluationResult::False,
        };
        for item in items {
            let scope = EvaluationContext::new(context, item);
            let element = evaluate_and(&self.children, &scope)?;
            match self.operator {
                IterateOperator::And => {
                    result = result.and(element);
                    if result == EvaluationResult::False {
                        return Ok(result);
                    }
                }
                IterateOperator::Or => {
                    result = result.or(element);
                    if result == EvaluationResult::True {
                        return Ok(result);
                    }
                }
            }
        }
        Ok(result)
    }
}

/// `with`: rebinds the default variable to a named variable's value for
/// the children.
///
/// A name that cannot be found at all is
/// [`ExpressionError::VariableNotDefined`]; a name bound to the explicit
/// [`Value::Undefined`] sentinel is a definite value and the children
/// still run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WithData {
    /// Name of the variable to rebind to.
    pub variable: String,
    /// Child expressions, combined as a conjunction.
    pub children: Vec<Expression>,
}

impl WithData {
    /// Create a with node.
    pub fn new(variable: impl Into<String>, children: Vec<Expression>) -> Self {
        Self {
            variable: variable.into(),
            children,
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let value = context.get_variable(&self.variable).ok_or_else(|| {
            ExpressionError::VariableNotDefined {
                name: self.variable.clone(),
            }
        })?;
        let scope = EvaluationContext::new(context, value);
        evaluate_and(&self.children, &scope)
    }
}

/// `resolve`: like [`WithData`], but resolution additionally runs the
/// registered resolver chain with the given arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveData {
    /// Name of the variable to resolve.
    pub variable: String,
    /// Arguments handed to the resolver chain.
    pub args: SmallVec<[Value; 4]>,
    /// Child expressions, combined as a conjunction.
    pub children: Vec<Expression>,
}

impl ResolveData {
    /// Create a resolve node.
    pub fn new(variable: impl Into<String>, args: Vec<Value>, children: Vec<Expression>) -> Self {
        Self {
            variable: variable.into(),
            args: SmallVec::from_vec(args),
            children,
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let value = context
            .resolve_variable(&self.variable, &self.args)?
            .ok_or_else(|| ExpressionError::VariableNotDefined {
                name: self.variable.clone(),
            })?;
        let scope = EvaluationContext::new(context, value);
        evaluate_and(&self.children, &scope)
    }
}

/// `adapt`: coerces the default variable to a target type for the
/// children. A failed adaptation is a definitive `False`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdaptData {
    /// Fully-qualified target type name.
    pub type_name: String,
    /// Child expressions, combined as a conjunction against the adapted
    /// value.
    pub children: Vec<Expression>,
}

impl AdaptData {
    /// Create an adapt node.
    pub fn new(type_name: impl Into<String>, children: Vec<Expression>) -> Self {
        Self {
            type_name: type_name.into(),
            children,
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        match context
            .type_resolver()
            .adapt(context.default_variable(), &self.type_name)
        {
            None => Ok(EvaluationResult::False),
            Some(adapted) => {
                let scope = EvaluationContext::new(context, adapted);
                evaluate_and(&self.children, &scope)
            }
        }
    }
}

/// `enablement`: the root node of a declarative enablement definition.
///
/// Children combine as a conjunction. When the definition carries the
/// force flag, child evaluation runs in a derived context that allows
/// tester provider activation, so a `test` child activates its provider
/// and answers instead of reporting `NotLoaded`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnablementData {
    /// Identifier of the owning declarative definition, used in trace
    /// output.
    pub source: Option<String>,
    /// Whether child evaluation may activate dormant tester providers.
    pub force_plugin_activation: bool,
    /// Child expressions, combined as a conjunction.
    pub children: Vec<Expression>,
}

impl EnablementData {
    /// Create an enablement node.
    pub fn new(
        source: Option<String>,
        force_plugin_activation: bool,
        children: Vec<Expression>,
    ) -> Self {
        Self {
            source,
            force_plugin_activation,
            children,
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let started = Instant::now();
        let result = if self.force_plugin_activation && !context.allow_plugin_activation() {
            let mut scope = EvaluationContext::new(context, context.default_variable().clone());
            scope.set_allow_plugin_activation(true);
            evaluate_and(&self.children, &scope)
        } else {
            evaluate_and(&self.children, context)
        }?;
        debug!(
            "enablement {} evaluated to {result} in {:?}",
            self.source.as_deref().unwrap_or("<anonymous>"),
            started.elapsed()
        );
        Ok(result)
    }
}

fn not_a_collection(value: &Value) -> ExpressionError {
    ExpressionError::VariableIsNotACollection {
        actual: value.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quantifier_parsing() {
        assert_eq!(
            "*".parse::<CountQuantifier>().unwrap(),
            CountQuantifier::Any
        );
        assert_eq!(
            "!".parse::<CountQuantifier>().unwrap(),
            CountQuantifier::Empty
        );
        assert_eq!(
            "?".parse::<CountQuantifier>().unwrap(),
            CountQuantifier::AtMostOne
        );
        assert_eq!(
            "+".parse::<CountQuantifier>().unwrap(),
            CountQuantifier::AtLeastOne
        );
        assert_eq!(
            "3".parse::<CountQuantifier>().unwrap(),
            CountQuantifier::Exact(3)
        );
        assert!("-1".parse::<CountQuantifier>().is_err());
        assert!("many".parse::<CountQuantifier>().is_err());
    }

    #[test]
    fn quantifier_predicates() {
        for size in 0..4 {
            assert!(CountQuantifier::Any.matches(size));
            assert_eq!(CountQuantifier::Empty.matches(size), size == 0);
            assert_eq!(CountQuantifier::AtMostOne.matches(size), size <= 1);
            assert_eq!(CountQuantifier::AtLeastOne.matches(size), size >= 1);
            assert_eq!(CountQuantifier::Exact(2).matches(size), size == 2);
        }
    }

    #[test]
    fn iterate_operator_parsing() {
        assert_eq!(
            "and".parse::<IterateOperator>().unwrap(),
            IterateOperator::And
        );
        assert_eq!(
            "or".parse::<IterateOperator>().unwrap(),
            IterateOperator::Or
        );
        assert!("xor".parse::<IterateOperator>().is_err());
    }
}
