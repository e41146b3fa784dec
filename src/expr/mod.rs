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

//! Expression tree
//!
//! [`Expression`] is a closed sum over every node kind the declarative
//! format knows. Trees are immutable after construction and carry no
//! evaluation state, so one tree can be evaluated concurrently against
//! many contexts. Equality and hashing derive purely from the node kind,
//! its constructor arguments, and its children, never from identity or
//! evaluation history. That makes independently built trees usable
//! interchangeably as cache keys.

mod composite;
mod leaf;

pub use composite::{
    AdaptData, CompositeData, CountData, CountQuantifier, EnablementData, IterateData,
    IterateOperator, ResolveData, WithData,
};
pub use leaf::{EqualsData, InstanceofData, SystemTestData, TestData};

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::result::EvaluationResult;
use crate::value::Value;
use composite::{evaluate_and, evaluate_or};

/// A node of a declarative boolean expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// A fixed result, independent of the context.
    Constant(EvaluationResult),
    /// Literal equality against the default variable.
    Equals(EqualsData),
    /// Process-wide property comparison.
    SystemTest(SystemTestData),
    /// Contributed property tester invocation.
    Test(Box<TestData>),
    /// Subtype check on the default variable.
    Instanceof(InstanceofData),
    /// Conjunction of children.
    And(CompositeData),
    /// Disjunction of children.
    Or(CompositeData),
    /// Negation of a single child.
    Not(Box<Expression>),
    /// Collection size predicate on the default variable.
    Count(CountData),
    /// Per-element evaluation over the default variable's collection
    /// view.
    Iterate(Box<IterateData>),
    /// Default-variable rebinding to a named variable.
    With(Box<WithData>),
    /// Default-variable rebinding through the resolver chain.
    Resolve(Box<ResolveData>),
    /// Default-variable coercion to a target type.
    Adapt(Box<AdaptData>),
    /// Root of a declarative enablement definition.
    Enablement(Box<EnablementData>),
}

impl Expression {
    /// The expression that always evaluates to `True`.
    pub const TRUE: Expression = Expression::Constant(EvaluationResult::True);

    /// The expression that always evaluates to `False`.
    pub const FALSE: Expression = Expression::Constant(EvaluationResult::False);

    /// Evaluate this tree against `context`.
    ///
    /// Evaluation never mutates the tree; the only shared mutable state it
    /// touches is the context's subtype-check cache, which is safe under
    /// concurrency.
    ///
    /// # Errors
    ///
    /// Structural failures only: unresolvable variables, non-collection
    /// quantifier targets, unknown tester properties, resolver failures.
    /// Negative answers and inactive providers are regular results.
    pub fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        match self {
            Expression::Constant(result) => Ok(*result),
            Expression::Equals(data) => data.evaluate(context),
            Expression::SystemTest(data) => data.evaluate(context),
            Expression::Test(data) => data.evaluate(context),
            Expression::Instanceof(data) => data.evaluate(context),
            Expression::And(data) => evaluate_and(&data.children, context),
            Expression::Or(data) => evaluate_or(&data.children, context),
            Expression::Not(child) => Ok(child.evaluate(context)?.not()),
            Expression::Count(data) => data.evaluate(context),
            Expression::Iterate(data) => data.evaluate(context),
            Expression::With(data) => data.evaluate(context),
            Expression::Resolve(data) => data.evaluate(context),
            Expression::Adapt(data) => data.evaluate(context),
            Expression::Enablement(data) => data.evaluate(context),
        }
    }

    /// Conjunction over `children`.
    pub fn and(children: Vec<Expression>) -> Expression {
        Expression::And(CompositeData::new(children))
    }

    /// Disjunction over `children`.
    pub fn or(children: Vec<Expression>) -> Expression {
        Expression::Or(CompositeData::new(children))
    }

    /// Negation of `child`.
    pub fn not(child: Expression) -> Expression {
        Expression::Not(Box::new(child))
    }

    /// Literal equality against the default variable.
    pub fn equals(expected: impl Into<Value>) -> Expression {
        Expression::Equals(EqualsData::new(expected))
    }

    /// Process-wide property comparison.
    pub fn system_test(property: impl Into<String>, expected: impl Into<String>) -> Expression {
        Expression::SystemTest(SystemTestData::new(property, expected))
    }

    /// Property tester invocation without forced activation.
    pub fn test(
        namespace: impl Into<String>,
        property: impl Into<String>,
        args: Vec<Value>,
        expected: Option<Value>,
    ) -> Expression {
        Expression::Test(Box::new(TestData::new(namespace, property, args, expected)))
    }

    /// Subtype check against a fully-qualified type name.
    pub fn instance_of(type_name: impl Into<String>) -> Expression {
        Expression::Instanceof(InstanceofData::new(type_name))
    }

    /// Collection size predicate from a raw quantifier specification.
    ///
    /// # Errors
    ///
    /// [`ExpressionError::InvalidQuantifier`](crate::ExpressionError::InvalidQuantifier)
    /// on an unrecognized specification.
    pub fn count(spec: Option<&str>) -> Result<Expression> {
        Ok(Expression::Count(CountData::new(spec)?))
    }

    /// Per-element evaluation over the default variable's collection view.
    pub fn iterate(
        operator: IterateOperator,
        if_empty: Option<bool>,
        children: Vec<Expression>,
    ) -> Expression {
        Expression::Iterate(Box::new(IterateData::new(operator, if_empty, children)))
    }

    /// Default-variable rebinding to a named variable.
    pub fn with_variable(variable: impl Into<String>, children: Vec<Expression>) -> Expression {
        Expression::With(Box::new(WithData::new(variable, children)))
    }

    /// Default-variable rebinding through the resolver chain.
    pub fn resolve(
        variable: impl Into<String>,
        args: Vec<Value>,
        children: Vec<Expression>,
    ) -> Expression {
        Expression::Resolve(Box::new(ResolveData::new(variable, args, children)))
    }

    /// Default-variable coercion to a target type.
    pub fn adapt(type_name: impl Into<String>, children: Vec<Expression>) -> Expression {
        Expression::Adapt(Box::new(AdaptData::new(type_name, children)))
    }

    /// Root of a declarative enablement definition.
    pub fn enablement(
        source: Option<String>,
        force_plugin_activation: bool,
        children: Vec<Expression>,
    ) -> Expression {
        Expression::Enablement(Box::new(EnablementData::new(
            source,
            force_plugin_activation,
            children,
        )))
    }
}

impl From<TestData> for Expression {
    fn from(data: TestData) -> Self {
        Expression::Test(Box::new(data))
    }
}

impl From<EqualsData> for Expression {
    fn from(data: EqualsData) -> Self {
        Expression::Equals(data)
    }
}

impl From<IterateData> for Expression {
    fn from(data: IterateData) -> Self {
        Expression::Iterate(Box::new(data))
    }
}
