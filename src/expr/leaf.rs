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

//! Leaf expression nodes
//!
//! Leaves answer directly from the evaluation context: literal equality,
//! process-wide properties, contributed property testers, and subtype
//! checks. None of them have children.

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::result::EvaluationResult;
use crate::testers::TesterAvailability;
use crate::value::Value;
use smallvec::SmallVec;

/// `equals`: value equality of the default variable against a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EqualsData {
    /// The literal the default variable is compared against.
    pub expected: Value,
}

impl EqualsData {
    /// Create an equality test against `expected`.
    pub fn new(expected: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        Ok((context.default_variable() == &self.expected).into())
    }
}

/// `systemTest`: compares a process-wide named property against an
/// expected string. An absent property is a definitive `False`, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemTestData {
    /// Name of the process-wide property.
    pub property: String,
    /// Expected property value.
    pub expected: String,
}

impl SystemTestData {
    /// Create a system property test.
    pub fn new(property: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            expected: expected.into(),
        }
    }

    pub(crate) fn evaluate(&self, _context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        match std::env::var(&self.property) {
            Ok(value) => Ok((value == self.expected).into()),
            Err(_) => Ok(EvaluationResult::False),
        }
    }
}

/// `test`: invokes a contributed property tester on the default variable.
///
/// When the tester's provider is not active the node evaluates to
/// `NotLoaded`, unless this node carries the force flag or the context
/// allows activation, in which case the provider is activated and the
/// test runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestData {
    /// Namespace the property lives in.
    pub namespace: String,
    /// Property name within the namespace.
    pub property: String,
    /// Arguments handed to the tester.
    pub args: SmallVec<[Value; 4]>,
    /// Expected value handed to the tester, when the definition carries
    /// one.
    pub expected: Option<Value>,
    /// Whether this node alone may activate a dormant tester provider.
    pub force_plugin_activation: bool,
}

impl TestData {
    /// Create a property test without forced activation.
    pub fn new(
        namespace: impl Into<String>,
        property: impl Into<String>,
        args: Vec<Value>,
        expected: Option<Value>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            property: property.into(),
            args: SmallVec::from_vec(args),
            expected,
            force_plugin_activation: false,
        }
    }

    /// Mark this node as allowed to activate its tester's provider.
    pub fn forcing_activation(mut self) -> Self {
        self.force_plugin_activation = true;
        self
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        let force = self.force_plugin_activation || context.allow_plugin_activation();
        match context
            .testers()
            .lookup(&self.namespace, &self.property, force)?
        {
            TesterAvailability::NotLoaded => Ok(EvaluationResult::NotLoaded),
            TesterAvailability::Ready(tester) => {
                let verdict = tester.test(
                    context.default_variable(),
                    &self.property,
                    &self.args,
                    self.expected.as_ref(),
                )?;
                Ok(verdict.into())
            }
        }
    }
}

/// `instanceof`: subtype check of the default variable against a
/// fully-qualified type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceofData {
    /// Fully-qualified target type name.
    pub type_name: String,
}

impl InstanceofData {
    /// Create a subtype check against `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub(crate) fn evaluate(&self, context: &EvaluationContext<'_>) -> Result<EvaluationResult> {
        Ok(context
            .type_resolver()
            .is_subtype_of(context.default_variable(), &self.type_name)
            .into())
    }
}
