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

//! Error types for expression construction and evaluation
//!
//! Errors cover structurally invalid input only: bad literal quoting, a
//! non-collection value handed to a quantifier, or an unresolvable
//! variable. A negative answer from a type test or adapter lookup is a
//! regular `False` result, and an inactive tester provider is the
//! `NotLoaded` result; neither is an error.

use thiserror::Error;

/// Result type alias for expression operations.
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Errors raised while building or evaluating expression trees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// Bad quoting or escaping in a literal argument string.
    #[error("malformed argument: {detail}")]
    MalformedArgument {
        /// Description of the offending input.
        detail: String,
    },

    /// A quantifier expression was evaluated against a default variable
    /// that is neither a collection nor adaptable to one.
    #[error("default variable of type {actual} is not a collection")]
    VariableIsNotACollection {
        /// Runtime type name of the offending value.
        actual: String,
    },

    /// A `with`/`resolve` target name could not be resolved at all.
    #[error("variable {name} is not defined")]
    VariableNotDefined {
        /// The unresolvable variable name.
        name: String,
    },

    /// A variable resolver was consulted but failed; carries the
    /// resolver's own message.
    #[error("variable {name} could not be resolved: {message}")]
    VariableNotResolved {
        /// The variable name handed to the resolver.
        name: String,
        /// The resolver's failure message.
        message: String,
    },

    /// A count expression was built with an unrecognized size
    /// specification.
    #[error("invalid count quantifier {spec:?}")]
    InvalidQuantifier {
        /// The rejected specification string.
        spec: String,
    },

    /// No registered property tester contributes the namespace/property
    /// pair.
    #[error("no property tester for {namespace}.{property}")]
    UnknownProperty {
        /// Namespace of the requested property.
        namespace: String,
        /// Name of the requested property.
        property: String,
    },

    /// The tree builder was handed an element it does not recognize.
    #[error("unknown expression element {name:?}")]
    UnknownElement {
        /// The unrecognized element name.
        name: String,
    },

    /// A declarative element is missing an attribute its kind requires.
    #[error("element {element:?} is missing required attribute {attribute:?}")]
    MissingAttribute {
        /// Name of the element.
        element: String,
        /// Name of the missing attribute.
        attribute: String,
    },

    /// A declarative element is structurally invalid for its kind.
    #[error("element {element:?} is malformed: {detail}")]
    MalformedElement {
        /// Name of the element.
        element: String,
        /// Description of the structural problem.
        detail: String,
    },
}

impl ExpressionError {
    /// Shorthand for [`ExpressionError::MalformedArgument`].
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedArgument {
            detail: detail.into(),
        }
    }
}
