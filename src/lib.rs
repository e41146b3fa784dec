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

//! # Declarative expression evaluation engine
//!
//! A small interpreter for tree-shaped boolean expressions, the kind
//! declarative definitions use to decide whether an action or capability
//! is enabled for a given runtime state. Trees are built once from a
//! declarative description and evaluated many times, possibly
//! concurrently, against independent [`EvaluationContext`]s.
//!
//! ## Features
//!
//! - **Tri-state results**: [`EvaluationResult`] distinguishes a
//!   definitive `False` from `NotLoaded`, the answer when a contributed
//!   property tester's provider is not active yet.
//! - **Short-circuit composites**: `and`/`or`/`not` with exact dominance
//!   rules for `NotLoaded`.
//! - **Collection quantifiers**: `count` size predicates and per-element
//!   `iterate` evaluation, with adapter-based coercion for values that
//!   are not collections themselves.
//! - **Variable scoping**: `with`/`resolve` rebind the default variable
//!   through chained contexts and contributed [`VariableResolver`]s.
//! - **Cached type resolution**: subtype checks memoize per concrete
//!   type in a concurrent cache shared across evaluations.
//! - **Thread safety**: trees are immutable and freely shared; one
//!   [`TypeResolver`] serves concurrent evaluations.
//!
//! ## Quick start
//!
//! ```rust
//! use octofhir_expressions::{
//!     ElementData, EvaluationContext, EvaluationResult, ExpressionConverter, Value,
//! };
//!
//! // <and><count value="+"/><iterate operator="or"><equals value="'one'"/></iterate></and>
//! let definition = ElementData::new("and")
//!     .with_child(ElementData::new("count").with_attribute("value", "+"))
//!     .with_child(
//!         ElementData::new("iterate")
//!             .with_attribute("operator", "or")
//!             .with_child(ElementData::new("equals").with_attribute("value", "'one'")),
//!     );
//! let expression = ExpressionConverter::new().convert(&definition)?;
//!
//! let selection = Value::List(vec![Value::from("one"), Value::from("two")]);
//! let context = EvaluationContext::root(selection);
//! assert_eq!(expression.evaluate(&context)?, EvaluationResult::True);
//! # Ok::<(), octofhir_expressions::ExpressionError>(())
//! ```

pub mod args;
pub mod context;
pub mod convert;
pub mod error;
pub mod expr;
pub mod result;
pub mod testers;
pub mod types;
pub mod value;

pub use context::{DEFAULT_VARIABLE, EvaluationContext, ROOT_VARIABLE, VariableResolver};
pub use convert::{ElementData, ExpressionConverter, ExpressionElement};
pub use error::{ExpressionError, Result};
pub use expr::{
    AdaptData, CompositeData, CountData, CountQuantifier, EnablementData, EqualsData, Expression,
    InstanceofData, IterateData, IterateOperator, ResolveData, SystemTestData, TestData, WithData,
};
pub use result::EvaluationResult;
pub use testers::{
    EmptyTesterProvider, PropertyTester, PropertyTesterProvider, StaticTesterRegistry,
    TesterAvailability,
};
pub use types::{AdapterProvider, EmptyAdapterProvider, TypeResolver};
pub use value::{TypedValue, Value};
