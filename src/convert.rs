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

//! Tree-builder glue
//!
//! The surrounding system parses declarative definitions (XML, extension
//! registries) into a generic attributed tree; this module turns such a
//! tree into an [`Expression`]. The parser itself lives outside the
//! engine; anything implementing [`ExpressionElement`] converts.

use crate::args::{convert_argument, convert_token, parse_arguments};
use crate::error::{ExpressionError, Result};
use crate::expr::{Expression, IterateOperator, TestData};
use crate::value::Value;
use rustc_hash::FxHashMap;

/// A node of a generic attributed tree describing an expression.
pub trait ExpressionElement {
    /// Element name, selecting the expression kind.
    fn name(&self) -> &str;

    /// Attribute value by name.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Child elements in document order.
    fn children(&self) -> Vec<&dyn ExpressionElement>;
}

/// Plain owned implementation of [`ExpressionElement`] for hosts that
/// have no element representation of their own.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    name: String,
    attributes: FxHashMap<String, String>,
    children: Vec<ElementData>,
}

impl ElementData {
    /// Create an element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: FxHashMap::default(),
            children: Vec::new(),
        }
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: ElementData) -> Self {
        self.children.push(child);
        self
    }
}

impl ExpressionElement for ElementData {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn children(&self) -> Vec<&dyn ExpressionElement> {
        self.children
            .iter()
            .map(|child| child as &dyn ExpressionElement)
            .collect()
    }
}

/// Converts attributed elements into expression trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionConverter;

impl ExpressionConverter {
    /// Create a converter.
    pub fn new() -> Self {
        Self
    }

    /// Convert `element` and its subtree into an [`Expression`].
    ///
    /// # Errors
    ///
    /// [`ExpressionError::UnknownElement`] for an unrecognized element
    /// name, [`ExpressionError::MissingAttribute`] /
    /// [`ExpressionError::MalformedElement`] for structurally invalid
    /// elements, and codec errors for bad argument strings.
    pub fn convert(&self, element: &dyn ExpressionElement) -> Result<Expression> {
        match element.name() {
            "enablement" => Ok(Expression::enablement(
                element.attribute("id").map(str::to_string),
                bool_attribute(element, "forcePluginActivation"),
                self.convert_children(element)?,
            )),
            "and" => Ok(Expression::and(self.convert_children(element)?)),
            "or" => Ok(Expression::or(self.convert_children(element)?)),
            "not" => {
                let children = element.children();
                let [child] = children.as_slice() else {
                    return Err(ExpressionError::MalformedElement {
                        element: "not".to_string(),
                        detail: format!("expected exactly one child, got {}", children.len()),
                    });
                };
                Ok(Expression::not(self.convert(*child)?))
            }
            "equals" => {
                let expected = convert_token(required_attribute(element, "value")?)?;
                Ok(Expression::equals(expected))
            }
            "count" => Expression::count(element.attribute("value")),
            "instanceof" => Ok(Expression::instance_of(required_attribute(
                element, "value",
            )?)),
            "systemTest" => Ok(Expression::system_test(
                required_attribute(element, "property")?,
                required_attribute(element, "value")?,
            )),
            "test" => self.convert_test(element),
            "iterate" => {
                let operator = match element.attribute("operator") {
                    Some(operator) => operator.parse()?,
                    None => IterateOperator::And,
                };
                let if_empty = element.attribute("ifEmpty").map(|value| value == "true");
                Ok(Expression::iterate(
                    operator,
                    if_empty,
                    self.convert_children(element)?,
                ))
            }
            "with" => Ok(Expression::with_variable(
                required_attribute(element, "variable")?,
                self.convert_children(element)?,
            )),
            "resolve" => Ok(Expression::resolve(
                required_attribute(element, "variable")?,
                self.arguments(element)?,
                self.convert_children(element)?,
            )),
            "adapt" => Ok(Expression::adapt(
                required_attribute(element, "type")?,
                self.convert_children(element)?,
            )),
            other => Err(ExpressionError::UnknownElement {
                name: other.to_string(),
            }),
        }
    }

    fn convert_test(&self, element: &dyn ExpressionElement) -> Result<Expression> {
        let qualified = required_attribute(element, "property")?;
        // the property attribute is namespace-qualified; split at the
        // last dot
        let Some((namespace, property)) = qualified.rsplit_once('.') else {
            return Err(ExpressionError::MalformedElement {
                element: "test".to_string(),
                detail: format!("property {qualified:?} has no namespace"),
            });
        };
        let expected = convert_argument(element.attribute("value"))?;
        let mut data = TestData::new(namespace, property, self.arguments(element)?, expected);
        if bool_attribute(element, "forcePluginActivation") {
            data = data.forcing_activation();
        }
        Ok(data.into())
    }

    fn convert_children(&self, element: &dyn ExpressionElement) -> Result<Vec<Expression>> {
        element
            .children()
            .into_iter()
            .map(|child| self.convert(child))
            .collect()
    }

    /// A missing `args` attribute means no arguments, unlike an empty one
    /// which carries a single empty string.
    fn arguments(&self, element: &dyn ExpressionElement) -> Result<Vec<Value>> {
        match element.attribute("args") {
            Some(args) => parse_arguments(args),
            None => Ok(Vec::new()),
        }
    }
}

fn required_attribute<'e>(element: &'e dyn ExpressionElement, name: &str) -> Result<&'e str> {
    element
        .attribute(name)
        .ok_or_else(|| ExpressionError::MissingAttribute {
            element: element.name().to_string(),
            attribute: name.to_string(),
        })
}

fn bool_attribute(element: &dyn ExpressionElement, name: &str) -> bool {
    element.attribute(name) == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_enablement() -> ElementData {
        ElementData::new("enablement")
            .with_attribute("id", "sample.definition")
            .with_child(
                ElementData::new("with")
                    .with_attribute("variable", "selection")
                    .with_child(
                        ElementData::new("iterate")
                            .with_attribute("operator", "and")
                            .with_attribute("ifEmpty", "false")
                            .with_child(
                                ElementData::new("instanceof")
                                    .with_attribute("value", "pkg.Resource"),
                            ),
                    ),
            )
            .with_child(
                ElementData::new("test")
                    .with_attribute("property", "pkg.tests.enabled")
                    .with_attribute("args", "'first arg', 2")
                    .with_attribute("value", "true")
                    .with_attribute("forcePluginActivation", "true"),
            )
    }

    #[test]
    fn converts_a_full_enablement_definition() {
        let converted = ExpressionConverter::new()
            .convert(&sample_enablement())
            .unwrap();
        let expected = Expression::enablement(
            Some("sample.definition".to_string()),
            false,
            vec![
                Expression::with_variable(
                    "selection",
                    vec![Expression::iterate(
                        IterateOperator::And,
                        Some(false),
                        vec![Expression::instance_of("pkg.Resource")],
                    )],
                ),
                TestData::new(
                    "pkg.tests",
                    "enabled",
                    vec![Value::from("first arg"), Value::from(2i64)],
                    Some(Value::from(true)),
                )
                .forcing_activation()
                .into(),
            ],
        );
        assert_eq!(converted, expected);
    }

    #[test]
    fn independently_converted_trees_are_equal() {
        let converter = ExpressionConverter::new();
        let first = converter.convert(&sample_enablement()).unwrap();
        let second = converter.convert(&sample_enablement()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_elements_are_rejected() {
        let error = ExpressionConverter::new()
            .convert(&ElementData::new("loop"))
            .unwrap_err();
        assert_eq!(
            error,
            ExpressionError::UnknownElement {
                name: "loop".to_string()
            }
        );
    }

    #[test]
    fn test_property_must_be_namespace_qualified() {
        let element = ElementData::new("test").with_attribute("property", "enabled");
        assert!(matches!(
            ExpressionConverter::new().convert(&element),
            Err(ExpressionError::MalformedElement { .. })
        ));
    }

    #[test]
    fn missing_attributes_are_reported() {
        let error = ExpressionConverter::new()
            .convert(&ElementData::new("with"))
            .unwrap_err();
        assert_eq!(
            error,
            ExpressionError::MissingAttribute {
                element: "with".to_string(),
                attribute: "variable".to_string()
            }
        );
    }

    #[test]
    fn not_requires_exactly_one_child() {
        let element = ElementData::new("not")
            .with_child(ElementData::new("count"))
            .with_child(ElementData::new("count"));
        assert!(matches!(
            ExpressionConverter::new().convert(&element),
            Err(ExpressionError::MalformedElement { .. })
        ));
    }
}
