//! Shared fixtures: a small host type hierarchy, adapter wiring, and
//! recording testers used across the integration suites.

// not every suite uses every fixture
#![allow(dead_code)]

use octofhir_expressions::{
    AdapterProvider, EmptyTesterProvider, EvaluationContext, PropertyTester,
    PropertyTesterProvider, Result, TypeResolver, TypedValue, Value,
};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Base class of the test hierarchy.
#[derive(Debug, Default)]
pub struct A;

impl TypedValue for A {
    fn type_name(&self) -> &str {
        "pkg.A"
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other.as_any().downcast_ref::<A>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `pkg.B extends pkg.A implements pkg.I`.
#[derive(Debug, Default)]
pub struct B;

impl TypedValue for B {
    fn type_name(&self) -> &str {
        "pkg.B"
    }

    fn supertype_names(&self) -> Vec<String> {
        vec!["pkg.A".to_string(), "pkg.I".to_string()]
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other.as_any().downcast_ref::<B>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Target type of the adaptation tests.
#[derive(Debug, Default)]
pub struct Adapter;

impl TypedValue for Adapter {
    fn type_name(&self) -> &str {
        "pkg.Adapter"
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other.as_any().downcast_ref::<Adapter>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adapted to [`Adapter`] by the registered adapter provider.
#[derive(Debug, Default)]
pub struct Adaptee;

impl TypedValue for Adaptee {
    fn type_name(&self) -> &str {
        "pkg.Adaptee"
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other.as_any().downcast_ref::<Adaptee>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Exposes [`Adapter`] through its own adapter capability instead of the
/// registered provider.
#[derive(Debug, Default)]
pub struct AdaptableAdaptee;

impl TypedValue for AdaptableAdaptee {
    fn type_name(&self) -> &str {
        "pkg.AdaptableAdaptee"
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other.as_any().downcast_ref::<AdaptableAdaptee>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_adapter(&self, type_name: &str) -> Option<Value> {
        (type_name == "pkg.Adapter").then(|| Value::object(Adapter))
    }
}

/// A host object wrapping a collection without being one.
#[derive(Debug)]
pub struct CollectionWrapper(pub Vec<Value>);

impl TypedValue for CollectionWrapper {
    fn type_name(&self) -> &str {
        "tests.CollectionWrapper"
    }

    fn object_eq(&self, other: &dyn TypedValue) -> bool {
        other
            .as_any()
            .downcast_ref::<CollectionWrapper>()
            .is_some_and(|wrapper| wrapper.0 == self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Adapter provider backing the test hierarchy: unwraps
/// [`CollectionWrapper`] into a collection and coerces [`Adaptee`] to
/// [`Adapter`].
pub struct TestAdapters;

impl AdapterProvider for TestAdapters {
    fn adapt(&self, value: &Value, type_name: &str) -> Option<Value> {
        let Value::Object(object) = value else {
            return None;
        };
        if type_name == "Collection" {
            let wrapper = object.as_any().downcast_ref::<CollectionWrapper>()?;
            return Some(Value::List(wrapper.0.clone()));
        }
        if type_name == "pkg.Adapter" && object.as_any().downcast_ref::<Adaptee>().is_some() {
            return Some(Value::object(Adapter));
        }
        None
    }
}

/// Root context over the test adapter provider and no property testers.
pub fn context_with_adapters(default_variable: Value) -> EvaluationContext<'static> {
    EvaluationContext::with_providers(
        default_variable,
        Arc::new(TypeResolver::new(Arc::new(TestAdapters))),
        Arc::new(EmptyTesterProvider),
    )
}

/// Root context wired to a property tester provider, with the test
/// adapters in place.
pub fn context_with_testers(
    default_variable: Value,
    testers: Arc<dyn PropertyTesterProvider>,
) -> EvaluationContext<'static> {
    EvaluationContext::with_providers(
        default_variable,
        Arc::new(TypeResolver::new(Arc::new(TestAdapters))),
        testers,
    )
}

/// A property tester recording every receiver it sees and answering a
/// fixed verdict.
pub struct RecordingTester {
    /// Receivers in visit order.
    pub visited: Mutex<Vec<Value>>,
    /// The verdict returned for every invocation.
    pub verdict: bool,
}

impl RecordingTester {
    pub fn new(verdict: bool) -> Arc<Self> {
        Arc::new(Self {
            visited: Mutex::new(Vec::new()),
            verdict,
        })
    }

    pub fn visited(&self) -> Vec<Value> {
        self.visited.lock().unwrap().clone()
    }
}

impl PropertyTester for RecordingTester {
    fn test(
        &self,
        receiver: &Value,
        _property: &str,
        _args: &[Value],
        _expected: Option<&Value>,
    ) -> Result<bool> {
        self.visited.lock().unwrap().push(receiver.clone());
        Ok(self.verdict)
    }
}
