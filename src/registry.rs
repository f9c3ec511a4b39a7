//! Explicit step registry.
//!
//! Resolves a step name to a runnable unit implementing the [`Step`] contract.
//! The set of valid steps is populated at startup by explicit `register`
//! calls (see `steps::catalog`), so it is statically enumerable and needs no
//! runtime introspection.

use std::collections::BTreeMap;

use crate::errors::RegistryError;
use crate::step::Step;

#[derive(Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, Box<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under its declared name.
    pub fn register(&mut self, step: Box<dyn Step>) -> Result<(), RegistryError> {
        let name = step.name().to_string();
        if self.steps.contains_key(&name) {
            return Err(RegistryError::DuplicateStep { name });
        }
        self.steps.insert(name, step);
        Ok(())
    }

    /// Resolve a step by name. Unknown names are a configuration error, not
    /// a data-quality error; the controller skips them without spending any
    /// retry budget.
    pub fn resolve(&self, name: &str) -> Result<&dyn Step, RegistryError> {
        self.steps
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| RegistryError::UnknownStep {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
