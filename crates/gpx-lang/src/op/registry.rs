use itertools::Itertools;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{Const, Function, Op, Operand};

/// Named functions and parse-time constants available to the parser.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    functions: FxHashMap<SmolStr, Function<T>>,
    constants: FxHashMap<SmolStr, Const<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            functions: FxHashMap::default(),
            constants: FxHashMap::default(),
        }
    }
}

impl<T: Operand> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `function`, replacing any function registered under the same name.
    pub fn register(&mut self, function: Function<T>) -> &mut Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    pub fn register_constant(&mut self, name: impl Into<SmolStr>, constant: Const<T>) -> &mut Self {
        self.constants.insert(name.into(), constant);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function<T>> {
        self.functions.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Const<T>> {
        self.constants.get(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered functions ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = &Function<T>> {
        self.functions
            .values()
            .sorted_by(|a, b| a.name().cmp(b.name()))
    }

    /// Registered functions as operations, ordered by name.
    pub fn ops(&self) -> Vec<Op<T>> {
        self.functions().cloned().map(Op::Function).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register(Function::of("twice", 1, |v: &[f64]| v[0] * 2.0))
            .register_constant("TAU", Const::named("τ", std::f64::consts::TAU));

        assert!(registry.is_function("twice"));
        assert!(!registry.is_function("twic"));
        assert_eq!(registry.function("twice").map(|f| f.arity()), Some(1));
        assert_eq!(registry.constant("TAU").and_then(|c| c.name()), Some("τ"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_functions_sorted_by_name() {
        let mut registry = Registry::new();
        for name in ["mul", "add", "sub"] {
            registry.register(Function::of(name, 2, |v: &[f64]| v[0]));
        }

        let names = registry.functions().map(|f| f.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["add", "mul", "sub"]);
    }
}
