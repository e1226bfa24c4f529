//! Registry of functions an expression may call.
//!
//! The registry is the allow-list for calls: a name that is not registered
//! cannot be compiled. It is passed to the compiler explicitly and travels
//! with each compiled expression, so there is no process-wide function table.

use std::collections::BTreeMap;

/// Elementwise kernel: receives one value per declared argument
pub type ElementwiseFn = fn(&[f64]) -> f64;

/// A callable function and its declared arity
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub arity: usize,
    pub apply: ElementwiseFn,
}

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Function>,
}

fn abs(args: &[f64]) -> f64 {
    args[0].abs()
}

impl FunctionRegistry {
    /// A registry that allows no calls at all
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Add (or replace) a function
    pub fn with_function(mut self, name: impl Into<String>, arity: usize, apply: ElementwiseFn) -> Self {
        self.functions.insert(name.into(), Function { arity, apply });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }
}

/// The default registry allows only `abs(x)`
impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::empty().with_function("abs", 1, abs)
    }
}
