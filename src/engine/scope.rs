//! Lexical environments.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Mutable,
    Const,
    /// Global constants such as `undefined` and `NaN`.
    ReadOnly,
}

#[derive(Clone)]
struct Binding {
    value: Value,
    kind: BindingKind,
    initialized: bool,
}

pub enum Lookup {
    Found(Value),
    /// Declared with `let`/`const` but not yet reached.
    Uninitialized,
    Missing,
}

pub enum Assignment {
    Done,
    Const,
    ReadOnly,
    Uninitialized,
    Missing,
}

pub struct Scope {
    values: RefCell<HashMap<Rc<str>, Binding>>,
    parent: Option<Rc<Scope>>,
    /// `this` of a non-arrow function scope; `None` defers to the parent.
    this: Option<Value>,
}

impl Scope {
    /// Block scope.
    pub fn new(parent: Option<Rc<Scope>>) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(HashMap::new()),
            parent,
            this: None,
        })
    }

    /// Scope of a non-arrow function call (or the program) with its own `this`.
    pub fn with_this(parent: Option<Rc<Scope>>, this: Value) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(HashMap::new()),
            parent,
            this: Some(this),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Create or overwrite an initialized binding in this scope.
    pub fn define(&self, name: Rc<str>, value: Value, kind: BindingKind) {
        self.values.borrow_mut().insert(
            name,
            Binding {
                value,
                kind,
                initialized: true,
            },
        );
    }

    /// Hoist a `let`/`const` binding into its temporal dead zone.
    pub fn define_uninitialized(&self, name: Rc<str>, kind: BindingKind) {
        self.values.borrow_mut().insert(
            name,
            Binding {
                value: Value::Undefined,
                kind,
                initialized: false,
            },
        );
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.values
            .borrow()
            .get(name)
            .filter(|b| b.initialized)
            .map(|b| b.value.clone())
    }

    pub fn lookup(&self, name: &str) -> Lookup {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.values.borrow().get(name) {
                return if binding.initialized {
                    Lookup::Found(binding.value.clone())
                } else {
                    Lookup::Uninitialized
                };
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Lookup::Missing,
            }
        }
    }

    pub fn assign(&self, name: &str, value: Value) -> Assignment {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.values.borrow_mut().get_mut(name) {
                if !binding.initialized {
                    return Assignment::Uninitialized;
                }
                return match binding.kind {
                    BindingKind::Mutable => {
                        binding.value = value;
                        Assignment::Done
                    }
                    BindingKind::Const => Assignment::Const,
                    BindingKind::ReadOnly => Assignment::ReadOnly,
                };
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Assignment::Missing,
            }
        }
    }

    pub fn this_value(&self) -> Value {
        let mut scope = self;
        loop {
            if let Some(this) = &scope.this {
                return this.clone();
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Value::Undefined,
            }
        }
    }

    /// Drop every binding; used when a realm is torn down.
    pub fn clear(&self) {
        let released: Vec<Binding> = match self.values.try_borrow_mut() {
            Ok(mut values) => values.drain().map(|(_, b)| b).collect(),
            Err(_) => return,
        };
        drop(released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let global = Scope::new(None);
        global.define("x".into(), Value::Number(1.0), BindingKind::Mutable);
        let inner = Scope::new(Some(global.clone()));
        assert!(matches!(inner.lookup("x"), Lookup::Found(Value::Number(n)) if n == 1.0));
        assert!(matches!(inner.lookup("y"), Lookup::Missing));
    }

    #[test]
    fn test_temporal_dead_zone() {
        let scope = Scope::new(None);
        scope.define_uninitialized("x".into(), BindingKind::Const);
        assert!(matches!(scope.lookup("x"), Lookup::Uninitialized));
        assert!(matches!(
            scope.assign("x", Value::Null),
            Assignment::Uninitialized
        ));
        scope.define("x".into(), Value::Null, BindingKind::Const);
        assert!(matches!(scope.assign("x", Value::Null), Assignment::Const));
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let global = Scope::new(None);
        global.define("x".into(), Value::Number(1.0), BindingKind::Mutable);
        let inner = Scope::new(Some(global.clone()));
        assert!(matches!(
            inner.assign("x", Value::Number(2.0)),
            Assignment::Done
        ));
        assert!(matches!(global.get_own("x"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(inner.assign("z", Value::Null), Assignment::Missing));
    }

    #[test]
    fn test_this_resolution() {
        let outer = Scope::with_this(None, Value::Bool(true));
        let arrow = Scope::new(Some(outer));
        assert!(matches!(arrow.this_value(), Value::Bool(true)));
    }
}
