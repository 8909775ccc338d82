//! Runtime classes and instances.
//!
//! Method lookup walks the superclass chain from a starting class.  A method
//! is always bound with the superclass of the class that *defines* it, never
//! the receiver's own class, which keeps multi-level `super` chains correct.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::{Function, Value};

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Look `name` up starting at this class and bind it to `instance`.
    pub fn bind_method(&self, instance: &Rc<RefCell<Instance>>, name: &str) -> Option<Function> {
        if let Some(method) = self.methods.get(name) {
            debug!("Binding '{}.{}'", self.name, name);
            return Some(method.bind(Rc::clone(instance), self.superclass.as_ref()));
        }

        self.superclass.as_ref()?.bind_method(instance, name)
    }

    /// The constructor declared by this class itself.
    fn own_initializer(&self) -> Option<&Rc<Function>> {
        ["init", self.name.as_str()]
            .into_iter()
            .filter_map(|name| self.methods.get(name))
            .find(|method| method.is_initializer)
    }

    /// The nearest constructor in the chain, bound to `instance`.
    pub fn bound_initializer(&self, instance: &Rc<RefCell<Instance>>) -> Option<Function> {
        match self.own_initializer() {
            Some(init) => Some(init.bind(Rc::clone(instance), self.superclass.as_ref())),
            None => self.superclass.as_ref()?.bound_initializer(instance),
        }
    }

    /// Number of arguments a call to the class requires.
    pub fn arity(&self) -> usize {
        match self.own_initializer() {
            Some(init) => init.arity(),
            None => self.superclass.as_ref().map_or(0, |s| s.arity()),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| &s.name))
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<RefCell<Instance>> {
        Rc::new(RefCell::new(Instance {
            class,
            fields: HashMap::new(),
        }))
    }

    /// Property read: fields first, then methods bound to the receiver.
    pub fn get(instance: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class = Rc::clone(&instance.borrow().class);
        match class.bind_method(instance, &name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(method))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    /// Property write always lands in the field table.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
