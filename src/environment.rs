//! Runtime scope frames.
//!
//! Frames are shared through [`EnvRef`] handles: a closure, the call that
//! created it and any sibling closures all alias the same frame, and a write
//! through one handle is visible through every other.

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// The outermost frame.
    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// New child frame whose enclosing link is `parent`.
    pub fn enter_scope(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(parent)),
        }))
    }

    /// Names bound directly in this frame.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Reserve `name` in this frame without clobbering an existing binding.
    pub fn declare(&mut self, name: &str) {
        if !self.values.contains_key(name) {
            self.values.insert(name.to_string(), Value::Nil);
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            })
        }
    }

    /// The frame exactly `distance` enclosing links out from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut frame = Rc::clone(env);
        for _ in 0..distance {
            let next = frame.borrow().enclosing.clone()?;
            frame = next;
        }
        Some(frame)
    }

    /// Read `name` directly from the frame `distance` hops out; no search.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Option<Value> {
        let frame = Self::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    /// Overwrite `name` in the frame `distance` hops out.  Returns `false`
    /// when the chain is shorter than `distance`.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &str, value: Value) -> bool {
        match Self::ancestor(env, distance) {
            Some(frame) => {
                frame.borrow_mut().values.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn get_walks_to_enclosing_frames() {
        let globals = Environment::global();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::enter_scope(&Environment::enter_scope(&globals));

        assert_eq!(inner.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
        assert!(matches!(
            inner.borrow().get(&ident("b")),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn assign_updates_the_defining_frame() {
        let globals = Environment::global();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::enter_scope(&globals);

        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert_eq!(
            Environment::get_at(&globals, 0, "a"),
            Some(Value::Number(2.0))
        );
        assert!(inner.borrow().values.is_empty());
    }

    #[test]
    fn assign_to_undeclared_name_fails() {
        let globals = Environment::global();
        let result = globals.borrow_mut().assign(&ident("nope"), Value::Nil);
        assert!(matches!(
            result,
            Err(RuntimeError::UndefinedVariable { line: 1, .. })
        ));
    }

    #[test]
    fn declare_keeps_an_existing_binding() {
        let globals = Environment::global();
        globals.borrow_mut().define("f", Value::Number(3.0));
        globals.borrow_mut().declare("f");
        globals.borrow_mut().declare("g");

        assert_eq!(
            Environment::get_at(&globals, 0, "f"),
            Some(Value::Number(3.0))
        );
        assert_eq!(Environment::get_at(&globals, 0, "g"), Some(Value::Nil));
    }

    #[test]
    fn distance_addressing_skips_shadowing_frames() {
        let globals = Environment::global();
        globals.borrow_mut().define("x", Value::Number(0.0));
        let middle = Environment::enter_scope(&globals);
        middle.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::enter_scope(&middle);
        inner.borrow_mut().define("x", Value::Number(2.0));

        assert_eq!(Environment::get_at(&inner, 0, "x"), Some(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&inner, 2, "x"), Some(Value::Number(0.0)));

        assert!(Environment::assign_at(&inner, 1, "x", Value::Number(9.0)));
        assert_eq!(Environment::get_at(&middle, 0, "x"), Some(Value::Number(9.0)));
        assert!(!Environment::assign_at(&inner, 3, "x", Value::Nil));
    }

    #[test]
    fn aliased_frames_share_writes() {
        let frame = Environment::global();
        let alias = Rc::clone(&frame);
        alias.borrow_mut().define("n", Value::Number(5.0));

        assert_eq!(Environment::get_at(&frame, 0, "n"), Some(Value::Number(5.0)));
    }
}
