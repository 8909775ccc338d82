//! Interpreter settings, loadable from a JSON file.
//!
//! ```json
//! { "arity": "exact", "max_call_depth": 512 }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::Result;

/// How a call's argument count is checked against the callee's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArityPolicy {
    /// Too few arguments is an error; extra arguments are ignored.
    #[default]
    Minimum,

    /// The argument count must equal the parameter count.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    pub arity: ArityPolicy,

    /// Interpreted call nesting allowed before `Stack overflow.` is raised.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            arity: ArityPolicy::Minimum,
            max_call_depth: 2048,
        }
    }
}

impl InterpreterConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading interpreter config from {:?}", path);

        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;

        info!("Loaded config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = InterpreterConfig::from_json("{}").unwrap();
        assert_eq!(config, InterpreterConfig::default());
        assert_eq!(config.arity, ArityPolicy::Minimum);
    }

    #[test]
    fn reads_every_field() {
        let config =
            InterpreterConfig::from_json(r#"{ "arity": "exact", "max_call_depth": 16 }"#).unwrap();
        assert_eq!(config.arity, ArityPolicy::Exact);
        assert_eq!(config.max_call_depth, 16);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(InterpreterConfig::from_json(r#"{ "arty": "exact" }"#).is_err());
    }
}
