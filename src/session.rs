//! Pipeline glue: scan → parse → resolve → interpret.
//!
//! A [`Session`] owns everything that must outlive a single source entry: the
//! interpreter (globals and accumulated binding table) and the node id
//! counter.  Batch runs use one entry; the REPL feeds one entry per line.

use std::io::Write;

use log::{debug, info};

use crate::ast::ExprId;
use crate::config::InterpreterConfig;
use crate::error::RunError;
use crate::interpreter::{ExecMode, Interpreter};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

pub struct Session {
    interpreter: Interpreter,
    next_id: ExprId,
}

impl Session {
    pub fn new(config: InterpreterConfig) -> Self {
        Self::from_interpreter(Interpreter::new(config))
    }

    /// Session whose `print` output is written to `out`.
    pub fn with_output(config: InterpreterConfig, out: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(config, out))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: ExprId(0),
        }
    }

    /// Run one source entry.  Static errors from every front-end stage are
    /// gathered together and stop the entry before anything executes.
    pub fn run(&mut self, source: &str, mode: ExecMode) -> Result<(), RunError> {
        info!("Running {} byte(s) of source ({:?})", source.len(), mode);

        let (tokens, mut errors) = Scanner::new(source.as_bytes()).scan_all();
        debug!("Scanned {} token(s)", tokens.len());

        let mut parser = Parser::starting_at(tokens, self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        let statements = match parsed {
            Ok(statements) if errors.is_empty() => statements,
            Ok(_) => return Err(RunError::Static(errors)),
            Err(parse_errors) => {
                errors.extend(parse_errors);
                return Err(RunError::Static(errors));
            }
        };

        let locals = Resolver::with_globals(self.interpreter.global_names())
            .resolve(&statements)
            .map_err(RunError::Static)?;

        self.interpreter.resolve(locals);
        self.interpreter.interpret(&statements, mode)?;

        Ok(())
    }
}
