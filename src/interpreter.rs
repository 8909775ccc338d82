//! Tree‑walking evaluator.
//!
//! Statements report how they completed through [`Flow`]: a `return` unwinds
//! as `Flow::Return` up to the nearest call boundary, while runtime failures
//! travel separately on the `Err` side.  The current‑environment cursor is
//! swapped for the dynamic extent of a block or call and restored on every
//! exit path.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::class::{Class, Instance};
use crate::config::{ArityPolicy, InterpreterConfig};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::{Function, NativeFn, NativeFunction, Value};

/// Remaining native stack below which a call grows the stack first.
const RED_ZONE: usize = 128 * 1024;

/// Size of each additional stack segment.
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Execution context passed down through statement execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecMode {
    /// Echo the value of top-level expression statements.
    pub repl: bool,
    pub in_function: bool,
}

impl ExecMode {
    pub const SCRIPT: ExecMode = ExecMode {
        repl: false,
        in_function: false,
    };

    pub const REPL: ExecMode = ExecMode {
        repl: true,
        in_function: false,
    };

    const FUNCTION_BODY: ExecMode = ExecMode {
        repl: false,
        in_function: true,
    };

    fn echoes(self) -> bool {
        self.repl && !self.in_function
    }
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    config: InterpreterConfig,
    out: Box<dyn Write>,
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter printing to stdout.
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_output(config, Box::new(io::stdout()))
    }

    /// Creates an interpreter whose `print` output goes to `out`, with the
    /// native globals such as `clock` already defined.
    pub fn with_output(config: InterpreterConfig, out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter with {:?}", config);

        let globals = Environment::global();

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            config,
            out,
            depth: 0,
        };

        interpreter.define_native("clock", 0, |_args: &[Value]| {
            let millis = Utc::now().timestamp_millis();
            Ok(Value::Number(millis as f64 / 1000.0))
        });

        interpreter
    }

    /// Expose a host function as a global.
    pub fn define_native(&mut self, name: &'static str, arity: usize, func: NativeFn) {
        debug!("Defining native function '{}'", name);

        self.globals.borrow_mut().define(
            name,
            Value::NativeFunction(Rc::new(NativeFunction { name, arity, func })),
        );
    }

    /// Every name currently defined in the global frame.
    pub fn global_names(&self) -> HashSet<String> {
        self.globals.borrow().names().map(str::to_owned).collect()
    }

    /// Merge a binding table produced by the resolver.  Tables accumulate so
    /// closures from earlier REPL entries keep their bindings.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Adding {} resolved binding(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Interprets a resolved program (or one REPL entry).
    pub fn interpret(&mut self, statements: &[Stmt], mode: ExecMode) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        self.environment = Rc::clone(&self.globals);
        self.depth = 0;

        let result = self.execute_all(statements, mode);

        // a failed entry must not leave the cursor inside a dead scope
        self.environment = Rc::clone(&self.globals);

        let flushed = self.out.flush();
        result?;
        flushed.map_err(|source| RuntimeError::Output { source, line: 0 })?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    fn execute_all(&mut self, statements: &[Stmt], mode: ExecMode) -> IResult<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt, mode)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `statements` with `environment` as the current scope, restoring
    /// the previous scope however the block is left.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
        mode: ExecMode,
    ) -> IResult<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements, mode);
        self.environment = previous;
        result
    }

    /// Executes a single statement.
    fn execute(&mut self, stmt: &Stmt, mode: ExecMode) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                let value = self.evaluate(expr)?;
                if mode.echoes() {
                    self.emit(&value, expr.line())?;
                }
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.emit(&value, expr.line())?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope = Environment::enter_scope(&self.environment);
                return self.execute_block(statements, scope, mode);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch, mode);
                } else if let Some(else_stmt) = else_branch {
                    return self.execute(else_stmt, mode);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, mode)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                // declared first so the body can refer to itself
                self.environment.borrow_mut().declare(&decl.name.lexeme);
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                self.environment
                    .borrow_mut()
                    .assign(&decl.name, Value::Function(Rc::new(function)))?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                self.environment.borrow_mut().declare(&name.lexeme);

                let superclass = match superclass {
                    Some(expr) => match self.evaluate(expr)? {
                        Value::Class(class) => Some(class),
                        _ => {
                            return Err(RuntimeError::SuperclassNotClass { line: expr.line() })
                        }
                    },
                    None => None,
                };

                let enclosing = superclass.as_ref().map(|class| {
                    let scope = Environment::enter_scope(&self.environment);
                    scope
                        .borrow_mut()
                        .define("super", Value::Class(Rc::clone(class)));
                    std::mem::replace(&mut self.environment, scope)
                });

                let mut table = HashMap::new();
                for method in methods {
                    let is_initializer =
                        method.name.lexeme == "init" || method.name.lexeme == name.lexeme;
                    let function = Function::new(
                        Rc::clone(method),
                        Rc::clone(&self.environment),
                        is_initializer,
                    );
                    table.insert(method.name.lexeme.clone(), Rc::new(function));
                }

                let class = Class::new(name.lexeme.clone(), superclass, table);

                if let Some(enclosing) = enclosing {
                    self.environment = enclosing;
                }

                self.environment
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn emit(&mut self, value: &Value, line: usize) -> IResult<()> {
        writeln!(self.out, "{}", value).map_err(|source| RuntimeError::Output { source, line })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::OperandNotNumber {
                            line: operator.line,
                        }),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::OperandNotNumber {
                        line: operator.line,
                    }),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        if !Environment::assign_at(
                            &self.environment,
                            distance,
                            &name.lexeme,
                            value.clone(),
                        ) {
                            return Err(undefined_variable(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call_value(callee, &args, paren)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::NotAnInstance { line: name.line }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::FieldOnNonInstance { line: name.line });
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super.method`: look the method up from the defining class's
    /// superclass, but bind it to the actual receiver.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .ok_or_else(|| undefined_variable(keyword))?;

        let Some(Value::Class(superclass)) =
            Environment::get_at(&self.environment, distance, "super")
        else {
            return Err(undefined_variable(keyword));
        };

        // `this` lives in the frame just inside the one holding `super`
        let receiver = distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"));
        let Some(Value::Instance(receiver)) = receiver else {
            return Err(RuntimeError::UndefinedVariable {
                name: "this".to_string(),
                line: keyword.line,
            });
        };

        match superclass.bind_method(&receiver, &method.lexeme) {
            Some(bound) => Ok(Value::Function(Rc::new(bound))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn check_arity(&self, expected: usize, got: usize, line: usize) -> IResult<()> {
        match self.config.arity {
            ArityPolicy::Minimum if got < expected => Err(RuntimeError::TooFewArguments {
                expected,
                got,
                line,
            }),
            ArityPolicy::Exact if got != expected => Err(RuntimeError::ArityMismatch {
                expected,
                got,
                line,
            }),
            _ => Ok(()),
        }
    }

    /// Invokes a callable (function, native function or class).
    fn call_value(&mut self, callee: Value, args: &[Value], paren: &Token) -> IResult<Value> {
        let line = paren.line;

        match callee {
            Value::Function(function) => {
                self.check_arity(function.arity(), args.len(), line)?;
                self.call_function(&function, args, line)
            }

            Value::NativeFunction(native) => {
                self.check_arity(native.arity, args.len(), line)?;
                debug!("Calling native function '{}'", native.name);
                (native.func)(args).map_err(|message| RuntimeError::Native { message, line })
            }

            Value::Class(class) => {
                self.check_arity(class.arity(), args.len(), line)?;
                debug!("Instantiating class '{}'", class.name);

                let instance = Instance::new(Rc::clone(&class));
                if let Some(initializer) = class.bound_initializer(&instance) {
                    self.call_function(&initializer, args, line)?;
                }
                Ok(Value::Instance(instance))
            }

            _ => Err(RuntimeError::NotCallable { line }),
        }
    }

    /// Call protocol: a fresh frame over the closure binds the parameters,
    /// then the body runs in it.
    fn call_function(
        &mut self,
        function: &Function,
        args: &[Value],
        line: usize,
    ) -> IResult<Value> {
        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow { line });
        }

        debug!("Calling function '{}'", function.name());

        let frame = Environment::enter_scope(&function.closure);
        {
            let mut frame = frame.borrow_mut();
            for (param, arg) in function.declaration.params.iter().zip(args) {
                frame.define(&param.lexeme, arg.clone());
            }
        }

        self.depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
            self.execute_block(&function.declaration.body, frame, ExecMode::FUNCTION_BODY)
        });
        self.depth -= 1;

        let flow = result?;

        if function.is_initializer {
            return Environment::get_at(&function.closure, 0, "this").ok_or_else(|| {
                RuntimeError::UndefinedVariable {
                    name: "this".to_string(),
                    line,
                }
            });
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        name: name.lexeme.clone(),
        line: name.line,
    }
}

/// Arithmetic, comparison and equality on two evaluated operands.
fn binary(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    let line = operator.line;

    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        TokenType::PLUS => {
            return match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::InvalidPlusOperands { line }),
            }
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(RuntimeError::OperandsNotNumbers { line });
    };

    Ok(match operator.token_type {
        TokenType::MINUS => Value::Number(a - b),
        TokenType::STAR => Value::Number(a * b),
        TokenType::SLASH => Value::Number(a / b),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        _ => return Err(RuntimeError::OperandsNotNumbers { line }),
    })
}
