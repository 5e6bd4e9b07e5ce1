//! Bind expressions: a small JavaScript-flavoured language compiled once to bytecode.

mod ast;
mod bytecode;
mod error;
mod lexer;
mod lower;
mod parser;
mod vm;

pub use error::{ExprError, VmError};
pub use vm::{Environment, NoEnv};

use crate::value::Value;

/// A parsed and lowered expression, ready to evaluate against any environment.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    source: String,
    program: bytecode::BytecodeProgram,
}

impl CompiledExpr {
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let ast = parser::parse_expr(source)?;
        let program = lower::lower_to_bytecode(&ast)?;
        Ok(Self {
            source: source.to_owned(),
            program,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn eval(&self, env: &dyn Environment) -> Result<Value, VmError> {
        vm::eval_program(&self.program, env)
    }

    /// Names of the scope variables this expression reads.
    pub fn free_variables(&self) -> Vec<&str> {
        self.program.free_variables()
    }
}

/// Compile and evaluate in one step.
pub fn evaluate(source: &str, env: &dyn Environment) -> Result<Value, crate::error::RenderError> {
    let expr = CompiledExpr::compile(source).map_err(|e| {
        crate::error::RenderError::expression(format!("cannot compile '{source}': {e}"))
    })?;
    expr.eval(env).map_err(|e| {
        crate::error::RenderError::expression(format!("cannot evaluate '{source}': {e}"))
    })
}
