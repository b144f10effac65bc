//! Quill
//!
//! A small procedural language — scalar integers, floats, booleans, and
//! string literals, procedures with value parameters and at most one return
//! value, `if`/`else`, `while`, `print` — compiled directly to quadruples
//! and executed on a dedicated virtual machine.
//!
//! The pipeline has two sides sharing one protocol crate:
//!
//! - `quad-gen` turns semantic actions fired by an external front-end into
//!   the flat quadruple list, validating every construct first
//! - `quad-vm` interprets the finished list over a segmented runtime
//!   memory with an explicit call stack
//!
//! ```
//! use quill::{Machine, Operator, QuadGenerator, ScalarType};
//!
//! let mut gen = QuadGenerator::new();
//! gen.declare_variable("x", ScalarType::Integer)?;
//! gen.push_int(10)?;
//! gen.push_operator(Operator::Add);
//! gen.push_int(5)?;
//! gen.reduce_binary()?;
//! gen.assign("x")?;
//! gen.push_variable("x")?;
//! gen.print_value()?;
//! let program = gen.finish()?;
//!
//! let mut machine = Machine::with_output(Vec::new());
//! machine.run(&program)?;
//! assert_eq!(machine.into_output(), b"15\n".to_vec());
//! # Ok::<(), quill::QuillError>(())
//! ```

use thiserror::Error;

pub use quad_common::{
    ConstValue, Constant, Operand, Operator, Program, Quadruple, ScalarType, StorageClass,
};
pub use quad_gen::{AddressAllocator, Directory, QuadGenerator, SemanticError};
pub use quad_vm::{Machine, RuntimeError, Value};

/// An error from either phase of the pair
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuillError {
    #[error("compile error: {0}")]
    Compile(#[from] SemanticError),

    #[error("runtime error: {0}")]
    Run(#[from] RuntimeError),
}

/// Execute a finished program, printing to stdout
pub fn execute(program: &Program) -> Result<(), QuillError> {
    let mut machine = Machine::new();
    machine.run(program)?;
    Ok(())
}

/// Execute a finished program, capturing printed lines.
///
/// The lines printed before a fatal fault are returned alongside the
/// outcome: print is an immediate side effect, never rolled back.
pub fn execute_capturing(program: &Program) -> (Result<(), QuillError>, Vec<String>) {
    let mut machine = Machine::with_output(Vec::new());
    let outcome = machine.run(program).map_err(QuillError::from);
    let output = String::from_utf8_lossy(&machine.into_output())
        .lines()
        .map(str::to_string)
        .collect();
    (outcome, output)
}
