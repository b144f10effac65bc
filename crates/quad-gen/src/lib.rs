//! Quadruple Generation
//!
//! This crate is the compile side of the pair: it turns the stream of
//! semantic actions fired by an external front-end into a flat list of
//! quadruples, validating every construct against the type-compatibility
//! table and the symbol directory before committing an instruction.
//!
//! # Components
//!
//! - **Type Table**: the static compatibility table for every operator family
//! - **Address Allocator**: hands out virtual addresses from the partitioned
//!   ranges and pools literal constants
//! - **Symbol Directory**: variable scopes and the procedure table
//! - **Generator**: the semantic-action surface driving quadruple emission,
//!   jump backpatching, and the call linkage protocol

use thiserror::Error;

use quad_common::{Operator, ScalarType};

pub mod cube;
pub mod memory;
pub mod quads;
pub mod symbols;

pub use memory::{AddressAllocator, AllocError};
pub use quads::QuadGenerator;
pub use symbols::{Directory, Parameter, ProcedureEntry, Variable};

/// Result type for code generation operations
pub type Result<T> = std::result::Result<T, SemanticError>;

/// Errors that abort code generation.
///
/// Every variant is fail-fast: the first one returned ends the compilation
/// and the partially built program is discarded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    #[error("variable '{0}' is already declared in this scope")]
    DuplicateDeclaration(String),

    #[error("procedure '{0}' is already declared")]
    DuplicateProcedure(String),

    #[error("variable '{0}' is not declared")]
    UndeclaredVariable(String),

    #[error("procedure '{0}' is not declared")]
    UnknownProcedure(String),

    #[error("call to '{procedure}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        procedure: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {position} of '{procedure}' expects {expected}, got {found}")]
    ArgumentTypeMismatch {
        procedure: String,
        position: usize,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: Operator,
        left: ScalarType,
        right: ScalarType,
    },

    #[error("void procedure '{0}' used in an expression")]
    VoidInExpression(String),

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error("jump at instruction {0} was never patched")]
    DanglingJump(usize),

    #[error("generator state out of balance: {0}")]
    UnbalancedGenerator(&'static str),
}
