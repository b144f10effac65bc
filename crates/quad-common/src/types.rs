//! Scalar Types
//!
//! The closed scalar type set shared by the compiler and the machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;

/// A scalar type of the language.
///
/// `Void` only appears as a procedure return type and `Error` is the
/// sentinel the type-compatibility table yields for invalid combinations;
/// neither is declarable for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum ScalarType {
    Integer,
    Float,
    Boolean,
    StringLit,
    Void,
    Error,
}

impl ScalarType {
    /// Whether a variable of this type can be declared at all
    pub fn is_declarable(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Boolean)
    }

    /// Whether this type participates in arithmetic and ordering
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "int",
            Self::Float => "float",
            Self::Boolean => "bool",
            Self::StringLit => "string",
            Self::Void => "void",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}
