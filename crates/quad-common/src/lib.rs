//! Quadruple Protocol Common Types
//!
//! This crate centralizes everything the compiler (`quad-gen`) and the
//! virtual machine (`quad-vm`) must agree on: the scalar type set, the
//! partitioned virtual address space, the quadruple instruction format, and
//! the program artifact that crosses from one side to the other.
//!
//! # Components
//!
//! - **Scalar Types**: the closed type set of the language
//! - **Memory Layout**: the ten disjoint virtual address ranges and the
//!   address-to-segment lookup both sides share
//! - **Quadruples**: the four-field instruction format and the finished
//!   program artifact

pub mod layout;
pub mod quad;
pub mod types;

pub use layout::{segment_of, Segment, StorageClass};
pub use quad::{ConstValue, Constant, Operand, Operator, Program, Quadruple};
pub use types::ScalarType;

/// Version of the quadruple protocol crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
