//! Quadruple Virtual Machine
//!
//! The run side of the pair: interprets a finished quadruple program over a
//! segmented runtime memory with an explicit call stack. Execution is a
//! plain fetch-decode-execute loop; every fault is fatal and aborts the run
//! with whatever output was already printed left in place.
//!
//! # Components
//!
//! - **Runtime Memory**: global store, read-only constant store, and the
//!   stack of per-call local/temporary frames
//! - **Machine**: the instruction-pointer loop, the `era`/`param`/`gosub`/
//!   `endfunc` activation protocol, and the fault taxonomy

use thiserror::Error;

pub mod machine;
pub mod memory;

pub use machine::Machine;
pub use memory::{Frame, RuntimeMemory, Value};

/// Result type for machine operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Fatal run-time faults. Any one of these stops the machine immediately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("division by zero at instruction {0}")]
    DivisionByZero(usize),

    #[error("segmentation fault at address {0}")]
    SegmentationFault(u32),

    #[error("write to read-only address {0}")]
    ReadOnlyViolation(u32),

    #[error("call protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("unknown or malformed instruction at {0}")]
    UnknownInstruction(usize),

    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    #[error("output write failed: {0}")]
    Output(String),
}
