//! Runtime Memory
//!
//! A value store segmented exactly like the compile-time address space: the
//! single global store, the read-only constant store loaded once from the
//! program artifact, and a stack of local/temporary frame pairs, one pair
//! per live call. Reads and writes are routed purely by which range the
//! address falls in, so the layout in `quad_common::layout` is the single
//! authority on both sides.

use std::collections::HashMap;
use std::fmt;

use quad_common::layout::{segment_of, StorageClass};
use quad_common::{ConstValue, Constant, ScalarType};

use crate::{Result, RuntimeError};

/// A runtime value in one storage slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Truthiness for `gotof`: false, zero, and 0.0 are falsy
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(_) => true,
        }
    }

    /// Numeric view, for mixed-type arithmetic and comparisons
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&ConstValue> for Value {
    fn from(constant: &ConstValue) -> Self {
        match constant {
            ConstValue::Int(i) => Value::Int(*i),
            ConstValue::Float(f) => Value::Float(*f),
            ConstValue::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

/// The zero value a never-written slot of this segment type reads as
fn zero_value(ty: ScalarType) -> Value {
    match ty {
        ScalarType::Integer => Value::Int(0),
        ScalarType::Float => Value::Float(0.0),
        ScalarType::Boolean => Value::Bool(false),
        _ => Value::Str(String::new()),
    }
}

/// One activation record: the local and temporary stores of a single call
#[derive(Debug, Clone, Default)]
pub struct Frame {
    locals: HashMap<u32, Value>,
    temps: HashMap<u32, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a parameter slot before the frame goes live (the `param` phase
    /// of the call protocol)
    pub fn set_local(&mut self, address: u32, value: Value) {
        self.locals.insert(address, value);
    }
}

/// The machine's whole data memory
#[derive(Debug)]
pub struct RuntimeMemory {
    globals: HashMap<u32, Value>,
    constants: HashMap<u32, Value>,
    /// Live frames; the bottom one belongs to the main body and is never
    /// popped
    frames: Vec<Frame>,
}

impl RuntimeMemory {
    /// Fresh memory with the constant store loaded from the artifact pool
    pub fn new(pool: &[Constant]) -> Self {
        let constants = pool.iter().map(|c| (c.address, Value::from(&c.value))).collect();
        Self { globals: HashMap::new(), constants, frames: vec![Frame::new()] }
    }

    /// Read the value at a virtual address, routed by its range.
    ///
    /// A slot that was never written reads as the zero value of its
    /// segment's scalar type; only an address outside every range faults.
    pub fn read(&self, address: u32) -> Result<Value> {
        let segment = segment_of(address).ok_or(RuntimeError::SegmentationFault(address))?;
        let stored = match segment.class {
            StorageClass::Global => self.globals.get(&address),
            StorageClass::Constant => self.constants.get(&address),
            StorageClass::Local => self.frames.last().and_then(|f| f.locals.get(&address)),
            StorageClass::Temp => self.frames.last().and_then(|f| f.temps.get(&address)),
        };
        Ok(stored.cloned().unwrap_or_else(|| zero_value(segment.ty)))
    }

    /// Write a value to a virtual address, coercing numerics to the
    /// segment's scalar type (an integer widens into a float slot).
    pub fn write(&mut self, address: u32, value: Value) -> Result<()> {
        let segment = segment_of(address).ok_or(RuntimeError::SegmentationFault(address))?;
        let value = coerce(value, segment.ty);
        match segment.class {
            StorageClass::Constant => return Err(RuntimeError::ReadOnlyViolation(address)),
            StorageClass::Global => {
                self.globals.insert(address, value);
            }
            StorageClass::Local => {
                let frame = self
                    .frames
                    .last_mut()
                    .ok_or(RuntimeError::ProtocolViolation("no live frame"))?;
                frame.locals.insert(address, value);
            }
            StorageClass::Temp => {
                let frame = self
                    .frames
                    .last_mut()
                    .ok_or(RuntimeError::ProtocolViolation("no live frame"))?;
                frame.temps.insert(address, value);
            }
        }
        Ok(())
    }

    /// Activate a frame built up by `era`/`param`, paired with a fresh
    /// temporary store
    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Release the top local/temp frame pair on `endfunc`. The main body's
    /// base frame cannot be released.
    pub fn pop_frame(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(RuntimeError::ProtocolViolation("endfunc released the base frame"));
        }
        self.frames.pop();
        Ok(())
    }

    /// Depth of the live frame stack, counting the base frame
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }
}

/// Coerce a numeric value to the scalar type of the slot it lands in
fn coerce(value: Value, ty: ScalarType) -> Value {
    match (ty, value) {
        (ScalarType::Float, Value::Int(i)) => Value::Float(i as f64),
        (ScalarType::Integer, Value::Float(f)) => Value::Int(f as i64),
        (_, value) => value,
    }
}
