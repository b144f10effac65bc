//! The Machine
//!
//! A fetch-decode-execute loop over the finished quadruple list. Control
//! flow is the instruction pointer plus the call-return stack; the
//! `era`/`param`/`gosub`/`endfunc` protocol moves activation records from
//! the pending stack onto the live frame stack and back off. Printing is an
//! immediate side effect on the injected output sink, so partial output
//! survives a fatal fault.

use std::io::{self, Write};

use tracing::trace;

use quad_common::{Operand, Operator, Program};

use crate::memory::{Frame, RuntimeMemory, Value};
use crate::{Result, RuntimeError};

/// Steps a program may take before the machine gives up on it
pub const DEFAULT_STEP_LIMIT: u64 = 1_000_000;

/// The virtual machine.
///
/// Generic over its output sink: stdout for normal runs, a buffer in tests.
#[derive(Debug)]
pub struct Machine<W> {
    out: W,
    max_steps: u64,
}

impl Machine<io::Stdout> {
    /// A machine printing to stdout
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Machine<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Machine<W> {
    /// A machine printing to the given sink
    pub fn with_output(out: W) -> Self {
        Self { out, max_steps: DEFAULT_STEP_LIMIT }
    }

    /// Override the runaway-program step limit
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Recover the output sink, e.g. the capture buffer in tests
    pub fn into_output(self) -> W {
        self.out
    }

    /// Execute a program to completion or to its first fatal fault.
    ///
    /// The constant store is loaded from the artifact's pool before the
    /// first instruction; execution starts at instruction 0 and halts
    /// normally when the pointer runs off the end of the list.
    pub fn run(&mut self, program: &Program) -> Result<()> {
        let mut memory = RuntimeMemory::new(&program.constants);
        let mut call_stack: Vec<usize> = Vec::new();
        let mut pending: Vec<Frame> = Vec::new();
        let mut ip = 0usize;
        let mut steps = 0u64;

        while ip < program.quadruples.len() {
            steps += 1;
            if steps > self.max_steps {
                return Err(RuntimeError::StepLimitExceeded(self.max_steps));
            }

            let quad = &program.quadruples[ip];
            trace!(ip, quad = %quad, "execute");

            match quad.op {
                Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                    let left = memory.read(address_of(&quad.left, ip)?)?;
                    let right = memory.read(address_of(&quad.right, ip)?)?;
                    let value = arithmetic(quad.op, left, right, ip)?;
                    memory.write(address_of(&quad.result, ip)?, value)?;
                    ip += 1;
                }
                Operator::Lt
                | Operator::Gt
                | Operator::Eq
                | Operator::Ne
                | Operator::Le
                | Operator::Ge => {
                    let left = memory.read(address_of(&quad.left, ip)?)?;
                    let right = memory.read(address_of(&quad.right, ip)?)?;
                    let value = relational(quad.op, left, right, ip)?;
                    memory.write(address_of(&quad.result, ip)?, value)?;
                    ip += 1;
                }
                Operator::And | Operator::Or => {
                    let left = memory.read(address_of(&quad.left, ip)?)?;
                    let right = memory.read(address_of(&quad.right, ip)?)?;
                    let value = boolean(quad.op, left, right, ip)?;
                    memory.write(address_of(&quad.result, ip)?, value)?;
                    ip += 1;
                }
                Operator::Assign => {
                    let value = memory.read(address_of(&quad.left, ip)?)?;
                    memory.write(address_of(&quad.result, ip)?, value)?;
                    ip += 1;
                }
                Operator::Print => {
                    match &quad.left {
                        Operand::Literal(text) => self.print(text)?,
                        Operand::Address(address) => {
                            let value = memory.read(*address)?;
                            self.print(&value.to_string())?;
                        }
                        _ => return Err(RuntimeError::UnknownInstruction(ip)),
                    }
                    ip += 1;
                }
                Operator::Goto => {
                    ip = label_of(&quad.result, ip)?;
                }
                Operator::GotoFalse => {
                    let condition = memory.read(address_of(&quad.left, ip)?)?;
                    if condition.truthy() {
                        ip += 1;
                    } else {
                        ip = label_of(&quad.result, ip)?;
                    }
                }
                Operator::Era => {
                    pending.push(Frame::new());
                    ip += 1;
                }
                Operator::Param => {
                    let record = pending.last_mut().ok_or(RuntimeError::ProtocolViolation(
                        "param without a pending activation record",
                    ))?;
                    let value = memory.read(address_of(&quad.left, ip)?)?;
                    record.set_local(address_of(&quad.result, ip)?, value);
                    ip += 1;
                }
                Operator::Gosub => {
                    let record = pending.pop().ok_or(RuntimeError::ProtocolViolation(
                        "gosub without a pending activation record",
                    ))?;
                    call_stack.push(ip + 1);
                    memory.push_frame(record);
                    ip = label_of(&quad.result, ip)?;
                }
                Operator::EndFunc => {
                    let resume = call_stack.pop().ok_or(RuntimeError::ProtocolViolation(
                        "endfunc with an empty call-return stack",
                    ))?;
                    memory.pop_frame()?;
                    ip = resume;
                }
                Operator::Ret => {
                    // the body already stored its result in the return slot
                    ip += 1;
                }
            }
        }
        Ok(())
    }

    fn print(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(|e| RuntimeError::Output(e.to_string()))
    }
}

fn address_of(operand: &Operand, ip: usize) -> Result<u32> {
    operand.as_address().ok_or(RuntimeError::UnknownInstruction(ip))
}

fn label_of(operand: &Operand, ip: usize) -> Result<usize> {
    operand.as_label().ok_or(RuntimeError::UnknownInstruction(ip))
}

fn arithmetic(op: Operator, left: Value, right: Value, ip: usize) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            Operator::Add => Ok(Value::Int(a.wrapping_add(b))),
            Operator::Sub => Ok(Value::Int(a.wrapping_sub(b))),
            Operator::Mul => Ok(Value::Int(a.wrapping_mul(b))),
            Operator::Div => {
                if b == 0 {
                    Err(RuntimeError::DivisionByZero(ip))
                } else {
                    Ok(Value::Int(a.wrapping_div(b)))
                }
            }
            _ => Err(RuntimeError::UnknownInstruction(ip)),
        },
        (left, right) => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(RuntimeError::UnknownInstruction(ip));
            };
            match op {
                Operator::Add => Ok(Value::Float(a + b)),
                Operator::Sub => Ok(Value::Float(a - b)),
                Operator::Mul => Ok(Value::Float(a * b)),
                Operator::Div => {
                    if b == 0.0 {
                        Err(RuntimeError::DivisionByZero(ip))
                    } else {
                        Ok(Value::Float(a / b))
                    }
                }
                _ => Err(RuntimeError::UnknownInstruction(ip)),
            }
        }
    }
}

fn relational(op: Operator, left: Value, right: Value, ip: usize) -> Result<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (&left, &right) {
        // booleans compare for equality only
        return match op {
            Operator::Eq => Ok(Value::Bool(a == b)),
            Operator::Ne => Ok(Value::Bool(a != b)),
            _ => Err(RuntimeError::UnknownInstruction(ip)),
        };
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(RuntimeError::UnknownInstruction(ip));
    };
    let result = match op {
        Operator::Lt => a < b,
        Operator::Gt => a > b,
        Operator::Le => a <= b,
        Operator::Ge => a >= b,
        Operator::Eq => a == b,
        Operator::Ne => a != b,
        _ => return Err(RuntimeError::UnknownInstruction(ip)),
    };
    Ok(Value::Bool(result))
}

fn boolean(op: Operator, left: Value, right: Value, ip: usize) -> Result<Value> {
    match (left, right, op) {
        (Value::Bool(a), Value::Bool(b), Operator::And) => Ok(Value::Bool(a && b)),
        (Value::Bool(a), Value::Bool(b), Operator::Or) => Ok(Value::Bool(a || b)),
        _ => Err(RuntimeError::UnknownInstruction(ip)),
    }
}
