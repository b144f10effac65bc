//! Quadruple Generator
//!
//! The semantic-action surface of the compiler. An external front-end (or a
//! test) fires these methods in the single left-to-right, depth-first order
//! of a conventional operator-precedence parse; the generator maintains the
//! operand, type, and operator stacks, a tagged control-structure stack for
//! jump backpatching, and a call-construction stack for nested calls, and
//! appends quadruples to the growing program.
//!
//! Every construct is validated against the type table and the symbol
//! directory before an instruction for it is committed; the first error
//! aborts the compilation.

use tracing::{debug, trace};

use quad_common::{ConstValue, Operand, Operator, Program, Quadruple, ScalarType};

use crate::cube;
use crate::memory::AddressAllocator;
use crate::symbols::Directory;
use crate::{Result, SemanticError};

/// One entry of the tagged control-structure stack.
///
/// Each variant records exactly the pending instruction indices its
/// construct still owes a patch to, so popping is checked by kind rather
/// than by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlFrame {
    /// `if` whose false-branch jump is still pending
    If { false_jump: usize },
    /// `if/else` past the `else`: the jump over the else block is pending
    Else { end_jump: usize },
    /// `while` whose condition has not been reduced yet
    WhileHeader { start: usize },
    /// `while` past the condition: exit jump pending, start recorded
    While { start: usize, false_jump: usize },
}

/// A call being assembled between `begin_call` and its matching end event
#[derive(Debug, Clone)]
struct CallFrame {
    name: String,
    args: Vec<ScalarType>,
}

/// The compilation context: one per program, never reused.
///
/// Owns the allocator and the symbol directory alongside the ephemeral
/// generation stacks; `finish` consumes it and yields the immutable
/// [`Program`] artifact.
#[derive(Debug)]
pub struct QuadGenerator {
    alloc: AddressAllocator,
    symbols: Directory,
    quads: Vec<Quadruple>,
    operands: Vec<u32>,
    types: Vec<ScalarType>,
    operators: Vec<Operator>,
    control: Vec<ControlFrame>,
    calls: Vec<CallFrame>,
    /// Index of the bootstrap jump over the procedure bodies, if one exists
    bootstrap: Option<usize>,
}

impl QuadGenerator {
    pub fn new() -> Self {
        Self {
            alloc: AddressAllocator::new(),
            symbols: Directory::new(),
            quads: Vec::new(),
            operands: Vec::new(),
            types: Vec::new(),
            operators: Vec::new(),
            control: Vec::new(),
            calls: Vec::new(),
            bootstrap: None,
        }
    }

    /// Index the next emitted quadruple will get
    pub fn next_index(&self) -> usize {
        self.quads.len()
    }

    /// The instructions emitted so far
    pub fn quadruples(&self) -> &[Quadruple] {
        &self.quads
    }

    pub fn symbols(&self) -> &Directory {
        &self.symbols
    }

    fn emit(&mut self, quad: Quadruple) -> usize {
        let index = self.quads.len();
        trace!(index, quad = %quad, "emit");
        self.quads.push(quad);
        index
    }

    /// Fill in a pending jump's target. Each pending jump is patched
    /// exactly once; the tagged control stack guarantees it.
    fn patch(&mut self, index: usize, target: usize) {
        debug!(index, target, "patch jump");
        self.quads[index].result = Operand::Label(target);
    }

    fn push_operand(&mut self, address: u32, ty: ScalarType) {
        self.operands.push(address);
        self.types.push(ty);
    }

    fn pop_operand(&mut self) -> Result<(u32, ScalarType)> {
        match (self.operands.pop(), self.types.pop()) {
            (Some(address), Some(ty)) => Ok((address, ty)),
            _ => Err(SemanticError::UnbalancedGenerator("operand stack is empty")),
        }
    }

    // ------------------------------------------------------------------
    // declarations
    // ------------------------------------------------------------------

    /// Declare a variable in the current scope
    pub fn declare_variable(&mut self, name: &str, ty: ScalarType) -> Result<()> {
        self.symbols.declare_variable(&mut self.alloc, name, ty)?;
        Ok(())
    }

    /// Start a procedure: declare it, switch to its scope, and record its
    /// entry index as the next instruction to be emitted.
    ///
    /// The first procedure also reserves quadruple 0 as a pending jump over
    /// all procedure bodies, patched when the main body begins.
    pub fn begin_procedure(&mut self, name: &str, return_type: ScalarType) -> Result<()> {
        if self.bootstrap.is_none() {
            let index = self.emit(Quadruple::new(
                Operator::Goto,
                Operand::Empty,
                Operand::Empty,
                Operand::Empty,
            ));
            self.bootstrap = Some(index);
        }
        self.symbols.declare_procedure(&mut self.alloc, name, return_type)?;
        self.symbols.enter(name)?;
        let entry = self.next_index();
        self.symbols.set_entry(name, entry)?;
        Ok(())
    }

    /// Register the next positional parameter of the open procedure
    pub fn add_parameter(&mut self, name: &str, ty: ScalarType) -> Result<()> {
        let proc_name = self
            .current_procedure()
            .ok_or(SemanticError::UnbalancedGenerator("parameter outside a procedure"))?;
        self.symbols.add_parameter(&mut self.alloc, &proc_name, name, ty)?;
        Ok(())
    }

    /// Close the open procedure's body and return to the global scope
    pub fn end_procedure(&mut self) -> Result<()> {
        if self.symbols.at_global_scope() {
            return Err(SemanticError::UnbalancedGenerator("end_procedure at global scope"));
        }
        self.emit(Quadruple::new(
            Operator::EndFunc,
            Operand::Empty,
            Operand::Empty,
            Operand::Empty,
        ));
        self.symbols.exit();
        Ok(())
    }

    /// Mark the start of the main body, patching the bootstrap jump
    pub fn begin_main(&mut self) -> Result<()> {
        if !self.symbols.at_global_scope() {
            return Err(SemanticError::UnbalancedGenerator("main body inside a procedure"));
        }
        if let Some(index) = self.bootstrap {
            let target = self.next_index();
            self.patch(index, target);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    /// Push a resolved variable's address and type
    pub fn push_variable(&mut self, name: &str) -> Result<()> {
        let var = self
            .symbols
            .resolve(name)
            .ok_or_else(|| SemanticError::UndeclaredVariable(name.to_string()))?;
        let (address, ty) = (var.address, var.ty);
        self.push_operand(address, ty);
        Ok(())
    }

    /// Push an integer literal, pooling it in the constant table
    pub fn push_int(&mut self, value: i64) -> Result<()> {
        let address = self.alloc.constant(ConstValue::Int(value))?;
        self.push_operand(address, ScalarType::Integer);
        Ok(())
    }

    /// Push a float literal, pooling it in the constant table
    pub fn push_float(&mut self, value: f64) -> Result<()> {
        let address = self.alloc.constant(ConstValue::Float(value))?;
        self.push_operand(address, ScalarType::Float);
        Ok(())
    }

    /// Push a pending binary operator
    pub fn push_operator(&mut self, op: Operator) {
        self.operators.push(op);
    }

    /// Reduce one completed sub-expression: pop the top operator and its
    /// two operands, consult the type table, and emit into a fresh temp.
    pub fn reduce_binary(&mut self) -> Result<()> {
        let op = self
            .operators
            .pop()
            .ok_or(SemanticError::UnbalancedGenerator("operator stack is empty"))?;
        let (right, right_ty) = self.pop_operand()?;
        let (left, left_ty) = self.pop_operand()?;
        let result_ty = cube::result_type(left_ty, right_ty, op);
        if result_ty == ScalarType::Error {
            return Err(SemanticError::TypeMismatch { op, left: left_ty, right: right_ty });
        }
        let temp = self.alloc.temp(result_ty)?;
        self.emit(Quadruple::new(
            op,
            Operand::Address(left),
            Operand::Address(right),
            Operand::Address(temp),
        ));
        self.push_operand(temp, result_ty);
        Ok(())
    }

    /// Unary minus: a single-operand reduction that keeps the operand's own
    /// numeric type, lowered to a multiplication by the pooled constant -1
    pub fn negate(&mut self) -> Result<()> {
        let (address, ty) = self.pop_operand()?;
        if !ty.is_numeric() {
            return Err(SemanticError::TypeMismatch { op: Operator::Sub, left: ty, right: ty });
        }
        let minus_one = self.alloc.constant(ConstValue::Int(-1))?;
        let temp = self.alloc.temp(ty)?;
        self.emit(Quadruple::new(
            Operator::Mul,
            Operand::Address(address),
            Operand::Address(minus_one),
            Operand::Address(temp),
        ));
        self.push_operand(temp, ty);
        Ok(())
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    /// Assign the finished expression on top of the operand stack to a
    /// variable, checking assignment compatibility
    pub fn assign(&mut self, name: &str) -> Result<()> {
        let (source, source_ty) = self.pop_operand()?;
        let target = self
            .symbols
            .resolve(name)
            .ok_or_else(|| SemanticError::UndeclaredVariable(name.to_string()))?;
        let (target_address, target_ty) = (target.address, target.ty);
        if cube::result_type(target_ty, source_ty, Operator::Assign) == ScalarType::Error {
            return Err(SemanticError::TypeMismatch {
                op: Operator::Assign,
                left: target_ty,
                right: source_ty,
            });
        }
        self.emit(Quadruple::new(
            Operator::Assign,
            Operand::Address(source),
            Operand::Empty,
            Operand::Address(target_address),
        ));
        Ok(())
    }

    /// Print a string literal, pooled into the constant-string range
    pub fn print_literal(&mut self, text: &str) -> Result<()> {
        let address = self.alloc.constant(ConstValue::Str(text.to_string()))?;
        self.emit(Quadruple::new(
            Operator::Print,
            Operand::Address(address),
            Operand::Empty,
            Operand::Empty,
        ));
        Ok(())
    }

    /// Print the finished expression on top of the operand stack
    pub fn print_value(&mut self) -> Result<()> {
        let (address, _) = self.pop_operand()?;
        self.emit(Quadruple::new(
            Operator::Print,
            Operand::Address(address),
            Operand::Empty,
            Operand::Empty,
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // conditionals and loops
    // ------------------------------------------------------------------

    /// Consume the controlling expression and open an `if`
    pub fn begin_if(&mut self) -> Result<()> {
        let false_jump = self.emit_condition_jump()?;
        self.control.push(ControlFrame::If { false_jump });
        Ok(())
    }

    /// Switch the open `if` into its `else` branch
    pub fn begin_else(&mut self) -> Result<()> {
        match self.control.pop() {
            Some(ControlFrame::If { false_jump }) => {
                let end_jump = self.emit(Quadruple::new(
                    Operator::Goto,
                    Operand::Empty,
                    Operand::Empty,
                    Operand::Empty,
                ));
                let target = self.next_index();
                self.patch(false_jump, target);
                self.control.push(ControlFrame::Else { end_jump });
                Ok(())
            }
            _ => Err(SemanticError::UnbalancedGenerator("else without an open if")),
        }
    }

    /// Close the open `if` or `if/else`
    pub fn end_if(&mut self) -> Result<()> {
        match self.control.pop() {
            Some(ControlFrame::If { false_jump }) => {
                let target = self.next_index();
                self.patch(false_jump, target);
                Ok(())
            }
            Some(ControlFrame::Else { end_jump }) => {
                let target = self.next_index();
                self.patch(end_jump, target);
                Ok(())
            }
            _ => Err(SemanticError::UnbalancedGenerator("end_if without an open if")),
        }
    }

    /// Record the loop start before the condition is evaluated
    pub fn begin_while(&mut self) {
        let start = self.next_index();
        self.control.push(ControlFrame::WhileHeader { start });
    }

    /// Consume the loop condition at the `do` boundary
    pub fn while_do(&mut self) -> Result<()> {
        match self.control.pop() {
            Some(ControlFrame::WhileHeader { start }) => {
                let false_jump = self.emit_condition_jump()?;
                self.control.push(ControlFrame::While { start, false_jump });
                Ok(())
            }
            _ => Err(SemanticError::UnbalancedGenerator("while_do without an open while")),
        }
    }

    /// Close the open loop: jump back to the condition, patch the exit
    pub fn end_while(&mut self) -> Result<()> {
        match self.control.pop() {
            Some(ControlFrame::While { start, false_jump }) => {
                self.emit(Quadruple::new(
                    Operator::Goto,
                    Operand::Empty,
                    Operand::Empty,
                    Operand::Label(start),
                ));
                let target = self.next_index();
                self.patch(false_jump, target);
                Ok(())
            }
            _ => Err(SemanticError::UnbalancedGenerator("end_while without an open while")),
        }
    }

    /// Pop a boolean condition and emit its pending `gotof`
    fn emit_condition_jump(&mut self) -> Result<usize> {
        let (condition, ty) = self.pop_operand()?;
        if ty != ScalarType::Boolean {
            return Err(SemanticError::TypeMismatch {
                op: Operator::GotoFalse,
                left: ty,
                right: ScalarType::Boolean,
            });
        }
        Ok(self.emit(Quadruple::new(
            Operator::GotoFalse,
            Operand::Address(condition),
            Operand::Empty,
            Operand::Empty,
        )))
    }

    // ------------------------------------------------------------------
    // procedure calls
    // ------------------------------------------------------------------

    /// Open a call: check the callee exists and reserve its activation
    /// record with `era`
    pub fn begin_call(&mut self, name: &str) -> Result<()> {
        if self.symbols.procedure(name).is_none() {
            return Err(SemanticError::UnknownProcedure(name.to_string()));
        }
        self.emit(Quadruple::new(
            Operator::Era,
            Operand::Literal(name.to_string()),
            Operand::Empty,
            Operand::Empty,
        ));
        self.calls.push(CallFrame { name: name.to_string(), args: Vec::new() });
        Ok(())
    }

    /// Consume one evaluated argument, matching it positionally against the
    /// callee's parameter list and emitting its `param`
    pub fn call_argument(&mut self) -> Result<()> {
        let (address, ty) = self.pop_operand()?;
        let (name, position) = match self.calls.last() {
            Some(frame) => (frame.name.clone(), frame.args.len()),
            None => return Err(SemanticError::UnbalancedGenerator("argument outside a call")),
        };
        let entry = self
            .symbols
            .procedure(&name)
            .ok_or_else(|| SemanticError::UnknownProcedure(name.clone()))?;
        if position >= entry.parameters.len() {
            return Err(SemanticError::ArityMismatch {
                procedure: name,
                expected: entry.parameters.len(),
                found: position + 1,
            });
        }
        let parameter = entry.parameters[position].clone();
        if ty != parameter.ty {
            return Err(SemanticError::ArgumentTypeMismatch {
                procedure: name,
                position: position + 1,
                expected: parameter.ty,
                found: ty,
            });
        }
        self.emit(Quadruple::new(
            Operator::Param,
            Operand::Address(address),
            Operand::Empty,
            Operand::Address(parameter.address),
        ));
        if let Some(frame) = self.calls.last_mut() {
            frame.args.push(ty);
        }
        Ok(())
    }

    /// Close a call used as a statement; any return value is discarded
    pub fn end_call_statement(&mut self) -> Result<()> {
        self.end_call()?;
        Ok(())
    }

    /// Close a call used inside an expression: the callee must return a
    /// value, and the return slot is copied into a fresh temp pushed as the
    /// call's result
    pub fn end_call_expression(&mut self) -> Result<()> {
        let name = match self.calls.last() {
            Some(frame) => frame.name.clone(),
            None => return Err(SemanticError::UnbalancedGenerator("call end without begin_call")),
        };
        let entry = self
            .symbols
            .procedure(&name)
            .ok_or_else(|| SemanticError::UnknownProcedure(name.clone()))?;
        if entry.return_type == ScalarType::Void {
            return Err(SemanticError::VoidInExpression(name));
        }
        let return_type = entry.return_type;
        let slot = entry
            .return_slot
            .ok_or(SemanticError::UnbalancedGenerator("value procedure without return slot"))?;
        self.end_call()?;
        let temp = self.alloc.temp(return_type)?;
        self.emit(Quadruple::new(
            Operator::Assign,
            Operand::Address(slot),
            Operand::Empty,
            Operand::Address(temp),
        ));
        self.push_operand(temp, return_type);
        Ok(())
    }

    fn end_call(&mut self) -> Result<()> {
        let frame = self
            .calls
            .pop()
            .ok_or(SemanticError::UnbalancedGenerator("call end without begin_call"))?;
        self.symbols.validate_call(&frame.name, &frame.args)?;
        let entry = self
            .symbols
            .procedure(&frame.name)
            .ok_or_else(|| SemanticError::UnknownProcedure(frame.name.clone()))?;
        let target = entry
            .entry
            .ok_or(SemanticError::UnbalancedGenerator("call to a procedure without a body"))?;
        self.emit(Quadruple::new(
            Operator::Gosub,
            Operand::Literal(frame.name),
            Operand::Empty,
            Operand::Label(target),
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // finalization
    // ------------------------------------------------------------------

    /// Verify the generator is balanced and every jump resolved, then yield
    /// the immutable program artifact
    pub fn finish(self) -> Result<Program> {
        if !self.operands.is_empty() || !self.types.is_empty() {
            return Err(SemanticError::UnbalancedGenerator("operand stack not empty"));
        }
        if !self.operators.is_empty() {
            return Err(SemanticError::UnbalancedGenerator("operator stack not empty"));
        }
        if !self.control.is_empty() {
            return Err(SemanticError::UnbalancedGenerator("control stack not empty"));
        }
        if !self.calls.is_empty() {
            return Err(SemanticError::UnbalancedGenerator("call stack not empty"));
        }
        if !self.symbols.at_global_scope() {
            return Err(SemanticError::UnbalancedGenerator("finalized inside a procedure"));
        }
        for (index, quad) in self.quads.iter().enumerate() {
            if quad.is_pending_jump() {
                return Err(SemanticError::DanglingJump(index));
            }
        }
        Ok(Program { quadruples: self.quads, constants: self.alloc.into_constant_pool() })
    }

    fn current_procedure(&self) -> Option<String> {
        self.symbols.current_procedure().map(str::to_string)
    }
}

impl Default for QuadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_common::layout::{CONST_INT_BASE, GLOBAL_INT_BASE, LOCAL_INT_BASE, TEMP_INT_BASE};

    fn addr(operand: &Operand) -> u32 {
        operand.as_address().expect("expected an address operand")
    }

    #[test]
    fn precedence_order_reaches_the_quadruples() {
        // x = 10 + 5 * 2  -- the multiplication reduces first
        let mut g = QuadGenerator::new();
        g.declare_variable("x", ScalarType::Integer).unwrap();
        g.push_int(10).unwrap();
        g.push_operator(Operator::Add);
        g.push_int(5).unwrap();
        g.push_operator(Operator::Mul);
        g.push_int(2).unwrap();
        g.reduce_binary().unwrap();
        g.reduce_binary().unwrap();
        g.assign("x").unwrap();

        let quads = g.quadruples();
        assert_eq!(quads.len(), 3);
        assert_eq!(quads[0].op, Operator::Mul);
        assert_eq!(addr(&quads[0].left), CONST_INT_BASE + 1); // 5
        assert_eq!(addr(&quads[0].right), CONST_INT_BASE + 2); // 2
        assert_eq!(addr(&quads[0].result), TEMP_INT_BASE);
        assert_eq!(quads[1].op, Operator::Add);
        assert_eq!(addr(&quads[1].left), CONST_INT_BASE); // 10
        assert_eq!(addr(&quads[1].right), TEMP_INT_BASE);
        assert_eq!(quads[2].op, Operator::Assign);
        assert_eq!(addr(&quads[2].result), GLOBAL_INT_BASE);
    }

    #[test]
    fn mixed_operands_promote_the_temporary() {
        let mut g = QuadGenerator::new();
        g.declare_variable("f", ScalarType::Float).unwrap();
        g.push_variable("f").unwrap();
        g.push_operator(Operator::Mul);
        g.push_int(3).unwrap();
        g.reduce_binary().unwrap();
        // float * int lands in the temp-float range
        let result = addr(&g.quadruples()[0].result);
        assert_eq!(result, quad_common::layout::TEMP_FLOAT_BASE);
    }

    #[test]
    fn invalid_operands_commit_no_instruction() {
        let mut g = QuadGenerator::new();
        g.push_int(1).unwrap();
        g.push_int(2).unwrap();
        g.push_operator(Operator::Lt);
        g.reduce_binary().unwrap(); // bool temp
        g.push_operator(Operator::Add);
        g.push_int(3).unwrap();
        let before = g.next_index();
        let err = g.reduce_binary().unwrap_err();
        assert_eq!(
            err,
            SemanticError::TypeMismatch {
                op: Operator::Add,
                left: ScalarType::Boolean,
                right: ScalarType::Integer,
            }
        );
        assert_eq!(g.next_index(), before);
    }

    #[test]
    fn assignment_rejects_narrowing() {
        let mut g = QuadGenerator::new();
        g.declare_variable("n", ScalarType::Integer).unwrap();
        g.push_float(2.5).unwrap();
        let err = g.assign("n").unwrap_err();
        assert!(matches!(err, SemanticError::TypeMismatch { op: Operator::Assign, .. }));
    }

    #[test]
    fn undeclared_names_are_caught_on_both_sides() {
        let mut g = QuadGenerator::new();
        assert_eq!(
            g.push_variable("ghost").unwrap_err(),
            SemanticError::UndeclaredVariable("ghost".into())
        );
        g.push_int(1).unwrap();
        assert_eq!(
            g.assign("ghost").unwrap_err(),
            SemanticError::UndeclaredVariable("ghost".into())
        );
    }

    #[test]
    fn if_without_else_patches_past_the_then_block() {
        let mut g = QuadGenerator::new();
        g.declare_variable("x", ScalarType::Integer).unwrap();
        g.push_variable("x").unwrap();
        g.push_int(0).unwrap();
        g.push_operator(Operator::Gt);
        g.reduce_binary().unwrap(); // quad 0
        g.begin_if().unwrap(); // quad 1, pending
        g.push_int(1).unwrap();
        g.assign("x").unwrap(); // quad 2
        g.end_if().unwrap();

        let quads = g.quadruples();
        assert_eq!(quads[1].op, Operator::GotoFalse);
        assert_eq!(quads[1].result, Operand::Label(3));
        assert!(quads.iter().all(|q| !q.is_pending_jump()));
    }

    #[test]
    fn if_else_patches_both_jumps() {
        let mut g = QuadGenerator::new();
        g.declare_variable("x", ScalarType::Integer).unwrap();
        g.push_variable("x").unwrap();
        g.push_int(0).unwrap();
        g.push_operator(Operator::Lt);
        g.reduce_binary().unwrap(); // 0: (<)
        g.begin_if().unwrap(); // 1: gotof
        g.push_int(1).unwrap();
        g.assign("x").unwrap(); // 2
        g.begin_else().unwrap(); // 3: goto
        g.push_int(2).unwrap();
        g.assign("x").unwrap(); // 4
        g.end_if().unwrap();

        let quads = g.quadruples();
        assert_eq!(quads[1].result, Operand::Label(4)); // false -> else block
        assert_eq!(quads[3].result, Operand::Label(5)); // then -> past the else
        assert!(quads.iter().all(|q| !q.is_pending_jump()));
    }

    #[test]
    fn while_jumps_back_to_the_condition() {
        let mut g = QuadGenerator::new();
        g.declare_variable("i", ScalarType::Integer).unwrap();
        g.begin_while();
        g.push_variable("i").unwrap();
        g.push_int(10).unwrap();
        g.push_operator(Operator::Lt);
        g.reduce_binary().unwrap(); // 0: (<)
        g.while_do().unwrap(); // 1: gotof
        g.push_variable("i").unwrap();
        g.push_operator(Operator::Add);
        g.push_int(1).unwrap();
        g.reduce_binary().unwrap(); // 2: (+)
        g.assign("i").unwrap(); // 3
        g.end_while().unwrap(); // 4: goto

        let quads = g.quadruples();
        assert_eq!(quads[4].op, Operator::Goto);
        assert_eq!(quads[4].result, Operand::Label(0));
        assert_eq!(quads[1].result, Operand::Label(5));
    }

    #[test]
    fn non_boolean_condition_is_a_type_mismatch() {
        let mut g = QuadGenerator::new();
        g.push_int(1).unwrap();
        let err = g.begin_if().unwrap_err();
        assert!(matches!(err, SemanticError::TypeMismatch { op: Operator::GotoFalse, .. }));
    }

    #[test]
    fn call_protocol_emits_era_param_gosub_and_copies_the_result() {
        let mut g = QuadGenerator::new();
        g.declare_variable("x", ScalarType::Integer).unwrap();
        g.begin_procedure("twice", ScalarType::Integer).unwrap(); // 0: goto main
        g.add_parameter("a", ScalarType::Integer).unwrap();
        g.push_variable("a").unwrap();
        g.push_operator(Operator::Mul);
        g.push_int(2).unwrap();
        g.reduce_binary().unwrap(); // 1
        g.assign("twice").unwrap(); // 2: into the return slot
        g.end_procedure().unwrap(); // 3: endfunc
        g.begin_main().unwrap();
        g.begin_call("twice").unwrap(); // 4: era
        g.push_int(5).unwrap();
        g.call_argument().unwrap(); // 5: param
        g.end_call_expression().unwrap(); // 6: gosub, 7: copy slot
        g.assign("x").unwrap(); // 8

        let quads = g.quadruples();
        assert_eq!(quads[0].result, Operand::Label(4)); // bootstrap over the body
        assert_eq!(quads[4].op, Operator::Era);
        assert_eq!(quads[5].op, Operator::Param);
        assert_eq!(addr(&quads[5].result), LOCAL_INT_BASE); // the parameter slot
        assert_eq!(quads[6].op, Operator::Gosub);
        assert_eq!(quads[6].result, Operand::Label(1)); // body entry
        assert_eq!(quads[7].op, Operator::Assign); // return slot -> temp

        let program = g.finish().unwrap();
        assert!(program.quadruples.iter().all(|q| !q.is_pending_jump()));
    }

    #[test]
    fn arity_and_argument_type_violations() {
        let mut g = QuadGenerator::new();
        g.begin_procedure("p", ScalarType::Void).unwrap();
        g.add_parameter("a", ScalarType::Integer).unwrap();
        g.end_procedure().unwrap();
        g.begin_main().unwrap();

        // too few arguments, caught when the call closes
        g.begin_call("p").unwrap();
        assert_eq!(
            g.end_call_statement().unwrap_err(),
            SemanticError::ArityMismatch { procedure: "p".into(), expected: 1, found: 0 }
        );

        // wrong positional type, caught at the argument
        let mut g = QuadGenerator::new();
        g.begin_procedure("p", ScalarType::Void).unwrap();
        g.add_parameter("a", ScalarType::Integer).unwrap();
        g.end_procedure().unwrap();
        g.begin_main().unwrap();
        g.begin_call("p").unwrap();
        g.push_float(1.5).unwrap();
        assert_eq!(
            g.call_argument().unwrap_err(),
            SemanticError::ArgumentTypeMismatch {
                procedure: "p".into(),
                position: 1,
                expected: ScalarType::Integer,
                found: ScalarType::Float,
            }
        );
    }

    #[test]
    fn void_procedures_cannot_appear_in_expressions() {
        let mut g = QuadGenerator::new();
        g.begin_procedure("show", ScalarType::Void).unwrap();
        g.end_procedure().unwrap();
        g.begin_main().unwrap();
        g.begin_call("show").unwrap();
        assert_eq!(
            g.end_call_expression().unwrap_err(),
            SemanticError::VoidInExpression("show".into())
        );
    }

    #[test]
    fn calling_an_unknown_procedure_fails_up_front() {
        let mut g = QuadGenerator::new();
        assert_eq!(
            g.begin_call("nowhere").unwrap_err(),
            SemanticError::UnknownProcedure("nowhere".into())
        );
    }

    #[test]
    fn finish_rejects_leftover_state() {
        let mut g = QuadGenerator::new();
        g.push_int(1).unwrap();
        assert!(matches!(g.finish(), Err(SemanticError::UnbalancedGenerator(_))));

        let mut g = QuadGenerator::new();
        g.declare_variable("x", ScalarType::Integer).unwrap();
        g.begin_while();
        g.push_variable("x").unwrap();
        g.push_int(0).unwrap();
        g.push_operator(Operator::Gt);
        g.reduce_binary().unwrap();
        g.while_do().unwrap();
        // loop never closed
        assert!(matches!(g.finish(), Err(SemanticError::UnbalancedGenerator(_))));
    }

    #[test]
    fn unpatched_bootstrap_is_a_dangling_jump() {
        let mut g = QuadGenerator::new();
        g.begin_procedure("f", ScalarType::Void).unwrap();
        g.end_procedure().unwrap();
        // begin_main never fired, so quad 0 still points nowhere
        assert_eq!(g.finish().unwrap_err(), SemanticError::DanglingJump(0));
    }

    #[test]
    fn unary_minus_keeps_the_operand_type() {
        let mut g = QuadGenerator::new();
        g.declare_variable("f", ScalarType::Float).unwrap();
        g.push_variable("f").unwrap();
        g.negate().unwrap();
        let quads = g.quadruples();
        assert_eq!(quads[0].op, Operator::Mul);
        assert_eq!(addr(&quads[0].result), quad_common::layout::TEMP_FLOAT_BASE);

        // not defined for booleans
        let mut g = QuadGenerator::new();
        g.push_int(1).unwrap();
        g.push_int(2).unwrap();
        g.push_operator(Operator::Eq);
        g.reduce_binary().unwrap();
        assert!(g.negate().is_err());
    }
}
