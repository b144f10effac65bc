//! Symbol & Procedure Directory
//!
//! Variable scopes and the procedure table. There are exactly two lookup
//! levels: the current procedure's local table (when inside one) and the
//! global table, checked in that order. A local may shadow a global;
//! re-declaring a name inside the same scope is an error.
//!
//! Declaring a procedure with a non-void return type reserves a global slot
//! named after the procedure; the body assigns its result there and callers
//! copy it out after `gosub` returns.

use std::collections::HashMap;

use quad_common::{ScalarType, StorageClass};

use crate::memory::AddressAllocator;
use crate::{Result, SemanticError};

/// A declared variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: ScalarType,
    pub address: u32,
    pub class: StorageClass,
}

/// One positional parameter of a procedure
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ScalarType,
    /// The parameter's slot inside the callee's local ranges
    pub address: u32,
}

/// A declared procedure
#[derive(Debug, Clone)]
pub struct ProcedureEntry {
    pub name: String,
    pub return_type: ScalarType,
    /// Parameters in declaration order; order is positional call matching
    pub parameters: Vec<Parameter>,
    /// Index of the first instruction of the body
    pub entry: Option<usize>,
    /// Global slot holding the return value, for non-void procedures
    pub return_slot: Option<u32>,
    locals: HashMap<String, Variable>,
}

/// Scopes and procedures for one compilation
#[derive(Debug, Default)]
pub struct Directory {
    globals: HashMap<String, Variable>,
    procedures: HashMap<String, ProcedureEntry>,
    /// Name of the procedure whose scope is current, or `None` at top level
    current: Option<String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable in the current scope, allocating its address.
    ///
    /// Fails with `DuplicateDeclaration` if the name already exists in that
    /// scope; shadowing a global from a local scope is fine.
    pub fn declare_variable(
        &mut self,
        alloc: &mut AddressAllocator,
        name: &str,
        ty: ScalarType,
    ) -> Result<u32> {
        match self.current.clone() {
            None => self.declare_global(alloc, name, ty),
            Some(proc_name) => {
                let address = alloc.local(ty)?;
                let entry = self
                    .procedures
                    .get_mut(&proc_name)
                    .ok_or(SemanticError::UnknownProcedure(proc_name.clone()))?;
                if entry.locals.contains_key(name) {
                    return Err(SemanticError::DuplicateDeclaration(name.to_string()));
                }
                entry.locals.insert(
                    name.to_string(),
                    Variable { name: name.to_string(), ty, address, class: StorageClass::Local },
                );
                Ok(address)
            }
        }
    }

    fn declare_global(
        &mut self,
        alloc: &mut AddressAllocator,
        name: &str,
        ty: ScalarType,
    ) -> Result<u32> {
        if self.globals.contains_key(name) {
            return Err(SemanticError::DuplicateDeclaration(name.to_string()));
        }
        let address = alloc.global(ty)?;
        self.globals.insert(
            name.to_string(),
            Variable { name: name.to_string(), ty, address, class: StorageClass::Global },
        );
        Ok(address)
    }

    /// Resolve a name: current locals first, then globals
    pub fn resolve(&self, name: &str) -> Option<&Variable> {
        if let Some(proc_name) = &self.current {
            if let Some(var) = self.procedures.get(proc_name).and_then(|p| p.locals.get(name)) {
                return Some(var);
            }
        }
        self.globals.get(name)
    }

    /// Declare a procedure. Non-void return types reserve the global
    /// return slot under the procedure's name.
    pub fn declare_procedure(
        &mut self,
        alloc: &mut AddressAllocator,
        name: &str,
        return_type: ScalarType,
    ) -> Result<()> {
        if self.procedures.contains_key(name) {
            return Err(SemanticError::DuplicateProcedure(name.to_string()));
        }
        let return_slot = if return_type == ScalarType::Void {
            None
        } else {
            Some(self.declare_global(alloc, name, return_type)?)
        };
        self.procedures.insert(
            name.to_string(),
            ProcedureEntry {
                name: name.to_string(),
                return_type,
                parameters: Vec::new(),
                entry: None,
                return_slot,
                locals: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Record the instruction index where a procedure's body starts
    pub fn set_entry(&mut self, name: &str, index: usize) -> Result<()> {
        let entry = self
            .procedures
            .get_mut(name)
            .ok_or(SemanticError::UnknownProcedure(name.to_string()))?;
        entry.entry = Some(index);
        Ok(())
    }

    /// Register the next positional parameter, allocating its local slot
    pub fn add_parameter(
        &mut self,
        alloc: &mut AddressAllocator,
        proc_name: &str,
        name: &str,
        ty: ScalarType,
    ) -> Result<u32> {
        let entry = self
            .procedures
            .get_mut(proc_name)
            .ok_or(SemanticError::UnknownProcedure(proc_name.to_string()))?;
        if entry.locals.contains_key(name) {
            return Err(SemanticError::DuplicateDeclaration(name.to_string()));
        }
        let address = alloc.local(ty)?;
        entry.locals.insert(
            name.to_string(),
            Variable { name: name.to_string(), ty, address, class: StorageClass::Local },
        );
        entry.parameters.push(Parameter { name: name.to_string(), ty, address });
        Ok(address)
    }

    /// Check a whole call signature: existence, arity, and exact positional
    /// parameter types (no implicit conversion across a call boundary)
    pub fn validate_call(&self, name: &str, argument_types: &[ScalarType]) -> Result<()> {
        let entry = self
            .procedures
            .get(name)
            .ok_or(SemanticError::UnknownProcedure(name.to_string()))?;
        if argument_types.len() != entry.parameters.len() {
            return Err(SemanticError::ArityMismatch {
                procedure: name.to_string(),
                expected: entry.parameters.len(),
                found: argument_types.len(),
            });
        }
        for (position, (argument, parameter)) in
            argument_types.iter().zip(entry.parameters.iter()).enumerate()
        {
            if *argument != parameter.ty {
                return Err(SemanticError::ArgumentTypeMismatch {
                    procedure: name.to_string(),
                    position: position + 1,
                    expected: parameter.ty,
                    found: *argument,
                });
            }
        }
        Ok(())
    }

    pub fn procedure(&self, name: &str) -> Option<&ProcedureEntry> {
        self.procedures.get(name)
    }

    /// Switch the current scope to a procedure's local scope
    pub fn enter(&mut self, name: &str) -> Result<()> {
        if !self.procedures.contains_key(name) {
            return Err(SemanticError::UnknownProcedure(name.to_string()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Switch back to the global scope
    pub fn exit(&mut self) {
        self.current = None;
    }

    /// Whether the current scope is the global one
    pub fn at_global_scope(&self) -> bool {
        self.current.is_none()
    }

    /// Name of the procedure whose scope is current, if any
    pub fn current_procedure(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_variable(&mut alloc, "x", ScalarType::Integer).unwrap();
        assert_eq!(
            dir.declare_variable(&mut alloc, "x", ScalarType::Float),
            Err(SemanticError::DuplicateDeclaration("x".into()))
        );
    }

    #[test]
    fn local_shadows_global() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        let global = dir.declare_variable(&mut alloc, "i", ScalarType::Integer).unwrap();
        dir.declare_procedure(&mut alloc, "f", ScalarType::Void).unwrap();
        dir.enter("f").unwrap();
        let local = dir.declare_variable(&mut alloc, "i", ScalarType::Integer).unwrap();
        assert_ne!(global, local);
        assert_eq!(dir.resolve("i").unwrap().address, local);
        dir.exit();
        assert_eq!(dir.resolve("i").unwrap().address, global);
    }

    #[test]
    fn locals_fall_through_to_globals() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_variable(&mut alloc, "k", ScalarType::Integer).unwrap();
        dir.declare_procedure(&mut alloc, "f", ScalarType::Void).unwrap();
        dir.enter("f").unwrap();
        assert_eq!(dir.resolve("k").unwrap().class, StorageClass::Global);
        assert!(dir.resolve("missing").is_none());
    }

    #[test]
    fn non_void_procedure_reserves_a_named_global_slot() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_procedure(&mut alloc, "factorial", ScalarType::Integer).unwrap();
        let slot = dir.procedure("factorial").unwrap().return_slot.unwrap();
        // the slot is resolvable by the procedure's name, like any global
        assert_eq!(dir.resolve("factorial").unwrap().address, slot);

        // a void procedure reserves nothing
        dir.declare_procedure(&mut alloc, "show", ScalarType::Void).unwrap();
        assert!(dir.procedure("show").unwrap().return_slot.is_none());
        assert!(dir.resolve("show").is_none());
    }

    #[test]
    fn duplicate_procedure_is_rejected() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_procedure(&mut alloc, "f", ScalarType::Void).unwrap();
        assert_eq!(
            dir.declare_procedure(&mut alloc, "f", ScalarType::Void),
            Err(SemanticError::DuplicateProcedure("f".into()))
        );
    }

    #[test]
    fn parameters_keep_declaration_order() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_procedure(&mut alloc, "f", ScalarType::Void).unwrap();
        dir.add_parameter(&mut alloc, "f", "a", ScalarType::Integer).unwrap();
        dir.add_parameter(&mut alloc, "f", "b", ScalarType::Integer).unwrap();
        let params = &dir.procedure("f").unwrap().parameters;
        assert_eq!(params[0].name, "a");
        assert_eq!(params[1].name, "b");
        assert!(params[0].address < params[1].address);
    }

    #[test]
    fn validate_call_checks_arity_then_types() {
        let mut alloc = AddressAllocator::new();
        let mut dir = Directory::new();
        dir.declare_procedure(&mut alloc, "f", ScalarType::Void).unwrap();
        dir.add_parameter(&mut alloc, "f", "a", ScalarType::Integer).unwrap();
        dir.add_parameter(&mut alloc, "f", "b", ScalarType::Float).unwrap();

        assert!(dir.validate_call("f", &[ScalarType::Integer, ScalarType::Float]).is_ok());
        assert_eq!(
            dir.validate_call("f", &[ScalarType::Integer]),
            Err(SemanticError::ArityMismatch { procedure: "f".into(), expected: 2, found: 1 })
        );
        // exact match only: an integer does not widen across a call boundary
        assert_eq!(
            dir.validate_call("f", &[ScalarType::Integer, ScalarType::Integer]),
            Err(SemanticError::ArgumentTypeMismatch {
                procedure: "f".into(),
                position: 2,
                expected: ScalarType::Float,
                found: ScalarType::Integer,
            })
        );
        assert_eq!(
            dir.validate_call("missing", &[]),
            Err(SemanticError::UnknownProcedure("missing".into()))
        );
    }
}
