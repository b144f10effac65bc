//! Virtual Address Allocator
//!
//! Hands out addresses from the ten partitioned ranges defined in
//! `quad_common::layout`. Counters only ever move forward during one
//! compilation; `reset` restores every range to its base for the next one.
//! Literal constants are pooled: the same `(text, type)` pair always maps to
//! the same address, and the finished pool travels with the program artifact
//! so the machine can load its read-only store.

use std::collections::HashMap;
use thiserror::Error;

use quad_common::layout::{self, StorageClass, SEGMENTS};
use quad_common::{ConstValue, Constant, ScalarType};

/// Errors from the address allocator
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("no address range for {class} {ty}")]
    UnsupportedType { class: StorageClass, ty: ScalarType },

    #[error("address range for {class} {ty} is exhausted")]
    SegmentExhausted { class: StorageClass, ty: ScalarType },
}

/// Allocator state for one compilation
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    /// Next free address per segment, parallel to `layout::SEGMENTS`
    next: [u32; SEGMENTS.len()],
    /// Dedup table: (literal text, type) -> pooled address
    constants: HashMap<(String, ScalarType), u32>,
    /// Pool entries in allocation order, with typed payloads
    pool: Vec<Constant>,
}

impl AddressAllocator {
    pub fn new() -> Self {
        let mut next = [0u32; SEGMENTS.len()];
        for (slot, segment) in next.iter_mut().zip(SEGMENTS.iter()) {
            *slot = segment.base;
        }
        Self { next, constants: HashMap::new(), pool: Vec::new() }
    }

    /// Restore every counter to its range base and drop the constant pool.
    /// Required between independent compilations.
    pub fn reset(&mut self) {
        for (slot, segment) in self.next.iter_mut().zip(SEGMENTS.iter()) {
            *slot = segment.base;
        }
        self.constants.clear();
        self.pool.clear();
    }

    /// Next free address for a global of the given type
    pub fn global(&mut self, ty: ScalarType) -> Result<u32, AllocError> {
        self.bump(StorageClass::Global, ty)
    }

    /// Next free address for a local (or parameter) of the given type
    pub fn local(&mut self, ty: ScalarType) -> Result<u32, AllocError> {
        self.bump(StorageClass::Local, ty)
    }

    /// Next free address for an expression temporary of the given type
    pub fn temp(&mut self, ty: ScalarType) -> Result<u32, AllocError> {
        self.bump(StorageClass::Temp, ty)
    }

    /// Address for a literal constant, pooling duplicates.
    ///
    /// The same literal text with the same type always answers the same
    /// address and consumes no new slot after the first request.
    pub fn constant(&mut self, value: ConstValue) -> Result<u32, AllocError> {
        let key = (constant_text(&value), value.scalar_type());
        if let Some(&address) = self.constants.get(&key) {
            return Ok(address);
        }
        let address = self.bump(StorageClass::Constant, key.1)?;
        self.constants.insert(key, address);
        self.pool.push(Constant { address, value });
        Ok(address)
    }

    /// The constant pool accumulated so far, in allocation order
    pub fn constant_pool(&self) -> &[Constant] {
        &self.pool
    }

    /// Consume the allocator, yielding the pool for the program artifact
    pub fn into_constant_pool(self) -> Vec<Constant> {
        self.pool
    }

    fn bump(&mut self, class: StorageClass, ty: ScalarType) -> Result<u32, AllocError> {
        let index = SEGMENTS
            .iter()
            .position(|s| s.class == class && s.ty == ty)
            .ok_or(AllocError::UnsupportedType { class, ty })?;
        let segment = SEGMENTS[index];
        if self.next[index] >= segment.base + layout::SEGMENT_CAPACITY {
            return Err(AllocError::SegmentExhausted { class, ty });
        }
        let address = self.next[index];
        self.next[index] += 1;
        Ok(address)
    }
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// The dedup key text for a constant payload
fn constant_text(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(i) => i.to_string(),
        ConstValue::Float(f) => f.to_string(),
        ConstValue::Str(s) => s.clone(),
    }
}
