//! A structured, mutable view of a core WebAssembly module.
//!
//! This crate decodes just enough of a module for whole-program passes over
//! its functions: the function import/export surface, element segments, the
//! code section and the debug name table. Everything else is carried through
//! as raw section bytes so that decoding and re-encoding a module is lossless.
//!
//! Function bodies are kept as raw bytes in the module and only decoded into
//! an [`Instruction`] tree on demand via [`CodeEntry::function`].

#![deny(missing_docs)]

use anyhow::{Result, bail};
use cranelift_entity::entity_impl;

mod encode;
mod function;
mod instruction;
mod module;
mod names;
mod parse;
mod visit;

pub use crate::function::{Function, ValType};
pub use crate::instruction::{BlockType, Instruction, MemArg};
pub use crate::module::{
    CodeEntry, ElementSegment, Export, ExportKind, Import, ImportKind, Module,
};
pub use crate::names::{FunctionName, Names};
pub use crate::visit::{Visitor, walk_instruction, walk_instructions};

/// Index type of a function (imported or defined) inside the WebAssembly
/// module.
///
/// This is the single flat index space shared by call instructions, exports,
/// element segments and the name section.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncIndex(u32);
entity_impl!(FuncIndex, "func");

impl FuncIndex {
    /// Convert an index read from a module. `u32::MAX` is reserved by the
    /// entity encoding and can never name a function, so it is rejected.
    pub(crate) fn from_wasm(index: u32) -> Result<FuncIndex> {
        if index == u32::MAX {
            bail!("function index {index:#x} is out of range");
        }
        Ok(FuncIndex::from_u32(index))
    }
}

/// Index type of a defined function, i.e. a position in the code section.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinedFuncIndex(u32);
entity_impl!(DefinedFuncIndex, "defined_func");
