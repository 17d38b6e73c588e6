use crate::names::Names;
use crate::{DefinedFuncIndex, FuncIndex, Function};
use anyhow::{Context, Result};
use cranelift_entity::{EntityRef, PrimaryMap};

/// A section of the module, in its original position.
#[derive(Clone, Debug)]
pub(crate) enum Section {
    /// A section this crate does not rewrite, kept verbatim. For custom
    /// sections `data` includes the section name.
    Raw { id: u8, data: Vec<u8> },
    /// The code section, re-encoded from [`Module::code_entries`].
    Code,
    /// The `name` custom section, re-encoded from [`Module::names`].
    Names,
}

/// What an import provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportKind {
    /// A function with the given type index.
    Function(u32),
    /// A table, memory, global or tag.
    Other,
}

/// An entry of the import section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    /// The module name.
    pub module: String,
    /// The field name.
    pub name: String,
    /// What is imported.
    pub kind: ImportKind,
}

/// What an export refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    /// A function.
    Function,
    /// A table, memory, global or tag.
    Other,
}

/// An entry of the export section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    /// The exported name.
    pub name: String,
    /// What kind of entity `index` refers to.
    pub kind: ExportKind,
    /// The index of the exported entity in its own index space.
    pub index: u32,
}

impl Export {
    /// The exported function, if this export is a function.
    pub fn func(&self) -> Option<FuncIndex> {
        match self.kind {
            ExportKind::Function => Some(FuncIndex::from_u32(self.index)),
            ExportKind::Other => None,
        }
    }
}

/// The functions an element segment places in a table, whether encoded as a
/// plain index list or as `ref.func` expressions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementSegment {
    /// Functions referenced by the segment, in order. `ref.null` entries are
    /// skipped.
    pub functions: Vec<FuncIndex>,
}

/// The body of a defined function, as stored in the code section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeEntry {
    body: Vec<u8>,
}

impl CodeEntry {
    /// Wrap raw body bytes: local declarations followed by the expression,
    /// without the size prefix.
    pub fn new(body: Vec<u8>) -> CodeEntry {
        CodeEntry { body }
    }

    /// Encode `function` into a code entry.
    pub fn from_function(function: &Function) -> CodeEntry {
        CodeEntry::new(function.encode())
    }

    /// The raw body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body into an instruction tree.
    pub fn function(&self) -> Result<Function> {
        Function::decode(&self.body)
    }
}

/// A decoded core WebAssembly module.
///
/// Imports, exports, element segments and the start function are read-only.
/// The code section is a fixed array of slots indexed by
/// [`DefinedFuncIndex`]: bodies can be replaced, but no entry can be added or
/// removed, so no function index ever moves.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub(crate) sections: Vec<Section>,
    pub(crate) imports: Vec<Import>,
    pub(crate) num_imported_funcs: u32,
    pub(crate) exports: Vec<Export>,
    pub(crate) elements: Vec<ElementSegment>,
    pub(crate) start: Option<FuncIndex>,
    pub(crate) code: PrimaryMap<DefinedFuncIndex, CodeEntry>,
    pub(crate) names: Names,
}

impl Module {
    /// The import section's entries, in order.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Function imports along with their function index. Function imports
    /// occupy the start of the function index space, in import order.
    pub fn imported_funcs(&self) -> impl Iterator<Item = (FuncIndex, &Import)> + '_ {
        self.imports
            .iter()
            .filter(|i| matches!(i.kind, ImportKind::Function(_)))
            .enumerate()
            .map(|(i, import)| (FuncIndex::new(i), import))
    }

    /// The number of imported functions.
    pub fn num_imported_funcs(&self) -> u32 {
        self.num_imported_funcs
    }

    /// The export section's entries, in order.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// The element segments, in order.
    pub fn elements(&self) -> &[ElementSegment] {
        &self.elements
    }

    /// The start function, if any.
    pub fn start(&self) -> Option<FuncIndex> {
        self.start
    }

    /// The number of functions with a body in the code section.
    pub fn num_defined_funcs(&self) -> usize {
        self.code.len()
    }

    /// The number of functions, imported and defined.
    pub fn num_funcs(&self) -> usize {
        self.num_imported_funcs as usize + self.code.len()
    }

    /// Convert a `DefinedFuncIndex` into its `FuncIndex`.
    #[inline]
    pub fn func_index(&self, defined_func: DefinedFuncIndex) -> FuncIndex {
        FuncIndex::from_u32(self.num_imported_funcs + defined_func.as_u32())
    }

    /// Convert a `FuncIndex` into a `DefinedFuncIndex`. Returns None if the
    /// index is an imported function.
    #[inline]
    pub fn defined_func_index(&self, func: FuncIndex) -> Option<DefinedFuncIndex> {
        if func.as_u32() < self.num_imported_funcs {
            None
        } else {
            Some(DefinedFuncIndex::from_u32(
                func.as_u32() - self.num_imported_funcs,
            ))
        }
    }

    /// Test whether the given function index is for an imported function.
    #[inline]
    pub fn is_imported_function(&self, index: FuncIndex) -> bool {
        index.as_u32() < self.num_imported_funcs
    }

    /// All code entries with their defined-function index.
    pub fn code_entries(&self) -> impl Iterator<Item = (DefinedFuncIndex, &CodeEntry)> + '_ {
        self.code.iter()
    }

    /// The code entry of a defined function.
    pub fn code_entry(&self, index: DefinedFuncIndex) -> Option<&CodeEntry> {
        self.code.get(index)
    }

    /// Decode the body of function `index`. Fails for imported functions and
    /// for indices out of range.
    pub fn defined_function(&self, index: FuncIndex) -> Result<Function> {
        let defined = self
            .defined_func_index(index)
            .with_context(|| format!("function {index} is imported"))?;
        let entry = self
            .code
            .get(defined)
            .with_context(|| format!("function {index} is out of range"))?;
        entry
            .function()
            .with_context(|| format!("failed to decode the body of function {index}"))
    }

    /// Replace the body in slot `index`, returning the previous body.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn replace_body(&mut self, index: DefinedFuncIndex, entry: CodeEntry) -> CodeEntry {
        std::mem::replace(&mut self.code[index], entry)
    }

    /// The debug names.
    pub fn names(&self) -> &Names {
        &self.names
    }

    /// Mutable access to the debug names. A module without a `name` section
    /// gets one appended when encoded with a non-empty table.
    pub fn names_mut(&mut self) -> &mut Names {
        &mut self.names
    }

    /// Whether the module has a `name` section.
    pub fn has_names(&self) -> bool {
        self.sections.iter().any(|s| matches!(s, Section::Names))
    }

    /// Run the encoded module through `wasmparser`'s validator.
    pub fn validate(&self) -> Result<()> {
        let wasm = self.encode();
        wasmparser::Validator::new()
            .validate_all(&wasm)
            .context("module failed to validate")?;
        Ok(())
    }
}
