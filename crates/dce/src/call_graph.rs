//! Whole-program call graph.
//!
//! The graph has two sources. The runtime library ships its call graph as
//! CSV records of `(caller, callee)` names, which are resolved through the
//! [`SymbolTable`]. Functions compiled for the current unit have their direct
//! call targets scanned from their instruction trees instead.

use crate::error::{DceError, Role, UnescapeError};
use crate::{CompiledFunc, SymbolTable};
use std::collections::HashMap;
use wasmprune_module::{FuncIndex, Instruction, Visitor, walk_instruction, walk_instructions};

/// Caller to callee edges, keyed by function index.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    edges: HashMap<FuncIndex, Vec<FuncIndex>>,
}

impl CallGraph {
    /// Create an empty call graph.
    pub fn new() -> CallGraph {
        CallGraph::default()
    }

    /// Decode the runtime's built-in call graph.
    ///
    /// Each record holds a caller and a callee name, both of which may use
    /// `\XX` hex escapes. Every name must resolve through `symbols`.
    pub fn from_builtin_csv(csv: &[u8], symbols: &SymbolTable) -> Result<CallGraph, DceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv);

        let mut graph = CallGraph::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            if record.len() != 2 {
                return Err(DceError::MalformedRecord {
                    line,
                    fields: record.len(),
                });
            }
            let caller = resolve(symbols, &record[0], Role::Caller)?;
            let callee = resolve(symbols, &record[1], Role::Callee)?;
            graph.add_edge(caller, callee);
        }

        log::debug!(
            "built-in call graph has {} edges from {} callers",
            graph.edge_count(),
            graph.edges.len()
        );
        Ok(graph)
    }

    /// Add the direct calls made by freshly compiled functions.
    ///
    /// The callee list of each compiled function replaces whatever the
    /// built-in graph said about it.
    pub fn add_compiled(
        &mut self,
        compiled: &[CompiledFunc],
        symbols: &SymbolTable,
    ) -> Result<(), DceError> {
        for func in compiled {
            let index = symbols.resolve(&func.name)?;
            let callees = find_callees(&func.function.instructions);
            log::trace!("{} ({index}) calls {callees:?}", func.name);
            self.edges.insert(index, callees);
        }
        Ok(())
    }

    /// Record that `caller` calls `callee`.
    pub fn add_edge(&mut self, caller: FuncIndex, callee: FuncIndex) {
        self.edges.entry(caller).or_default().push(callee);
    }

    /// The functions `caller` calls, in the order they were recorded.
    pub fn callees(&self, caller: FuncIndex) -> &[FuncIndex] {
        self.edges
            .get(&caller)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

fn resolve(symbols: &SymbolTable, raw: &str, role: Role) -> Result<FuncIndex, DceError> {
    let name = unescape_name(raw).map_err(|source| DceError::Unescape {
        role,
        raw: raw.to_string(),
        source,
    })?;
    match symbols.get(&name) {
        Some(index) => Ok(index),
        None => {
            let raw = raw.to_string();
            Err(match role {
                Role::Caller => DceError::UnknownCaller { raw, name },
                Role::Callee => DceError::UnknownCallee { raw, name },
            })
        }
    }
}

/// Undo the escaping of a call graph name: `\XX` stands for the byte with
/// hex value `XX`. Any other use of a backslash, or a bare `"`, is an error.
pub fn unescape_name(raw: &str) -> Result<String, UnescapeError> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or(UnescapeError::InvalidEscape(i))?;
                out.push(byte);
                i += 3;
            }
            b'"' => return Err(UnescapeError::UnescapedQuote(i)),
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| UnescapeError::InvalidUtf8)
}

/// The targets of all direct calls and tail calls in `instructions`, at any
/// nesting depth, in the order they appear.
pub fn find_callees(instructions: &[Instruction]) -> Vec<FuncIndex> {
    struct Callees(Vec<FuncIndex>);

    impl Visitor for Callees {
        fn visit_instruction(&mut self, instruction: &Instruction) {
            if let Instruction::Call(callee) | Instruction::ReturnCall(callee) = instruction {
                self.0.push(*callee);
            }
            walk_instruction(self, instruction);
        }
    }

    let mut callees = Callees(Vec::new());
    walk_instructions(&mut callees, instructions);
    callees.0
}
